// src/parse_type.rs
//
// Type parsing: cv-qualified, possibly qualified names with template
// arguments, pointer levels and references; plus function parameter lists.

use smallvec::SmallVec;

use crate::ast::{FUNDAMENTAL_WORDS, NameSegment, Param, PointerLevel, RefKind, TemplateArg, TypeExpr, TypeName};
use crate::errors::ParserError;
use crate::parser::{ParseError, Parser};
use crate::TokenType;

impl<'src> Parser<'src> {
    /// Run `f`, restoring the token position if it fails.
    pub(super) fn speculate<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Option<T> {
        let save = self.pos;
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = save;
                None
            }
        }
    }

    /// Parse a full type: `const ns::Vec<int>* const&`
    pub(super) fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let start = self.pos;
        let mut ty = self.parse_base_type()?;
        self.parse_pointer_suffix(&mut ty);
        ty.span = self.span_from(start);
        Ok(ty)
    }

    /// Parse a type without pointer levels or reference. Declarators add those
    /// per name (`int a, *b;`).
    pub(super) fn parse_base_type(&mut self) -> Result<TypeExpr, ParseError> {
        let start = self.pos;
        let mut is_const = false;
        let mut is_volatile = false;
        let mut elaborated = false;

        loop {
            match self.current().ty {
                TokenType::KwConst => is_const = true,
                TokenType::KwVolatile => is_volatile = true,
                TokenType::KwClass
                | TokenType::KwStruct
                | TokenType::KwUnion
                | TokenType::KwEnum
                | TokenType::KwTypename => elaborated = true,
                _ => break,
            }
            self.advance();
        }

        let name = if self.is_fundamental_word() {
            let mut words = Vec::new();
            while self.is_fundamental_word() || self.check(TokenType::KwConst) {
                if self.check(TokenType::KwConst) {
                    is_const = true;
                } else {
                    words.push(self.current().lexeme.to_string());
                }
                self.advance();
            }
            TypeName::simple(words.join(" "))
        } else if self.check(TokenType::Identifier) || self.check(TokenType::ColonColon) {
            self.parse_type_name()?
        } else {
            let token = self.current();
            return Err(ParseError::new(
                ParserError::ExpectedType {
                    span: token.span.into(),
                },
                token.span,
            ));
        };

        loop {
            match self.current().ty {
                TokenType::KwConst => is_const = true,
                TokenType::KwVolatile => is_volatile = true,
                _ => break,
            }
            self.advance();
        }

        Ok(TypeExpr {
            is_const,
            is_volatile,
            elaborated,
            name,
            pointers: SmallVec::new(),
            reference: None,
            span: self.span_from(start),
        })
    }

    fn is_fundamental_word(&self) -> bool {
        let token = self.current();
        token.ty == TokenType::Identifier && FUNDAMENTAL_WORDS.contains(&&*token.lexeme)
    }

    /// `*`, `* const`, ... followed by an optional `&` or `&&`.
    pub(super) fn parse_pointer_suffix(&mut self, ty: &mut TypeExpr) {
        while self.match_token(TokenType::Star) {
            let mut level = PointerLevel::default();
            loop {
                match self.current().ty {
                    TokenType::KwConst => level.is_const = true,
                    TokenType::KwVolatile => level.is_volatile = true,
                    _ => break,
                }
                self.advance();
            }
            ty.pointers.push(level);
        }
        if self.match_token(TokenType::Ampersand) {
            ty.reference = Some(RefKind::LValue);
        } else if self.match_token(TokenType::AmpAmp) {
            ty.reference = Some(RefKind::RValue);
        }
    }

    /// Parse `::a::b<args>::c`. Stops before `::~` and `::operator` so
    /// out-of-line definitions can take over.
    pub(super) fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let global = self.match_token(TokenType::ColonColon);
        let mut segments = SmallVec::new();
        loop {
            let (ident, _) = self.expect_identifier()?;
            let args = if self.check(TokenType::Lt) {
                Some(self.parse_template_args()?)
            } else {
                None
            };
            segments.push(NameSegment { ident, args });
            if self.check(TokenType::ColonColon) && self.peek_at(1).ty == TokenType::Identifier {
                self.advance();
            } else {
                break;
            }
        }
        Ok(TypeName { global, segments })
    }

    /// Parse `<arg, ...>` starting at '<'.
    pub(super) fn parse_template_args(&mut self) -> Result<Vec<TemplateArg>, ParseError> {
        self.consume(TokenType::Lt, "<")?;
        let mut args = Vec::new();
        if self.match_token(TokenType::Gt) {
            return Ok(args);
        }
        loop {
            let ty = self.speculate(|p| {
                let ty = p.parse_type()?;
                if p.check(TokenType::Comma) || p.check(TokenType::Gt) {
                    Ok(ty)
                } else {
                    Err(p.expected_error(">"))
                }
            });
            let arg = match ty {
                Some(ty) => TemplateArg::Type(ty),
                None => TemplateArg::Value(self.parse_template_value()?),
            };
            args.push(arg);
            if self.match_token(TokenType::Comma) {
                continue;
            }
            self.consume(TokenType::Gt, ">")?;
            return Ok(args);
        }
    }

    /// A non-type template argument, kept as trimmed source text.
    fn parse_template_value(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.skip_until(&[
            TokenType::Comma,
            TokenType::Gt,
            TokenType::Semicolon,
            TokenType::LBrace,
            TokenType::RBrace,
            TokenType::RParen,
        ])?;
        if self.pos == start || !(self.check(TokenType::Comma) || self.check(TokenType::Gt)) {
            return Err(self.expected_error(">"));
        }
        let span = self.span_from(start);
        Ok(self.text(span).trim().to_string())
    }

    /// Parse a parenthesized parameter list starting at '('.
    pub(super) fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.consume(TokenType::LParen, "(")?;
        let mut params = Vec::new();
        if self.match_token(TokenType::RParen) {
            return Ok(params);
        }
        loop {
            let start = self.pos;
            let parsed = self.speculate(|p| {
                let ty = p.parse_type()?;
                let name = if p.check(TokenType::Identifier) {
                    let (name, _) = p.expect_identifier()?;
                    Some(name)
                } else {
                    None
                };
                while p.check(TokenType::LBracket) {
                    p.skip_group()?;
                }
                if p.check(TokenType::Comma) || p.check(TokenType::RParen) || p.check(TokenType::Eq) {
                    Ok((ty, name))
                } else {
                    Err(p.unexpected_token_error())
                }
            });

            let (ty, name) = match parsed {
                Some((ty, name)) => (Some(ty), name),
                None => {
                    // Function pointers, variadics and the like are kept as text.
                    self.skip_until(&[TokenType::Comma, TokenType::RParen, TokenType::Eq])?;
                    (None, None)
                }
            };

            let default_value = if self.match_token(TokenType::Eq) {
                let default_start = self.pos;
                self.skip_until(&[TokenType::Comma, TokenType::RParen])?;
                Some(self.span_from(default_start))
            } else {
                None
            };

            params.push(Param {
                ty,
                name,
                default_value,
                span: self.span_from(start),
            });

            if self.match_token(TokenType::Comma) {
                continue;
            }
            self.consume(TokenType::RParen, ")")?;
            return Ok(params);
        }
    }
}
