// src/parser/mod.rs

use crate::errors::{LexerError, ParserError};
use crate::{Lexer, Span, Token, TokenType, ast::*};

/// Skeleton parser over a fully lexed token buffer. Parsing is speculative in
/// places (declaration vs. expression statements), so the parser keeps every
/// token and backtracks by restoring `pos`.
pub struct Parser<'src> {
    pub(super) source: &'src str,
    pub(super) tokens: Vec<Token<'src>>,
    pub(super) pos: usize,
    lexer_errors: Vec<LexerError>,
}

/// A parse error wrapping a miette-enabled ParserError
#[derive(Debug)]
pub struct ParseError {
    pub error: ParserError,
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(error: ParserError, span: Span) -> Self {
        Self { error, span }
    }
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let (tokens, lexer_errors) = Lexer::new(source).tokenize();
        // Directives carry no declarations the tool reads, and lexer errors
        // are reported separately.
        let tokens = tokens
            .into_iter()
            .filter(|t| !matches!(t.ty, TokenType::Directive | TokenType::Error))
            .collect();
        Self {
            source,
            tokens,
            pos: 0,
            lexer_errors,
        }
    }

    /// Parse every namespace-scope declaration of the file.
    pub fn parse_translation_unit(&mut self) -> Result<TranslationUnit, ParseError> {
        let items = self.parse_items(false)?;
        Ok(TranslationUnit { items })
    }

    /// Take lexer errors (for diagnostic rendering)
    pub fn take_lexer_errors(&mut self) -> Vec<LexerError> {
        std::mem::take(&mut self.lexer_errors)
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub(super) fn current(&self) -> &Token<'src> {
        // The buffer always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(super) fn peek_at(&self, offset: usize) -> &Token<'src> {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(super) fn previous(&self) -> &Token<'src> {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    /// Advance to the next token
    pub(super) fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    /// Check if the current token matches the given type
    pub(super) fn check(&self, ty: TokenType) -> bool {
        self.current().ty == ty
    }

    pub(super) fn check_ident(&self, text: &str) -> bool {
        self.current().is_ident(text)
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.check(TokenType::Eof)
    }

    /// Consume the current token if it matches, otherwise return false
    pub(super) fn match_token(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require a token of the given type, or return an error
    pub(super) fn consume(&mut self, ty: TokenType, expected: &str) -> Result<(), ParseError> {
        if self.check(ty) {
            self.advance();
            Ok(())
        } else {
            Err(self.expected_error(expected))
        }
    }

    pub(super) fn expected_error(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::new(
            ParserError::ExpectedToken {
                expected: expected.to_string(),
                found: token.lexeme.to_string(),
                span: token.span.into(),
            },
            token.span,
        )
    }

    pub(super) fn unexpected_token_error(&self) -> ParseError {
        let token = self.current();
        ParseError::new(
            ParserError::UnexpectedToken {
                token: token.ty.as_str().to_string(),
                span: token.span.into(),
            },
            token.span,
        )
    }

    pub(super) fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        let token = self.current();
        if token.ty == TokenType::Identifier {
            let result = (token.lexeme.to_string(), token.span);
            self.advance();
            Ok(result)
        } else {
            Err(ParseError::new(
                ParserError::ExpectedIdentifier {
                    span: token.span.into(),
                },
                token.span,
            ))
        }
    }

    /// Span from the token at `start` through the previously consumed token.
    pub(super) fn span_from(&self, start: usize) -> Span {
        let first = self.tokens[start.min(self.tokens.len() - 1)].span;
        if self.pos <= start {
            return Span::new(first.start, first.start, first.line, first.column);
        }
        first.merge(self.previous().span)
    }

    pub(super) fn text(&self, span: Span) -> &'src str {
        span.text(self.source)
    }

    /// Skip a balanced `(...)`, `[...]` or `{...}` group starting at the
    /// current opening delimiter.
    pub(super) fn skip_group(&mut self) -> Result<(), ParseError> {
        let mut stack: Vec<usize> = Vec::new();
        loop {
            let ty = self.current().ty;
            if ty.is_open_delim() {
                stack.push(self.pos);
            } else if ty.is_close_delim() {
                let Some(open) = stack.pop() else {
                    return Err(stray_close(self.current()));
                };
                if closer_of(self.tokens[open].ty) != ty {
                    return Err(unbalanced(&self.tokens[open]));
                }
            } else if ty == TokenType::Eof {
                return Err(match stack.last() {
                    Some(&open) => unbalanced(&self.tokens[open]),
                    None => self.unexpected_token_error(),
                });
            }
            self.advance();
            if stack.is_empty() {
                return Ok(());
            }
        }
    }

    /// Skip tokens until one of `stops` at nesting depth zero (not consumed),
    /// or until EOF. Nested groups are skipped whole.
    pub(super) fn skip_until(&mut self, stops: &[TokenType]) -> Result<(), ParseError> {
        loop {
            let ty = self.current().ty;
            if stops.contains(&ty) || ty == TokenType::Eof {
                return Ok(());
            }
            if ty.is_open_delim() {
                self.skip_group()?;
            } else if ty.is_close_delim() {
                return Err(stray_close(self.current()));
            } else {
                self.advance();
            }
        }
    }

    /// Skip one declaration: through the ';' at depth zero, or through a
    /// braced body (and a ';' directly after it).
    pub(super) fn skip_declaration(&mut self) -> Result<(), ParseError> {
        loop {
            match self.current().ty {
                TokenType::Semicolon => {
                    self.advance();
                    return Ok(());
                }
                TokenType::LBrace => {
                    let is_initializer = matches!(
                        self.previous().ty,
                        TokenType::Eq | TokenType::Identifier | TokenType::Comma
                    );
                    self.skip_group()?;
                    if self.match_token(TokenType::Semicolon) || !is_initializer {
                        return Ok(());
                    }
                }
                TokenType::Eof => return Ok(()),
                ty if ty.is_open_delim() => self.skip_group()?,
                ty if ty.is_close_delim() => return Err(stray_close(self.current())),
                _ => self.advance(),
            }
        }
    }

    /// Skip a `template<...>` parameter list starting at '<'.
    /// Returns true if the list was non-empty.
    pub(super) fn skip_angle_group(&mut self) -> Result<bool, ParseError> {
        let open = self.pos;
        self.consume(TokenType::Lt, "<")?;
        let mut depth = 1usize;
        let mut saw_param = false;
        while depth > 0 {
            match self.current().ty {
                TokenType::Lt => depth += 1,
                TokenType::Gt => depth -= 1,
                TokenType::LParen | TokenType::LBracket | TokenType::LBrace => {
                    self.skip_group()?;
                    saw_param = true;
                    continue;
                }
                TokenType::Eof => return Err(unbalanced(&self.tokens[open])),
                _ => saw_param = true,
            }
            self.advance();
        }
        Ok(saw_param)
    }
}

pub(super) fn closer_of(open: TokenType) -> TokenType {
    match open {
        TokenType::LParen => TokenType::RParen,
        TokenType::LBracket => TokenType::RBracket,
        _ => TokenType::RBrace,
    }
}

pub(super) fn unbalanced(open: &Token<'_>) -> ParseError {
    ParseError::new(
        ParserError::UnbalancedDelimiter {
            open: open.ty.as_str().to_string(),
            close: closer_of(open.ty).as_str().to_string(),
            span: open.span.into(),
        },
        open.span,
    )
}

pub(super) fn stray_close(token: &Token<'_>) -> ParseError {
    ParseError::new(
        ParserError::StrayClosingDelimiter {
            close: token.ty.as_str().to_string(),
            span: token.span.into(),
        },
        token.span,
    )
}

#[cfg(test)]
mod tests;
