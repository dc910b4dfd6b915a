// src/parse_stmt.rs
//
// Statements inside function bodies. Only declarations and `new`
// expressions are given structure; other expressions stay opaque.

use crate::TokenType;
use crate::ast::*;
use crate::parser::{ParseError, Parser, closer_of, stray_close, unbalanced};

impl<'src> Parser<'src> {
    /// Parse `{ statements }` starting at '{'.
    pub(super) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.pos;
        self.consume(TokenType::LBrace, "{")?;
        let mut stmts = Vec::new();
        loop {
            if self.is_at_end() {
                return Err(unbalanced(&self.tokens[start]));
            }
            if self.match_token(TokenType::RBrace) {
                return Ok(Block {
                    stmts,
                    span: self.span_from(start),
                });
            }
            stmts.push(self.parse_statement()?);
        }
    }

    pub(super) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.pos;
        match self.current().ty {
            TokenType::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenType::Semicolon => {
                self.advance();
                Ok(Stmt::Empty(self.span_from(start)))
            }
            TokenType::KwIf => {
                self.advance();
                self.match_token(TokenType::KwConstexpr);
                let header = self.parse_condition()?;
                let mut body = vec![self.parse_statement()?];
                if self.match_token(TokenType::KwElse) {
                    body.push(self.parse_statement()?);
                }
                Ok(self.control(start, header, body))
            }
            TokenType::KwWhile | TokenType::KwSwitch => {
                self.advance();
                let header = self.parse_condition()?;
                let body = vec![self.parse_statement()?];
                Ok(self.control(start, header, body))
            }
            TokenType::KwFor => {
                self.advance();
                let header = self.parse_for_header()?;
                let body = vec![self.parse_statement()?];
                Ok(self.control(start, header, body))
            }
            TokenType::KwDo => {
                self.advance();
                let body = vec![self.parse_statement()?];
                self.consume(TokenType::KwWhile, "while")?;
                let header = self.parse_condition()?;
                self.consume(TokenType::Semicolon, ";")?;
                Ok(self.control(start, header, body))
            }
            TokenType::KwTry => {
                self.advance();
                let mut body = vec![Stmt::Block(self.parse_block()?)];
                while self.match_token(TokenType::KwCatch) {
                    if self.check(TokenType::LParen) {
                        self.skip_group()?;
                    }
                    body.push(Stmt::Block(self.parse_block()?));
                }
                Ok(self.control(start, Vec::new(), body))
            }
            TokenType::KwCase => {
                self.advance();
                self.skip_until(&[TokenType::Colon, TokenType::Semicolon])?;
                self.consume(TokenType::Colon, ":")?;
                Ok(Stmt::Empty(self.span_from(start)))
            }
            TokenType::KwDefault if self.peek_at(1).ty == TokenType::Colon => {
                self.advance();
                self.advance();
                Ok(Stmt::Empty(self.span_from(start)))
            }
            TokenType::Identifier if self.peek_at(1).ty == TokenType::Colon => {
                // label
                self.advance();
                self.advance();
                Ok(Stmt::Empty(self.span_from(start)))
            }
            TokenType::KwPublic | TokenType::KwPrivate | TokenType::KwProtected => {
                Err(self.unexpected_token_error())
            }
            TokenType::KwTypedef
            | TokenType::KwUsing
            | TokenType::KwStaticAssert
            | TokenType::KwEnum
            | TokenType::KwClass
            | TokenType::KwUnion
            | TokenType::KwStruct
            | TokenType::KwTemplate
            | TokenType::KwNamespace => {
                self.skip_declaration()?;
                Ok(Stmt::Empty(self.span_from(start)))
            }
            TokenType::KwReturn
            | TokenType::KwDelete
            | TokenType::KwNew
            | TokenType::KwThis
            | TokenType::KwNullptr => self.expression_statement(start),
            _ => {
                let decl = self.speculate(|p| {
                    let decl = p.parse_local_var_decl(start)?;
                    p.consume(TokenType::Semicolon, ";")?;
                    Ok(decl)
                });
                match decl {
                    Some(decl) => Ok(Stmt::VarDecl(decl)),
                    None => self.expression_statement(start),
                }
            }
        }
    }

    fn control(&self, start: usize, header: Vec<Stmt>, body: Vec<Stmt>) -> Stmt {
        Stmt::Control(ControlStmt {
            header,
            body,
            span: self.span_from(start),
        })
    }

    fn expression_statement(&mut self, start: usize) -> Result<Stmt, ParseError> {
        let mut expr = self.parse_expr(&[TokenType::Semicolon])?;
        self.consume(TokenType::Semicolon, ";")?;
        expr.span = self.span_from(start);
        Ok(Stmt::Expr(expr))
    }

    /// `( expr )` or `( decl = init )` of if/while/switch
    fn parse_condition(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(TokenType::LParen, "(")?;
        let start = self.pos;
        let clause = match self.speculate(|p| {
            let decl = p.parse_local_var_decl(start)?;
            if p.check(TokenType::RParen) || p.check(TokenType::Semicolon) {
                Ok(decl)
            } else {
                Err(p.expected_error(")"))
            }
        }) {
            Some(decl) if decl.declarators.iter().all(|d| d.init.is_some()) => Stmt::VarDecl(decl),
            Some(_) => {
                self.pos = start;
                Stmt::Expr(self.parse_expr(&[TokenType::RParen, TokenType::Semicolon])?)
            }
            None => Stmt::Expr(self.parse_expr(&[TokenType::RParen, TokenType::Semicolon])?),
        };
        let mut header = vec![clause];
        // `if (init; cond)`
        if self.match_token(TokenType::Semicolon) {
            header.push(Stmt::Expr(self.parse_expr(&[TokenType::RParen])?));
        }
        self.consume(TokenType::RParen, ")")?;
        Ok(header)
    }

    /// `(init; cond; step)` or `(decl : range)`
    fn parse_for_header(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(TokenType::LParen, "(")?;
        let mut header = Vec::new();
        let start = self.pos;

        if !self.check(TokenType::Semicolon) {
            let decl = self.speculate(|p| {
                let decl = p.parse_local_var_decl(start)?;
                if p.check(TokenType::Semicolon) || p.check(TokenType::Colon) {
                    Ok(decl)
                } else {
                    Err(p.expected_error(";"))
                }
            });
            match decl {
                Some(decl) => {
                    header.push(Stmt::VarDecl(decl));
                    if self.match_token(TokenType::Colon) {
                        header.push(Stmt::Expr(self.parse_expr(&[TokenType::RParen])?));
                        self.consume(TokenType::RParen, ")")?;
                        return Ok(header);
                    }
                }
                None => header.push(Stmt::Expr(self.parse_expr(&[TokenType::Semicolon])?)),
            }
        }
        self.consume(TokenType::Semicolon, ";")?;
        header.push(Stmt::Expr(self.parse_expr(&[TokenType::Semicolon])?));
        self.consume(TokenType::Semicolon, ";")?;
        header.push(Stmt::Expr(self.parse_expr(&[TokenType::RParen])?));
        self.consume(TokenType::RParen, ")")?;
        Ok(header)
    }

    /// `[static] [const] Type declarators`, without the terminating ';'.
    fn parse_local_var_decl(&mut self, start: usize) -> Result<VarDecl, ParseError> {
        loop {
            match self.current().ty {
                TokenType::KwStatic | TokenType::KwConstexpr | TokenType::KwInline => self.advance(),
                TokenType::KwExtern => self.advance(),
                TokenType::Identifier
                    if self.check_ident("thread_local") || self.check_ident("register") =>
                {
                    self.advance()
                }
                _ => break,
            }
        }
        let base = self.parse_base_type()?;
        self.parse_declarators(start, base)
    }

    /// Declarators after a base type: `*a = x, b(1), c{2}`. The terminator is
    /// left for the caller.
    pub(super) fn parse_declarators(
        &mut self,
        start: usize,
        base: TypeExpr,
    ) -> Result<VarDecl, ParseError> {
        let mut declarators = Vec::new();
        loop {
            let declarator_start = self.pos;
            let mut ty = base.clone();
            self.parse_pointer_suffix(&mut ty);
            if self.pos > declarator_start {
                ty.span = base.span.merge(self.previous().span);
            }
            let (name, name_span) = self.expect_identifier()?;
            while self.check(TokenType::LBracket) {
                self.skip_group()?;
            }

            let init = match self.current().ty {
                TokenType::Eq => {
                    let init_start = self.pos;
                    self.advance();
                    if self.check(TokenType::LBrace) {
                        Some(self.parse_init_args(InitStyle::Brace)?)
                    } else {
                        let expr = self.parse_expr(&[
                            TokenType::Comma,
                            TokenType::Semicolon,
                            TokenType::RParen,
                        ])?;
                        Some(Initializer {
                            style: InitStyle::Assign,
                            exprs: vec![expr],
                            span: self.span_from(init_start),
                        })
                    }
                }
                TokenType::LParen => Some(self.parse_init_args(InitStyle::Paren)?),
                TokenType::LBrace => Some(self.parse_init_args(InitStyle::Brace)?),
                _ => None,
            };

            declarators.push(Declarator {
                ty,
                name,
                name_span,
                init,
                span: self.span_from(declarator_start),
            });

            if !self.match_token(TokenType::Comma) {
                return Ok(VarDecl {
                    declarators,
                    span: self.span_from(start),
                });
            }
        }
    }

    /// `(a, b)` or `{a, b}` starting at the opening delimiter.
    pub(super) fn parse_init_args(&mut self, style: InitStyle) -> Result<Initializer, ParseError> {
        let start = self.pos;
        let open = self.current().ty;
        let close = closer_of(open);
        self.advance();
        let mut exprs = Vec::new();
        if !self.check(close) {
            loop {
                if self.is_at_end() {
                    return Err(unbalanced(&self.tokens[start]));
                }
                exprs.push(self.parse_expr(&[TokenType::Comma, close])?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        if !self.check(close) {
            return Err(if self.is_at_end() {
                unbalanced(&self.tokens[start])
            } else {
                stray_close(self.current())
            });
        }
        self.advance();
        Ok(Initializer {
            style,
            exprs,
            span: self.span_from(start),
        })
    }

    /// Scan an expression up to one of `stops` at depth zero, recording every
    /// `new` expression in it.
    pub(super) fn parse_expr(&mut self, stops: &[TokenType]) -> Result<Expr, ParseError> {
        let start = self.pos;
        let mut news = Vec::new();

        if self.check(TokenType::KwNew) {
            let new = self.parse_new()?;
            if stops.contains(&self.current().ty) || self.is_at_end() {
                return Ok(Expr {
                    kind: ExprKind::New(Box::new(new)),
                    span: self.span_from(start),
                });
            }
            news.push(new);
        }

        loop {
            let ty = self.current().ty;
            if stops.contains(&ty) || ty == TokenType::Eof {
                break;
            }
            if ty == TokenType::KwNew {
                news.push(self.parse_new()?);
            } else if ty.is_open_delim() {
                self.collect_group_news(&mut news)?;
            } else if ty.is_close_delim() {
                return Err(stray_close(self.current()));
            } else {
                self.advance();
            }
        }

        Ok(Expr {
            kind: ExprKind::Opaque(news),
            span: self.span_from(start),
        })
    }

    /// Skip a balanced group, collecting the `new` expressions inside it.
    fn collect_group_news(&mut self, news: &mut Vec<NewExpr>) -> Result<(), ParseError> {
        let open = self.pos;
        let close = closer_of(self.current().ty);
        self.advance();
        loop {
            let ty = self.current().ty;
            if ty == close {
                self.advance();
                return Ok(());
            }
            match ty {
                TokenType::Eof => return Err(unbalanced(&self.tokens[open])),
                TokenType::KwNew => news.push(self.parse_new()?),
                ty if ty.is_open_delim() => self.collect_group_news(news)?,
                ty if ty.is_close_delim() => return Err(stray_close(self.current())),
                _ => self.advance(),
            }
        }
    }

    /// `new [(placement)] Type [\[len\]] [(args) | {args}]` starting at `new`.
    fn parse_new(&mut self) -> Result<NewExpr, ParseError> {
        let start = self.pos;
        self.consume(TokenType::KwNew, "new")?;

        let placement = if self.check(TokenType::LParen) {
            let placement_start = self.pos;
            self.skip_group()?;
            Some(self.span_from(placement_start))
        } else {
            None
        };

        let type_start = self.pos;
        let mut ty = self.parse_base_type()?;
        while self.match_token(TokenType::Star) {
            ty.pointers.push(PointerLevel::default());
        }
        ty.span = self.span_from(type_start);

        let array_len = if self.match_token(TokenType::LBracket) {
            let len = self.parse_expr(&[TokenType::RBracket])?;
            self.consume(TokenType::RBracket, "]")?;
            while self.check(TokenType::LBracket) {
                self.skip_group()?;
            }
            Some(Box::new(len))
        } else {
            None
        };

        let init = match self.current().ty {
            TokenType::LParen => Some(self.parse_init_args(InitStyle::Paren)?),
            TokenType::LBrace => Some(self.parse_init_args(InitStyle::Brace)?),
            _ => None,
        };

        Ok(NewExpr {
            ty,
            placement,
            array_len,
            init,
            span: self.span_from(start),
        })
    }
}
