// src/parse_decl.rs
//
// Namespace-scope and class-member declarations.

use crate::TokenType;
use crate::ast::*;
use crate::errors::ParserError;
use crate::parser::{ParseError, Parser, stray_close, unbalanced};

/// Where a function signature was found; decides how the name is classified.
struct FunctionHead {
    kind: FunctionKind,
    name: String,
    name_span: crate::Span,
    return_type: Option<TypeExpr>,
    specifiers: Specifiers,
    decl_start: usize,
    start: usize,
}

impl<'src> Parser<'src> {
    /// Parse items until EOF, or until the closing '}' when `nested`.
    pub(super) fn parse_items(&mut self, nested: bool) -> Result<Vec<Item>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.is_at_end() {
                if nested {
                    return Err(self.expected_error("}"));
                }
                return Ok(items);
            }
            if self.check(TokenType::RBrace) {
                if nested {
                    return Ok(items);
                }
                return Err(stray_close(self.current()));
            }
            items.push(self.parse_item()?);
        }
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        let start = self.pos;
        match self.current().ty {
            TokenType::Semicolon => {
                self.advance();
                Ok(Item::Other(self.span_from(start)))
            }
            TokenType::KwNamespace => self.parse_namespace(start),
            TokenType::KwInline if self.peek_at(1).ty == TokenType::KwNamespace => {
                self.advance();
                self.parse_namespace(start)
            }
            TokenType::KwExtern if self.peek_at(1).ty == TokenType::StringLiteral => {
                self.advance();
                self.advance();
                if self.check(TokenType::LBrace) {
                    self.advance();
                    let items = self.parse_items(true)?;
                    self.consume(TokenType::RBrace, "}")?;
                    Ok(Item::Namespace(NamespaceDecl {
                        name: None,
                        items,
                        span: self.span_from(start),
                    }))
                } else {
                    self.parse_declaration_item(start, false)
                }
            }
            TokenType::KwTemplate => self.parse_template_item(start),
            TokenType::KwClass | TokenType::KwStruct | TokenType::KwUnion => {
                self.parse_class_or_declaration(start, TemplateHeader::None)
            }
            TokenType::KwTypedef => self.parse_typedef(start),
            TokenType::KwUsing => self.parse_using(start),
            TokenType::KwEnum | TokenType::KwStaticAssert => {
                self.skip_declaration()?;
                Ok(Item::Other(self.span_from(start)))
            }
            _ => self.parse_declaration_item(start, false),
        }
    }

    fn parse_namespace(&mut self, start: usize) -> Result<Item, ParseError> {
        self.consume(TokenType::KwNamespace, "namespace")?;
        let mut name = None;
        if self.check(TokenType::Identifier) {
            let mut parts = Vec::new();
            loop {
                let (part, _) = self.expect_identifier()?;
                parts.push(part);
                if !self.match_token(TokenType::ColonColon) {
                    break;
                }
            }
            name = Some(parts.join("::"));
        }
        if self.check(TokenType::Eq) {
            // namespace alias
            self.skip_declaration()?;
            return Ok(Item::Other(self.span_from(start)));
        }
        let open = self.pos;
        self.consume(TokenType::LBrace, "{")?;
        let items = match self.parse_items(true) {
            Ok(items) => items,
            Err(_) if self.is_at_end() => return Err(unbalanced(&self.tokens[open])),
            Err(e) => return Err(e),
        };
        self.consume(TokenType::RBrace, "}")?;
        Ok(Item::Namespace(NamespaceDecl {
            name,
            items,
            span: self.span_from(start),
        }))
    }

    fn parse_template_item(&mut self, start: usize) -> Result<Item, ParseError> {
        self.consume(TokenType::KwTemplate, "template")?;
        if !self.check(TokenType::Lt) {
            // explicit instantiation
            self.skip_declaration()?;
            return Ok(Item::Other(self.span_from(start)));
        }
        let header = if self.skip_angle_group()? {
            TemplateHeader::Primary
        } else {
            TemplateHeader::Specialization
        };
        match self.current().ty {
            TokenType::KwClass | TokenType::KwStruct | TokenType::KwUnion => {
                self.parse_class_or_declaration(start, header)
            }
            TokenType::KwTemplate | TokenType::KwUsing | TokenType::KwTypedef => {
                self.skip_declaration()?;
                Ok(Item::Other(self.span_from(start)))
            }
            _ => self.parse_declaration_item(start, header == TemplateHeader::Primary),
        }
    }

    fn parse_typedef(&mut self, start: usize) -> Result<Item, ParseError> {
        self.consume(TokenType::KwTypedef, "typedef")?;
        let alias = self.speculate(|p| {
            let target = p.parse_type()?;
            let (name, _) = p.expect_identifier()?;
            p.consume(TokenType::Semicolon, ";")?;
            Ok((name, target))
        });
        match alias {
            Some((name, target)) => Ok(Item::Alias(AliasDecl {
                name,
                target,
                span: self.span_from(start),
            })),
            None => {
                self.skip_declaration()?;
                Ok(Item::Other(self.span_from(start)))
            }
        }
    }

    fn parse_using(&mut self, start: usize) -> Result<Item, ParseError> {
        self.consume(TokenType::KwUsing, "using")?;
        if self.check(TokenType::Identifier) && self.peek_at(1).ty == TokenType::Eq {
            let alias = self.speculate(|p| {
                let (name, _) = p.expect_identifier()?;
                p.consume(TokenType::Eq, "=")?;
                let target = p.parse_type()?;
                p.consume(TokenType::Semicolon, ";")?;
                Ok((name, target))
            });
            if let Some((name, target)) = alias {
                return Ok(Item::Alias(AliasDecl {
                    name,
                    target,
                    span: self.span_from(start),
                }));
            }
        }
        self.skip_declaration()?;
        Ok(Item::Other(self.span_from(start)))
    }

    /// `class X ...` at namespace scope: a definition, a forward declaration,
    /// or an elaborated type in an ordinary declaration (`struct X* p;`).
    fn parse_class_or_declaration(
        &mut self,
        start: usize,
        template: TemplateHeader,
    ) -> Result<Item, ParseError> {
        let save = self.pos;
        let key = match self.current().ty {
            TokenType::KwStruct => ClassKey::Struct,
            TokenType::KwUnion => ClassKey::Union,
            _ => ClassKey::Class,
        };
        self.advance();
        self.skip_attributes()?;

        if self.check(TokenType::LBrace) {
            // anonymous class with declarators
            self.skip_declaration()?;
            return Ok(Item::Other(self.span_from(start)));
        }

        let name_start = self.pos;
        let name = self.parse_type_name()?;
        let name_span = self.span_from(name_start);
        if self.check_ident("final") {
            self.advance();
        }

        match self.current().ty {
            TokenType::Semicolon => {
                self.advance();
                Ok(Item::Class(self.class_decl(
                    key,
                    name,
                    template,
                    Vec::new(),
                    Vec::new(),
                    true,
                    start,
                    name_span,
                )))
            }
            TokenType::Colon | TokenType::LBrace => {
                let bases = if self.match_token(TokenType::Colon) {
                    self.parse_bases()?
                } else {
                    Vec::new()
                };
                let class_name = name.last().map(|s| s.ident.clone()).unwrap_or_default();
                let members = self.parse_class_body(&class_name)?;
                if !self.check(TokenType::Semicolon) {
                    // `struct S { ... } s;` declares variables too
                    if self.check(TokenType::Identifier) || self.check(TokenType::Star) {
                        self.skip_until(&[TokenType::Semicolon])?;
                    }
                    if !self.check(TokenType::Semicolon) {
                        let close = self.previous().span;
                        return Err(ParseError::new(
                            ParserError::MissingClassSemicolon {
                                name: class_name,
                                span: close.into(),
                            },
                            close,
                        ));
                    }
                }
                self.advance();
                Ok(Item::Class(self.class_decl(
                    key, name, template, bases, members, false, start, name_span,
                )))
            }
            _ => {
                self.pos = save;
                self.parse_declaration_item(start, template == TemplateHeader::Primary)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn class_decl(
        &self,
        key: ClassKey,
        name: TypeName,
        template: TemplateHeader,
        bases: Vec<BaseSpec>,
        members: Vec<Member>,
        is_forward: bool,
        start: usize,
        name_span: crate::Span,
    ) -> ClassDecl {
        let (ident, specialization_args) = match name.segments.last() {
            Some(segment) => (segment.ident.clone(), segment.args.clone()),
            None => (String::new(), None),
        };
        ClassDecl {
            key,
            name: ident,
            specialization_args,
            template,
            bases,
            members,
            is_forward,
            span: self.span_from(start),
            name_span,
        }
    }

    /// `[[attr]]` sequences
    fn skip_attributes(&mut self) -> Result<(), ParseError> {
        while self.check(TokenType::LBracket) && self.peek_at(1).ty == TokenType::LBracket {
            self.skip_group()?;
        }
        Ok(())
    }

    fn parse_bases(&mut self) -> Result<Vec<BaseSpec>, ParseError> {
        let mut bases = Vec::new();
        loop {
            let start = self.pos;
            let mut access = None;
            let mut is_virtual = false;
            loop {
                match self.current().ty {
                    TokenType::KwPublic => access = Some(Access::Public),
                    TokenType::KwProtected => access = Some(Access::Protected),
                    TokenType::KwPrivate => access = Some(Access::Private),
                    TokenType::KwVirtual => is_virtual = true,
                    _ => break,
                }
                self.advance();
            }
            let ty = self.parse_type()?;
            bases.push(BaseSpec {
                access,
                is_virtual,
                ty,
                span: self.span_from(start),
            });
            if !self.match_token(TokenType::Comma) {
                return Ok(bases);
            }
        }
    }

    /// Parse `{ members }` (the braces included).
    fn parse_class_body(&mut self, class_name: &str) -> Result<Vec<Member>, ParseError> {
        let open = self.pos;
        self.consume(TokenType::LBrace, "{")?;
        let mut members = Vec::new();
        loop {
            if self.is_at_end() {
                return Err(unbalanced(&self.tokens[open]));
            }
            if self.match_token(TokenType::RBrace) {
                return Ok(members);
            }
            members.extend(self.parse_member(class_name)?);
        }
    }

    fn parse_member(&mut self, class_name: &str) -> Result<Vec<Member>, ParseError> {
        let start = self.pos;
        let passthrough = |p: &mut Self, kind| -> Result<Vec<Member>, ParseError> {
            p.skip_declaration()?;
            Ok(vec![Member::Passthrough {
                kind,
                span: p.span_from(start),
            }])
        };

        match self.current().ty {
            TokenType::KwPublic | TokenType::KwPrivate | TokenType::KwProtected
                if self.peek_at(1).ty == TokenType::Colon =>
            {
                let access = match self.current().ty {
                    TokenType::KwPublic => Access::Public,
                    TokenType::KwProtected => Access::Protected,
                    _ => Access::Private,
                };
                self.advance();
                self.advance();
                Ok(vec![Member::AccessLabel {
                    access,
                    span: self.span_from(start),
                }])
            }
            TokenType::Semicolon => {
                self.advance();
                Ok(Vec::new())
            }
            TokenType::KwEnum => passthrough(self, PassthroughKind::Enum),
            TokenType::KwTypedef => passthrough(self, PassthroughKind::Typedef),
            TokenType::KwUsing => passthrough(self, PassthroughKind::Using),
            TokenType::KwFriend => passthrough(self, PassthroughKind::Friend),
            TokenType::KwStaticAssert => passthrough(self, PassthroughKind::StaticAssert),
            TokenType::KwTemplate => {
                self.advance();
                if self.check(TokenType::Lt) {
                    self.skip_angle_group()?;
                }
                passthrough(self, PassthroughKind::MemberTemplate)
            }
            TokenType::KwClass | TokenType::KwStruct | TokenType::KwUnion
                if self.is_nested_class() =>
            {
                if self.peek_at(1).ty == TokenType::LBrace {
                    self.advance();
                    self.skip_group()?;
                    self.skip_until(&[TokenType::Semicolon])?;
                    self.consume(TokenType::Semicolon, ";")?;
                    return Ok(vec![Member::Passthrough {
                        kind: PassthroughKind::NestedClass,
                        span: self.span_from(start),
                    }]);
                }
                passthrough(self, PassthroughKind::NestedClass)
            }
            _ => {
                if let Some(members) =
                    self.speculate(|p| p.parse_member_declaration(start, class_name))
                {
                    return Ok(members);
                }
                self.skip_declaration()?;
                let span = self.span_from(start);
                tracing::trace!(text = self.text(span), "unrecognized member");
                Ok(vec![Member::Unrecognized(span)])
            }
        }
    }

    /// `struct Inner {`, `struct Inner : Base {`, `struct Inner;` or an anonymous `struct {`
    fn is_nested_class(&self) -> bool {
        match self.peek_at(1).ty {
            TokenType::LBrace => true,
            TokenType::Identifier => matches!(
                self.peek_at(2).ty,
                TokenType::LBrace | TokenType::Colon | TokenType::Semicolon
            ) || self.peek_at(2).is_ident("final"),
            _ => false,
        }
    }

    fn parse_specifiers(&mut self) -> Result<Specifiers, ParseError> {
        let mut specifiers = Specifiers::default();
        loop {
            match self.current().ty {
                TokenType::KwVirtual => specifiers.is_virtual = true,
                TokenType::KwStatic => specifiers.is_static = true,
                TokenType::KwInline => specifiers.is_inline = true,
                TokenType::KwConstexpr => specifiers.is_constexpr = true,
                TokenType::KwFriend => specifiers.is_friend = true,
                TokenType::KwMutable => specifiers.is_mutable = true,
                TokenType::KwExtern => {}
                TokenType::KwExplicit => {
                    specifiers.is_explicit = true;
                    self.advance();
                    if self.check(TokenType::LParen) {
                        self.skip_group()?;
                    }
                    continue;
                }
                _ => return Ok(specifiers),
            }
            self.advance();
        }
    }

    fn parse_member_declaration(
        &mut self,
        start: usize,
        class_name: &str,
    ) -> Result<Vec<Member>, ParseError> {
        let decl_start = self.current().span.start;
        let specifiers = self.parse_specifiers()?;

        if self.check(TokenType::Tilde) && self.peek_at(1).is_ident(class_name) {
            self.advance();
            let (name, name_span) = self.expect_identifier()?;
            let head = FunctionHead {
                kind: FunctionKind::Destructor,
                name: format!("~{}", name),
                name_span,
                return_type: None,
                specifiers,
                decl_start,
                start,
            };
            return Ok(vec![Member::Destructor(self.parse_function_rest(head)?)]);
        }

        if self.check_ident(class_name) && self.peek_at(1).ty == TokenType::LParen {
            let (name, name_span) = self.expect_identifier()?;
            let head = FunctionHead {
                kind: FunctionKind::Constructor,
                name,
                name_span,
                return_type: None,
                specifiers,
                decl_start,
                start,
            };
            return Ok(vec![Member::Constructor(self.parse_function_rest(head)?)]);
        }

        if self.check(TokenType::KwOperator) {
            let (name, name_span, kind) = self.parse_operator_name()?;
            let head = FunctionHead {
                kind,
                name,
                name_span,
                return_type: None,
                specifiers,
                decl_start,
                start,
            };
            return Ok(vec![Member::Method(self.parse_function_rest(head)?)]);
        }

        let base = self.parse_base_type()?;
        let mut ty = base.clone();
        self.parse_pointer_suffix(&mut ty);
        ty.span = base.span.merge(self.previous().span);

        if self.check(TokenType::KwOperator) {
            let (name, name_span, _) = self.parse_operator_name()?;
            let head = FunctionHead {
                kind: FunctionKind::Method,
                name,
                name_span,
                return_type: Some(ty),
                specifiers,
                decl_start,
                start,
            };
            return Ok(vec![Member::Method(self.parse_function_rest(head)?)]);
        }

        let (name, name_span) = self.expect_identifier()?;
        if self.check(TokenType::LParen) {
            let head = FunctionHead {
                kind: FunctionKind::Method,
                name,
                name_span,
                return_type: Some(ty),
                specifiers,
                decl_start,
                start,
            };
            return Ok(vec![Member::Method(self.parse_function_rest(head)?)]);
        }

        // Data members: one FieldDecl per declarator.
        let mut fields = Vec::new();
        let (mut ty, mut name, mut name_span) = (ty, name, name_span);
        loop {
            let array_start = self.pos;
            while self.check(TokenType::LBracket) {
                self.skip_group()?;
            }
            let array_suffix = (self.pos > array_start).then(|| self.span_from(array_start));

            let bit_width = if self.match_token(TokenType::Colon) {
                let width_start = self.pos;
                self.skip_until(&[
                    TokenType::Comma,
                    TokenType::Semicolon,
                    TokenType::Eq,
                    TokenType::LBrace,
                ])?;
                Some(self.span_from(width_start))
            } else {
                None
            };

            let init_start = self.pos;
            let default_init = if self.match_token(TokenType::Eq) {
                self.skip_until(&[TokenType::Comma, TokenType::Semicolon])?;
                Some(self.span_from(init_start))
            } else if self.check(TokenType::LBrace) {
                self.skip_group()?;
                Some(self.span_from(init_start))
            } else {
                None
            };

            fields.push(FieldDecl {
                ty,
                name,
                name_span,
                array_suffix,
                bit_width,
                default_init,
                is_static: specifiers.is_static,
                is_constexpr: specifiers.is_constexpr,
                is_mutable: specifiers.is_mutable,
                decl_span: crate::Span::default(),
            });

            if self.match_token(TokenType::Comma) {
                let declarator_start = self.pos;
                ty = base.clone();
                self.parse_pointer_suffix(&mut ty);
                if self.pos > declarator_start {
                    ty.span = self.span_from(declarator_start);
                }
                (name, name_span) = self.expect_identifier()?;
                continue;
            }
            self.consume(TokenType::Semicolon, ";")?;
            break;
        }

        let decl_span = self.span_from(start);
        Ok(fields
            .into_iter()
            .map(|field| Member::Field(FieldDecl { decl_span, ..field }))
            .collect())
    }

    /// After `operator`: the operator's spelling. Conversion functions are
    /// reported as such.
    fn parse_operator_name(&mut self) -> Result<(String, crate::Span, FunctionKind), ParseError> {
        let start = self.pos;
        self.consume(TokenType::KwOperator, "operator")?;
        let mut kind = FunctionKind::Method;
        let symbol = match self.current().ty {
            TokenType::LParen => {
                self.advance();
                self.consume(TokenType::RParen, ")")?;
                "()".to_string()
            }
            TokenType::LBracket => {
                self.advance();
                self.consume(TokenType::RBracket, "]")?;
                "[]".to_string()
            }
            TokenType::KwNew | TokenType::KwDelete => {
                let mut word = format!(" {}", self.current().lexeme);
                self.advance();
                if self.check(TokenType::LBracket) && self.peek_at(1).ty == TokenType::RBracket {
                    self.advance();
                    self.advance();
                    word.push_str("[]");
                }
                word
            }
            TokenType::Identifier | TokenType::KwConst | TokenType::KwVolatile => {
                kind = FunctionKind::Conversion;
                let ty = self.parse_type()?;
                format!(" {}", ty)
            }
            TokenType::Eof => return Err(self.unexpected_token_error()),
            _ => {
                let mut symbol = self.current().lexeme.to_string();
                let mut end = self.current().span.end;
                self.advance();
                while !self.check(TokenType::LParen)
                    && self.current().span.start == end
                    && !matches!(self.current().ty, TokenType::Identifier | TokenType::Eof)
                {
                    symbol.push_str(&self.current().lexeme);
                    end = self.current().span.end;
                    self.advance();
                }
                symbol
            }
        };
        Ok((format!("operator{}", symbol), self.span_from(start), kind))
    }

    /// Everything after a function's name: parameters, qualifiers, member
    /// initializers and an optional body (or `;`).
    fn parse_function_rest(&mut self, head: FunctionHead) -> Result<FunctionDecl, ParseError> {
        let params_start = self.pos;
        let params = self.parse_params()?;
        let params_span = self.span_from(params_start);

        let mut return_type = head.return_type;
        let mut qualifiers = Qualifiers::default();
        loop {
            let token_start = self.pos;
            match self.current().ty {
                TokenType::KwConst => qualifiers.is_const = true,
                TokenType::KwVolatile => qualifiers.is_volatile = true,
                TokenType::Ampersand | TokenType::AmpAmp => {
                    qualifiers.ref_qualifier = Some(self.current().span)
                }
                TokenType::KwNoexcept => {
                    self.advance();
                    if self.check(TokenType::LParen) {
                        self.skip_group()?;
                    }
                    qualifiers.noexcept = Some(self.span_from(token_start));
                    continue;
                }
                TokenType::Arrow => {
                    self.advance();
                    return_type = Some(self.parse_type()?);
                    continue;
                }
                TokenType::Identifier if self.check_ident("override") => {
                    qualifiers.is_override = true
                }
                TokenType::Identifier if self.check_ident("final") => qualifiers.is_final = true,
                TokenType::Identifier if self.check_ident("throw") => {
                    self.advance();
                    if self.check(TokenType::LParen) {
                        self.skip_group()?;
                    }
                    continue;
                }
                _ => break,
            }
            self.advance();
        }

        if self.match_token(TokenType::Eq) {
            match self.current().ty {
                TokenType::IntLiteral if self.current().lexeme == "0" => qualifiers.is_pure = true,
                TokenType::KwDefault => qualifiers.is_defaulted = true,
                TokenType::KwDelete => qualifiers.is_deleted = true,
                _ => return Err(self.unexpected_token_error()),
            }
            self.advance();
        }

        let mut mem_inits = Vec::new();
        if head.kind == FunctionKind::Constructor && self.match_token(TokenType::Colon) {
            mem_inits = self.parse_mem_inits()?;
        }

        let body = if self.check(TokenType::LBrace) {
            let body = self.parse_body()?;
            self.match_token(TokenType::Semicolon);
            Some(body)
        } else {
            self.consume(TokenType::Semicolon, ";")?;
            None
        };

        Ok(FunctionDecl {
            kind: head.kind,
            name: head.name,
            name_span: head.name_span,
            return_type,
            params,
            params_span,
            specifiers: head.specifiers,
            qualifiers,
            mem_inits,
            body,
            decl_start: head.decl_start,
            span: self.span_from(head.start),
        })
    }

    fn parse_mem_inits(&mut self) -> Result<Vec<MemInit>, ParseError> {
        let mut inits = Vec::new();
        loop {
            let name_start = self.pos;
            let name = self.parse_type_name()?;
            let name_span = self.span_from(name_start);
            let args_start = self.pos;
            let style = match self.current().ty {
                TokenType::LParen => InitStyle::Paren,
                TokenType::LBrace => InitStyle::Brace,
                _ => return Err(self.expected_error("(")),
            };
            let init = self.parse_init_args(style)?;
            self.match_token(TokenType::Ellipsis);
            inits.push(MemInit {
                name: name.to_string(),
                name_span,
                args: init.exprs,
                args_span: self.span_from(args_start),
            });
            if !self.match_token(TokenType::Comma) {
                return Ok(inits);
            }
        }
    }

    pub(super) fn parse_body(&mut self) -> Result<Body, ParseError> {
        let block = self.parse_block()?;
        Ok(Body {
            stmts: block.stmts,
            span: block.span,
        })
    }

    /// A namespace-scope declaration that is not a class, alias or namespace:
    /// a function definition, a variable, or something kept opaque.
    fn parse_declaration_item(&mut self, start: usize, is_template: bool) -> Result<Item, ParseError> {
        if let Some(item) = self.speculate(|p| p.parse_function_or_variable(start, is_template)) {
            return Ok(item);
        }
        self.skip_declaration()?;
        Ok(Item::Other(self.span_from(start)))
    }

    fn parse_function_or_variable(
        &mut self,
        start: usize,
        is_template: bool,
    ) -> Result<Item, ParseError> {
        let decl_start = self.current().span.start;
        let specifiers = self.parse_specifiers()?;

        // Out-of-line constructors and destructors have no return type.
        if self.check(TokenType::Identifier) || self.check(TokenType::ColonColon) {
            let save = self.pos;
            let qualified = self.parse_type_name()?;
            if self.check(TokenType::ColonColon) && self.peek_at(1).ty == TokenType::Tilde {
                self.advance();
                self.advance();
                let (name, name_span) = self.expect_identifier()?;
                let head = FunctionHead {
                    kind: FunctionKind::Destructor,
                    name: format!("~{}", name),
                    name_span,
                    return_type: None,
                    specifiers,
                    decl_start,
                    start,
                };
                return self.finish_function_item(Some(qualified), head, is_template);
            }
            if self.check(TokenType::LParen) && is_constructor_name(&qualified) {
                let owner = qualified.qualifier();
                let name_span = self.previous().span;
                let name = qualified.last().map(|s| s.ident.clone()).unwrap_or_default();
                let head = FunctionHead {
                    kind: FunctionKind::Constructor,
                    name,
                    name_span,
                    return_type: None,
                    specifiers,
                    decl_start,
                    start,
                };
                return self.finish_function_item(owner, head, is_template);
            }
            self.pos = save;
        }

        let base = self.parse_base_type()?;
        let after_base = self.pos;
        let mut ty = base.clone();
        self.parse_pointer_suffix(&mut ty);
        ty.span = base.span.merge(self.previous().span);

        let (owner, name, name_span, kind) = if self.check(TokenType::KwOperator) {
            let (name, span, kind) = self.parse_operator_name()?;
            (None, name, span, kind)
        } else {
            let name_start = self.pos;
            let declared = self.parse_type_name()?;
            if self.check(TokenType::ColonColon) && self.peek_at(1).ty == TokenType::KwOperator {
                self.advance();
                let (name, span, kind) = self.parse_operator_name()?;
                (Some(declared), name, span, kind)
            } else {
                let name = declared.last().map(|s| s.ident.clone()).unwrap_or_default();
                (declared.qualifier(), name, self.span_from(name_start), FunctionKind::Method)
            }
        };

        if self.check(TokenType::LParen) && self.peek_at(1).ty != TokenType::KwNew {
            let head = FunctionHead {
                kind,
                name,
                name_span,
                return_type: Some(ty),
                specifiers,
                decl_start,
                start,
            };
            return self.finish_function_item(owner, head, is_template);
        }

        // A variable: reparse declarators from just after the base type.
        self.pos = after_base;
        let decl = self.parse_declarators(start, base)?;
        self.consume(TokenType::Semicolon, ";")?;
        Ok(Item::Variable(decl))
    }

    fn finish_function_item(
        &mut self,
        owner: Option<TypeName>,
        head: FunctionHead,
        is_template: bool,
    ) -> Result<Item, ParseError> {
        let start = head.start;
        let decl = self.parse_function_rest(head)?;
        if decl.body.is_none() {
            // prototype
            return Ok(Item::Other(self.span_from(start)));
        }
        Ok(Item::Function(FunctionDef {
            owner,
            decl,
            is_template,
        }))
    }
}

/// `Node::Node` or `ns::Vec<T>::Vec`: the last two segments share the identifier.
fn is_constructor_name(name: &TypeName) -> bool {
    let segments = name.segments.as_slice();
    match segments {
        [.., owner, last] => owner.ident == last.ident && last.args.is_none(),
        _ => false,
    }
}
