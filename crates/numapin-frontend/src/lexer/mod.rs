// src/lexer/mod.rs

mod literals;

pub use literals::parse_int_literal;

use crate::errors::LexerError;
use crate::{Span, Token, TokenType};

/// Smallest byte value that starts a multi-byte UTF-8 sequence (non-ASCII).
const UTF8_MULTIBYTE: u8 = 0x80;

/// Identifier spellings that prefix a string or character literal (`L"..."`, `u8'x'`, `R"(...)"`).
const LITERAL_PREFIXES: &[&str] = &["L", "u", "U", "u8", "R", "LR", "uR", "UR", "u8R"];

#[derive(Clone)]
pub struct Lexer<'src> {
    pub(crate) source: &'src str,
    pub(crate) bytes: &'src [u8],
    pub(crate) current: usize,
    pub(crate) start: usize,
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) start_column: u32,
    pub(crate) start_line: u32,
    // Only whitespace seen since the last newline (directives must start a line)
    pub(crate) at_line_start: bool,
    // Error collection
    pub(crate) errors: Vec<LexerError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_column: 1,
            start_line: 1,
            at_line_start: true,
            errors: Vec::new(),
        }
    }

    /// Take all collected errors, leaving the internal list empty.
    pub fn take_errors(&mut self) -> Vec<LexerError> {
        std::mem::take(&mut self.errors)
    }

    /// Check if any errors have been collected.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the source string being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Lex the whole source. The returned vector always ends with an `Eof` token.
    pub fn tokenize(mut self) -> (Vec<Token<'src>>, Vec<LexerError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.ty == TokenType::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.errors)
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token<'src> {
        if let Some(error_token) = self.skip_trivia() {
            return error_token;
        }

        self.start = self.current;
        self.start_column = self.column;
        self.start_line = self.line;
        let line_start = self.at_line_start;
        self.at_line_start = false;

        let Some(c) = self.advance() else {
            return self.make_token(TokenType::Eof);
        };

        match c {
            '#' if line_start => self.directive(),
            '(' => self.make_token(TokenType::LParen),
            ')' => self.make_token(TokenType::RParen),
            '{' => self.make_token(TokenType::LBrace),
            '}' => self.make_token(TokenType::RBrace),
            '[' => self.make_token(TokenType::LBracket),
            ']' => self.make_token(TokenType::RBracket),
            ',' => self.make_token(TokenType::Comma),
            ';' => self.make_token(TokenType::Semicolon),
            '?' => self.make_token(TokenType::Question),
            '~' => self.make_token(TokenType::Tilde),
            '>' => self.make_token(TokenType::Gt),
            ':' => {
                if self.match_byte(b':') {
                    self.make_token(TokenType::ColonColon)
                } else {
                    self.make_token(TokenType::Colon)
                }
            }
            '+' => {
                if self.match_byte(b'+') {
                    self.make_token(TokenType::PlusPlus)
                } else if self.match_byte(b'=') {
                    self.make_token(TokenType::CompoundEq)
                } else {
                    self.make_token(TokenType::Plus)
                }
            }
            '-' => {
                if self.match_byte(b'>') {
                    self.make_token(TokenType::Arrow)
                } else if self.match_byte(b'-') {
                    self.make_token(TokenType::MinusMinus)
                } else if self.match_byte(b'=') {
                    self.make_token(TokenType::CompoundEq)
                } else {
                    self.make_token(TokenType::Minus)
                }
            }
            '*' => self.with_compound(TokenType::Star),
            '/' => self.with_compound(TokenType::Slash),
            '%' => self.with_compound(TokenType::Percent),
            '^' => self.with_compound(TokenType::Caret),
            '=' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenType::EqEq)
                } else {
                    self.make_token(TokenType::Eq)
                }
            }
            '!' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenType::BangEq)
                } else {
                    self.make_token(TokenType::Bang)
                }
            }
            '&' => {
                if self.match_byte(b'&') {
                    self.make_token(TokenType::AmpAmp)
                } else {
                    self.with_compound(TokenType::Ampersand)
                }
            }
            '|' => {
                if self.match_byte(b'|') {
                    self.make_token(TokenType::PipePipe)
                } else {
                    self.with_compound(TokenType::Pipe)
                }
            }
            '<' => {
                if self.match_byte(b'<') {
                    self.with_compound(TokenType::LessLess)
                } else if self.match_byte(b'=') {
                    self.make_token(TokenType::LtEq)
                } else {
                    self.make_token(TokenType::Lt)
                }
            }
            '.' => {
                if self.peek_byte() == Some(b'.') && self.bytes.get(self.current + 1) == Some(&b'.')
                {
                    self.current += 2;
                    self.column += 2;
                    self.make_token(TokenType::Ellipsis)
                } else if self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                    self.number()
                } else {
                    self.make_token(TokenType::Dot)
                }
            }
            '"' => self.string(),
            '\'' => self.char_literal(),
            c if c.is_ascii_digit() => self.number(),
            c if c == '_' || unicode_ident::is_xid_start(c) => self.identifier(),
            _ => self.error_unexpected_char(c),
        }
    }

    /// Skip whitespace and comments. Returns an error token for an unterminated
    /// block comment.
    fn skip_trivia(&mut self) -> Option<Token<'src>> {
        while self.current < self.bytes.len() {
            match self.bytes[self.current] {
                b' ' | b'\t' | b'\r' | b'\x0c' => {
                    self.current += 1;
                    self.column += 1;
                }
                b'\n' => {
                    self.current += 1;
                    self.line += 1;
                    self.column = 1;
                    self.at_line_start = true;
                }
                b'/' if self.bytes.get(self.current + 1) == Some(&b'/') => {
                    self.skip_line_comment();
                }
                b'/' if self.bytes.get(self.current + 1) == Some(&b'*') => {
                    if let Some(token) = self.skip_block_comment() {
                        return Some(token);
                    }
                }
                _ => break,
            }
        }
        None
    }

    /// Advance to the next character and return it.
    /// Fast path for ASCII bytes (no UTF-8 decoding needed).
    #[inline]
    pub(crate) fn advance(&mut self) -> Option<char> {
        if self.current >= self.bytes.len() {
            return None;
        }
        let b = self.bytes[self.current];
        if b < UTF8_MULTIBYTE {
            self.current += 1;
            self.column += 1;
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            }
            Some(b as char)
        } else {
            let c = self.source[self.current..].chars().next()?;
            self.current += c.len_utf8();
            self.column += 1;
            Some(c)
        }
    }

    /// Peek at the next byte directly (for ASCII-only comparisons).
    #[inline]
    pub(crate) fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.current).copied()
    }

    /// Consume the next character if it matches the expected byte.
    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        debug_assert!(expected < UTF8_MULTIBYTE, "match_byte only works for ASCII");
        if self.current < self.bytes.len() && self.bytes[self.current] == expected {
            self.current += 1;
            self.column += 1;
            true
        } else {
            false
        }
    }

    /// An operator that may be followed by `=` to form a compound assignment.
    fn with_compound(&mut self, plain: TokenType) -> Token<'src> {
        if self.match_byte(b'=') {
            self.make_token(TokenType::CompoundEq)
        } else {
            self.make_token(plain)
        }
    }

    /// Create a token from start to current position
    pub(crate) fn make_token(&self, ty: TokenType) -> Token<'src> {
        let lexeme = &self.source[self.start..self.current];
        Token::new(ty, lexeme, self.current_span())
    }

    pub(crate) fn current_span(&self) -> Span {
        Span::new_with_end(
            self.start,
            self.current,
            self.start_line,
            self.start_column,
            self.line,
            self.column,
        )
    }

    /// Create an error token and collect an error for an unexpected character.
    fn error_unexpected_char(&mut self, c: char) -> Token<'src> {
        let span = self.current_span();
        tracing::debug!(char = %c, line = self.start_line, col = self.start_column, "lexer error: unexpected character");
        self.errors.push(LexerError::UnexpectedCharacter {
            ch: c,
            span: span.into(),
        });
        Token::new(TokenType::Error, format!("unexpected character '{}'", c), span)
    }

    /// Scan an identifier or keyword. Literal prefixes (`L`, `u8`, `R`, ...)
    /// immediately followed by a quote continue as a string or character literal.
    fn identifier(&mut self) -> Token<'src> {
        while self.current < self.bytes.len() {
            let b = self.bytes[self.current];
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.current += 1;
                self.column += 1;
            } else if b >= UTF8_MULTIBYTE {
                let Some(c) = self.source[self.current..].chars().next() else {
                    break;
                };
                if unicode_ident::is_xid_continue(c) {
                    self.current += c.len_utf8();
                    self.column += 1;
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        let text = &self.source[self.start..self.current];
        if LITERAL_PREFIXES.contains(&text) {
            match self.peek_byte() {
                Some(b'"') if text.ends_with('R') => {
                    self.advance();
                    return self.raw_string();
                }
                Some(b'"') => {
                    self.advance();
                    return self.string();
                }
                Some(b'\'') if !text.ends_with('R') => {
                    self.advance();
                    return self.char_literal();
                }
                _ => {}
            }
        }

        let ty = TokenType::keyword_type(text).unwrap_or(TokenType::Identifier);
        self.make_token(ty)
    }

    /// Consume a preprocessor line, honoring backslash continuations.
    fn directive(&mut self) -> Token<'src> {
        while self.current < self.bytes.len() {
            match self.bytes[self.current] {
                b'\\' if self.bytes.get(self.current + 1) == Some(&b'\n') => {
                    self.current += 2;
                    self.line += 1;
                    self.column = 1;
                }
                b'\\' if self.source[self.current..].starts_with("\\\r\n") => {
                    self.current += 3;
                    self.line += 1;
                    self.column = 1;
                }
                b'\n' => break,
                b'/' if self.bytes.get(self.current + 1) == Some(&b'/') => break,
                _ => {
                    self.advance();
                }
            }
        }
        self.make_token(TokenType::Directive)
    }

    /// Skip a line comment (everything until newline or EOF) using byte scanning.
    #[inline]
    fn skip_line_comment(&mut self) {
        while self.current < self.bytes.len() && self.bytes[self.current] != b'\n' {
            self.current += 1;
            self.column += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Option<Token<'src>> {
        self.start = self.current;
        self.start_line = self.line;
        self.start_column = self.column;
        self.current += 2;
        self.column += 2;
        loop {
            match self.peek_byte() {
                None => {
                    let span = self.current_span();
                    self.errors
                        .push(LexerError::UnterminatedComment { span: span.into() });
                    return Some(Token::new(
                        TokenType::Error,
                        "unterminated block comment",
                        span,
                    ));
                }
                Some(b'*') if self.bytes.get(self.current + 1) == Some(&b'/') => {
                    self.current += 2;
                    self.column += 2;
                    return None;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        let (tokens, _) = Lexer::new(source).tokenize();
        tokens.into_iter().map(|t| t.ty).collect()
    }

    #[test]
    fn lex_class_header() {
        assert_eq!(
            types("class Node { };"),
            vec![
                TokenType::KwClass,
                TokenType::Identifier,
                TokenType::LBrace,
                TokenType::RBrace,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn nested_template_closers_stay_separate() {
        assert_eq!(
            types("numa<numa<int,1>,1>"),
            vec![
                TokenType::Identifier,
                TokenType::Lt,
                TokenType::Identifier,
                TokenType::Lt,
                TokenType::Identifier,
                TokenType::Comma,
                TokenType::IntLiteral,
                TokenType::Gt,
                TokenType::Comma,
                TokenType::IntLiteral,
                TokenType::Gt,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn lex_scope_and_arrow() {
        assert_eq!(
            types("Node::getLink()->x"),
            vec![
                TokenType::Identifier,
                TokenType::ColonColon,
                TokenType::Identifier,
                TokenType::LParen,
                TokenType::RParen,
                TokenType::Arrow,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            types("int /* a\n b */ x; // trailing\n"),
            vec![
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn directive_is_one_token_with_continuation() {
        let (tokens, errors) = Lexer::new("#define X \\\n  1\nint y;").tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].ty, TokenType::Directive);
        assert_eq!(tokens[0].lexeme, "#define X \\\n  1");
        assert_eq!(tokens[1].ty, TokenType::Identifier);
        assert_eq!(tokens[1].span.line, 3);
    }

    #[test]
    fn include_directive_stops_before_line_comment() {
        let (tokens, _) = Lexer::new("#include \"a.hpp\" // note\nx").tokenize();
        assert_eq!(tokens[0].lexeme, "#include \"a.hpp\" ");
        assert_eq!(tokens[1].lexeme, "x");
    }

    #[test]
    fn lex_string_and_char_literals() {
        let (tokens, errors) = Lexer::new(r#""a\"b" 'c' '\n' L"wide" u8'x'"#).tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].ty, TokenType::StringLiteral);
        assert_eq!(tokens[0].lexeme, r#""a\"b""#);
        assert_eq!(tokens[1].ty, TokenType::CharLiteral);
        assert_eq!(tokens[2].ty, TokenType::CharLiteral);
        assert_eq!(tokens[3].ty, TokenType::StringLiteral);
        assert_eq!(tokens[3].lexeme, "L\"wide\"");
        assert_eq!(tokens[4].ty, TokenType::CharLiteral);
    }

    #[test]
    fn lex_raw_string() {
        let (tokens, errors) = Lexer::new("R\"xy(a \"quoted\" )\" )xy\" ;").tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].ty, TokenType::StringLiteral);
        assert_eq!(tokens[1].ty, TokenType::Semicolon);
    }

    #[test]
    fn lex_numbers() {
        let (tokens, errors) = Lexer::new("42 0x1F 3.5f 1e9 10'000ul .5").tokenize();
        assert!(errors.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|t| (t.ty, &*t.lexeme)).collect();
        assert_eq!(
            kinds,
            vec![
                (TokenType::IntLiteral, "42"),
                (TokenType::IntLiteral, "0x1F"),
                (TokenType::FloatLiteral, "3.5f"),
                (TokenType::FloatLiteral, "1e9"),
                (TokenType::IntLiteral, "10'000ul"),
                (TokenType::FloatLiteral, ".5"),
                (TokenType::Eof, ""),
            ]
        );
    }

    #[test]
    fn invalid_hex_is_reported() {
        let (tokens, errors) = Lexer::new("0x;").tokenize();
        assert_eq!(tokens[0].ty, TokenType::Error);
        assert!(matches!(errors[0], LexerError::InvalidNumber { .. }));
    }

    #[test]
    fn unterminated_comment_is_reported() {
        let (tokens, errors) = Lexer::new("int x; /* open").tokenize();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LexerError::UnterminatedComment { .. }));
        assert!(tokens.iter().any(|t| t.ty == TokenType::Error));
    }

    #[test]
    fn lexer_continues_after_errors() {
        let (tokens, errors) = Lexer::new("int @ x = 1;").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            tokens.iter().map(|t| t.ty).collect::<Vec<_>>(),
            vec![
                TokenType::Identifier,
                TokenType::Error,
                TokenType::Identifier,
                TokenType::Eq,
                TokenType::IntLiteral,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn spans_track_lines_and_columns() {
        let (tokens, _) = Lexer::new("class A\n{\n  int x;\n};").tokenize();
        let x = tokens.iter().find(|t| t.lexeme == "x").unwrap();
        assert_eq!(x.span.line, 3);
        assert_eq!(x.span.column, 7);
        assert_eq!(x.span.end_column, 8);
    }
}
