// src/lexer/literals.rs
//
// String, character and number literal scanning.

use super::Lexer;
use crate::errors::LexerError;
use crate::{Token, TokenType};

impl<'src> Lexer<'src> {
    /// Scan a string literal; the opening quote (and any prefix) is already consumed.
    pub(super) fn string(&mut self) -> Token<'src> {
        if self.scan_quoted(b'"') {
            self.make_token(TokenType::StringLiteral)
        } else {
            let span = self.current_span();
            tracing::debug!(line = self.start_line, col = self.start_column, "lexer error: unterminated string");
            self.errors
                .push(LexerError::UnterminatedString { span: span.into() });
            Token::new(TokenType::Error, "unterminated string", span)
        }
    }

    /// Scan a character literal; the opening quote (and any prefix) is already consumed.
    pub(super) fn char_literal(&mut self) -> Token<'src> {
        if self.scan_quoted(b'\'') {
            self.make_token(TokenType::CharLiteral)
        } else {
            let span = self.current_span();
            tracing::debug!(line = self.start_line, col = self.start_column, "lexer error: unterminated character literal");
            self.errors
                .push(LexerError::UnterminatedChar { span: span.into() });
            Token::new(TokenType::Error, "unterminated character literal", span)
        }
    }

    /// Consume up to and including `quote`, honoring backslash escapes.
    /// Returns false when a newline or EOF is reached first.
    fn scan_quoted(&mut self, quote: u8) -> bool {
        loop {
            match self.peek_byte() {
                None | Some(b'\n') => return false,
                Some(b'\\') => {
                    self.advance();
                    if self.peek_byte().is_some() {
                        self.advance();
                    }
                }
                Some(b) if b == quote => {
                    self.advance();
                    return true;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Scan a raw string `R"delim( ... )delim"`; the `R"` is already consumed.
    pub(super) fn raw_string(&mut self) -> Token<'src> {
        let delim_start = self.current;
        while let Some(b) = self.peek_byte() {
            if b == b'(' || b == b'"' || b == b'\n' || b.is_ascii_whitespace() {
                break;
            }
            self.advance();
        }
        if self.peek_byte() != Some(b'(') {
            return self.unterminated_raw_string();
        }
        let closing = format!("){}\"", &self.source[delim_start..self.current]);
        self.advance();

        let Some(offset) = self.source[self.current..].find(&closing) else {
            while self.advance().is_some() {}
            return self.unterminated_raw_string();
        };
        let end = self.current + offset + closing.len();
        while self.current < end {
            self.advance();
        }
        self.make_token(TokenType::StringLiteral)
    }

    fn unterminated_raw_string(&mut self) -> Token<'src> {
        let span = self.current_span();
        self.errors
            .push(LexerError::UnterminatedString { span: span.into() });
        Token::new(TokenType::Error, "unterminated raw string", span)
    }

    /// Scan a number literal. The first digit (or leading '.') is already consumed.
    ///
    /// Numbers are scanned greedily (digits, letters for radix prefixes and
    /// suffixes, digit separators, '.', and exponent signs) and then classified.
    pub(super) fn number(&mut self) -> Token<'src> {
        while let Some(b) = self.peek_byte() {
            let prev = self.bytes[self.current - 1];
            let accept = match b {
                b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'.' => true,
                b'\'' => self
                    .bytes
                    .get(self.current + 1)
                    .is_some_and(|next| next.is_ascii_alphanumeric()),
                b'+' | b'-' => self.exponent_sign_allowed(prev),
                _ => false,
            };
            if !accept {
                break;
            }
            self.current += 1;
            self.column += 1;
        }

        let text = &self.source[self.start..self.current];
        let lower = text.to_ascii_lowercase();
        let is_hex = lower.starts_with("0x");
        let is_bin = lower.starts_with("0b");

        if is_hex || is_bin {
            let digits = &lower[2..];
            let valid_digit = |c: char| {
                if is_hex {
                    c.is_ascii_hexdigit()
                } else {
                    c == '0' || c == '1'
                }
            };
            if !digits.chars().next().is_some_and(valid_digit) {
                let span = self.current_span();
                tracing::debug!(text, "lexer error: invalid number");
                self.errors
                    .push(LexerError::InvalidNumber { span: span.into() });
                return Token::new(TokenType::Error, "invalid number", span);
            }
        }

        let is_float = if is_hex {
            lower.contains('.') || lower.contains('p')
        } else if is_bin {
            false
        } else {
            lower.contains('.') || lower.contains('e')
        };
        if is_float {
            self.make_token(TokenType::FloatLiteral)
        } else {
            self.make_token(TokenType::IntLiteral)
        }
    }

    /// '+'/'-' continue a number only right after an exponent marker.
    fn exponent_sign_allowed(&self, prev: u8) -> bool {
        let text = &self.source[self.start..self.current];
        let is_hex = text.len() > 1 && (text.starts_with("0x") || text.starts_with("0X"));
        if is_hex {
            prev == b'p' || prev == b'P'
        } else {
            prev == b'e' || prev == b'E'
        }
    }
}

/// Parse the value of an integer literal (decimal, hex, octal or binary, with
/// digit separators and `u`/`l` suffixes). Returns `None` for anything else.
pub fn parse_int_literal(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|c| *c != '\'').collect();
    let digits = cleaned.trim_end_matches(['u', 'U', 'l', 'L', 'z', 'Z']);
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        u64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literal_values() {
        assert_eq!(parse_int_literal("3"), Some(3));
        assert_eq!(parse_int_literal("0x1f"), Some(31));
        assert_eq!(parse_int_literal("010"), Some(8));
        assert_eq!(parse_int_literal("0b11"), Some(3));
        assert_eq!(parse_int_literal("2u"), Some(2));
        assert_eq!(parse_int_literal("1'000UL"), Some(1000));
        assert_eq!(parse_int_literal("0"), Some(0));
        assert_eq!(parse_int_literal("1.5"), None);
        assert_eq!(parse_int_literal("N"), None);
    }
}
