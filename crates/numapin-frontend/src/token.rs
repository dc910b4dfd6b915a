// src/token.rs

/// Single source of truth for keyword-to-token mapping.
///
/// Each entry `"text" => Variant` generates:
/// - A match arm in `TokenType::keyword_type`: `"text" => Some(TokenType::Variant)`
/// - A match arm in `TokenType::as_str`:       `Self::Variant => "text"`
macro_rules! define_keywords {
    ( $( $text:literal => $variant:ident ),+ $(,)? ) => {
        impl TokenType {
            /// Check if a string is a keyword and return its token type.
            pub fn keyword_type(text: &str) -> Option<TokenType> {
                match text {
                    $( $text => Some(TokenType::$variant), )+
                    _ => None,
                }
            }

            /// String representation for keyword tokens (used by `as_str`).
            fn keyword_as_str(&self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($text), )+
                    _ => None,
                }
            }
        }
    };
}

define_keywords! {
    // Declarations
    "class"         => KwClass,
    "struct"        => KwStruct,
    "union"         => KwUnion,
    "enum"          => KwEnum,
    "namespace"     => KwNamespace,
    "template"      => KwTemplate,
    "typename"      => KwTypename,
    "typedef"       => KwTypedef,
    "using"         => KwUsing,
    "friend"        => KwFriend,
    "operator"      => KwOperator,
    "static_assert" => KwStaticAssert,
    "extern"        => KwExtern,
    // Access
    "public"        => KwPublic,
    "private"       => KwPrivate,
    "protected"     => KwProtected,
    // Specifiers
    "virtual"       => KwVirtual,
    "static"        => KwStatic,
    "inline"        => KwInline,
    "explicit"      => KwExplicit,
    "constexpr"     => KwConstexpr,
    "mutable"       => KwMutable,
    "const"         => KwConst,
    "volatile"      => KwVolatile,
    "noexcept"      => KwNoexcept,
    // Statements and expressions
    "new"           => KwNew,
    "delete"        => KwDelete,
    "default"       => KwDefault,
    "return"        => KwReturn,
    "if"            => KwIf,
    "else"          => KwElse,
    "for"           => KwFor,
    "while"         => KwWhile,
    "do"            => KwDo,
    "switch"        => KwSwitch,
    "case"          => KwCase,
    "try"           => KwTry,
    "catch"         => KwCatch,
    "nullptr"       => KwNullptr,
    "this"          => KwThis,
}

/// All token types of the C++ subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,
    Identifier,

    // Keywords
    KwClass,
    KwStruct,
    KwUnion,
    KwEnum,
    KwNamespace,
    KwTemplate,
    KwTypename,
    KwTypedef,
    KwUsing,
    KwFriend,
    KwOperator,
    KwStaticAssert,
    KwExtern,
    KwPublic,
    KwPrivate,
    KwProtected,
    KwVirtual,
    KwStatic,
    KwInline,
    KwExplicit,
    KwConstexpr,
    KwMutable,
    KwConst,
    KwVolatile,
    KwNoexcept,
    KwNew,
    KwDelete,
    KwDefault,
    KwReturn,
    KwIf,
    KwElse,
    KwFor,
    KwWhile,
    KwDo,
    KwSwitch,
    KwCase,
    KwTry,
    KwCatch,
    KwNullptr,
    KwThis,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,   // ++
    MinusMinus, // --
    CompoundEq, // += -= *= /= %= &= |= ^= <<=
    EqEq,
    BangEq,
    Bang,
    Ampersand, // &
    AmpAmp,    // &&
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    Lt,
    Gt, // always a single '>' so nested template argument lists close
    LtEq,
    LessLess,
    Eq,
    Question,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    ColonColon,
    Dot,
    Arrow,    // ->
    Ellipsis, // ...

    // Special
    Directive, // a whole preprocessor line
    Eof,
    Error,
}

impl TokenType {
    /// Get string representation for error messages
    pub fn as_str(&self) -> &'static str {
        if let Some(s) = self.keyword_as_str() {
            return s;
        }
        match self {
            Self::IntLiteral => "integer",
            Self::FloatLiteral => "float",
            Self::StringLiteral => "string",
            Self::CharLiteral => "character",
            Self::Identifier => "identifier",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::CompoundEq => "compound assignment",
            Self::EqEq => "==",
            Self::BangEq => "!=",
            Self::Bang => "!",
            Self::Ampersand => "&",
            Self::AmpAmp => "&&",
            Self::Pipe => "|",
            Self::PipePipe => "||",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::LessLess => "<<",
            Self::Eq => "=",
            Self::Question => "?",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::ColonColon => "::",
            Self::Dot => ".",
            Self::Arrow => "->",
            Self::Ellipsis => "...",
            Self::Directive => "preprocessor directive",
            Self::Eof => "end of file",
            Self::Error => "error",
            _ => unreachable!("keyword variant not covered by define_keywords! macro"),
        }
    }

    /// Opening delimiter that nests (parens, braces, brackets).
    pub fn is_open_delim(&self) -> bool {
        matches!(self, Self::LParen | Self::LBrace | Self::LBracket)
    }

    /// Closing delimiter that nests (parens, braces, brackets).
    pub fn is_close_delim(&self) -> bool {
        matches!(self, Self::RParen | Self::RBrace | Self::RBracket)
    }

    /// Keywords that may start or continue a declaration without naming a type.
    pub fn is_decl_specifier(&self) -> bool {
        matches!(
            self,
            Self::KwStatic
                | Self::KwInline
                | Self::KwVirtual
                | Self::KwExplicit
                | Self::KwConstexpr
                | Self::KwMutable
                | Self::KwExtern
        )
    }
}

pub use crate::span::Span;

/// A token with its location in source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub ty: TokenType,
    pub lexeme: std::borrow::Cow<'src, str>,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn new(ty: TokenType, lexeme: impl Into<std::borrow::Cow<'src, str>>, span: Span) -> Self {
        Self {
            ty,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// True for an identifier token with exactly this spelling.
    pub fn is_ident(&self, text: &str) -> bool {
        self.ty == TokenType::Identifier && self.lexeme == text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_with_end_position() {
        let span = Span::new(0, 5, 1, 1);
        assert_eq!(span.start, 0);
        assert_eq!(span.end, 5);
        assert_eq!(span.end_line, 1);
        assert_eq!(span.end_column, 6);
    }

    #[test]
    fn span_merge_preserves_end_position() {
        let span1 = Span::new_with_end(0, 5, 1, 1, 1, 6);
        let span2 = Span::new_with_end(10, 15, 2, 3, 2, 8);
        let merged = span1.merge(span2);

        assert_eq!(merged.start, 0);
        assert_eq!(merged.line, 1);
        assert_eq!(merged.end, 15);
        assert_eq!(merged.end_line, 2);
        assert_eq!(merged.end_column, 8);
    }

    #[test]
    fn keyword_lookup_round_trips_spelling() {
        let ty = TokenType::keyword_type("virtual").unwrap();
        assert_eq!(ty, TokenType::KwVirtual);
        assert_eq!(ty.as_str(), "virtual");
        assert_eq!(TokenType::keyword_type("override"), None);
    }
}
