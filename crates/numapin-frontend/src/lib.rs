//! numapin frontend: lexer, skeleton parser, and AST for the C++ subset the
//! tool reads.

pub mod ast;
pub mod errors;
pub mod lexer;
mod parse_decl;
mod parse_stmt;
mod parse_type;
pub mod parser;
pub mod span;
pub mod token;

pub use ast::*;
pub use errors::{LexerError, ParserError};
pub use lexer::{Lexer, parse_int_literal};
pub use parser::{ParseError, Parser};
pub use token::{Span, Token, TokenType};
