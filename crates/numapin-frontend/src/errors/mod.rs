// Frontend errors (lexer and parser)
pub mod lexer;
pub mod parser;

pub use lexer::LexerError;
pub use parser::ParserError;
