// src/errors/parser.rs
//! Parser errors (E1xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("expected '{expected}', found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("unexpected token '{token}'")]
    #[diagnostic(code(E1003))]
    UnexpectedToken {
        token: String,
        #[label("unexpected")]
        span: SourceSpan,
    },

    #[error("expected type")]
    #[diagnostic(code(E1004))]
    ExpectedType {
        #[label("expected type")]
        span: SourceSpan,
    },

    #[error("expected identifier")]
    #[diagnostic(code(E1006))]
    ExpectedIdentifier {
        #[label("expected identifier")]
        span: SourceSpan,
    },

    #[error("unbalanced '{open}'")]
    #[diagnostic(code(E1007), help("every '{open}' needs a matching '{close}'"))]
    UnbalancedDelimiter {
        open: String,
        close: String,
        #[label("opened here")]
        span: SourceSpan,
    },

    #[error("unexpected '{close}'")]
    #[diagnostic(code(E1008))]
    StrayClosingDelimiter {
        close: String,
        #[label("nothing to close here")]
        span: SourceSpan,
    },

    #[error("class body of '{name}' is missing its terminating ';'")]
    #[diagnostic(code(E1010), help("class definitions end with '}};'"))]
    MissingClassSemicolon {
        name: String,
        #[label("expected ';' after this '}}'")]
        span: SourceSpan,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn braces_in_messages_render_single() {
        let err = ParserError::MissingClassSemicolon {
            name: "Node".to_string(),
            span: (10, 1).into(),
        };
        let help = err.help().map(|h| h.to_string());
        assert_eq!(help.as_deref(), Some("class definitions end with '};'"));
        let labels: Vec<String> = err
            .labels()
            .into_iter()
            .flatten()
            .filter_map(|l| l.label().map(str::to_string))
            .collect();
        assert_eq!(labels, vec!["expected ';' after this '}'".to_string()]);
    }
}
