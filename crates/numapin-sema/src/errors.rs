// src/errors.rs
//! Declaration errors (E2xxx) and scan warnings (W3xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::FileId;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ProfileError {
    #[error("no definition of '{name}' is visible")]
    #[diagnostic(
        code(E2001),
        help("the class must be defined (not only forward-declared) in one of the input files")
    )]
    UnresolvedDeclaration {
        name: String,
        #[label("pinned allocation of '{name}'")]
        span: SourceSpan,
    },

    #[error("cannot pin '{name}': {reason}")]
    #[diagnostic(code(E2002))]
    UnsupportedDeclaration {
        name: String,
        reason: String,
        #[label("{reason}")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ScanWarning {
    #[error("pinned '{name}' is held through a plain handle")]
    #[diagnostic(
        code(W3001),
        severity(Warning),
        help("declare the handle as '{wrapper}<{name}*, {node}>' so the specialization's members are used")
    )]
    PlainHandle {
        name: String,
        wrapper: String,
        node: u32,
        #[label("allocated on node {node} here")]
        span: SourceSpan,
    },
}

/// An error together with the file its span points into.
#[derive(Debug, Clone)]
pub struct Located<E> {
    pub file: FileId,
    pub error: E,
}

impl<E> Located<E> {
    pub fn new(file: FileId, error: E) -> Self {
        Self { file, error }
    }
}
