// src/errors.rs
//! Synthesis errors (E3xxx), synthesis warnings (W3xxx) and rewrite errors.

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SynthError {
    #[error("constructors of '{class}' become indistinguishable on node {node}")]
    #[diagnostic(
        code(E3001),
        help("pinned pointer parameters collapse onto the same type; remove one of the overloads")
    )]
    AmbiguousConstructor {
        class: String,
        node: u32,
        #[label("this constructor")]
        span: SourceSpan,
        #[label("has the same parameters as this one")]
        previous: SourceSpan,
    },

    #[error("'{class}::{member}' has no definition to copy")]
    #[diagnostic(
        code(E3002),
        help("define the member inline or out-of-line in one of the input files")
    )]
    MissingDefinition {
        class: String,
        member: String,
        #[label("declared here")]
        span: SourceSpan,
    },

    #[error("the specialization of '{class}' cannot be placed: {reason}")]
    #[diagnostic(code(E3003))]
    Placement {
        class: String,
        reason: String,
        #[label("specialized class")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SynthWarning {
    #[error("field '{class}::{field}' keeps its plain '{element}*' type")]
    #[diagnostic(
        code(W3002),
        severity(Warning),
        help("'{element}' has no specialization for node {node}: {reason}")
    )]
    FieldLeftUnpinned {
        class: String,
        field: String,
        element: String,
        node: u32,
        reason: String,
        #[label("not pinned to node {node}")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("insertion offset {offset} is past the end of the buffer ({len} bytes)")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("insertion offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}
