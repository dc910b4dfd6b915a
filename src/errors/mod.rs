// src/errors/mod.rs
//! Structured error reporting for the numapin driver.
//!
//! Diagnostics raised by the frontend, sema and codegen crates are re-exported
//! here; `TransformError` covers what goes wrong around them (reading inputs,
//! loading configuration, writing outputs).

pub mod report;

use std::path::PathBuf;

use thiserror::Error;

use crate::cli::PathError;

// Re-export frontend errors
pub use numapin_frontend::errors::{LexerError, ParserError};

// Re-export sema errors
pub use numapin_sema::errors::{ProfileError, ScanWarning};

// Re-export codegen errors
pub use numapin_codegen::errors::{RewriteError, SynthError, SynthWarning};

pub use report::{render_to_string, render_to_writer_terminal};

/// Failures outside any single source file's diagnostics
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("could not read '{}': {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write '{}': {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read config '{}': {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Paths(#[from] PathError),

    #[error("no C++ source files found")]
    NoInputs,
}
