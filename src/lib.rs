// src/lib.rs

// Public modules (the numapin driver API)
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod pipeline;

pub use config::Config;
pub use pipeline::{Pipeline, RunOutput, SourceFile};
