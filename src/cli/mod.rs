// src/cli/mod.rs
pub mod args;
pub mod paths;

pub use args::{Cli, ColorMode, Commands};
pub use paths::{PathError, SOURCE_EXTENSIONS, common_root, expand_paths, has_source_extension};
