// src/commands/common.rs
//! Shared utilities for CLI commands.

use std::fs;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::cli::{ColorMode, expand_paths};
use crate::config::{Config, Mode};
use crate::errors::{TransformError, render_to_writer_terminal};
use crate::pipeline::{FileDiagnostic, SourceFile};

/// Expand the command-line patterns and read every matched file.
pub fn read_sources(patterns: &[String]) -> Result<Vec<SourceFile>, TransformError> {
    let paths = expand_paths(patterns)?;
    if paths.is_empty() {
        return Err(TransformError::NoInputs);
    }
    paths.into_iter().map(read_source).collect()
}

fn read_source(path: PathBuf) -> Result<SourceFile, TransformError> {
    match fs::read_to_string(&path) {
        Ok(source) => Ok(SourceFile::new(path, source)),
        Err(source) => Err(TransformError::ReadInput { path, source }),
    }
}

/// Config file (explicit or discovered) with command-line overrides applied.
pub fn load_config(
    explicit: Option<&Path>,
    wrapper: Option<String>,
    mode: Option<Mode>,
) -> Result<Config, TransformError> {
    Ok(Config::discover(explicit)?.with_overrides(wrapper, mode))
}

/// Render diagnostics with the source of the file each one points into.
/// `files` holds `(name, source)` pairs indexed by `FileId`.
pub fn render_diagnostics(
    diagnostics: &[FileDiagnostic],
    files: &[(&str, &str)],
    w: &mut dyn Write,
    color_mode: ColorMode,
) {
    for diagnostic in diagnostics {
        match files.get(diagnostic.file.index()) {
            Some((name, source)) => {
                let report = diagnostic.to_report(name, source);
                let _ = render_to_writer_terminal(report.as_ref(), w, color_mode);
            }
            None => {
                let _ = writeln!(w, "error: diagnostic for unknown file {}", diagnostic.file.0);
            }
        }
    }
}

/// ANSI color codes for terminal output.
pub struct TermColors {
    use_color: bool,
}

impl TermColors {
    /// Colors for stdout, honoring `--color`.
    pub fn for_stdout(color_mode: ColorMode) -> Self {
        let use_color = match color_mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        };
        Self { use_color }
    }

    /// Green text (for success).
    pub fn green(&self) -> &'static str {
        if self.use_color { "\x1b[32m" } else { "" }
    }

    /// Yellow text (for warnings).
    pub fn yellow(&self) -> &'static str {
        if self.use_color { "\x1b[33m" } else { "" }
    }

    /// Dim/gray text (for secondary info like locations).
    pub fn dim(&self) -> &'static str {
        if self.use_color { "\x1b[90m" } else { "" }
    }

    /// Reset to default colors.
    pub fn reset(&self) -> &'static str {
        if self.use_color { "\x1b[0m" } else { "" }
    }
}
