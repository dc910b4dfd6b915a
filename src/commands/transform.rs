// src/commands/transform.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::common::{load_config, read_sources, render_diagnostics};
use crate::cli::{ColorMode, common_root};
use crate::config::Mode;
use crate::errors::TransformError;
use crate::pipeline::{FileOutput, Pipeline, RunOutput};

pub struct TransformOptions<'a> {
    pub out_dir: &'a Path,
    pub config: Option<&'a Path>,
    pub wrapper: Option<String>,
    pub mode: Option<Mode>,
    pub color: ColorMode,
}

/// Transform the matched sources into `out_dir`. Every input is written,
/// rewritten or not; the exit code is nonzero if any error was reported.
pub fn transform_paths(patterns: &[String], options: TransformOptions<'_>) -> ExitCode {
    let config = match load_config(options.config, options.wrapper, options.mode) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let sources = match read_sources(patterns) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let root = common_root(&sources.iter().map(|s| s.path.clone()).collect::<Vec<_>>());
    let output = Pipeline::new(config).run(sources);

    let files: Vec<(&str, &str)> = output
        .files
        .iter()
        .map(|f| (f.name.as_str(), f.source.as_str()))
        .collect();
    render_diagnostics(&output.diagnostics, &files, &mut std::io::stderr(), options.color);

    let mut had_error = output.has_errors();
    if let Err(e) = write_outputs(&output, &root, options.out_dir) {
        eprintln!("error: {}", e);
        had_error = true;
    }
    print_summary(&output);

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn write_outputs(output: &RunOutput, root: &Path, out_dir: &Path) -> Result<(), TransformError> {
    for file in &output.files {
        let target = output_path(file, root, out_dir);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| TransformError::WriteOutput {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, file.contents()).map_err(|source| TransformError::WriteOutput {
            path: target.clone(),
            source,
        })?;
        tracing::debug!(path = %target.display(), changed = file.changed(), "wrote output");
    }
    Ok(())
}

/// `out_dir` joined with the file's path relative to the inputs' common root
fn output_path(file: &FileOutput, root: &Path, out_dir: &Path) -> PathBuf {
    let relative = file
        .path
        .strip_prefix(root)
        .ok()
        .map(Path::to_path_buf)
        .or_else(|| file.path.file_name().map(PathBuf::from))
        .unwrap_or_else(|| file.path.clone());
    out_dir.join(relative)
}

fn print_summary(output: &RunOutput) {
    let changed = output.files.iter().filter(|f| f.changed()).count();
    let errors = output.diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = output.diagnostics.len() - errors;
    eprintln!(
        "numapin: {} site(s), {} specialization(s) emitted, {} of {} file(s) changed, {} error(s), {} warning(s)",
        output.sites,
        output.records.len(),
        changed,
        output.files.len(),
        errors,
        warnings
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use numapin_sema::FileId;

    fn file(path: &str) -> FileOutput {
        FileOutput {
            id: FileId(0),
            path: PathBuf::from(path),
            name: path.to_string(),
            source: String::new(),
            rewritten: None,
        }
    }

    #[test]
    fn outputs_keep_paths_relative_to_root() {
        let out = output_path(&file("proj/src/list.hpp"), Path::new("proj"), Path::new("out"));
        assert_eq!(out, PathBuf::from("out/src/list.hpp"));
    }

    #[test]
    fn file_outside_root_falls_back_to_its_name() {
        let out = output_path(&file("other/list.hpp"), Path::new("proj"), Path::new("out"));
        assert_eq!(out, PathBuf::from("out/list.hpp"));
    }
}
