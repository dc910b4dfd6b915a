// src/commands/scan.rs

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use super::common::{TermColors, load_config, read_sources, render_diagnostics};
use crate::cli::ColorMode;
use crate::pipeline::{FileScan, Pipeline};

/// List every pinned allocation site and bare pinned allocation.
pub fn scan_paths(
    patterns: &[String],
    config: Option<&Path>,
    wrapper: Option<String>,
    color_mode: ColorMode,
) -> ExitCode {
    let config = match load_config(config, wrapper, None) {
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

    let output = Pipeline::new(config).scan(&sources);
    let files: Vec<(&str, &str)> = sources
        .iter()
        .map(|s| (s.name.as_str(), s.source.as_str()))
        .collect();
    render_diagnostics(&output.diagnostics, &files, &mut io::stderr(), color_mode);

    let colors = TermColors::for_stdout(color_mode);
    let mut stdout = io::stdout().lock();
    for scan in &output.files {
        if write_scan(&mut stdout, scan, &colors).is_err() {
            return ExitCode::FAILURE;
        }
    }

    if output.diagnostics.iter().any(|d| d.is_error()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// `file:line:col  variable  Type @ node N`, one line per site, then the
/// allocations held through plain handles.
fn write_scan(w: &mut dyn Write, scan: &FileScan, colors: &TermColors) -> io::Result<()> {
    for site in &scan.result.sites {
        writeln!(
            w,
            "{}{}:{}:{}{}  {}  {}{} @ node {}{}",
            colors.dim(),
            scan.name,
            site.variable_span.line,
            site.variable_span.column,
            colors.reset(),
            site.variable,
            colors.green(),
            site.canonical,
            site.node,
            colors.reset(),
        )?;
    }
    for bare in &scan.result.bare_allocations {
        writeln!(
            w,
            "{}{}:{}:{}{}  {}(plain handle){}  {} @ node {}",
            colors.dim(),
            scan.name,
            bare.span.line,
            bare.span.column,
            colors.reset(),
            colors.yellow(),
            colors.reset(),
            bare.canonical,
            bare.node,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::SourceFile;

    #[test]
    fn scan_lines_name_location_variable_and_key() {
        let source = "class Node { int v; };\nvoid f() {\n    numa<Node*, 1> head = new numa<Node, 1>();\n    Node* raw = new numa<Node, 0>();\n}\n";
        let files = vec![SourceFile::new("main.cpp", source)];
        let output = Pipeline::new(Config::default()).scan(&files);

        let mut buf = Vec::new();
        write_scan(&mut buf, &output.files[0], &TermColors::for_stdout(ColorMode::Never)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "main.cpp:3:20  head  Node @ node 1");
        assert!(lines[1].starts_with("main.cpp:4:"));
        assert!(lines[1].ends_with("(plain handle)  Node @ node 0"));
    }
}
