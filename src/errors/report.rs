// src/errors/report.rs
//! Rendering utilities for miette diagnostics.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, ThemeCharacters, ThemeStyles};
use std::io::{IsTerminal, Write as IoWrite};

use crate::cli::ColorMode;

/// Create a handler for terminal output (unicode + colors).
pub fn terminal_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::unicode(),
        styles: ThemeStyles::ansi(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Create a handler for snapshot testing (ascii + no colors).
pub fn snapshot_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::ascii(),
        styles: ThemeStyles::none(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Render to a buffer without colors (for snapshots/testing).
pub fn render_to_string(report: &dyn Diagnostic) -> String {
    let mut output = String::new();
    let handler = snapshot_handler();
    let _ = handler.render_report(&mut output, report);
    output
}

/// Render for a terminal writer, honoring `--color`. `Auto` colors only when
/// stderr is a terminal.
pub fn render_to_writer_terminal(
    report: &dyn Diagnostic,
    writer: &mut dyn IoWrite,
    color_mode: ColorMode,
) -> std::io::Result<()> {
    let use_color = match color_mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stderr().is_terminal(),
    };
    let handler = if use_color {
        terminal_handler()
    } else {
        snapshot_handler()
    };
    let mut output = String::new();
    if handler.render_report(&mut output, report).is_ok() {
        writer.write_all(output.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{LexerError, ScanWarning, SynthError};
    use miette::NamedSource;

    #[test]
    fn render_lexer_error_to_string() {
        let err = LexerError::UnexpectedCharacter {
            ch: '@',
            span: (0, 1).into(),
        };
        let report = miette::Report::new(err)
            .with_source_code(NamedSource::new("list.hpp", "@".to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("E0001"), "should contain error code");
        assert!(
            output.contains("unexpected character"),
            "should contain message"
        );
        assert!(output.contains("list.hpp"), "should name the file");
    }

    #[test]
    fn render_synth_error_with_both_labels() {
        let source = "struct A { A(B* b); A(B* c); };";
        let err = SynthError::AmbiguousConstructor {
            class: "A".to_string(),
            node: 1,
            span: (20, 7).into(),
            previous: (11, 7).into(),
        };
        let report = miette::Report::new(err)
            .with_source_code(NamedSource::new("a.hpp", source.to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("E3001"));
        assert!(output.contains("this constructor"));
        assert!(output.contains("has the same parameters as this one"));
        assert!(output.contains("help"));
    }

    #[test]
    fn warning_renders_without_color_when_never() {
        let source = "Node* p = new numa<Node, 1>();";
        let warning = ScanWarning::PlainHandle {
            name: "Node".to_string(),
            wrapper: "numa".to_string(),
            node: 1,
            span: (10, 19).into(),
        };
        let report = miette::Report::new(warning)
            .with_source_code(NamedSource::new("main.cpp", source.to_string()));

        let mut buf = Vec::new();
        render_to_writer_terminal(report.as_ref(), &mut buf, ColorMode::Never).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("W3001"));
        assert!(output.contains("numa<Node*, 1>"));
        assert!(!output.contains('\u{1b}'), "no ANSI escapes expected");
    }
}
