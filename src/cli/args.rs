// src/cli/args.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Mode;

/// Color output mode
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Retrofit NUMA node pinning onto C++ value types
#[derive(Parser)]
#[command(name = "numapin")]
#[command(version)]
#[command(
    about = "Synthesize NUMA-pinned class specializations for C++ sources",
    long_about = None
)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite sources, adding a pinned specialization for every allocation site
    #[command(visible_alias = "t")]
    Transform {
        /// Paths to transform (files, directories, or glob patterns)
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<String>,

        /// Directory the rewritten tree is written to
        #[arg(long, short = 'o', value_name = "DIR")]
        out_dir: PathBuf,

        /// Configuration file (defaults to ./numapin.toml when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Pinning wrapper template name (overrides the config file)
        #[arg(long, value_name = "NAME")]
        wrapper: Option<String>,

        /// How specializations relate to the original type
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// List pinned allocation sites without writing anything
    Scan {
        /// Paths to scan (files, directories, or glob patterns)
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<String>,

        /// Configuration file (defaults to ./numapin.toml when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Pinning wrapper template name (overrides the config file)
        #[arg(long, value_name = "NAME")]
        wrapper: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn transform_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "numapin",
            "--color",
            "never",
            "transform",
            "src",
            "--out-dir",
            "out",
            "--wrapper",
            "pinned",
            "--mode",
            "inherit",
        ])
        .unwrap();
        assert!(matches!(cli.color, ColorMode::Never));
        match cli.command {
            Commands::Transform {
                paths,
                out_dir,
                wrapper,
                mode,
                config,
            } => {
                assert_eq!(paths, vec!["src".to_string()]);
                assert_eq!(out_dir, PathBuf::from("out"));
                assert_eq!(wrapper.as_deref(), Some("pinned"));
                assert_eq!(mode, Some(Mode::Inherit));
                assert!(config.is_none());
            }
            Commands::Scan { .. } => panic!("expected transform"),
        }
    }

    #[test]
    fn transform_requires_out_dir() {
        assert!(Cli::try_parse_from(["numapin", "transform", "a.cpp"]).is_err());
    }
}
