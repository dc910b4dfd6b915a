// src/config.rs
//! `numapin.toml` loading. Every field is optional; omitted fields take the
//! `Default` values, and command-line flags override whatever the file says.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use numapin_codegen::SynthOptions;
use numapin_sema::PinningConfig;

use crate::errors::TransformError;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "numapin.toml";

/// How specializations relate to the original type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Self-contained replica with pinned storage
    #[default]
    Standalone,
    /// Derive from the original type and promote its methods to virtual
    Inherit,
}

impl From<Mode> for numapin_codegen::Mode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Standalone => numapin_codegen::Mode::Standalone,
            Mode::Inherit => numapin_codegen::Mode::Inherit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Pinning wrapper template: `numa` in `numa<T, N>`
    pub wrapper: String,
    /// Single-argument handle templates accepted in place of `wrapper<T*, N>`
    pub handle_aliases: Vec<String>,
    /// Called as `allocate_fn(size, node)` by the emitted `operator new`
    pub allocate_fn: String,
    /// Called as `deallocate_fn(ptr, size)` by the emitted `operator delete`
    pub deallocate_fn: String,
    pub mode: Mode,
    /// Header included at the top of every rewritten file; empty to disable
    pub include: String,
}

impl Default for Config {
    fn default() -> Self {
        let synth = SynthOptions::default();
        Self {
            wrapper: synth.wrapper,
            handle_aliases: Vec::new(),
            allocate_fn: synth.allocate_fn,
            deallocate_fn: synth.deallocate_fn,
            mode: Mode::Standalone,
            include: "numatype.hpp".to_string(),
        }
    }
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> Result<Self, TransformError> {
        toml::from_str(text).map_err(|source| TransformError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, TransformError> {
        let text = std::fs::read_to_string(path).map_err(|source| TransformError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Load `explicit` when given, otherwise `numapin.toml` from the working
    /// directory if it exists, otherwise the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, TransformError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            tracing::debug!(path = %fallback.display(), "using config from working directory");
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, wrapper: Option<String>, mode: Option<Mode>) -> Self {
        if let Some(wrapper) = wrapper {
            self.wrapper = wrapper;
        }
        if let Some(mode) = mode {
            self.mode = mode;
        }
        self
    }

    /// `None` when no include should be added
    pub fn include_header(&self) -> Option<&str> {
        Some(self.include.trim()).filter(|header| !header.is_empty())
    }

    pub fn pinning(&self) -> PinningConfig {
        PinningConfig {
            wrapper: self.wrapper.clone(),
            handle_aliases: self.handle_aliases.clone(),
        }
    }

    pub fn synth_options(&self) -> SynthOptions {
        SynthOptions {
            wrapper: self.wrapper.clone(),
            allocate_fn: self.allocate_fn.clone(),
            deallocate_fn: self.deallocate_fn.clone(),
            mode: self.mode.into(),
        }
    }
}
