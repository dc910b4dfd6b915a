// src/pipeline.rs
//! One numapin run over a set of source files: parse, index, scan,
//! synthesize, rewrite.
//!
//! The pipeline owns the run-wide state (specialization registry and profile
//! cache). Files that fail to lex or parse are reported and passed through
//! unmodified; they take no part in the declaration index.

use std::path::PathBuf;

use miette::NamedSource;
use rustc_hash::FxHashSet;

use numapin_codegen::{Mode, RewriteSet, SynthDiagnostic, Synthesizer};
use numapin_frontend::{Parser, TemplateArg, parse_int_literal};
use numapin_sema::{
    CanonicalType, DeclIndex, FileId, NodeId, ParsedFile, Profiler, ScanResult,
    SpecializationKey, SpecializationRecord, SpecializationRegistry, scan_unit,
};

use crate::config::Config;
use crate::errors::{LexerError, ParserError, ProfileError, ScanWarning, SynthError, SynthWarning};

/// An input file as read from disk
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Display name used in diagnostics
    pub name: String,
    pub source: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DiagnosticKind {
    Lexer(LexerError),
    Parser(ParserError),
    Profile(ProfileError),
    Synth(SynthError),
    Warning(ScanWarning),
    SynthWarning(SynthWarning),
}

/// A diagnostic and the file its span points into
#[derive(Debug, Clone)]
pub struct FileDiagnostic {
    pub file: FileId,
    pub kind: DiagnosticKind,
}

impl FileDiagnostic {
    pub fn is_error(&self) -> bool {
        !matches!(
            self.kind,
            DiagnosticKind::Warning(_) | DiagnosticKind::SynthWarning(_)
        )
    }

    /// Attach the file's text so the report can show source context.
    pub fn to_report(&self, name: &str, source: &str) -> miette::Report {
        let report = match &self.kind {
            DiagnosticKind::Lexer(e) => miette::Report::new(e.clone()),
            DiagnosticKind::Parser(e) => miette::Report::new(e.clone()),
            DiagnosticKind::Profile(e) => miette::Report::new(e.clone()),
            DiagnosticKind::Synth(e) => miette::Report::new(e.clone()),
            DiagnosticKind::Warning(w) => miette::Report::new(w.clone()),
            DiagnosticKind::SynthWarning(w) => miette::Report::new(w.clone()),
        };
        report.with_source_code(NamedSource::new(name, source.to_string()))
    }
}

impl From<SynthDiagnostic> for FileDiagnostic {
    fn from(diagnostic: SynthDiagnostic) -> Self {
        match diagnostic {
            SynthDiagnostic::Profile(located) => FileDiagnostic {
                file: located.file,
                kind: DiagnosticKind::Profile(located.error),
            },
            SynthDiagnostic::Synth(located) => FileDiagnostic {
                file: located.file,
                kind: DiagnosticKind::Synth(located.error),
            },
            SynthDiagnostic::Warning(located) => FileDiagnostic {
                file: located.file,
                kind: DiagnosticKind::SynthWarning(located.error),
            },
        }
    }
}

/// What a run produced for one input file
#[derive(Debug, Clone)]
pub struct FileOutput {
    pub id: FileId,
    pub path: PathBuf,
    pub name: String,
    pub source: String,
    /// Rewritten text; `None` when the file needed no edits
    pub rewritten: Option<String>,
}

impl FileOutput {
    pub fn contents(&self) -> &str {
        self.rewritten.as_deref().unwrap_or(&self.source)
    }

    pub fn changed(&self) -> bool {
        self.rewritten.is_some()
    }
}

#[derive(Debug, Default)]
pub struct RunOutput {
    pub files: Vec<FileOutput>,
    pub diagnostics: Vec<FileDiagnostic>,
    /// Specializations emitted by this run, in emission order
    pub records: Vec<SpecializationRecord>,
    pub sites: usize,
}

impl RunOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(FileDiagnostic::is_error)
    }

    pub fn file(&self, id: FileId) -> Option<&FileOutput> {
        self.files.get(id.index())
    }
}

/// Allocation sites found in one file
#[derive(Debug, Clone)]
pub struct FileScan {
    pub id: FileId,
    pub name: String,
    pub result: ScanResult,
}

#[derive(Debug, Default)]
pub struct ScanOutput {
    pub files: Vec<FileScan>,
    pub diagnostics: Vec<FileDiagnostic>,
}

pub struct Pipeline {
    config: Config,
    registry: SpecializationRegistry,
    profiler: Profiler,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: SpecializationRegistry::new(),
            profiler: Profiler::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transform every file. Each output keeps the position of its input.
    pub fn run(mut self, files: Vec<SourceFile>) -> RunOutput {
        let _span = tracing::info_span!("run", files = files.len()).entered();
        let (parsed, mut diagnostics) = parse_all(&files);
        let index = DeclIndex::build(&parsed);
        self.seed_existing(&index);

        let pinning = self.config.pinning();
        let scans: Vec<(FileId, ScanResult)> = parsed
            .iter()
            .map(|file| (file.id, scan_unit(&file.unit, &file.source, &pinning, &index)))
            .collect();

        let bare_types: FxHashSet<CanonicalType> = scans
            .iter()
            .flat_map(|(_, scan)| scan.bare_allocations.iter().map(|b| b.canonical.clone()))
            .collect();

        let options = self.config.synth_options();
        let nested_prefix = format!("{}<", self.config.wrapper);
        let mut rewrites = RewriteSet::new();
        let mut sites = 0;
        {
            let mut synth = Synthesizer::new(
                &index,
                &mut self.profiler,
                &mut self.registry,
                &mut rewrites,
                &options,
                &bare_types,
            );
            for (file, scan) in &scans {
                for site in &scan.sites {
                    sites += 1;
                    if site.canonical.as_str().starts_with(&nested_prefix) {
                        tracing::debug!(
                            variable = %site.variable,
                            element = %site.canonical,
                            "skipping site whose element is already pinned"
                        );
                        continue;
                    }
                    let outcome = synth.request(&site.element, &site.scope, site.node, (*file, site.span));
                    tracing::debug!(
                        variable = %site.variable,
                        element = %site.canonical,
                        node = %site.node,
                        ?outcome,
                        "allocation site"
                    );
                }
            }
            diagnostics.extend(synth.take_diagnostics().into_iter().map(FileDiagnostic::from));
        }

        if options.mode == Mode::Standalone {
            for (file, scan) in &scans {
                for bare in &scan.bare_allocations {
                    diagnostics.push(FileDiagnostic {
                        file: *file,
                        kind: DiagnosticKind::Warning(ScanWarning::PlainHandle {
                            name: bare.canonical.to_string(),
                            wrapper: self.config.wrapper.clone(),
                            node: bare.node.0,
                            span: bare.span.into(),
                        }),
                    });
                }
            }
        }

        if let Some(header) = self.config.include_header() {
            rewrites.include_in_touched(header);
        }
        let mut rewritten = rewrites.flush();
        let outputs = files
            .into_iter()
            .enumerate()
            .map(|(i, file)| {
                let id = file_id(i);
                FileOutput {
                    id,
                    rewritten: rewritten.remove(&id),
                    path: file.path,
                    name: file.name,
                    source: file.source,
                }
            })
            .collect();

        diagnostics.sort_by_key(|d| d.file);
        tracing::info!(
            sites,
            specializations = self.registry.records().len(),
            diagnostics = diagnostics.len(),
            "run finished"
        );
        RunOutput {
            files: outputs,
            diagnostics,
            records: self.registry.records().to_vec(),
            sites,
        }
    }

    /// Parse and scan without synthesizing anything.
    pub fn scan(&self, files: &[SourceFile]) -> ScanOutput {
        let (parsed, diagnostics) = parse_all(files);
        let index = DeclIndex::build(&parsed);
        let pinning = self.config.pinning();
        let files = parsed
            .iter()
            .map(|file| FileScan {
                id: file.id,
                name: file.name.clone(),
                result: scan_unit(&file.unit, &file.source, &pinning, &index),
            })
            .collect();
        ScanOutput { files, diagnostics }
    }

    /// Specializations already written in the input count as emitted.
    fn seed_existing(&mut self, index: &DeclIndex<'_>) {
        for existing in index.existing_specializations() {
            if existing.decl.name != self.config.wrapper {
                continue;
            }
            let Some([TemplateArg::Type(element), TemplateArg::Value(node)]) =
                existing.decl.specialization_args.as_deref()
            else {
                continue;
            };
            let Some(node) = parse_int_literal(node).and_then(|n| u32::try_from(n).ok()) else {
                continue;
            };
            let key = SpecializationKey::new(index.canonical(element, &existing.scope), NodeId(node));
            tracing::debug!(%key, "specialization already present in input");
            self.registry.mark_existing(key);
        }
    }
}

fn file_id(position: usize) -> FileId {
    FileId(u32::try_from(position).unwrap_or(u32::MAX))
}

/// Parse every file. A file with lexer or parser errors yields diagnostics
/// instead of a `ParsedFile`; lexer errors suppress the parse error they
/// usually cause.
fn parse_all(files: &[SourceFile]) -> (Vec<ParsedFile>, Vec<FileDiagnostic>) {
    let mut parsed = Vec::with_capacity(files.len());
    let mut diagnostics = Vec::new();
    for (i, file) in files.iter().enumerate() {
        let id = file_id(i);
        let mut parser = Parser::new(&file.source);
        let result = parser.parse_translation_unit();
        let lexer_errors = parser.take_lexer_errors();
        if !lexer_errors.is_empty() {
            tracing::warn!(file = %file.name, errors = lexer_errors.len(), "lexer errors; file left unmodified");
            diagnostics.extend(lexer_errors.into_iter().map(|e| FileDiagnostic {
                file: id,
                kind: DiagnosticKind::Lexer(e),
            }));
            continue;
        }
        match result {
            Ok(unit) => parsed.push(ParsedFile {
                id,
                name: file.name.clone(),
                source: file.source.clone(),
                unit,
            }),
            Err(err) => {
                tracing::warn!(file = %file.name, "parse error; file left unmodified");
                diagnostics.push(FileDiagnostic {
                    file: id,
                    kind: DiagnosticKind::Parser(err.error),
                });
            }
        }
    }
    (parsed, diagnostics)
}
