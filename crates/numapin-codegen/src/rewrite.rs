// src/rewrite.rs
//
// Buffered insertions against an original source buffer, applied in one pass.

use std::collections::BTreeMap;

use numapin_sema::FileId;

use crate::errors::RewriteError;

/// Text to insert at an offset of the original buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub offset: usize,
    pub text: String,
}

/// Pending insertions for one file, kept in the order they were queued.
/// Flushing applies them by offset; equal offsets keep queue order.
#[derive(Debug, Clone)]
pub struct RewriteSession<'src> {
    file: FileId,
    source: &'src str,
    edits: Vec<PendingEdit>,
}

impl<'src> RewriteSession<'src> {
    pub fn new(file: FileId, source: &'src str) -> Self {
        Self {
            file,
            source,
            edits: Vec::new(),
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn insert(&mut self, offset: usize, text: impl Into<String>) -> Result<(), RewriteError> {
        if offset > self.source.len() {
            return Err(RewriteError::OffsetOutOfBounds {
                offset,
                len: self.source.len(),
            });
        }
        if !self.source.is_char_boundary(offset) {
            return Err(RewriteError::NotCharBoundary { offset });
        }
        self.edits.push(PendingEdit {
            offset,
            text: text.into(),
        });
        Ok(())
    }

    /// Edits in queue order
    pub fn edits(&self) -> &[PendingEdit] {
        &self.edits
    }

    /// Drop every edit queued after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.edits.truncate(len);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every edit. `None` when nothing was queued.
    pub fn flush(mut self) -> Option<String> {
        if self.edits.is_empty() {
            return None;
        }
        // Stable: equal offsets stay in queue order.
        self.edits.sort_by_key(|edit| edit.offset);
        let added: usize = self.edits.iter().map(|e| e.text.len()).sum();
        let mut out = String::with_capacity(self.source.len() + added);
        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&self.source[cursor..edit.offset]);
            out.push_str(&edit.text);
            cursor = edit.offset;
        }
        out.push_str(&self.source[cursor..]);
        tracing::debug!(file = self.file.0, edits = self.edits.len(), bytes = added, "rewrite flushed");
        Some(out)
    }
}

/// Queue lengths per file at some point of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteMark(BTreeMap<FileId, usize>);

/// One session per file touched during a run
#[derive(Debug, Default)]
pub struct RewriteSet<'src> {
    sessions: BTreeMap<FileId, RewriteSession<'src>>,
}

impl<'src> RewriteSet<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        file: FileId,
        source: &'src str,
        offset: usize,
        text: impl Into<String>,
    ) -> Result<(), RewriteError> {
        self.sessions
            .entry(file)
            .or_insert_with(|| RewriteSession::new(file, source))
            .insert(offset, text)
    }

    pub fn session(&self, file: FileId) -> Option<&RewriteSession<'src>> {
        self.sessions.get(&file)
    }

    pub fn mark(&self) -> RewriteMark {
        RewriteMark(
            self.sessions
                .iter()
                .map(|(file, session)| (*file, session.edits.len()))
                .collect(),
        )
    }

    /// Discard every edit queued since `mark`.
    pub fn rollback(&mut self, mark: &RewriteMark) {
        self.sessions.retain(|file, session| match mark.0.get(file) {
            Some(&len) => {
                session.truncate(len);
                true
            }
            None => false,
        });
    }

    /// Put `#include "header"` at the top of every file with pending edits,
    /// unless the file already includes it.
    pub fn include_in_touched(&mut self, header: &str) {
        let directive = format!("#include \"{header}\"");
        for session in self.sessions.values_mut() {
            if session.is_empty() || session.source.contains(&directive) {
                continue;
            }
            tracing::debug!(file = session.file.0, header, "adding include");
            session.edits.insert(
                0,
                PendingEdit {
                    offset: 0,
                    text: format!("{directive}\n"),
                },
            );
        }
    }

    /// Rewritten contents of every file with at least one edit
    pub fn flush(self) -> BTreeMap<FileId, String> {
        self.sessions
            .into_iter()
            .filter_map(|(file, session)| session.flush().map(|text| (file, text)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_edits_shift_by_earlier_insertions() {
        let mut session = RewriteSession::new(FileId(0), "class A {};\nclass B {};\n");
        session.insert(23, "\n// after B").unwrap();
        session.insert(11, "\n// after A").unwrap();
        assert_eq!(
            session.flush().unwrap(),
            "class A {};\n// after A\nclass B {};\n// after B\n"
        );
    }

    #[test]
    fn equal_offsets_keep_submission_order() {
        let mut session = RewriteSession::new(FileId(0), "x");
        session.insert(1, "a").unwrap();
        session.insert(0, "<").unwrap();
        session.insert(1, "b").unwrap();
        let offsets: Vec<usize> = session.edits().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![1, 0, 1]);
        assert_eq!(session.flush().unwrap(), "<xab");
    }

    #[test]
    fn empty_session_flushes_to_none() {
        let session = RewriteSession::new(FileId(0), "int x;");
        assert!(session.flush().is_none());
    }

    #[test]
    fn invalid_offsets_are_rejected() {
        let mut session = RewriteSession::new(FileId(0), "é;");
        assert_eq!(
            session.insert(9, "x"),
            Err(RewriteError::OffsetOutOfBounds { offset: 9, len: 3 })
        );
        assert_eq!(
            session.insert(1, "x"),
            Err(RewriteError::NotCharBoundary { offset: 1 })
        );
        assert!(session.is_empty());
    }

    #[test]
    fn rollback_discards_edits_queued_after_the_mark() {
        let mut set = RewriteSet::new();
        set.insert(FileId(0), "ab", 1, "1").unwrap();
        let mark = set.mark();
        set.insert(FileId(0), "ab", 2, "2").unwrap();
        set.insert(FileId(1), "c", 0, "3").unwrap();
        set.rollback(&mark);
        assert!(set.session(FileId(1)).is_none());
        let out = set.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[&FileId(0)], "a1b");
    }

    #[test]
    fn include_goes_first_and_only_once() {
        let mut set = RewriteSet::new();
        set.insert(FileId(0), "a", 0, "<").unwrap();
        set.insert(FileId(1), "#include \"numatype.hpp\"\nb", 1, "!").unwrap();
        let mark = set.mark();
        set.insert(FileId(2), "c", 1, "?").unwrap();
        set.rollback(&mark);
        set.include_in_touched("numatype.hpp");
        let out = set.flush();
        assert_eq!(out[&FileId(0)], "#include \"numatype.hpp\"\n<a");
        assert_eq!(out[&FileId(1)], "#include \"numatype.hpp\"\nb!");
        assert!(!out.contains_key(&FileId(2)));
    }

    #[test]
    fn set_flushes_only_touched_files() {
        let mut set = RewriteSet::new();
        set.insert(FileId(1), "b", 1, "!").unwrap();
        let out = set.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[&FileId(1)], "b!");
    }
}
