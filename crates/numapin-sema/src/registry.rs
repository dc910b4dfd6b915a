// src/registry.rs
//
// Run-scoped record of synthesized (type, node) specializations.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::index::{CanonicalType, FileId};

/// A memory-locality domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecializationKey {
    pub element: CanonicalType,
    pub node: NodeId,
}

impl SpecializationKey {
    pub fn new(element: CanonicalType, node: NodeId) -> Self {
        Self { element, node }
    }
}

impl fmt::Display for SpecializationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.element, self.node)
    }
}

/// One emitted specialization and where it was inserted.
#[derive(Debug, Clone)]
pub struct SpecializationRecord {
    pub key: SpecializationKey,
    pub emitted_text: String,
    pub file: FileId,
    pub offset: usize,
}

/// Outcome of [`SpecializationRegistry::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// The caller now owns synthesis of this key and must `complete` or `abandon` it.
    Started,
    AlreadyPresent,
    /// Synthesis of this key is underway further up the stack (pointer cycle).
    InProgress,
}

/// Registry state a failed synthesis rolls back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryMark {
    records: usize,
    promoted: usize,
}

#[derive(Debug, Default)]
pub struct SpecializationRegistry {
    records: Vec<SpecializationRecord>,
    by_key: FxHashMap<SpecializationKey, usize>,
    /// Present in the input already (hand-written or from an earlier run)
    existing: FxHashSet<SpecializationKey>,
    in_progress: FxHashSet<SpecializationKey>,
    promoted: FxHashSet<CanonicalType>,
    promoted_order: Vec<CanonicalType>,
}

impl SpecializationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-claim a key in one step.
    pub fn begin(&mut self, key: &SpecializationKey) -> Begin {
        if self.by_key.contains_key(key) || self.existing.contains(key) {
            tracing::debug!(%key, "registry hit");
            return Begin::AlreadyPresent;
        }
        if !self.in_progress.insert(key.clone()) {
            tracing::debug!(%key, "specialization already being synthesized");
            return Begin::InProgress;
        }
        Begin::Started
    }

    /// Store the record for a key claimed with `begin`.
    pub fn complete(&mut self, record: SpecializationRecord) {
        self.in_progress.remove(&record.key);
        if self.by_key.contains_key(&record.key) {
            tracing::warn!(key = %record.key, "duplicate specialization record dropped");
            return;
        }
        tracing::debug!(key = %record.key, file = record.file.0, offset = record.offset, "specialization recorded");
        self.by_key.insert(record.key.clone(), self.records.len());
        self.records.push(record);
    }

    /// Release a claimed key without a record; a later site may try again.
    pub fn abandon(&mut self, key: &SpecializationKey) {
        self.in_progress.remove(key);
    }

    pub fn contains(&self, key: &SpecializationKey) -> bool {
        self.by_key.contains_key(key) || self.existing.contains(key)
    }

    pub fn get(&self, key: &SpecializationKey) -> Option<&SpecializationRecord> {
        self.by_key.get(key).map(|&i| &self.records[i])
    }

    pub fn mark_existing(&mut self, key: SpecializationKey) {
        tracing::debug!(%key, "specialization present in input");
        self.existing.insert(key);
    }

    /// Records in the order they were completed
    pub fn records(&self) -> &[SpecializationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true the first time a type is marked for dynamic promotion.
    pub fn mark_promoted(&mut self, ty: &CanonicalType) -> bool {
        if !self.promoted.insert(ty.clone()) {
            return false;
        }
        self.promoted_order.push(ty.clone());
        true
    }

    pub fn is_promoted(&self, ty: &CanonicalType) -> bool {
        self.promoted.contains(ty)
    }

    pub fn mark(&self) -> RegistryMark {
        RegistryMark {
            records: self.records.len(),
            promoted: self.promoted_order.len(),
        }
    }

    /// Forget every record and promotion made since `mark`.
    pub fn rollback(&mut self, mark: RegistryMark) {
        for record in self.records.drain(mark.records..) {
            tracing::debug!(key = %record.key, "specialization rolled back");
            self.by_key.remove(&record.key);
        }
        for ty in self.promoted_order.drain(mark.promoted..) {
            self.promoted.remove(&ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, node: u32) -> SpecializationKey {
        SpecializationKey::new(CanonicalType::new(name), NodeId(node))
    }

    fn record(key: SpecializationKey) -> SpecializationRecord {
        SpecializationRecord {
            key,
            emitted_text: String::new(),
            file: FileId(0),
            offset: 0,
        }
    }

    #[test]
    fn begin_then_complete_records_once() {
        let mut registry = SpecializationRegistry::new();
        let k = key("Node", 1);
        assert_eq!(registry.begin(&k), Begin::Started);
        assert_eq!(registry.begin(&k), Begin::InProgress);
        registry.complete(record(k.clone()));
        assert_eq!(registry.begin(&k), Begin::AlreadyPresent);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn nodes_are_distinct_keys() {
        let mut registry = SpecializationRegistry::new();
        for node in [0, 1] {
            let k = key("Node", node);
            assert_eq!(registry.begin(&k), Begin::Started);
            registry.complete(record(k));
        }
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&key("Node", 0)));
        assert!(!registry.contains(&key("Node", 2)));
    }

    #[test]
    fn abandoned_key_can_be_retried() {
        let mut registry = SpecializationRegistry::new();
        let k = key("Node", 1);
        assert_eq!(registry.begin(&k), Begin::Started);
        registry.abandon(&k);
        assert!(!registry.contains(&k));
        assert_eq!(registry.begin(&k), Begin::Started);
    }

    #[test]
    fn existing_specializations_count_as_present() {
        let mut registry = SpecializationRegistry::new();
        registry.mark_existing(key("Node", 3));
        assert_eq!(registry.begin(&key("Node", 3)), Begin::AlreadyPresent);
        assert!(registry.records().is_empty());
    }

    #[test]
    fn rollback_forgets_later_records_and_promotions() {
        let mut registry = SpecializationRegistry::new();
        let kept = key("Leaf", 1);
        registry.begin(&kept);
        registry.complete(record(kept.clone()));
        let mark = registry.mark();

        let dropped = key("Tree", 1);
        registry.begin(&dropped);
        registry.complete(record(dropped.clone()));
        assert!(registry.mark_promoted(&CanonicalType::new("Tree")));
        registry.rollback(mark);

        assert!(registry.contains(&kept));
        assert!(!registry.contains(&dropped));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.begin(&dropped), Begin::Started);
        assert!(registry.mark_promoted(&CanonicalType::new("Tree")));
    }

    #[test]
    fn promotion_is_marked_once() {
        let mut registry = SpecializationRegistry::new();
        let ty = CanonicalType::new("Node");
        assert!(registry.mark_promoted(&ty));
        assert!(!registry.mark_promoted(&ty));
        assert!(registry.is_promoted(&ty));
    }
}
