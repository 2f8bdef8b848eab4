//! Per-revision bookkeeping for one history file.
//!
//! The [`RecordTable`] keeps a [`RevisionRecord`] for every revision whose
//! fulltext is still needed, either because a blob was requested for it or
//! because another needed revision is derived from it. Records are removed as
//! soon as neither holds, and removal propagates down the chain of bases.

use std::mem;

use logging::trace_prune;
use rcs::RevisionMetadata;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EngineError, EngineResult};
use crate::revision::{Mark, RevisionId};
use crate::store::Handle;

/// What is known about one revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionRecord {
    id: RevisionId,
    mark: Option<Mark>,
    base: Option<RevisionId>,
    dependents: FxHashSet<RevisionId>,
    location: Option<Handle>,
    metadata: Option<RevisionMetadata>,
}

impl RevisionRecord {
    fn new(id: RevisionId) -> Self {
        Self {
            id,
            mark: None,
            base: None,
            dependents: FxHashSet::default(),
            location: None,
            metadata: None,
        }
    }

    /// The revision this record describes.
    #[must_use]
    pub const fn id(&self) -> &RevisionId {
        &self.id
    }

    /// Mark of a blob still to be written for this revision.
    #[must_use]
    pub const fn mark(&self) -> Option<&Mark> {
        self.mark.as_ref()
    }

    /// Revision whose fulltext the diff for this one applies to.
    #[must_use]
    pub const fn base(&self) -> Option<&RevisionId> {
        self.base.as_ref()
    }

    /// Revisions still waiting to be derived from this one.
    #[must_use]
    pub const fn dependents(&self) -> &FxHashSet<RevisionId> {
        &self.dependents
    }

    /// Where the fulltext has been persisted, if anywhere.
    #[must_use]
    pub const fn location(&self) -> Option<Handle> {
        self.location
    }

    /// Metadata from the history file's tree section.
    #[must_use]
    pub const fn metadata(&self) -> Option<&RevisionMetadata> {
        self.metadata.as_ref()
    }

    /// Whether the revision appeared in the tree section.
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.metadata.is_some()
    }

    /// A record is needed while it has a pending mark or any dependent.
    #[must_use]
    pub fn is_needed(&self) -> bool {
        self.mark.is_some() || !self.dependents.is_empty()
    }

    /// Whether the fulltext is stored somewhere and can be read back.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.location.is_some()
    }

    /// Records where the fulltext was written.
    pub fn set_location(&mut self, handle: Handle) {
        self.location = Some(handle);
    }

    /// Clears and returns the pending mark once its blob has been written.
    pub fn take_mark(&mut self) -> Option<Mark> {
        self.mark.take()
    }

    /// Stores the tree-section metadata.
    pub fn set_metadata(&mut self, metadata: RevisionMetadata) {
        self.metadata = Some(metadata);
    }
}

/// All records of the history file currently being processed.
#[derive(Debug, Default)]
pub struct RecordTable {
    records: FxHashMap<RevisionId, RevisionRecord>,
}

impl RecordTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Looks up a record.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RevisionRecord> {
        self.records.get(id)
    }

    /// Looks up a record for modification.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut RevisionRecord> {
        self.records.get_mut(id)
    }

    /// Iterates over all records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &RevisionRecord> {
        self.records.values()
    }

    /// Returns the record for `id`, creating an empty one if needed.
    pub fn get_or_create(&mut self, id: &RevisionId) -> &mut RevisionRecord {
        self.records
            .entry(id.clone())
            .or_insert_with(|| RevisionRecord::new(id.clone()))
    }

    /// Records that `dependent` is reconstructed by applying its diff to `base`.
    ///
    /// Registering the same edge twice is harmless. A dependent that already
    /// derives from a different base yields [`EngineError::ConflictingBase`].
    pub fn register_dependency(
        &mut self,
        base: &RevisionId,
        dependent: &RevisionId,
    ) -> EngineResult<()> {
        let record = self.get_or_create(dependent);
        if let Some(existing) = record.base.as_ref().filter(|existing| *existing != base) {
            return Err(EngineError::ConflictingBase {
                revision: dependent.clone(),
                existing: existing.clone(),
                requested: base.clone(),
            });
        }
        record.base = Some(base.clone());
        self.get_or_create(base).dependents.insert(dependent.clone());
        Ok(())
    }

    /// Requests a blob with `mark` for `id`.
    ///
    /// Requesting the same mark twice is harmless; a different one yields
    /// [`EngineError::DuplicateMark`].
    pub fn mark_needed(&mut self, id: &RevisionId, mark: Mark) -> EngineResult<()> {
        let record = self.get_or_create(id);
        if let Some(existing) = record.mark.as_ref().filter(|existing| **existing != mark) {
            return Err(EngineError::DuplicateMark {
                revision: id.clone(),
                existing: existing.clone(),
                requested: mark,
            });
        }
        record.mark = Some(mark);
        Ok(())
    }

    /// Deletes a record. Removing an absent id returns `None`.
    pub fn remove(&mut self, id: &str) -> Option<RevisionRecord> {
        self.records.remove(id)
    }

    /// Drops the edge from `base` to `dependent`.
    ///
    /// Returns whether an edge was removed. A base that no longer exists is
    /// not an error.
    pub fn release_dependent(&mut self, base: &str, dependent: &str) -> bool {
        self.records
            .get_mut(base)
            .is_some_and(|record| record.dependents.remove(dependent))
    }

    /// Removes every record that is not needed, then every base that becomes
    /// unneeded as a result. Returns the number of records removed.
    ///
    /// Runs once after the tree section and before any fulltext is built.
    pub fn prune(&mut self) -> usize {
        let worklist: Vec<RevisionId> = self
            .records
            .values()
            .filter(|record| !record.is_needed())
            .map(|record| record.id.clone())
            .collect();
        let removed = self.drain(worklist);
        trace_prune!("pruned {} records, {} remain", removed, self.records.len());
        removed
    }

    /// Removes `id` if it is no longer needed, propagating to its bases.
    /// Returns the number of records removed.
    pub fn remove_if_unneeded(&mut self, id: &str) -> usize {
        let unneeded = self.records.get(id).is_some_and(|record| !record.is_needed());
        if unneeded {
            self.drain(vec![RevisionId::from(id)])
        } else {
            0
        }
    }

    fn drain(&mut self, mut worklist: Vec<RevisionId>) -> usize {
        let mut removed = 0;
        while let Some(id) = worklist.pop() {
            let Some(mut record) = self.records.remove(&id) else {
                continue;
            };
            removed += 1;
            trace_prune!("removed {}", id);

            let Some(base) = mem::take(&mut record.base) else {
                continue;
            };
            if let Some(base_record) = self.records.get_mut(&base) {
                let was_needed = base_record.is_needed();
                base_record.dependents.remove(&id);
                if was_needed && !base_record.is_needed() {
                    worklist.push(base);
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> RevisionId {
        RevisionId::from(s)
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut table = RecordTable::new();
        table.get_or_create(&id("1.1"));
        table.get_or_create(&id("1.1"));
        assert_eq!(table.len(), 1);
        assert!(!table.get("1.1").unwrap().is_needed());
    }

    #[test]
    fn dependency_edges_are_recorded_both_ways() {
        let mut table = RecordTable::new();
        table.register_dependency(&id("1.2"), &id("1.1")).unwrap();
        table.register_dependency(&id("1.2"), &id("1.1")).unwrap();

        assert_eq!(table.get("1.1").unwrap().base(), Some(&id("1.2")));
        assert!(table.get("1.2").unwrap().dependents().contains("1.1"));
        assert!(table.get("1.2").unwrap().is_needed());
    }

    #[test]
    fn second_base_is_rejected() {
        let mut table = RecordTable::new();
        table.register_dependency(&id("1.2"), &id("1.1")).unwrap();
        let err = table.register_dependency(&id("1.3"), &id("1.1")).unwrap_err();
        assert!(matches!(err, EngineError::ConflictingBase { .. }));
    }

    #[test]
    fn marks_are_assigned_once() {
        let mut table = RecordTable::new();
        table.mark_needed(&id("1.1"), Mark::from(1)).unwrap();
        table.mark_needed(&id("1.1"), Mark::from(1)).unwrap();
        let err = table.mark_needed(&id("1.1"), Mark::from(2)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateMark { .. }));
    }

    #[test]
    fn removal_and_release_are_idempotent() {
        let mut table = RecordTable::new();
        table.register_dependency(&id("1.2"), &id("1.1")).unwrap();
        assert!(table.release_dependent("1.2", "1.1"));
        assert!(!table.release_dependent("1.2", "1.1"));
        assert!(table.remove("1.2").is_some());
        assert!(table.remove("1.2").is_none());
        assert!(!table.release_dependent("1.2", "1.1"));
    }

    #[test]
    fn prune_keeps_only_the_chain_to_marked_revisions() {
        // 1.3 -> 1.2 -> 1.1, with branch 1.2.2.1 off 1.2 and 1.2.2.2 after it.
        let mut table = RecordTable::new();
        table.register_dependency(&id("1.3"), &id("1.2")).unwrap();
        table.register_dependency(&id("1.2"), &id("1.1")).unwrap();
        table.register_dependency(&id("1.2"), &id("1.2.2.1")).unwrap();
        table.register_dependency(&id("1.2.2.1"), &id("1.2.2.2")).unwrap();
        table.mark_needed(&id("1.2.2.1"), Mark::from(5)).unwrap();

        let removed = table.prune();

        assert_eq!(removed, 2);
        assert!(table.contains("1.3"));
        assert!(table.contains("1.2"));
        assert!(table.contains("1.2.2.1"));
        assert!(!table.contains("1.1"));
        assert!(!table.contains("1.2.2.2"));
        assert_eq!(table.get("1.2").unwrap().dependents().len(), 1);
        assert_eq!(table.prune(), 0);
    }

    #[test]
    fn prune_without_marks_empties_the_table() {
        let mut table = RecordTable::new();
        table.register_dependency(&id("1.2"), &id("1.1")).unwrap();
        table.register_dependency(&id("1.1"), &id("1.1.1.1")).unwrap();
        assert_eq!(table.prune(), 3);
        assert!(table.is_empty());
    }

    #[test]
    fn remove_if_unneeded_propagates() {
        let mut table = RecordTable::new();
        table.register_dependency(&id("1.2"), &id("1.1")).unwrap();
        table.mark_needed(&id("1.1"), Mark::from(1)).unwrap();

        assert_eq!(table.remove_if_unneeded("1.1"), 0);
        table.get_mut("1.1").unwrap().take_mark();
        assert_eq!(table.remove_if_unneeded("1.1"), 2);
        assert!(table.is_empty());
    }

    /// Random forest: every revision `i > 0` may derive from some `j < i`.
    fn forest() -> impl Strategy<Value = (Vec<Option<usize>>, Vec<bool>)> {
        (1usize..24).prop_flat_map(|n| {
            let bases = (0..n)
                .map(|i| {
                    if i == 0 {
                        Just(None).boxed()
                    } else {
                        proptest::option::of(0..i).boxed()
                    }
                })
                .collect::<Vec<_>>();
            (bases, proptest::collection::vec(any::<bool>(), n))
        })
    }

    fn build(bases: &[Option<usize>], marked: &[bool]) -> RecordTable {
        let mut table = RecordTable::new();
        for (i, base) in bases.iter().enumerate() {
            let rev = id(&format!("r{i}"));
            table.get_or_create(&rev);
            if let Some(base) = base {
                table.register_dependency(&id(&format!("r{base}")), &rev).unwrap();
            }
            if marked[i] {
                table.mark_needed(&rev, Mark::from(i as u64)).unwrap();
            }
        }
        table
    }

    proptest! {
        #[test]
        fn prune_leaves_exactly_the_ancestors_of_marked_revisions(
            (bases, marked) in forest()
        ) {
            let mut table = build(&bases, &marked);
            let before = table.len();
            let removed = table.prune();

            let mut expected = vec![false; bases.len()];
            for (i, &is_marked) in marked.iter().enumerate() {
                let mut current = is_marked.then_some(i);
                while let Some(c) = current {
                    expected[c] = true;
                    current = bases[c];
                }
            }

            for (i, &keep) in expected.iter().enumerate() {
                prop_assert_eq!(table.contains(&format!("r{i}")), keep);
            }
            prop_assert_eq!(before - removed, table.len());
            prop_assert!(table.iter().all(RevisionRecord::is_needed));
            prop_assert_eq!(table.prune(), 0);
        }
    }
}
