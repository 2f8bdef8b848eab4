//! Reconstruction of requested fulltexts while an RCS file is parsed.
//!
//! # Overview
//!
//! [`Coordinator`] is the [`rcs::Sink`] that turns a stream of deltatexts into
//! blob records. The tree section tells it which revision derives from which;
//! it prunes everything no requested revision depends on, then rebuilds
//! fulltexts one deltatext at a time.
//!
//! # Design
//!
//! One fulltext, the *working* text, is held in memory between deltatexts.
//! RCS stores deltatexts so that most revisions derive from the one delivered
//! just before them, in which case the diff is applied to the working text
//! directly. When the working text is still needed by a revision further
//! away, it is spilled to the scratch store first. A revision whose base is
//! not the working text (the first revision on a branch, typically) has its
//! base reloaded from wherever it was persisted: the scratch store, or the
//! blob stream if the base was emitted.
//!
//! Records leave the table as soon as no pending mark or dependent needs
//! them, so nothing is persisted that will not be read again.
//!
//! # Invariants
//!
//! - At most one working fulltext is held, and at most two fulltexts are
//!   resident at any instant (a source text and the text derived from it).
//! - A revision's blob is written exactly once; its mark is cleared afterwards.
//! - A base is released only after the diff of its dependent was applied.

use std::cell::Cell;
use std::io::{Read, Seek, Write};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use keywords::{KeywordContext, KeywordHandling};
use logging::{
    DebugFlag, VerbosityConfig, trace_delta, trace_emit, trace_files, trace_keyword, trace_prune,
    trace_stats, trace_store,
};
use rcs::{RevisionMetadata, Sink};

use crate::delta::Fulltext;
use crate::error::{EngineError, EngineResult};
use crate::revision::{Mark, RevisionId};
use crate::store::{FulltextStore, Handle, StoreKind};
use crate::table::RecordTable;

/// Counters collected while reconstructing one history file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconstructionStats {
    /// Records removed by the pruning pass.
    pub pruned: usize,
    /// Diff programs applied.
    pub diffs_applied: usize,
    /// Fulltexts written to the scratch store.
    pub spills: usize,
    /// Base fulltexts read back from a store.
    pub reloads: usize,
    /// Blob records written.
    pub blobs_emitted: usize,
    /// Fulltext bytes written in blob records.
    pub bytes_emitted: u64,
    /// Most fulltexts held in memory at once.
    pub peak_resident: usize,
}

impl ReconstructionStats {
    /// Adds the counters of `other`, keeping the larger peak.
    pub fn merge(&mut self, other: &Self) {
        self.pruned += other.pruned;
        self.diffs_applied += other.diffs_applied;
        self.spills += other.spills;
        self.reloads += other.reloads;
        self.blobs_emitted += other.blobs_emitted;
        self.bytes_emitted += other.bytes_emitted;
        self.peak_resident = self.peak_resident.max(other.peak_resident);
    }
}

/// Count of fulltexts alive in memory, shared by every [`Resident`] of one
/// coordinator.
#[derive(Debug, Default)]
struct ResidentGauge {
    live: Cell<usize>,
    peak: Cell<usize>,
}

impl ResidentGauge {
    fn enter(&self) {
        let live = self.live.get() + 1;
        self.live.set(live);
        self.peak.set(self.peak.get().max(live));
    }

    fn leave(&self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

/// A fulltext counted by the gauge for as long as it is alive.
#[derive(Debug)]
struct Resident {
    text: Fulltext,
    gauge: Rc<ResidentGauge>,
}

impl Resident {
    fn new(text: Fulltext, gauge: &Rc<ResidentGauge>) -> Self {
        gauge.enter();
        Self {
            text,
            gauge: Rc::clone(gauge),
        }
    }
}

impl Deref for Resident {
    type Target = Fulltext;

    fn deref(&self) -> &Fulltext {
        &self.text
    }
}

impl DerefMut for Resident {
    fn deref_mut(&mut self) -> &mut Fulltext {
        &mut self.text
    }
}

impl Drop for Resident {
    fn drop(&mut self) {
        self.gauge.leave();
    }
}

/// Drives fulltext reconstruction for one history file.
///
/// `B` is the blob output stream, shared across files; `S` is the scratch
/// store, private to this file.
#[derive(Debug)]
pub struct Coordinator<'b, B, S> {
    rcs_path: String,
    table: RecordTable,
    working: Option<(RevisionId, Resident)>,
    gauge: Rc<ResidentGauge>,
    blobs: &'b mut FulltextStore<B>,
    scratch: FulltextStore<S>,
    keyword_handling: KeywordHandling,
    keywords_disabled: bool,
    verbosity: VerbosityConfig,
    stats: ReconstructionStats,
}

impl<'b, B, S> Coordinator<'b, B, S>
where
    B: Read + Write + Seek,
    S: Read + Write + Seek,
{
    /// Creates a coordinator for the history file at `rcs_path` that emits a
    /// blob for every `(revision, mark)` pair in `marks`.
    pub fn new<I>(
        rcs_path: impl Into<String>,
        marks: I,
        blobs: &'b mut FulltextStore<B>,
        scratch: FulltextStore<S>,
    ) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (RevisionId, Mark)>,
    {
        let mut table = RecordTable::new();
        for (revision, mark) in marks {
            table.mark_needed(&revision, mark)?;
        }
        Ok(Self {
            rcs_path: rcs_path.into(),
            table,
            working: None,
            gauge: Rc::default(),
            blobs,
            scratch,
            keyword_handling: KeywordHandling::default(),
            keywords_disabled: false,
            verbosity: VerbosityConfig::default(),
            stats: ReconstructionStats::default(),
        })
    }

    /// Selects how keyword markers are rewritten.
    #[must_use]
    pub const fn with_keyword_handling(mut self, handling: KeywordHandling) -> Self {
        self.keyword_handling = handling;
        self
    }

    /// Leaves keyword markers untouched regardless of the handling mode.
    #[must_use]
    pub const fn without_keywords(mut self) -> Self {
        self.keywords_disabled = true;
        self
    }

    /// Sets the verbosity used to gate costly diagnostics.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: VerbosityConfig) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Counters collected so far.
    #[must_use]
    pub const fn stats(&self) -> &ReconstructionStats {
        &self.stats
    }

    /// The record table.
    #[must_use]
    pub const fn table(&self) -> &RecordTable {
        &self.table
    }

    /// Whether keyword rewriting is off for this file.
    #[must_use]
    pub const fn keywords_disabled(&self) -> bool {
        self.keywords_disabled
    }

    /// Revision currently held as working fulltext.
    #[must_use]
    pub fn working_revision(&self) -> Option<&RevisionId> {
        self.working.as_ref().map(|(id, _)| id)
    }

    /// Returns the scratch store, consuming the coordinator.
    pub fn into_scratch(self) -> FulltextStore<S> {
        self.scratch
    }

    /// Writes `text` to the scratch store unless `id` is already persisted or
    /// no longer needed.
    fn persist_if_needed(&mut self, id: &str, text: &Fulltext) -> EngineResult<()> {
        let Some(record) = self.table.get_mut(id) else {
            return Ok(());
        };
        if !record.is_needed() || record.is_persisted() {
            return Ok(());
        }
        let handle = self.scratch.write(text.as_bytes())?;
        record.set_location(handle);
        self.stats.spills += 1;
        trace_store!(
            "spilled {} ({} bytes, {} dependents left)",
            id,
            text.len(),
            record.dependents().len()
        );
        Ok(())
    }

    fn resident(&self, text: Fulltext) -> Resident {
        Resident::new(text, &self.gauge)
    }

    fn load(&mut self, handle: Handle) -> EngineResult<Resident> {
        let bytes = match handle.kind() {
            StoreKind::Scratch => self.scratch.read(handle)?,
            StoreKind::Blob => self.blobs.read(handle)?,
        };
        self.stats.reloads += 1;
        Ok(self.resident(Fulltext::new(bytes)))
    }

    fn apply(
        &mut self,
        revision: &RevisionId,
        base: &Fulltext,
        diff: &[u8],
    ) -> EngineResult<Resident> {
        let (text, summary) = base
            .apply(diff)
            .map_err(|source| EngineError::MalformedDiff {
                revision: revision.clone(),
                source,
            })?;
        let text = self.resident(text);
        self.stats.diffs_applied += 1;
        if self.verbosity.debug_gte(DebugFlag::Delta, 1) {
            trace_delta!(
                "{}: {} appends (+{} lines), {} deletes (-{} lines), {} lines total",
                revision,
                summary.appends,
                summary.lines_added,
                summary.deletes,
                summary.lines_deleted,
                text.line_count()
            );
        }
        Ok(text)
    }

    /// Case where the base is the working fulltext.
    fn derive_from_working(
        &mut self,
        revision: &RevisionId,
        base_id: &RevisionId,
        base_text: Resident,
        diff: &[u8],
    ) -> EngineResult<Resident> {
        self.table.release_dependent(base_id.as_str(), revision.as_str());
        self.persist_if_needed(base_id.as_str(), &base_text)?;
        let text = self.apply(revision, &base_text, diff)?;
        drop(base_text);
        self.table.remove_if_unneeded(base_id.as_str());
        Ok(text)
    }

    /// Case where the base has to be read back from a store. The working
    /// fulltext, if any, is persisted and dropped first.
    fn derive_from_store(
        &mut self,
        revision: &RevisionId,
        base_id: &RevisionId,
        working: Option<(RevisionId, Resident)>,
        diff: &[u8],
    ) -> EngineResult<Resident> {
        if let Some((working_id, working_text)) = working {
            self.persist_if_needed(working_id.as_str(), &working_text)?;
            drop(working_text);
            self.table.remove_if_unneeded(working_id.as_str());
        }

        let handle = self
            .table
            .get(base_id.as_str())
            .and_then(|record| record.location())
            .ok_or_else(|| EngineError::MissingBase {
                revision: revision.clone(),
                base: base_id.clone(),
            })?;
        let base_text = self.load(handle)?;
        trace_store!(
            "reloaded {} from {} store for {}",
            base_id,
            handle.kind().as_str(),
            revision
        );

        let text = self.apply(revision, &base_text, diff)?;
        drop(base_text);
        self.table.release_dependent(base_id.as_str(), revision.as_str());
        self.table.remove_if_unneeded(base_id.as_str());
        Ok(text)
    }

    fn rewrite_keywords(&self, revision: &RevisionId, text: &mut Fulltext) {
        if self.keywords_disabled || self.keyword_handling == KeywordHandling::Untouched {
            return;
        }
        let metadata = self
            .table
            .get(revision.as_str())
            .and_then(|record| record.metadata());
        let context = KeywordContext {
            rcs_path: &self.rcs_path,
            revision: revision.as_str(),
            timestamp: metadata.map_or(0, |m| m.timestamp),
            author: metadata.map_or("", |m| m.author.as_str()),
        };
        if text.apply_keywords(self.keyword_handling, &context) {
            trace_keyword!("{}: keywords {}", revision, self.keyword_handling);
        }
    }

    fn emit_if_requested(&mut self, revision: &RevisionId, text: &Fulltext) -> EngineResult<()> {
        let Some(record) = self.table.get_mut(revision.as_str()) else {
            return Ok(());
        };
        let Some(mark) = record.take_mark() else {
            return Ok(());
        };
        let handle = self.blobs.write_as_blob(&mark, text.as_bytes())?;
        record.set_location(handle);
        self.stats.blobs_emitted += 1;
        self.stats.bytes_emitted += handle.length();
        trace_emit!("{} -> mark :{} ({} bytes)", revision, mark, handle.length());
        Ok(())
    }

    fn reconstruct(&mut self, revision: &RevisionId, text: Vec<u8>) -> EngineResult<()> {
        let Some(record) = self.table.get(revision.as_str()) else {
            trace_prune!("skipping unneeded revision {}", revision);
            return Ok(());
        };
        let base = record.base().cloned();

        let mut fulltext = match base {
            None => {
                if let Some((working, _)) = &self.working {
                    return Err(EngineError::UnexpectedRoot {
                        revision: revision.clone(),
                        working: working.clone(),
                    });
                }
                self.resident(Fulltext::new(text))
            }
            Some(base_id) => match self.working.take() {
                Some((working_id, working_text)) if working_id == base_id => {
                    self.derive_from_working(revision, &base_id, working_text, &text)?
                }
                working => self.derive_from_store(revision, &base_id, working, &text)?,
            },
        };

        self.rewrite_keywords(revision, &mut fulltext);
        self.emit_if_requested(revision, &fulltext)?;

        let needed = self
            .table
            .get(revision.as_str())
            .is_some_and(|record| record.is_needed());
        if needed {
            self.working = Some((revision.clone(), fulltext));
        } else {
            self.table.remove_if_unneeded(revision.as_str());
        }
        Ok(())
    }
}

impl<B, S> Sink for Coordinator<'_, B, S>
where
    B: Read + Write + Seek,
    S: Read + Write + Seek,
{
    type Error = EngineError;

    fn on_expansion(&mut self, mode: &str) -> EngineResult<()> {
        if matches!(mode, "b" | "o") {
            trace_keyword!("{}: expand @{}@, keywords left untouched", self.rcs_path, mode);
            self.keywords_disabled = true;
        }
        Ok(())
    }

    fn on_revision_metadata(&mut self, metadata: RevisionMetadata) -> EngineResult<()> {
        let id = RevisionId::from(metadata.revision.as_str());
        for dependent in metadata.next.iter().chain(&metadata.branches) {
            self.table
                .register_dependency(&id, &RevisionId::from(dependent.as_str()))?;
        }
        self.table.get_or_create(&id).set_metadata(metadata);
        Ok(())
    }

    fn on_tree_complete(&mut self) -> EngineResult<()> {
        let unknown: Vec<_> = self
            .table
            .iter()
            .filter(|record| !record.is_defined())
            .filter_map(|record| record.mark().map(|mark| (record.id(), mark)))
            .collect();
        if let Some((revision, mark)) = unknown.into_iter().min_by_key(|(id, _)| *id) {
            return Err(EngineError::UnknownRevision {
                revision: revision.clone(),
                mark: mark.clone(),
            });
        }

        self.stats.pruned = self.table.prune();
        Ok(())
    }

    fn on_revision_text(&mut self, revision: &str, _log: &[u8], text: Vec<u8>) -> EngineResult<()> {
        let result = self.reconstruct(&RevisionId::from(revision), text);
        self.stats.peak_resident = self.gauge.peak.get();
        result
    }

    fn on_parse_complete(&mut self) -> EngineResult<()> {
        self.working = None;

        let pending: Vec<_> = self
            .table
            .iter()
            .filter_map(|record| record.mark().map(|mark| (record.id(), mark)))
            .collect();
        if let Some((revision, mark)) = pending.into_iter().min_by_key(|(id, _)| *id) {
            return Err(EngineError::MissingOutputTarget {
                revision: revision.clone(),
                mark: mark.clone(),
            });
        }

        self.blobs.flush()?;
        let stats = &self.stats;
        trace_files!("{}: {} blobs", self.rcs_path, stats.blobs_emitted);
        trace_stats!(
            "{}: {} diffs applied, {} spills, {} reloads, {} bytes emitted, peak {} resident, {} pruned",
            self.rcs_path,
            stats.diffs_applied,
            stats.spills,
            stats.reloads,
            stats.bytes_emitted,
            stats.peak_resident,
            stats.pruned
        );
        Ok(())
    }
}
