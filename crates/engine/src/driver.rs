//! Job stream processing.
//!
//! A run reads one job per history file from a JSON Lines stream:
//!
//! ```text
//! {"path": "repo/src/main.c,v", "marks": {"1.3": 17, "1.2": "18"}}
//! ```
//!
//! Each job is processed to completion before the next line is read. Every
//! job gets a fresh record table and scratch store; the blob stream is shared.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use logging::{trace_files, trace_stats};
use serde::Deserialize;

use crate::config::{BinarySuffixes, BlobConfig};
use crate::coordinator::{Coordinator, ReconstructionStats};
use crate::error::{EngineError, EngineResult};
use crate::revision::{Mark, RevisionId};
use crate::store::FulltextStore;

/// One history file and the revisions to emit from it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    /// Path of the `,v` file.
    pub path: PathBuf,
    /// Requested revisions and the mark each blob is written under.
    #[serde(default)]
    pub marks: BTreeMap<RevisionId, Mark>,
}

/// Iterator over the jobs of a JSON Lines stream.
///
/// Lines are read as bytes. Blank lines are skipped. A line that does not
/// decode, invalid UTF-8 included, yields [`EngineError::InvalidJob`] with its
/// one-based line number.
#[derive(Debug)]
pub struct JobReader<R> {
    reader: R,
    line: usize,
    buffer: Vec<u8>,
}

impl<R: BufRead> JobReader<R> {
    /// Reads jobs from `reader`.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: Vec::new(),
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for JobReader<R> {
    type Item = EngineResult<Job>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(err) => return Some(Err(err.into())),
            }
            let trimmed = self.buffer.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            return Some(
                serde_json::from_slice(trimmed).map_err(|source| EngineError::InvalidJob {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}

/// Totals for a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// History files processed.
    pub files: usize,
    /// Counters summed over every file.
    pub stats: ReconstructionStats,
}

/// Emits every blob requested by `job` into `blobs`.
///
/// Errors are wrapped with the history file path.
pub fn process_job<B>(
    job: Job,
    blobs: &mut FulltextStore<B>,
    config: &BlobConfig,
    binary: &BinarySuffixes,
) -> EngineResult<ReconstructionStats>
where
    B: Read + Write + Seek,
{
    let Job { path, marks } = job;
    run_file(&path, marks, blobs, config, binary).map_err(|err| err.in_file(&path))
}

fn run_file<B>(
    path: &Path,
    marks: BTreeMap<RevisionId, Mark>,
    blobs: &mut FulltextStore<B>,
    config: &BlobConfig,
    binary: &BinarySuffixes,
) -> EngineResult<ReconstructionStats>
where
    B: Read + Write + Seek,
{
    let file = File::open(path)?;
    let scratch = FulltextStore::scratch()?;
    let mut coordinator = Coordinator::new(path.to_string_lossy(), marks, blobs, scratch)?
        .with_keyword_handling(config.keyword_handling)
        .with_verbosity(config.verbosity.clone());
    if binary.matches(path) {
        trace_files!("{}: binary suffix, keywords left untouched", path.display());
        coordinator = coordinator.without_keywords();
    }

    rcs::parse(BufReader::new(file), &mut coordinator)?;
    Ok(*coordinator.stats())
}

/// Processes every job read from `input`, appending blobs to `blobs`.
///
/// Stops at the first error; blobs already written stay in the stream.
pub fn generate_blobs<R, B>(
    input: R,
    blobs: &mut FulltextStore<B>,
    config: &BlobConfig,
) -> EngineResult<RunSummary>
where
    R: BufRead,
    B: Read + Write + Seek,
{
    let binary = config.binary_matcher()?;
    let mut summary = RunSummary::default();

    for job in JobReader::new(input) {
        let job = job?;
        trace_files!("{}: {} marks", job.path.display(), job.marks.len());
        let stats = process_job(job, blobs, config, &binary)?;
        summary.files += 1;
        summary.stats.merge(&stats);
    }

    blobs.flush()?;
    trace_stats!(
        "{} files, {} blobs, {} bytes",
        summary.files,
        summary.stats.blobs_emitted,
        summary.stats.bytes_emitted
    );
    Ok(summary)
}
