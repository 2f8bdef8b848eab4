#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` rebuilds the fulltexts of selected revisions from an RCS history
//! file and writes each one to a blob stream under a caller-chosen mark. RCS
//! keeps only the head revision of the trunk in full; every other revision
//! is a reverse delta against a neighbour. The engine walks those deltas in
//! file order while holding as little as possible in memory.
//!
//! # Design
//!
//! - [`delta`] applies one diff program to a fulltext.
//! - [`table`] tracks, per revision, its base, its dependents, the mark it
//!   must be emitted under and where its fulltext was persisted.
//! - [`store`] is the append-only storage behind those locations: a scratch
//!   file per history file and the shared blob stream.
//! - [`coordinator`] is the [`rcs::Sink`] tying the pieces together.
//! - [`driver`] reads the JSON Lines job stream and runs one coordinator per
//!   history file.
//!
//! # Errors
//!
//! Every failure is an [`EngineError`]. Errors abort the run: a blob stream
//! with a missing record would be read downstream as complete. Errors raised
//! while processing a history file carry its path via
//! [`EngineError::File`].
//!
//! # Examples
//!
//! ```
//! use engine::delta::apply_diff;
//!
//! let head = b"one\ntwo\nthree\n";
//! let previous = apply_diff(head, b"d2 1\na3 1\n3b\n").unwrap();
//! assert_eq!(previous, b"one\nthree\n3b\n");
//! ```

pub mod config;
pub mod coordinator;
pub mod delta;
pub mod driver;
mod error;
pub mod revision;
pub mod store;
pub mod table;

pub use config::{BinarySuffixes, BlobConfig, DEFAULT_BINARY_SUFFIXES};
pub use coordinator::{Coordinator, ReconstructionStats};
pub use delta::{DeltaError, DiffSummary, Fulltext, apply_diff};
pub use driver::{Job, JobReader, RunSummary, generate_blobs, process_job};
pub use error::{EngineError, EngineResult};
pub use revision::{Mark, RevisionId};
pub use store::{FulltextStore, Handle, StoreKind};
pub use table::{RecordTable, RevisionRecord};
