//! Common error types for the engine crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::delta::DeltaError;
use crate::revision::{Mark, RevisionId};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while reconstructing fulltexts and emitting blobs.
///
/// Every variant is fatal for the current history file. The driver stops the
/// whole run on the first error, since a blob stream with a gap would be read
/// downstream as valid data.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A revision was registered as the dependent of two different bases.
    #[error("revision {revision} already has base {existing}, cannot also derive from {requested}")]
    ConflictingBase {
        /// The dependent revision.
        revision: RevisionId,
        /// Base recorded first.
        existing: RevisionId,
        /// Base requested later.
        requested: RevisionId,
    },
    /// Two different marks were requested for one revision.
    #[error("revision {revision} already has mark :{existing}, cannot also use :{requested}")]
    DuplicateMark {
        /// The revision.
        revision: RevisionId,
        /// Mark recorded first.
        existing: Mark,
        /// Mark requested later.
        requested: Mark,
    },
    /// A revision's base fulltext is neither resident nor persisted.
    #[error("base {base} of revision {revision} is not available")]
    MissingBase {
        /// The revision being reconstructed.
        revision: RevisionId,
        /// Its base revision.
        base: RevisionId,
    },
    /// A second revision without a base arrived while a working fulltext was held.
    #[error("revision {revision} has no base but {working} is already being reconstructed")]
    UnexpectedRoot {
        /// The unexpected root revision.
        revision: RevisionId,
        /// The revision held as working fulltext.
        working: RevisionId,
    },
    /// A diff program could not be applied.
    #[error("malformed diff for revision {revision}: {source}")]
    MalformedDiff {
        /// The revision whose deltatext is malformed.
        revision: RevisionId,
        /// What went wrong.
        #[source]
        source: DeltaError,
    },
    /// A mark was requested for a revision the history file does not define.
    #[error("revision {revision} (mark :{mark}) is not defined in the history file")]
    UnknownRevision {
        /// The requested revision.
        revision: RevisionId,
        /// Its mark.
        mark: Mark,
    },
    /// Parsing finished with a requested blob still unwritten.
    #[error("no fulltext was produced for revision {revision} (mark :{mark})")]
    MissingOutputTarget {
        /// The revision that was never reconstructed.
        revision: RevisionId,
        /// Its mark.
        mark: Mark,
    },
    /// The history file could not be parsed.
    #[error(transparent)]
    Parse(#[from] rcs::ParseError),
    /// I/O error on a store or input stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A job line could not be decoded.
    #[error("invalid job on input line {line}: {source}")]
    InvalidJob {
        /// One-based input line number.
        line: usize,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// The configuration file could not be decoded.
    #[error("invalid configuration in {}: {source}", .path.display())]
    InvalidConfig {
        /// Configuration file path.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// A binary suffix could not be compiled into a glob.
    #[error("invalid binary suffix '{suffix}': {source}")]
    InvalidSuffix {
        /// The offending suffix.
        suffix: String,
        /// Glob compilation error.
        #[source]
        source: globset::Error,
    },
    /// An error attributed to a specific history or configuration file.
    #[error("{}: {source}", .path.display())]
    File {
        /// The file being processed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Attributes this error to `path`, unless it already is.
    #[must_use]
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::File { .. } | Self::InvalidConfig { .. } => self,
            other => Self::File {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, looking through [`EngineError::File`].
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::File { source, .. } => source.root(),
            other => other,
        }
    }
}
