//! Run configuration.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use keywords::KeywordHandling;
use logging::VerbosityConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// File suffixes whose history files never get keyword rewriting.
pub const DEFAULT_BINARY_SUFFIXES: &[&str] = &[
    "avi", "cur", "ico", "gif", "jpg", "bmp", "png", "tif", "hlp", "cnt", "o", "obj", "class",
    "jar", "sys", "zip", "dll", "exe", "exp", "myi", "myd", "isd", "frm", "db", "book", "fm",
    "fts", "gid", "pdf", "ps", "pdb", "pdm", "doc", "tmp", "xls", "ppt", "msm", "rpm", "vsd",
    "tar", "gz", "gzip",
];

/// Settings shared by every job of a run.
///
/// Deserialised from a JSON file; missing fields take their defaults.
///
/// ```
/// use engine::BlobConfig;
/// use keywords::KeywordHandling;
///
/// let config = BlobConfig::from_reader(&br#"{"keyword_handling": "collapsed"}"#[..]).unwrap();
/// assert_eq!(config.keyword_handling, KeywordHandling::Collapsed);
/// assert!(config.binary_suffixes.iter().any(|s| s == "gif"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlobConfig {
    /// What to do with keyword markers in emitted fulltexts.
    pub keyword_handling: KeywordHandling,
    /// Suffixes (without the dot) of files treated as binary.
    pub binary_suffixes: Vec<String>,
    /// Diagnostic verbosity.
    pub verbosity: VerbosityConfig,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            keyword_handling: KeywordHandling::default(),
            binary_suffixes: DEFAULT_BINARY_SUFFIXES
                .iter()
                .map(|suffix| (*suffix).to_owned())
                .collect(),
            verbosity: VerbosityConfig::default(),
        }
    }
}

impl BlobConfig {
    /// Decodes a configuration from JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let file = File::open(path).map_err(|err| EngineError::from(err).in_file(path))?;
        Self::from_reader(BufReader::new(file)).map_err(|source| EngineError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compiles [`binary_suffixes`](Self::binary_suffixes) into a matcher.
    pub fn binary_matcher(&self) -> EngineResult<BinarySuffixes> {
        BinarySuffixes::new(&self.binary_suffixes)
    }
}

/// Matches history file paths against a list of binary suffixes.
///
/// A path matches suffix `gif` when it ends in `.gif,v`, ignoring case.
#[derive(Clone, Debug)]
pub struct BinarySuffixes {
    set: GlobSet,
}

impl BinarySuffixes {
    /// Compiles the given suffixes.
    pub fn new<S: AsRef<str>>(suffixes: &[S]) -> EngineResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for suffix in suffixes {
            let suffix = suffix.as_ref();
            let glob = GlobBuilder::new(&format!("*.{suffix},v"))
                .case_insensitive(true)
                .literal_separator(false)
                .build()
                .map_err(|source| EngineError::InvalidSuffix {
                    suffix: suffix.to_owned(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| EngineError::InvalidSuffix {
            suffix: suffixes
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(","),
            source,
        })?;
        Ok(Self { set })
    }

    /// Whether keyword rewriting is disabled for `path`.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }

    /// Number of compiled suffixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether no suffix was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
