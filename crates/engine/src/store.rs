//! Append-only fulltext storage.
//!
//! A [`FulltextStore`] wraps a seekable file and only ever appends to it.
//! Each write returns a [`Handle`] naming the bytes just written; the handle
//! stays valid for the life of the store. Two kinds exist:
//!
//! - the scratch store, a nameless temporary file holding fulltexts that are
//!   needed later in the same history file but never emitted;
//! - the blob store, the output stream itself. Fulltexts emitted as blobs are
//!   read back from it when a later revision derives from them.
//!
//! # Blob records
//!
//! ```text
//! blob
//! mark :<mark>
//! data <length>
//! <fulltext bytes>
//! ```
//!
//! followed by a single newline. The handle returned for a blob addresses
//! the fulltext bytes only.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use logging::trace_store;

use crate::revision::Mark;

/// Which store a [`Handle`] points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Temporary spill file for the current history file.
    Scratch,
    /// The blob output stream.
    Blob,
}

impl StoreKind {
    /// Short name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scratch => "scratch",
            Self::Blob => "blob",
        }
    }
}

/// Location of a persisted fulltext.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    kind: StoreKind,
    offset: u64,
    length: u64,
}

impl Handle {
    /// Store the bytes live in.
    #[must_use]
    pub const fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Byte offset of the fulltext within the store.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the fulltext in bytes.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.length
    }
}

/// Append-only store over a seekable file.
#[derive(Debug)]
pub struct FulltextStore<F> {
    kind: StoreKind,
    file: F,
    end: u64,
}

impl FulltextStore<File> {
    /// Creates a scratch store backed by an anonymous temporary file.
    ///
    /// The file is removed by the operating system once the store is dropped.
    pub fn scratch() -> io::Result<Self> {
        Self::new(StoreKind::Scratch, tempfile::tempfile()?)
    }
}

impl<F: Read + Write + Seek> FulltextStore<F> {
    /// Wraps `file`, appending after any existing contents.
    pub fn new(kind: StoreKind, mut file: F) -> io::Result<Self> {
        let end = file.seek(SeekFrom::End(0))?;
        Ok(Self { kind, file, end })
    }

    /// Kind of this store.
    #[must_use]
    pub const fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Total number of bytes in the store.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == 0
    }

    fn append(&mut self, chunks: &[&[u8]]) -> io::Result<u64> {
        let start = self.end;
        self.file.seek(SeekFrom::Start(start))?;
        for chunk in chunks {
            self.file.write_all(chunk)?;
            self.end += chunk.len() as u64;
        }
        Ok(start)
    }

    /// Appends raw bytes.
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<Handle> {
        let offset = self.append(&[bytes])?;
        trace_store!(
            "{}: stored {} bytes at {}",
            self.kind.as_str(),
            bytes.len(),
            offset
        );
        Ok(Handle {
            kind: self.kind,
            offset,
            length: bytes.len() as u64,
        })
    }

    /// Appends a blob record for `bytes` under `mark`.
    ///
    /// The returned handle addresses the fulltext inside the record.
    pub fn write_as_blob(&mut self, mark: &Mark, bytes: &[u8]) -> io::Result<Handle> {
        let header = format!("blob\nmark :{mark}\ndata {}\n", bytes.len());
        let start = self.append(&[header.as_bytes(), bytes, b"\n"])?;
        Ok(Handle {
            kind: self.kind,
            offset: start + header.len() as u64,
            length: bytes.len() as u64,
        })
    }

    /// Reads back exactly the bytes named by `handle`.
    pub fn read(&mut self, handle: Handle) -> io::Result<Vec<u8>> {
        if handle.kind != self.kind {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "handle for the {} store used on the {} store",
                    handle.kind.as_str(),
                    self.kind.as_str()
                ),
            ));
        }
        let in_bounds = handle
            .offset
            .checked_add(handle.length)
            .is_some_and(|end| end <= self.end);
        if !in_bounds {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "handle points past the end of the store",
            ));
        }
        let length = usize::try_from(handle.length)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "fulltext too large"))?;

        self.file.seek(SeekFrom::Start(handle.offset))?;
        let mut bytes = vec![0u8; length];
        self.file.read_exact(&mut bytes)?;
        trace_store!(
            "{}: loaded {} bytes from {}",
            self.kind.as_str(),
            length,
            handle.offset
        );
        Ok(bytes)
    }

    /// Flushes buffered output.
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    /// Returns the underlying file.
    pub fn into_inner(self) -> F {
        self.file
    }
}
