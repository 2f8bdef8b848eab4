//! Callback interface the parser drives while streaming through a file.

use crate::error::ParseError;

/// Metadata from one entry of the RCS delta (tree) section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevisionMetadata {
    /// Revision number, e.g. `1.2.3.4`.
    pub revision: String,
    /// Commit time as seconds since the Unix epoch (UTC).
    pub timestamp: i64,
    /// Login of the committer.
    pub author: String,
    /// Revision state, usually `Exp` or `dead`.
    pub state: String,
    /// First revisions of the branches sprouting from this revision.
    pub branches: Vec<String>,
    /// Next revision in the physical delta chain.
    pub next: Option<String>,
}

/// Receiver of parse events.
///
/// The parser calls the methods in file order:
///
/// 1. [`on_admin_head`](Self::on_admin_head) and
///    [`on_expansion`](Self::on_expansion) while reading the admin section,
/// 2. [`on_revision_metadata`](Self::on_revision_metadata) once per delta,
/// 3. [`on_tree_complete`](Self::on_tree_complete) after the last delta,
/// 4. [`on_revision_text`](Self::on_revision_text) once per deltatext, in the
///    order the deltatexts are stored,
/// 5. [`on_parse_complete`](Self::on_parse_complete) at end of file.
///
/// Returning an error from any callback stops parsing and the error is
/// returned from [`parse`](crate::parse) unchanged.
pub trait Sink {
    /// Error type produced by the sink; parser errors convert into it.
    type Error: From<ParseError>;

    /// Reports the `head` revision of the file, if any.
    fn on_admin_head(&mut self, _head: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Reports the value of the `expand` admin header (e.g. `kv`, `b`, `o`).
    fn on_expansion(&mut self, _mode: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Reports one revision's tree metadata.
    fn on_revision_metadata(&mut self, metadata: RevisionMetadata) -> Result<(), Self::Error>;

    /// Called once all revision metadata has been delivered.
    fn on_tree_complete(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Reports one revision's log message and delta text.
    ///
    /// For the head revision of the trunk the text is the full file content;
    /// for every other revision it is a diff program against its base.
    fn on_revision_text(
        &mut self,
        revision: &str,
        log: &[u8],
        text: Vec<u8>,
    ) -> Result<(), Self::Error>;

    /// Called once the whole file has been parsed.
    fn on_parse_complete(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
