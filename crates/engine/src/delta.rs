//! Application of RCS diff programs to fulltexts.
//!
//! An RCS deltatext is a sequence of edit commands:
//!
//! ```text
//! dN M    delete M lines starting at line N
//! aN M    append the M lines that follow after line N
//! ```
//!
//! Line numbers are one-based and always refer to the text the diff is
//! applied to, never to the partially edited result. Commands must therefore
//! appear in non-decreasing line order, and a delete never overlaps an
//! earlier command. The final line of a fulltext, or of an `a` payload, may
//! lack a trailing newline.

use std::borrow::Cow;

use keywords::{KeywordContext, KeywordHandling};
use thiserror::Error;

/// Errors produced while applying a diff program.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeltaError {
    /// A command line did not have the form `aN M` or `dN M`.
    #[error("line {line}: malformed command '{text}'")]
    MalformedCommand {
        /// One-based line in the diff program.
        line: usize,
        /// The offending line, lossily decoded.
        text: String,
    },
    /// A command refers to lines before the end of an earlier command.
    #[error("line {line}: command at text line {position} precedes already edited line {cursor}")]
    OutOfOrder {
        /// One-based line in the diff program.
        line: usize,
        /// Text line the command refers to.
        position: usize,
        /// Number of text lines already consumed.
        cursor: usize,
    },
    /// A command refers to lines past the end of the text.
    #[error("line {line}: range {start}+{count} exceeds text of {total} lines")]
    OutOfBounds {
        /// One-based line in the diff program.
        line: usize,
        /// First text line of the range.
        start: usize,
        /// Number of lines in the range.
        count: usize,
        /// Number of lines in the text.
        total: usize,
    },
    /// An `a` command announced more lines than the diff contains.
    #[error("line {line}: expected {expected} inserted lines, found {found}")]
    TruncatedInsert {
        /// One-based line in the diff program.
        line: usize,
        /// Lines announced by the command.
        expected: usize,
        /// Lines actually present.
        found: usize,
    },
}

/// Splits `text` into lines, each keeping its trailing `\n`.
fn lines(text: &[u8]) -> impl Iterator<Item = &[u8]> {
    text.split_inclusive(|&b| b == b'\n')
}

/// One parsed edit command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Append { after: usize, count: usize },
    Delete { start: usize, count: usize },
}

fn parse_command(raw: &[u8], line: usize) -> Result<Command, DeltaError> {
    let malformed = || DeltaError::MalformedCommand {
        line,
        text: String::from_utf8_lossy(raw).trim_end().to_owned(),
    };

    let body = raw.strip_suffix(b"\n").unwrap_or(raw);
    let (&op, rest) = body.split_first().ok_or_else(malformed)?;
    let rest = std::str::from_utf8(rest).map_err(|_| malformed())?;
    let (position, count) = rest.split_once(' ').ok_or_else(malformed)?;
    let position: usize = position.parse().map_err(|_| malformed())?;
    let count: usize = count.trim_end_matches('\r').parse().map_err(|_| malformed())?;

    match op {
        b'a' => Ok(Command::Append {
            after: position,
            count,
        }),
        b'd' if position > 0 => Ok(Command::Delete {
            start: position,
            count,
        }),
        _ => Err(malformed()),
    }
}

/// Counters describing one diff application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of `a` commands.
    pub appends: usize,
    /// Number of `d` commands.
    pub deletes: usize,
    /// Lines inserted.
    pub lines_added: usize,
    /// Lines removed.
    pub lines_deleted: usize,
}

/// Applies the diff program `diff` to `original`.
///
/// # Examples
///
/// ```
/// use engine::delta::apply_diff;
///
/// let original = b"one\ntwo\nthree\n";
/// let patched = apply_diff(original, b"d2 1\na3 1\nfour\n").unwrap();
/// assert_eq!(patched, b"one\nthree\nfour\n");
/// ```
pub fn apply_diff(original: &[u8], diff: &[u8]) -> Result<Vec<u8>, DeltaError> {
    apply_diff_with_summary(original, diff).map(|(text, _)| text)
}

/// Like [`apply_diff`], also reporting what the diff did.
pub fn apply_diff_with_summary(
    original: &[u8],
    diff: &[u8],
) -> Result<(Vec<u8>, DiffSummary), DeltaError> {
    let source: Vec<&[u8]> = lines(original).collect();
    let total = source.len();
    let mut out = Vec::with_capacity(original.len() + diff.len());
    let mut summary = DiffSummary::default();
    let mut cursor = 0usize;

    let mut program = lines(diff).enumerate().map(|(index, raw)| (index + 1, raw));
    while let Some((line, raw)) = program.next() {
        match parse_command(raw, line)? {
            Command::Delete { start, count } => {
                let first = start - 1;
                if first < cursor {
                    return Err(DeltaError::OutOfOrder {
                        line,
                        position: start,
                        cursor,
                    });
                }
                let end = first.checked_add(count).filter(|&end| end <= total).ok_or(
                    DeltaError::OutOfBounds {
                        line,
                        start,
                        count,
                        total,
                    },
                )?;
                source[cursor..first].iter().for_each(|l| out.extend_from_slice(l));
                cursor = end;
                summary.deletes += 1;
                summary.lines_deleted += count;
            }
            Command::Append { after, count } => {
                if after < cursor {
                    return Err(DeltaError::OutOfOrder {
                        line,
                        position: after,
                        cursor,
                    });
                }
                if after > total {
                    return Err(DeltaError::OutOfBounds {
                        line,
                        start: after,
                        count,
                        total,
                    });
                }
                source[cursor..after].iter().for_each(|l| out.extend_from_slice(l));
                cursor = after;

                let mut found = 0;
                while found < count {
                    let Some((_, payload)) = program.next() else {
                        return Err(DeltaError::TruncatedInsert {
                            line,
                            expected: count,
                            found,
                        });
                    };
                    out.extend_from_slice(payload);
                    found += 1;
                }
                summary.appends += 1;
                summary.lines_added += count;
            }
        }
    }

    source[cursor..].iter().for_each(|l| out.extend_from_slice(l));
    Ok((out, summary))
}

/// The complete contents of one revision, held in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fulltext {
    bytes: Vec<u8>,
}

impl Fulltext {
    /// Wraps raw bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The text as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of lines, counting a final unterminated line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        lines(&self.bytes).count()
    }

    /// Produces the text obtained by applying `diff` to this one.
    pub fn apply(&self, diff: &[u8]) -> Result<(Self, DiffSummary), DeltaError> {
        apply_diff_with_summary(&self.bytes, diff)
            .map(|(bytes, summary)| (Self::new(bytes), summary))
    }

    fn store(&mut self, rewritten: Option<Vec<u8>>) -> bool {
        match rewritten {
            Some(bytes) if bytes != self.bytes => {
                self.bytes = bytes;
                true
            }
            _ => false,
        }
    }

    /// Rewrites keyword markers in place as selected by `handling`.
    /// Returns whether the text changed.
    pub fn apply_keywords(
        &mut self,
        handling: KeywordHandling,
        context: &KeywordContext<'_>,
    ) -> bool {
        let rewritten = owned(handling.apply(&self.bytes, context));
        self.store(rewritten)
    }
}

fn owned(rewritten: Cow<'_, [u8]>) -> Option<Vec<u8>> {
    match rewritten {
        Cow::Borrowed(_) => None,
        Cow::Owned(bytes) => Some(bytes),
    }
}

impl From<Vec<u8>> for Fulltext {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for Fulltext {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(original: &str, diff: &str) -> Result<String, DeltaError> {
        apply_diff(original.as_bytes(), diff.as_bytes())
            .map(|bytes| String::from_utf8(bytes).expect("utf8"))
    }

    #[test]
    fn empty_diff_is_identity() {
        assert_eq!(apply("a\nb\n", "").unwrap(), "a\nb\n");
    }

    #[test]
    fn line_numbers_refer_to_the_original() {
        let original = "1\n2\n3\n4\n5\n";
        let diff = "d1 1\na2 2\nx\ny\nd4 2\na5 1\nz\n";
        assert_eq!(apply(original, diff).unwrap(), "2\nx\ny\n3\nz\n");
    }

    #[test]
    fn append_after_deleted_range() {
        assert_eq!(apply("a\nb\nc\n", "d2 1\na2 1\nB\n").unwrap(), "a\nB\nc\n");
    }

    #[test]
    fn insert_at_start_and_end() {
        assert_eq!(apply("m\n", "a0 1\nfirst\na1 1\nlast\n").unwrap(), "first\nm\nlast\n");
    }

    #[test]
    fn unterminated_last_lines_survive() {
        assert_eq!(apply("a\nb", "d1 1").unwrap(), "b");
        assert_eq!(apply("a\n", "a1 1\nno newline").unwrap(), "a\nno newline");
    }

    #[test]
    fn delete_everything() {
        assert_eq!(apply("a\nb\n", "d1 2\n").unwrap(), "");
    }

    #[test]
    fn out_of_bounds_delete() {
        assert_eq!(
            apply("a\n", "d1 2\n").unwrap_err(),
            DeltaError::OutOfBounds {
                line: 1,
                start: 1,
                count: 2,
                total: 1
            }
        );
        assert!(matches!(
            apply("a\n", "a3 1\nx\n").unwrap_err(),
            DeltaError::OutOfBounds { start: 3, .. }
        ));
    }

    #[test]
    fn overlapping_commands_are_rejected() {
        let err = apply("a\nb\nc\n", "d2 2\nd3 1\n").unwrap_err();
        assert_eq!(
            err,
            DeltaError::OutOfOrder {
                line: 2,
                position: 3,
                cursor: 3
            }
        );
        assert!(apply("a\nb\nc\n", "a2 1\nx\na1 1\ny\n").is_err());
    }

    #[test]
    fn malformed_commands() {
        for diff in ["x1 1\n", "d1\n", "dx 1\n", "d0 1\n", "a1 -1\n", "\n"] {
            assert!(
                matches!(apply("a\n", diff), Err(DeltaError::MalformedCommand { line: 1, .. })),
                "{diff:?}"
            );
        }
    }

    #[test]
    fn truncated_insert() {
        assert_eq!(
            apply("a\n", "a1 3\nx\ny\n").unwrap_err(),
            DeltaError::TruncatedInsert {
                line: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn summary_counts_lines() {
        let (_, summary) = apply_diff_with_summary(b"a\nb\nc\n", b"d1 2\na3 2\nx\ny\n").unwrap();
        assert_eq!(
            summary,
            DiffSummary {
                appends: 1,
                deletes: 1,
                lines_added: 2,
                lines_deleted: 2
            }
        );
    }

    #[test]
    fn fulltext_keyword_hooks() {
        let context = KeywordContext {
            rcs_path: "dir/f.c,v",
            revision: "1.3",
            timestamp: 0,
            author: "ann",
        };
        let mut text = Fulltext::from(b"$Revision$\nplain\n".to_vec());
        assert!(text.apply_keywords(KeywordHandling::Expanded, &context));
        assert_eq!(text.as_bytes(), b"$Revision: 1.3 $\nplain\n");
        assert!(!text.apply_keywords(KeywordHandling::Untouched, &context));
        assert!(text.apply_keywords(KeywordHandling::Collapsed, &context));
        assert_eq!(text.as_bytes(), b"$Revision$\nplain\n");
        assert!(!text.apply_keywords(KeywordHandling::Collapsed, &context));
        assert_eq!(text.line_count(), 2);
    }
}
