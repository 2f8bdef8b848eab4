use std::borrow::Cow;

use time::OffsetDateTime;
use time::macros::format_description;

use crate::Keyword;

const NOT_SUPPORTED: &str = "not supported by cvs2svn";

/// State written by `$State$` and the identification keywords. Dead
/// revisions are never emitted, so every expanded revision reads as `Exp`.
const STATE: &str = "Exp";

/// Revision attributes substituted into expanded keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeywordContext<'a> {
    /// Path of the history file, including its `,v` suffix.
    pub rcs_path: &'a str,
    /// Dotted revision number.
    pub revision: &'a str,
    /// Commit time in seconds since the Unix epoch, UTC.
    pub timestamp: i64,
    /// Committer login.
    pub author: &'a str,
}

impl<'a> KeywordContext<'a> {
    /// Final component of [`rcs_path`](Self::rcs_path).
    #[must_use]
    pub fn basename(&self) -> &'a str {
        self.rcs_path.rsplit('/').next().unwrap_or(self.rcs_path)
    }

    fn datetime(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.timestamp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Commit time as `YYYY/MM/DD hh:mm:ss`.
    #[must_use]
    pub fn date(&self) -> String {
        self.datetime()
            .format(format_description!(
                "[year]/[month]/[day] [hour]:[minute]:[second]"
            ))
            .unwrap_or_default()
    }

    /// Commit time as used by mdoc pages, e.g. `October 18 1995`.
    #[must_use]
    pub fn mdocdate(&self) -> String {
        self.datetime()
            .format(format_description!(
                "[month repr:long] [day padding:none] [year]"
            ))
            .unwrap_or_default()
    }

    fn id_line(&self, file: &str) -> String {
        format!(
            "{file} {} {} {} {STATE}",
            self.revision,
            self.date(),
            self.author
        )
    }

    /// The value written between `$Keyword: ` and ` $`.
    #[must_use]
    pub fn value(&self, keyword: Keyword) -> Cow<'a, str> {
        match keyword {
            Keyword::Author => Cow::Borrowed(self.author),
            Keyword::Date => Cow::Owned(self.date()),
            Keyword::Header => Cow::Owned(self.id_line(self.rcs_path)),
            Keyword::Id | Keyword::OpenBsd => Cow::Owned(self.id_line(self.basename())),
            Keyword::Locker => Cow::Borrowed(""),
            Keyword::Log | Keyword::Name => Cow::Borrowed(NOT_SUPPORTED),
            Keyword::Mdocdate => Cow::Owned(self.mdocdate()),
            Keyword::RcsFile => Cow::Borrowed(self.basename()),
            Keyword::Revision => Cow::Borrowed(self.revision),
            Keyword::Source => Cow::Borrowed(self.rcs_path),
            Keyword::State => Cow::Borrowed(STATE),
        }
    }
}
