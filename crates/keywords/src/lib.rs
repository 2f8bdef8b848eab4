#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `keywords` rewrites RCS keyword markers such as `$Id$` or
//! `$Author: joe $` inside a reconstructed fulltext. [`expand_keywords`]
//! fills each marker with the value for a given revision, while
//! [`collapse_keywords`] strips every marker back to its bare `$Keyword$`
//! form. [`KeywordHandling`] selects between the two, or leaves the text
//! alone.
//!
//! # Design
//!
//! Occurrences are found by a hand-written scanner in [`scan`] rather than a
//! regular expression; the acceptance rules need look-behind and look-ahead
//! checks around the closing `$`. Values never contain a newline, so both
//! transforms preserve the number of lines in the text and reverse deltas
//! stay applicable to a rewritten fulltext.
//!
//! Rewriting allocates only when the text contains at least one occurrence.
//!
//! # Examples
//!
//! ```
//! use keywords::{KeywordContext, collapse_keywords, expand_keywords};
//!
//! let context = KeywordContext {
//!     rcs_path: "src/main.c,v",
//!     revision: "1.4",
//!     timestamp: 1_000_000_000,
//!     author: "alice",
//! };
//! let expanded = expand_keywords(b"/* $Revision$ */\n", &context);
//! assert_eq!(&*expanded, b"/* $Revision: 1.4 $ */\n");
//! assert_eq!(&*collapse_keywords(&expanded), b"/* $Revision$ */\n");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

mod context;
pub mod scan;

pub use context::KeywordContext;

/// The RCS keywords recognised inside fulltexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `$Author$`
    Author,
    /// `$Date$`
    Date,
    /// `$Header$`
    Header,
    /// `$Id$`
    Id,
    /// `$Locker$`
    Locker,
    /// `$Log$`
    Log,
    /// `$Mdocdate$`
    Mdocdate,
    /// `$Name$`
    Name,
    /// `$OpenBSD$`
    OpenBsd,
    /// `$RCSfile$`
    RcsFile,
    /// `$Revision$`
    Revision,
    /// `$Source$`
    Source,
    /// `$State$`
    State,
}

impl Keyword {
    /// Every keyword.
    pub const ALL: [Self; 13] = [
        Self::Author,
        Self::Date,
        Self::Header,
        Self::Id,
        Self::Locker,
        Self::Log,
        Self::Mdocdate,
        Self::Name,
        Self::OpenBsd,
        Self::RcsFile,
        Self::Revision,
        Self::Source,
        Self::State,
    ];

    /// Name as it appears between the dollar signs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Author => "Author",
            Self::Date => "Date",
            Self::Header => "Header",
            Self::Id => "Id",
            Self::Locker => "Locker",
            Self::Log => "Log",
            Self::Mdocdate => "Mdocdate",
            Self::Name => "Name",
            Self::OpenBsd => "OpenBSD",
            Self::RcsFile => "RCSfile",
            Self::Revision => "Revision",
            Self::Source => "Source",
            Self::State => "State",
        }
    }

    /// Looks up a keyword by its exact, case-sensitive name.
    #[must_use]
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|keyword| keyword.name().as_bytes() == name)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How keyword markers are treated in emitted fulltexts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum KeywordHandling {
    /// Fill each marker with the revision's value.
    #[default]
    Expanded,
    /// Reduce each marker to `$Keyword$`.
    Collapsed,
    /// Leave the text as stored in the history file.
    Untouched,
}

impl KeywordHandling {
    /// Name accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expanded => "expanded",
            Self::Collapsed => "collapsed",
            Self::Untouched => "untouched",
        }
    }

    /// Rewrites `text` according to this mode.
    #[must_use]
    pub fn apply<'t>(self, text: &'t [u8], context: &KeywordContext<'_>) -> Cow<'t, [u8]> {
        match self {
            Self::Expanded => expand_keywords(text, context),
            Self::Collapsed => collapse_keywords(text),
            Self::Untouched => Cow::Borrowed(text),
        }
    }
}

impl fmt::Display for KeywordHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`KeywordHandling`] name.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown keyword handling '{0}' (expected expanded, collapsed or untouched)")]
pub struct UnknownKeywordHandling(pub String);

impl FromStr for KeywordHandling {
    type Err = UnknownKeywordHandling;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expanded" => Ok(Self::Expanded),
            "collapsed" => Ok(Self::Collapsed),
            "untouched" => Ok(Self::Untouched),
            _ => Err(UnknownKeywordHandling(s.to_owned())),
        }
    }
}

fn rewrite<'t>(text: &'t [u8], mut replace: impl FnMut(Keyword, &mut Vec<u8>)) -> Cow<'t, [u8]> {
    let mut occurrences = scan::occurrences(text).peekable();
    if occurrences.peek().is_none() {
        return Cow::Borrowed(text);
    }

    let mut out = Vec::with_capacity(text.len() + 64);
    let mut copied = 0;
    for occurrence in occurrences {
        out.extend_from_slice(&text[copied..occurrence.start]);
        out.push(b'$');
        out.extend_from_slice(occurrence.keyword.name().as_bytes());
        replace(occurrence.keyword, &mut out);
        out.push(b'$');
        copied = occurrence.end;
    }
    out.extend_from_slice(&text[copied..]);
    Cow::Owned(out)
}

/// Expands every keyword occurrence to `$Keyword: value $`.
#[must_use]
pub fn expand_keywords<'t>(text: &'t [u8], context: &KeywordContext<'_>) -> Cow<'t, [u8]> {
    rewrite(text, |keyword, out| {
        out.extend_from_slice(b": ");
        out.extend_from_slice(context.value(keyword).as_bytes());
        out.push(b' ');
    })
}

/// Collapses every keyword occurrence to `$Keyword$`.
#[must_use]
pub fn collapse_keywords(text: &[u8]) -> Cow<'_, [u8]> {
    rewrite(text, |_, _| {})
}
