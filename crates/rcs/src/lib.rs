#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rcs` streams through an RCS history file (`,v` file) and reports what it
//! finds to a [`Sink`]. It understands the admin section (only `head` and
//! `expand` are surfaced, everything else is skipped), the tree of revision
//! metadata, the description, and the deltatexts. It does not interpret
//! diff programs; that is the job of the consumer.
//!
//! # Design
//!
//! [`parse`] reads from any [`BufRead`](std::io::BufRead) through a small
//! pull-based [`lexer`]. Callbacks are delivered in file order, so a sink
//! sees every [`RevisionMetadata`] before the first deltatext and can plan
//! its work in [`Sink::on_tree_complete`]. Sinks choose their own error type
//! as long as it can absorb a [`ParseError`]; the parser never swallows sink
//! errors.
//!
//! # Errors
//!
//! Grammar violations surface as [`ParseError::UnexpectedToken`] with the
//! byte offset of the offending token; truncated files surface as
//! [`ParseError::UnexpectedEof`].

mod date;
mod error;
pub mod lexer;
mod parser;
mod sink;

pub use date::parse_rcs_date;
pub use error::{ParseError, ParseResult};
pub use parser::parse;
pub use sink::{RevisionMetadata, Sink};
