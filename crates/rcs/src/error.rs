//! crates/rcs/src/error.rs
//!
//! Error types for RCS parsing.

use std::io;

use thiserror::Error;

/// Result type for RCS parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while tokenizing or parsing an RCS file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// I/O error occurred while reading the history file.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// The file ended in the middle of a construct.
    #[error("unexpected end of RCS file while reading {context}")]
    UnexpectedEof {
        /// What the parser was reading when input ran out.
        context: &'static str,
    },
    /// A token did not match the grammar.
    #[error("expected {expected} at byte {offset}, found {found}")]
    UnexpectedToken {
        /// Description of the expected token.
        expected: &'static str,
        /// Rendering of the token that was found.
        found: String,
        /// Byte offset of the offending token.
        offset: u64,
    },
    /// A `date` field could not be converted to a timestamp.
    #[error("invalid RCS date '{0}'")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn io_error_from_std_io_error() {
        let io_err = io::Error::new(ErrorKind::NotFound, "file not found");
        let err: ParseError = io_err.into();

        assert!(matches!(err, ParseError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn unexpected_token_names_offset() {
        let err = ParseError::UnexpectedToken {
            expected: "';'",
            found: "'head'".to_owned(),
            offset: 42,
        };

        assert!(err.to_string().contains("';'"));
        assert!(err.to_string().contains("byte 42"));
    }

    #[test]
    fn error_source_for_io() {
        use std::error::Error;

        let err: ParseError = io::Error::new(ErrorKind::PermissionDenied, "denied").into();
        assert!(err.source().is_some());
    }
}
