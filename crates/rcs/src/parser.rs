//! Recursive-descent parser for the RCS file grammar.

use std::io::BufRead;

use logging::trace_rcs;

use crate::date::parse_rcs_date;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Token};
use crate::sink::{RevisionMetadata, Sink};

/// Parses an RCS file from `reader`, reporting its contents to `sink`.
///
/// Parsing stops at the first grammar error or the first error returned by
/// the sink.
///
/// # Examples
///
/// ```
/// use rcs::{RevisionMetadata, Sink, ParseError, parse};
///
/// #[derive(Default)]
/// struct Revisions(Vec<String>);
///
/// impl Sink for Revisions {
///     type Error = ParseError;
///
///     fn on_revision_metadata(&mut self, meta: RevisionMetadata) -> Result<(), ParseError> {
///         self.0.push(meta.revision);
///         Ok(())
///     }
///
///     fn on_revision_text(&mut self, _: &str, _: &[u8], _: Vec<u8>) -> Result<(), ParseError> {
///         Ok(())
///     }
/// }
///
/// let file = b"head 1.1; access; symbols; locks; strict;\n\
///     1.1 date 2004.01.01.00.00.00; author joe; state Exp; branches; next ;\n\
///     desc @@\n\
///     1.1 log @initial@ text @hello\n@\n";
///
/// let mut sink = Revisions::default();
/// parse(&file[..], &mut sink)?;
/// assert_eq!(sink.0, vec!["1.1".to_string()]);
/// # Ok::<(), ParseError>(())
/// ```
pub fn parse<R, S>(reader: R, sink: &mut S) -> Result<(), S::Error>
where
    R: BufRead,
    S: Sink + ?Sized,
{
    Parser {
        lexer: Lexer::new(reader),
    }
    .run(sink)
}

fn is_revision_number(word: &str) -> bool {
    word.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

struct Parser<R> {
    lexer: Lexer<R>,
}

impl<R: BufRead> Parser<R> {
    fn run<S: Sink + ?Sized>(mut self, sink: &mut S) -> Result<(), S::Error> {
        self.admin_section(sink)?;

        let mut revisions = 0usize;
        while let Some(metadata) = self.delta_entry()? {
            revisions += 1;
            sink.on_revision_metadata(metadata)?;
        }
        trace_rcs!("tree section complete: {} revisions", revisions);
        sink.on_tree_complete()?;

        self.expect_string("description")?;

        while let Some(token) = self.lexer.next_token()? {
            let revision = self.word_or_error(token, "deltatext revision")?;
            self.expect_keyword("log")?;
            let log = self.expect_string("log message")?;
            let text = self.deltatext_body()?;
            trace_rcs!("deltatext {}: {} bytes", revision, text.len());
            sink.on_revision_text(&revision, &log, text)?;
        }

        sink.on_parse_complete()
    }

    fn unexpected(&self, expected: &'static str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: found.to_string(),
            offset: self.lexer.token_offset(),
        }
    }

    fn word_or_error(&self, token: Token, expected: &'static str) -> ParseResult<String> {
        match token {
            Token::Word(word) => Ok(word),
            other => Err(self.unexpected(expected, &other)),
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> ParseResult<()> {
        let token = self.lexer.expect_token(keyword)?;
        if token.as_word() == Some(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword, &token))
        }
    }

    fn expect_string(&mut self, context: &'static str) -> ParseResult<Vec<u8>> {
        match self.lexer.expect_token(context)? {
            Token::String(bytes) => Ok(bytes),
            other => Err(self.unexpected("'@'-string", &other)),
        }
    }

    /// Reads the values of a phrase up to and including its `;`.
    fn phrase_values(&mut self, context: &'static str) -> ParseResult<Vec<Token>> {
        let mut values = Vec::new();
        loop {
            match self.lexer.expect_token(context)? {
                Token::Semicolon => return Ok(values),
                token => values.push(token),
            }
        }
    }

    fn admin_section<S: Sink + ?Sized>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        loop {
            let token = self.lexer.expect_token("admin section")?;
            let keyword = self.word_or_error(token, "admin keyword")?;
            if keyword == "desc" || is_revision_number(&keyword) {
                self.lexer.push_back(Token::Word(keyword));
                return Ok(());
            }

            let values = self.phrase_values("admin phrase")?;
            match (keyword.as_str(), values.first()) {
                ("head", Some(Token::Word(head))) => sink.on_admin_head(head)?,
                ("expand", Some(Token::String(mode))) => {
                    sink.on_expansion(&String::from_utf8_lossy(mode))?;
                }
                _ => {}
            }
        }
    }

    /// Parses one delta entry, or returns `None` once `desc` is reached.
    fn delta_entry(&mut self) -> ParseResult<Option<RevisionMetadata>> {
        let token = self.lexer.expect_token("delta section")?;
        let revision = self.word_or_error(token, "revision number")?;
        if revision == "desc" {
            return Ok(None);
        }
        if !is_revision_number(&revision) {
            return Err(self.unexpected("revision number", &Token::Word(revision)));
        }

        let mut metadata = RevisionMetadata {
            revision,
            ..RevisionMetadata::default()
        };

        loop {
            let token = self.lexer.expect_token("delta entry")?;
            let keyword = self.word_or_error(token, "delta keyword")?;
            if keyword == "desc" || is_revision_number(&keyword) {
                self.lexer.push_back(Token::Word(keyword));
                break;
            }

            let values = self.phrase_values("delta phrase")?;
            let mut words = values.into_iter().filter_map(|token| match token {
                Token::Word(word) => Some(word),
                _ => None,
            });
            match keyword.as_str() {
                "date" => {
                    let field = words.next().unwrap_or_default();
                    metadata.timestamp = parse_rcs_date(&field)?;
                }
                "author" => metadata.author = words.next().unwrap_or_default(),
                "state" => metadata.state = words.next().unwrap_or_default(),
                "branches" => metadata.branches = words.collect(),
                "next" => metadata.next = words.next(),
                _ => {}
            }
        }

        Ok(Some(metadata))
    }

    /// Reads optional newphrases followed by `text @...@`.
    fn deltatext_body(&mut self) -> ParseResult<Vec<u8>> {
        loop {
            let token = self.lexer.expect_token("deltatext")?;
            let keyword = self.word_or_error(token, "'text'")?;
            if keyword == "text" {
                return self.expect_string("delta text");
            }
            self.phrase_values("deltatext phrase")?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        head: Option<String>,
        expansion: Option<String>,
        events: Vec<String>,
        metadata: Vec<RevisionMetadata>,
        texts: Vec<(String, Vec<u8>, Vec<u8>)>,
        fail_on_text: bool,
    }

    impl Sink for Recorder {
        type Error = ParseError;

        fn on_admin_head(&mut self, head: &str) -> Result<(), ParseError> {
            self.head = Some(head.to_owned());
            Ok(())
        }

        fn on_expansion(&mut self, mode: &str) -> Result<(), ParseError> {
            self.expansion = Some(mode.to_owned());
            Ok(())
        }

        fn on_revision_metadata(&mut self, metadata: RevisionMetadata) -> Result<(), ParseError> {
            self.events.push(format!("meta {}", metadata.revision));
            self.metadata.push(metadata);
            Ok(())
        }

        fn on_tree_complete(&mut self) -> Result<(), ParseError> {
            self.events.push("tree".to_owned());
            Ok(())
        }

        fn on_revision_text(
            &mut self,
            revision: &str,
            log: &[u8],
            text: Vec<u8>,
        ) -> Result<(), ParseError> {
            if self.fail_on_text {
                return Err(ParseError::InvalidDate("sink refused".to_owned()));
            }
            self.events.push(format!("text {revision}"));
            self.texts.push((revision.to_owned(), log.to_vec(), text));
            Ok(())
        }

        fn on_parse_complete(&mut self) -> Result<(), ParseError> {
            self.events.push("complete".to_owned());
            Ok(())
        }
    }

    const BRANCHED: &[u8] = b"head\t1.2;
access;
symbols
\tbranch:1.1.0.2 release:1.1;
locks; strict;
comment\t@# @;
expand\t@kv@;


1.2
date\t2004.03.15.10.20.30;\tauthor alice;\tstate Exp;
branches;
next\t1.1;
commitid\tabc123;

1.1
date\t95.10.18.08.38.49;\tauthor bob;\tstate Exp;
branches
\t1.1.2.1;
next\t;

1.1.2.1
date\t2004.03.16.00.00.00;\tauthor carol;\tstate dead;
branches;
next\t;


desc
@a test file@


1.2
log
@second@@
@
text
@A
B
@


1.1
log
@initial
@
text
@d2 1
@


1.1.2.1
log
@branch
@
commitid\tdef456;
text
@a1 1
C
@
";

    #[test]
    fn parses_admin_tree_and_deltatexts_in_order() {
        let mut sink = Recorder::default();
        parse(BRANCHED, &mut sink).expect("parse");

        assert_eq!(sink.head.as_deref(), Some("1.2"));
        assert_eq!(sink.expansion.as_deref(), Some("kv"));
        assert_eq!(
            sink.events,
            vec![
                "meta 1.2",
                "meta 1.1",
                "meta 1.1.2.1",
                "tree",
                "text 1.2",
                "text 1.1",
                "text 1.1.2.1",
                "complete",
            ]
        );
    }

    #[test]
    fn delta_metadata_is_decoded() {
        let mut sink = Recorder::default();
        parse(BRANCHED, &mut sink).expect("parse");

        let head = &sink.metadata[0];
        assert_eq!(head.author, "alice");
        assert_eq!(head.state, "Exp");
        assert_eq!(head.next.as_deref(), Some("1.1"));
        assert!(head.branches.is_empty());

        let base = &sink.metadata[1];
        assert_eq!(base.timestamp, 814_005_529);
        assert_eq!(base.branches, vec!["1.1.2.1".to_owned()]);
        assert_eq!(base.next, None);

        assert_eq!(sink.metadata[2].state, "dead");
    }

    #[test]
    fn deltatext_strings_are_unescaped() {
        let mut sink = Recorder::default();
        parse(BRANCHED, &mut sink).expect("parse");

        assert_eq!(sink.texts[0].1, b"second@\n");
        assert_eq!(sink.texts[0].2, b"A\nB\n");
        assert_eq!(sink.texts[2].2, b"a1 1\nC\n");
    }

    #[test]
    fn sink_errors_stop_parsing() {
        let mut sink = Recorder {
            fail_on_text: true,
            ..Recorder::default()
        };
        let err = parse(BRANCHED, &mut sink).expect_err("sink error");
        assert!(err.to_string().contains("sink refused"));
        assert_eq!(sink.events.last().map(String::as_str), Some("tree"));
    }

    #[test]
    fn truncated_file_reports_context() {
        let truncated = &BRANCHED[..BRANCHED.len() / 3];
        let mut sink = Recorder::default();
        let err = parse(truncated, &mut sink).expect_err("truncated");
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn garbage_in_delta_section_is_rejected() {
        let input = b"head 1.1;\n1.1 date 2004.01.01.00.00.00; author a; state Exp; branches; next;\n@oops@";
        let mut sink = Recorder::default();
        let err = parse(&input[..], &mut sink).expect_err("garbage");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn empty_head_is_allowed() {
        let input = b"head ;\naccess;\nsymbols;\nlocks;\ndesc\n@@\n";
        let mut sink = Recorder::default();
        parse(&input[..], &mut sink).expect("parse");
        assert_eq!(sink.head, None);
        assert_eq!(sink.events, vec!["tree", "complete"]);
    }
}
