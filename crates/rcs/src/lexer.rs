//! Byte-level tokenizer for the RCS file grammar.
//!
//! RCS files consist of whitespace-separated words (identifiers, revision
//! numbers, keywords), `@`-delimited strings in which `@@` stands for a
//! literal `@`, and the punctuation tokens `;` and `:`. The lexer pulls bytes
//! from a [`BufRead`] so deltatext bodies are never buffered twice.

use std::fmt;
use std::io::BufRead;

use crate::error::{ParseError, ParseResult};

/// A single lexical token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Identifier, keyword, or revision number.
    Word(String),
    /// Contents of an `@`-string with `@@` escapes resolved.
    String(Vec<u8>),
    /// `;`
    Semicolon,
    /// `:`
    Colon,
}

impl Token {
    /// Returns the word text when the token is a [`Token::Word`].
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Self::Word(word) => Some(word),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(word) => write!(f, "'{word}'"),
            Self::String(bytes) => write!(f, "string of {} bytes", bytes.len()),
            Self::Semicolon => f.write_str("';'"),
            Self::Colon => f.write_str("':'"),
        }
    }
}

const fn is_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b';' | b':' | b'@')
}

/// Pull-based tokenizer with one token of push-back.
pub struct Lexer<R> {
    reader: R,
    offset: u64,
    token_offset: u64,
    pushed_back: Option<(Token, u64)>,
}

impl<R: BufRead> Lexer<R> {
    /// Creates a lexer reading from `reader`.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            token_offset: 0,
            pushed_back: None,
        }
    }

    /// Byte offset at which the most recently returned token started.
    pub const fn token_offset(&self) -> u64 {
        self.token_offset
    }

    /// Returns a token to the stream; the next call to
    /// [`next_token`](Self::next_token) yields it again.
    pub fn push_back(&mut self, token: Token) {
        debug_assert!(self.pushed_back.is_none(), "only one token of push-back");
        self.pushed_back = Some((token, self.token_offset));
    }

    fn peek_byte(&mut self) -> ParseResult<Option<u8>> {
        let buf = self.reader.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn bump(&mut self, count: usize) {
        self.reader.consume(count);
        self.offset += count as u64;
    }

    fn skip_whitespace(&mut self) -> ParseResult<()> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let skipped = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let exhausted = skipped == buf.len();
            self.bump(skipped);
            if !exhausted {
                return Ok(());
            }
        }
    }

    /// Returns the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> ParseResult<Option<Token>> {
        if let Some((token, offset)) = self.pushed_back.take() {
            self.token_offset = offset;
            return Ok(Some(token));
        }

        self.skip_whitespace()?;
        self.token_offset = self.offset;

        let Some(first) = self.peek_byte()? else {
            return Ok(None);
        };

        match first {
            b';' => {
                self.bump(1);
                Ok(Some(Token::Semicolon))
            }
            b':' => {
                self.bump(1);
                Ok(Some(Token::Colon))
            }
            b'@' => {
                self.bump(1);
                self.read_string().map(|bytes| Some(Token::String(bytes)))
            }
            _ => self.read_word().map(|word| Some(Token::Word(word))),
        }
    }

    /// Returns the next token, failing with [`ParseError::UnexpectedEof`] at
    /// end of input.
    pub fn expect_token(&mut self, context: &'static str) -> ParseResult<Token> {
        self.next_token()?
            .ok_or(ParseError::UnexpectedEof { context })
    }

    fn read_word(&mut self) -> ParseResult<String> {
        let mut word = Vec::new();
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let len = buf.iter().take_while(|&&b| !is_delimiter(b)).count();
            word.extend_from_slice(&buf[..len]);
            let finished = len < buf.len();
            self.bump(len);
            if finished {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&word).into_owned())
    }

    /// Reads the body of an `@`-string; the opening `@` is already consumed.
    fn read_string(&mut self) -> ParseResult<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Err(ParseError::UnexpectedEof { context: "string" });
            }
            match buf.iter().position(|&b| b == b'@') {
                Some(pos) => {
                    bytes.extend_from_slice(&buf[..pos]);
                    self.bump(pos + 1);
                    if self.peek_byte()? == Some(b'@') {
                        bytes.push(b'@');
                        self.bump(1);
                    } else {
                        return Ok(bytes);
                    }
                }
                None => {
                    let len = buf.len();
                    bytes.extend_from_slice(buf);
                    self.bump(len);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(Cursor::new(input.to_vec()));
        let mut out = Vec::new();
        while let Some(token) = lexer.next_token().expect("lex") {
            out.push(token);
        }
        out
    }

    #[test]
    fn splits_words_and_punctuation() {
        assert_eq!(
            tokens(b"head\t1.2;\nsymbols v1:1.1;"),
            vec![
                Token::Word("head".into()),
                Token::Word("1.2".into()),
                Token::Semicolon,
                Token::Word("symbols".into()),
                Token::Word("v1".into()),
                Token::Colon,
                Token::Word("1.1".into()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn resolves_doubled_at_signs() {
        assert_eq!(
            tokens(b"@mail me@@example.com@ @@"),
            vec![
                Token::String(b"mail me@example.com".to_vec()),
                Token::String(Vec::new()),
            ]
        );
    }

    #[test]
    fn strings_survive_tiny_buffers() {
        let input = b"text @a@@b\nc@@@ next".to_vec();
        let mut lexer = Lexer::new(BufReader::with_capacity(1, Cursor::new(input)));
        assert_eq!(
            lexer.next_token().expect("lex"),
            Some(Token::Word("text".into()))
        );
        assert_eq!(
            lexer.next_token().expect("lex"),
            Some(Token::String(b"a@b\nc@".to_vec()))
        );
        assert_eq!(
            lexer.next_token().expect("lex"),
            Some(Token::Word("next".into()))
        );
        assert_eq!(lexer.next_token().expect("lex"), None);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new(Cursor::new(b"@never closed".to_vec()));
        let err = lexer.next_token().expect_err("eof");
        assert!(matches!(err, ParseError::UnexpectedEof { context: "string" }));
    }

    #[test]
    fn push_back_restores_offset() {
        let mut lexer = Lexer::new(Cursor::new(b"  alpha beta".to_vec()));
        lexer.expect_token("word").expect("alpha");
        assert_eq!(lexer.token_offset(), 2);
        let beta = lexer.expect_token("word").expect("beta");
        assert_eq!(lexer.token_offset(), 8);
        lexer.push_back(beta.clone());
        assert_eq!(lexer.next_token().expect("again"), Some(beta));
        assert_eq!(lexer.token_offset(), 8);
        assert_eq!(lexer.next_token().expect("eof"), None);
    }
}
