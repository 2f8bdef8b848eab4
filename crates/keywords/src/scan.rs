//! Locating keyword occurrences inside a fulltext.
//!
//! An occurrence starts with `$`, followed by a keyword name that forms a
//! whole word, an optional value, and a closing `$`. The rules below keep
//! shell and Perl snippets such as `"$Name eq ..."` or `$(L_CRYPTO)` from
//! being mistaken for keywords:
//!
//! - the name must not be followed by whitespace and then `$`;
//! - the value must not contain `"`, `&`, `'`, `$`, or a newline;
//! - the byte before the closing `$` must not be `.` or `\`;
//! - the closing `$` must be followed by a non-word byte, or by a word byte
//!   and a whitespace run that contains a newline.

use crate::Keyword;

/// One keyword occurrence, as a half-open byte range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occurrence {
    /// Offset of the opening `$`.
    pub start: usize,
    /// Offset one past the closing `$`.
    pub end: usize,
    /// The keyword found.
    pub keyword: Keyword,
}

const fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

const fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

const fn ends_value(byte: u8) -> bool {
    matches!(byte, b'"' | b'&' | b'$' | b'\'' | b'\n')
}

fn run_len(text: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> usize {
    text.get(from..)
        .map_or(0, |rest| rest.iter().take_while(|&&b| pred(b)).count())
}

/// Tries to match a keyword occurrence whose `$` sits at `start`.
fn match_at(text: &[u8], start: usize) -> Option<Occurrence> {
    let name_start = start + 1;
    let name_end = name_start + run_len(text, name_start, is_word);
    let keyword = Keyword::from_name(&text[name_start..name_end])?;

    let spaces = run_len(text, name_end, is_space);
    if spaces > 0 && text.get(name_end + spaces) == Some(&b'$') {
        return None;
    }

    let close = name_end + run_len(text, name_end, |b| !ends_value(b));
    if text.get(close) != Some(&b'$') {
        return None;
    }
    if matches!(text[close - 1], b'.' | b'\\') {
        return None;
    }

    let end = close + 1;
    let accepted = match text.get(end) {
        None => false,
        Some(&next) if !is_word(next) => true,
        Some(_) => text[end + 1..]
            .iter()
            .take_while(|&&b| is_space(b))
            .any(|&b| b == b'\n'),
    };

    accepted.then_some(Occurrence {
        start,
        end,
        keyword,
    })
}

/// Iterator over the non-overlapping keyword occurrences of a text.
pub struct Occurrences<'a> {
    text: &'a [u8],
    pos: usize,
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        while self.pos < self.text.len() {
            let offset = self.text[self.pos..].iter().position(|&b| b == b'$')?;
            let dollar = self.pos + offset;
            if let Some(found) = match_at(self.text, dollar) {
                self.pos = found.end;
                return Some(found);
            }
            self.pos = dollar + 1;
        }
        None
    }
}

/// Returns the keyword occurrences in `text`, left to right.
pub fn occurrences(text: &[u8]) -> Occurrences<'_> {
    Occurrences { text, pos: 0 }
}
