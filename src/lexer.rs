//! Chumsky-based line lexer.
//!
//! The block parser is a per-line state machine, so the lexical unit here is
//! the logical line, not the character. [`normalize`] canonicalizes the raw
//! input first; [`split_lines`] then maps every byte of the normalized
//! buffer into exactly one [`Line`]. The lexer is infallible.

use chumsky::{extra, prelude::*};

/// A logical line of the normalized buffer: a byte range whose `end` is
/// exclusive and includes the terminating `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// Byte offset of the first character of the line.
    pub start: usize,
    /// Byte offset one past the terminating `\n`.
    pub end: usize,
}

impl Line {
    /// The line's text, including the terminating `\n`.
    #[must_use]
    pub fn slice<'a>(&self, buf: &'a str) -> &'a str {
        &buf[self.start..self.end]
    }
}

/// Canonicalize raw input for line splitting:
///
/// * `\r\n` collapses to `\n` (a lone `\r` is ordinary text),
/// * NUL becomes U+FFFD,
/// * non-empty input gains a trailing `\n` if it lacks one.
#[must_use]
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 1);
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {}
            '\0' => out.push('\u{FFFD}'),
            _ => out.push(c),
        }
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Split a normalized buffer into logical lines.
///
/// The buffer must come from [`normalize`], so it is either empty or ends
/// with `\n`; every byte lands in exactly one line.
#[must_use]
pub fn split_lines(buf: &str) -> Vec<Line> {
    lexer()
        .parse(buf)
        .into_output()
        .expect("infallible line lexer produced no output")
}

/// Build the chumsky line splitter.
fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<Line>, extra::Default> {
    let line = any()
        .filter(|c: &char| *c != '\n')
        .repeated()
        .then(just('\n'))
        .map_with(|_, e| {
            let span: SimpleSpan = e.span();
            Line {
                start: span.start,
                end: span.end,
            }
        });

    line.repeated().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: normalize then split, returning the line texts.
    fn lines(input: &str) -> Vec<String> {
        let buf = normalize(input);
        split_lines(&buf)
            .iter()
            .map(|l| l.slice(&buf).to_string())
            .collect()
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize(""), "");
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn trailing_newline_appended() {
        assert_eq!(lines("abc"), vec!["abc\n"]);
    }

    #[test]
    fn crlf_collapsed() {
        assert_eq!(lines("a\r\nb\r\n"), vec!["a\n", "b\n"]);
    }

    #[test]
    fn lone_cr_preserved() {
        assert_eq!(lines("a\rb"), vec!["a\rb\n"]);
    }

    #[test]
    fn nul_replaced() {
        assert_eq!(lines("a\0b"), vec!["a\u{FFFD}b\n"]);
    }

    #[test]
    fn blank_lines_kept() {
        assert_eq!(lines("a\n\nb\n"), vec!["a\n", "\n", "b\n"]);
    }

    #[test]
    fn line_offsets_cover_buffer() {
        let buf = normalize("one\ntwo\n");
        let ls = split_lines(&buf);
        assert_eq!(ls[0], Line { start: 0, end: 4 });
        assert_eq!(ls[1], Line { start: 4, end: 8 });
    }
}
