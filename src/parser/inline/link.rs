//! Links, images, and the link reference definition map.
//!
//! Open brackets go on a stack as plain `[` / `![` text nodes; on `]` the
//! closer tries an inline link, then the reference forms. A match relabels
//! the opener's text node into the link or image in place and pulls the
//! nodes after it in as children.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{NodeData, NodeId};

use super::InlineParser;

static LINK_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(?:[^\\\[\]]|\\.){0,1000}\]").unwrap());
static ANGLE_DESTINATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(?:[^<>\n\\\x00]|\\.)*>").unwrap());
static LINK_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:"(?:\\.|[^"\x00])*"|'(?:\\.|[^'\x00])*'|\((?:\\.|[^()\x00])*\))"#).unwrap()
});
static SPACE_AT_EOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *(?:\n|$)").unwrap());

/// One entry on the bracket stack.
#[derive(Debug)]
pub(super) struct Bracket {
    /// The `[` / `![` text node, relabeled on match.
    pub node: NodeId,
    /// Subject offset just past the opening bracket.
    pub position: usize,
    pub image: bool,
    /// Cleared when an enclosing link matches; links do not nest.
    pub active: bool,
    /// Whether another bracket opened after this one (blocks the
    /// collapsed/shortcut reference forms).
    pub bracket_after: bool,
    /// Delimiter stack top at push time, the emphasis floor for this
    /// bracket's content.
    pub delim_bottom: Option<usize>,
}

/// A resolved link reference definition.
#[derive(Debug, Clone)]
pub(in crate::parser) struct RefDef {
    pub destination: String,
    pub title: Option<String>,
}

/// Link reference definitions by normalized label. The first definition of
/// a label wins.
#[derive(Debug, Default)]
pub(in crate::parser) struct RefMap {
    defs: HashMap<String, RefDef>,
}

impl RefMap {
    pub(in crate::parser) fn new() -> Self {
        Self::default()
    }

    fn define(&mut self, label: &str, def: RefDef) {
        self.defs.entry(normalize_label(label)).or_insert(def);
    }

    fn lookup(&self, label: &str) -> Option<&RefDef> {
        self.defs.get(&normalize_label(label))
    }
}

/// Case-fold a reference label and collapse its internal whitespace.
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse one link reference definition at the start of `s` into `refmap`,
/// returning the number of bytes consumed (0 if `s` does not start with a
/// valid definition).
pub(in crate::parser) fn parse_reference(s: &str, refmap: &mut RefMap) -> usize {
    let mut sc = Scanner { s, pos: 0 };
    let label_len = sc.link_label();
    if label_len == 0 {
        return 0;
    }
    let raw_label = &s[1..label_len - 1];
    if sc.peek() != Some(b':') {
        return 0;
    }
    sc.pos += 1;
    sc.spnl();
    let Some(dest) = sc.link_destination() else {
        return 0;
    };

    let before_title = sc.pos;
    sc.spnl();
    let mut title = if sc.pos > before_title {
        sc.link_title()
    } else {
        None
    };
    if title.is_none() {
        sc.pos = before_title;
    }

    // The definition must fill its line(s) exactly.
    let mut at_line_end = sc.eat_space_to_eol();
    if !at_line_end && title.is_some() {
        // Retry without the title; it may belong to the next definition.
        title = None;
        sc.pos = before_title;
        at_line_end = sc.eat_space_to_eol();
    }
    if !at_line_end {
        return 0;
    }
    if normalize_label(raw_label).is_empty() {
        return 0;
    }
    refmap.define(
        raw_label,
        RefDef {
            destination: dest,
            title,
        },
    );
    sc.pos
}

impl InlineParser<'_, '_> {
    /// Resolve a `]` against the bracket stack.
    pub(super) fn close_bracket(&mut self) {
        self.pos += 1;
        let startpos = self.pos;

        let Some(bracket) = self.brackets.pop() else {
            self.add_text("]");
            return;
        };
        if !bracket.active {
            self.add_text("]");
            return;
        }

        let mut matched = None;

        // Inline form: "(" dest (ws title)? ")".
        if self.subject.as_bytes().get(self.pos) == Some(&b'(') {
            let mut sc = Scanner {
                s: &self.subject,
                pos: self.pos + 1,
            };
            sc.spnl();
            if let Some(dest) = sc.link_destination() {
                let before_title = sc.pos;
                sc.spnl();
                let title = if sc.pos > before_title {
                    sc.link_title()
                } else {
                    None
                };
                sc.spnl();
                if sc.peek() == Some(b')') {
                    matched = Some((dest, title, sc.pos + 1));
                }
            }
        }

        // Reference forms: full, collapsed, shortcut.
        if matched.is_none() {
            let mut sc = Scanner {
                s: &self.subject,
                pos: self.pos,
            };
            let n = sc.link_label();
            let label = if n > 2 {
                Some(&self.subject[self.pos + 1..self.pos + n - 1])
            } else if !bracket.bracket_after {
                Some(&self.subject[bracket.position..startpos - 1])
            } else {
                None
            };
            if let Some(label) = label {
                if let Some(def) = self.refmap.lookup(label) {
                    let end = if n > 0 { self.pos + n } else { self.pos };
                    matched = Some((def.destination.clone(), def.title.clone(), end));
                }
            }
        }

        // A failed closer spends its bracket: the opener stays literal
        // text and never matches again.
        let Some((destination, title, end)) = matched else {
            self.pos = startpos;
            self.add_text("]");
            return;
        };

        self.process_emphasis(bracket.delim_bottom);

        // The opener's text node becomes the link; everything parsed after
        // it moves inside.
        let node = bracket.node;
        {
            let n = self.tree.get_mut(node);
            n.data = if bracket.image {
                NodeData::Image {
                    destination,
                    title,
                }
            } else {
                NodeData::Link { destination, title }
            };
            n.text.clear();
        }
        let mut cur = self.tree.next(node);
        while let Some(sib) = cur {
            let next = self.tree.next(sib);
            self.tree.unlink(sib);
            self.tree.append_child(node, sib);
            cur = next;
        }

        if !bracket.image {
            for b in self.brackets.iter_mut() {
                if !b.image {
                    b.active = false;
                }
            }
        }
        self.pos = end;
    }
}

/// A byte cursor over one subject, shared by the inline-link scanner and
/// the reference definition parser.
struct Scanner<'s> {
    s: &'s str,
    pos: usize,
}

impl<'s> Scanner<'s> {
    fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.pos).copied()
    }

    /// The unconsumed tail. Borrows from the subject, not the scanner, so
    /// the cursor can advance while a match is held.
    fn rest(&self) -> &'s str {
        &self.s[self.pos..]
    }

    /// Skip spaces and tabs with at most one newline.
    fn spnl(&mut self) {
        let mut seen_newline = false;
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' => self.pos += 1,
                b'\n' if !seen_newline => {
                    seen_newline = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
    }

    /// Consume trailing spaces up to a newline or the end of input.
    /// Returns `false` when non-space content remains on the line.
    fn eat_space_to_eol(&mut self) -> bool {
        match SPACE_AT_EOL.find(self.rest()) {
            Some(m) => {
                self.pos += m.len();
                true
            }
            None => false,
        }
    }

    /// Length of a `[label]` at the cursor including both brackets, or 0.
    fn link_label(&mut self) -> usize {
        let Some(m) = LINK_LABEL.find(self.rest()) else {
            return 0;
        };
        if m.len() > 1001 {
            return 0;
        }
        self.pos += m.len();
        m.len()
    }

    /// A link destination, either `<...>` or a bare run with balanced
    /// parentheses, unescaped.
    fn link_destination(&mut self) -> Option<String> {
        if let Some(m) = ANGLE_DESTINATION.find(self.rest()) {
            let inner = &m.as_str()[1..m.len() - 1];
            self.pos += m.len();
            return Some(super::unescape(inner));
        }
        if self.peek() == Some(b'<') {
            return None;
        }
        let bytes = self.s.as_bytes();
        let start = self.pos;
        let mut open_parens = 0i32;
        while let Some(&c) = bytes.get(self.pos) {
            match c {
                b'\\' if bytes
                    .get(self.pos + 1)
                    .is_some_and(u8::is_ascii_punctuation) =>
                {
                    self.pos += 2;
                }
                b'(' => {
                    self.pos += 1;
                    open_parens += 1;
                }
                b')' => {
                    if open_parens < 1 {
                        break;
                    }
                    self.pos += 1;
                    open_parens -= 1;
                }
                b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r' => break,
                _ => self.pos += 1,
            }
        }
        if self.pos == start && self.peek() != Some(b')') {
            return None;
        }
        if open_parens != 0 {
            return None;
        }
        Some(super::unescape(&self.s[start..self.pos]))
    }

    /// A quoted or parenthesized link title, unescaped. `None` keeps the
    /// cursor in place.
    fn link_title(&mut self) -> Option<String> {
        let m = LINK_TITLE.find(self.rest())?;
        let inner = &m.as_str()[1..m.len() - 1];
        self.pos += m.len();
        Some(super::unescape(inner))
    }
}
