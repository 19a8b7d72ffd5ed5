//! The inline parser.
//!
//! Runs once per finalized text-bearing leaf (paragraph, heading, table
//! cell). A trigger-byte dispatch loop appends inline nodes to the leaf;
//! emphasis and links resolve afterwards over the delimiter and bracket
//! stacks. Everything that fails to parse degrades to literal text.

mod emphasis;
mod entity;
pub(in crate::parser) mod link;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::node::{ListData, ListKind, NodeData, NodeId, NodeKind, Tree};
use crate::options::Options;

use emphasis::Delimiter;
use link::{Bracket, RefMap};

const TAG_NAME: &str = "[A-Za-z][A-Za-z0-9-]*";
const ATTRIBUTE: &str =
    r#"(?:\s+[a-zA-Z_:][a-zA-Z0-9:._-]*(?:\s*=\s*(?:[^ \t\n"'=<>`]+|'[^']*'|"[^"]*"))?)"#;

/// The raw inline HTML tag grammar: open/close tags, comments, processing
/// instructions, declarations, CDATA.
static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s)^<(?:{TAG_NAME}{ATTRIBUTE}*\s*/?>|/{TAG_NAME}\s*>|!--(?:>|->|.*?-->)|\?.*?\?>|![A-Za-z][^>]*>|!\[CDATA\[.*?\]\]>)"
    ))
    .unwrap()
});

static AUTOLINK_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Za-z][A-Za-z0-9.+-]{1,31}:[^<>\x00-\x20]*)>").unwrap());
static AUTOLINK_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^<([a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*)>",
    )
    .unwrap()
});

static GFM_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s<]+").unwrap());
static GFM_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+")
        .unwrap()
});

/// Parse the accumulated text of one leaf block into inline children.
pub(in crate::parser) fn parse_block(
    tree: &mut Tree,
    block: NodeId,
    options: &Options,
    refmap: &RefMap,
) {
    let raw = std::mem::take(&mut tree.get_mut(block).text);
    let subject = raw.trim().to_string();
    let mut parser = InlineParser {
        tree,
        block,
        subject,
        pos: 0,
        delimiters: Vec::new(),
        delim_top: None,
        brackets: SmallVec::new(),
        options,
        refmap,
    };
    parser.run();
}

/// Unescape backslash escapes and entity references in a raw span (used
/// for info strings, link destinations and titles).
pub(in crate::parser) fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        let c = s[i..].chars().next().expect("in-bounds char");
        match c {
            '\\' => {
                let next = s[i + 1..].chars().next();
                match next {
                    Some(p) if p.is_ascii_punctuation() => {
                        out.push(p);
                        i += 2;
                    }
                    _ => {
                        out.push('\\');
                        i += 1;
                    }
                }
            }
            '&' => match entity::parse(&s[i..]) {
                Some((decoded, len)) => {
                    out.push_str(&decoded);
                    i += len;
                }
                None => {
                    out.push('&');
                    i += 1;
                }
            },
            _ => {
                out.push(c);
                i += c.len_utf8();
            }
        }
    }
    out
}

/// State for one leaf's inline parse.
struct InlineParser<'a, 'o> {
    tree: &'a mut Tree,
    block: NodeId,
    subject: String,
    pos: usize,
    delimiters: Vec<Delimiter>,
    /// Topmost live delimiter, tail of the linked stack.
    delim_top: Option<usize>,
    brackets: SmallVec<[Bracket; 4]>,
    options: &'o Options,
    refmap: &'a RefMap,
}

impl InlineParser<'_, '_> {
    fn run(&mut self) {
        self.emit_task_marker();
        while self.pos < self.subject.len() {
            let c = self.subject.as_bytes()[self.pos];
            match c {
                b'\n' => self.parse_newline(),
                b'\\' => self.parse_backslash(),
                b'`' => self.parse_backticks(),
                b'*' | b'_' => self.handle_delim(c),
                b'~' if self.options.gfm_strikethrough => self.handle_delim(c),
                b'[' => self.parse_open_bracket(),
                b']' => self.close_bracket(),
                b'!' => self.parse_bang(),
                b'<' => self.parse_angle(),
                b'&' => self.parse_entity(),
                _ => self.parse_string(),
            }
        }
        self.process_emphasis(None);
        if self.options.gfm_auto_link {
            self.apply_autolinks();
        }
    }

    // ── node building ──

    fn add_text(&mut self, s: &str) -> NodeId {
        let id = self.tree.add(NodeData::Text);
        self.tree.get_mut(id).text.push_str(s);
        self.tree.append_child(self.block, id);
        id
    }

    fn add_node(&mut self, data: NodeData) -> NodeId {
        let id = self.tree.add(data);
        self.tree.append_child(self.block, id);
        id
    }

    fn peek_byte(&self) -> Option<u8> {
        self.subject.as_bytes().get(self.pos).copied()
    }

    // ── triggers ──

    /// The leading `[ ]` / `[x]` of a task item's first paragraph becomes
    /// a marker node; the rest of the line keeps its leading space.
    fn emit_task_marker(&mut self) {
        if !self.options.gfm_task_list_item || self.tree[self.block].kind() != NodeKind::Paragraph
        {
            return;
        }
        let Some(item) = self.tree.parent(self.block) else {
            return;
        };
        if self.tree.first_child(item) != Some(self.block) {
            return;
        }
        let checked = match &self.tree[item].data {
            NodeData::ListItem(ListData {
                kind: ListKind::Task,
                checked,
                ..
            }) => *checked,
            _ => return,
        };
        if matches!(
            self.subject.as_bytes(),
            [b'[', b' ' | b'x' | b'X', b']', ..]
        ) {
            self.add_node(NodeData::TaskListItemMarker { checked });
            self.pos = 3;
        }
    }

    fn parse_newline(&mut self) {
        self.pos += 1;
        let mut hard = false;
        if let Some(last) = self.tree.last_child(self.block) {
            if self.tree[last].kind() == NodeKind::Text && self.tree[last].text.ends_with(' ') {
                let text = &mut self.tree.get_mut(last).text;
                let stripped = text.trim_end_matches(' ').len();
                hard = text.len() - stripped >= 2;
                text.truncate(stripped);
            }
        }
        self.add_node(if hard {
            NodeData::HardBreak
        } else {
            NodeData::SoftBreak
        });
        // Leading spaces of the next line are not content.
        while self.peek_byte() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn parse_backslash(&mut self) {
        self.pos += 1;
        match self.peek_byte() {
            Some(b'\n') => {
                self.pos += 1;
                self.add_node(NodeData::HardBreak);
            }
            Some(c) if c.is_ascii_punctuation() => {
                self.pos += 1;
                self.add_text(&(c as char).to_string());
            }
            _ => {
                self.add_text("\\");
            }
        }
    }

    /// Code spans: an opener run matches the next run of exactly the same
    /// length. An opener with no closer degrades to literal backticks and
    /// the scan never backtracks past it.
    fn parse_backticks(&mut self) {
        let bytes = self.subject.as_bytes();
        let start = self.pos;
        let n = bytes[start..].iter().take_while(|&&b| b == b'`').count();

        let mut i = start + n;
        while i < bytes.len() {
            if bytes[i] != b'`' {
                i += 1;
                continue;
            }
            let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
            if run != n {
                i += run;
                continue;
            }
            // Found the closer: newlines count as spaces, and one space is
            // stripped from both ends when the content isn't all spaces.
            let mut content = self.subject[start + n..i].replace('\n', " ");
            if content.starts_with(' ')
                && content.ends_with(' ')
                && content.bytes().any(|b| b != b' ')
            {
                content = content[1..content.len() - 1].to_string();
            }
            let node = self.add_node(NodeData::CodeSpan);
            self.tree.get_mut(node).text = content;
            self.pos = i + run;
            return;
        }

        let literal = self.subject[start..start + n].to_string();
        self.add_text(&literal);
        self.pos = start + n;
    }

    fn parse_open_bracket(&mut self) {
        let node = self.add_text("[");
        self.pos += 1;
        self.push_bracket(node, false);
    }

    fn parse_bang(&mut self) {
        self.pos += 1;
        if self.peek_byte() == Some(b'[') {
            self.pos += 1;
            let node = self.add_text("![");
            self.push_bracket(node, true);
        } else {
            self.add_text("!");
        }
    }

    fn push_bracket(&mut self, node: NodeId, image: bool) {
        if let Some(top) = self.brackets.last_mut() {
            top.bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            position: self.pos,
            image,
            active: true,
            bracket_after: false,
            delim_bottom: self.delim_top,
        });
    }

    /// `<`: CommonMark autolink, raw inline HTML, or a literal.
    fn parse_angle(&mut self) {
        let rest = &self.subject[self.pos..];
        if let Some(caps) = AUTOLINK_URI.captures(rest) {
            let url = caps.get(1).expect("capture 1").as_str().to_string();
            let consumed = caps.get(0).expect("whole match").len();
            let link = self.add_node(NodeData::Link {
                destination: url.clone(),
                title: None,
            });
            let text = self.tree.add(NodeData::Text);
            self.tree.get_mut(text).text = url;
            self.tree.append_child(link, text);
            self.pos += consumed;
            return;
        }
        if let Some(caps) = AUTOLINK_EMAIL.captures(rest) {
            let addr = caps.get(1).expect("capture 1").as_str().to_string();
            let consumed = caps.get(0).expect("whole match").len();
            let link = self.add_node(NodeData::Link {
                destination: format!("mailto:{addr}"),
                title: None,
            });
            let text = self.tree.add(NodeData::Text);
            self.tree.get_mut(text).text = addr;
            self.tree.append_child(link, text);
            self.pos += consumed;
            return;
        }
        if let Some(m) = HTML_TAG.find(rest) {
            let raw = m.as_str().to_string();
            let consumed = m.len();
            let node = self.add_node(NodeData::InlineHtml);
            self.tree.get_mut(node).text = raw;
            self.pos += consumed;
            return;
        }
        self.add_text("<");
        self.pos += 1;
    }

    fn parse_entity(&mut self) {
        match entity::parse(&self.subject[self.pos..]) {
            Some((decoded, len)) => {
                self.add_text(&decoded);
                self.pos += len;
            }
            None => {
                self.add_text("&");
                self.pos += 1;
            }
        }
    }

    /// A plain text run up to the next trigger byte.
    fn parse_string(&mut self) {
        let bytes = self.subject.as_bytes();
        let start = self.pos;
        while self.pos < bytes.len() && !self.is_trigger(bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos == start {
            // A trigger byte every handler declined; take it literally.
            self.pos += 1;
        }
        let run = self.subject[start..self.pos].to_string();
        self.add_text(&run);
    }

    fn is_trigger(&self, c: u8) -> bool {
        match c {
            b'\n' | b'\\' | b'`' | b'*' | b'_' | b'[' | b']' | b'!' | b'<' | b'&' => true,
            b'~' => self.options.gfm_strikethrough,
            _ => false,
        }
    }

    // ── GFM bare autolinks ──

    /// Linkify bare URLs/emails in text runs, skipping text that already
    /// sits inside a link or image.
    fn apply_autolinks(&mut self) {
        let mut targets = Vec::new();
        let mut stack = vec![self.block];
        while let Some(id) = stack.pop() {
            for child in self.tree.children(id) {
                match self.tree[child].kind() {
                    NodeKind::Link | NodeKind::Image => {}
                    NodeKind::Text => targets.push(child),
                    _ => stack.push(child),
                }
            }
        }
        for id in targets {
            self.split_autolinks(id);
        }
    }

    fn split_autolinks(&mut self, id: NodeId) {
        let text = self.tree[id].text.clone();
        let pieces = autolink_pieces(&text);
        if matches!(pieces.as_slice(), [Piece::Text(_)]) {
            return;
        }
        let mut anchor = id;
        for piece in pieces {
            let node = match piece {
                Piece::Text(s) => {
                    let n = self.tree.add(NodeData::Text);
                    self.tree.get_mut(n).text = s;
                    n
                }
                Piece::Url { display, dest } => {
                    let link = self.tree.add(NodeData::Link {
                        destination: dest,
                        title: None,
                    });
                    let t = self.tree.add(NodeData::Text);
                    self.tree.get_mut(t).text = display;
                    self.tree.append_child(link, t);
                    link
                }
            };
            self.tree.insert_after(anchor, node);
            anchor = node;
        }
        self.tree.unlink(id);
    }
}

/// One fragment of an autolinked text run.
enum Piece {
    Text(String),
    Url { display: String, dest: String },
}

/// Split a text run around bare URLs and email addresses.
fn autolink_pieces(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut cursor = 0;
    for m in GFM_URL.find_iter(text) {
        if m.start() < cursor || !boundary_ok(text, m.start()) {
            continue;
        }
        let url = trim_trailing_punct(m.as_str());
        if url.is_empty() {
            continue;
        }
        if m.start() > cursor {
            email_pieces(&text[cursor..m.start()], &mut pieces);
        }
        pieces.push(Piece::Url {
            display: url.to_string(),
            dest: url.to_string(),
        });
        cursor = m.start() + url.len();
    }
    if cursor < text.len() {
        email_pieces(&text[cursor..], &mut pieces);
    }
    if pieces.is_empty() {
        pieces.push(Piece::Text(text.to_string()));
    }
    pieces
}

/// Split the non-URL stretches around bare email addresses.
fn email_pieces(text: &str, pieces: &mut Vec<Piece>) {
    let mut cursor = 0;
    for m in GFM_EMAIL.find_iter(text) {
        if !boundary_ok(text, m.start()) {
            continue;
        }
        if m.start() > cursor {
            pieces.push(Piece::Text(text[cursor..m.start()].to_string()));
        }
        let addr = m.as_str();
        pieces.push(Piece::Url {
            display: addr.to_string(),
            dest: format!("mailto:{addr}"),
        });
        cursor = m.end();
    }
    if cursor < text.len() {
        pieces.push(Piece::Text(text[cursor..].to_string()));
    }
}

/// A bare autolink must start the run or follow whitespace or `(`.
fn boundary_ok(text: &str, start: usize) -> bool {
    match text[..start].chars().next_back() {
        None => true,
        Some(c) => c.is_whitespace() || c == '(',
    }
}

/// GFM strips trailing ASCII punctuation from bare URLs.
fn trim_trailing_punct(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ':', ';', '!', '?', ')', '\'', '"'])
}
