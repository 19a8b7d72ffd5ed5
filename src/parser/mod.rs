//! The two-phase markdown parser.
//!
//! Phase one is a per-line block-structure state machine: each logical line
//! first re-matches the spine of open blocks (the continuation pass), then
//! tries to open new blocks in priority order, then hands any remaining
//! content to the deepest open leaf. Phase two runs the inline parser over
//! every finalized text-bearing leaf.

mod block;
mod inline;
mod list;
mod table;

use log::debug;

use crate::lexer;
use crate::node::{NodeData, NodeId, NodeKind, Tree};
use crate::options::Options;

use inline::link::RefMap;

/// Outcome of re-matching an open block against the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockContinue {
    /// The block continues; its prefix has been consumed.
    Matched,
    /// The block does not continue on this line.
    NotMatched,
    /// The line belongs to the block and closes it (fence close); the line
    /// is fully consumed.
    Finished,
}

/// Outcome of the block-start pass for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockStart {
    /// No start matched at this position.
    None,
    /// A container block opened; keep scanning for nested starts.
    Container,
    /// A leaf block opened; the rest of the line is its content.
    Leaf,
}

/// Parse a markdown document into its document tree.
pub(crate) fn parse(name: &str, input: &str, options: &Options) -> Tree {
    let buf = lexer::normalize(input);
    let lines = lexer::split_lines(&buf);
    debug!("{name}: block phase over {} lines", lines.len());

    let mut parser = Parser::new(name, options);
    for line in &lines {
        parser.incorporate_line(line.slice(&buf).to_string());
    }
    parser.finish()
}

/// Block-phase state: the tree under construction plus the per-line cursor.
struct Parser<'o> {
    options: &'o Options,
    tree: Tree,
    refmap: RefMap,
    /// Deepest open block.
    tip: NodeId,
    /// Tip as of the start of the current line.
    oldtip: NodeId,
    /// Deepest block matched by the continuation pass.
    last_matched_container: NodeId,
    all_closed: bool,
    /// The current line, including its terminating `\n`.
    ln: String,
    line_number: usize,
    offset: usize,
    column: usize,
    next_nonspace: usize,
    next_nonspace_column: usize,
    indent: usize,
    blank: bool,
    /// A block start consumed only part of a tab stop; the remainder is
    /// emitted as spaces when content is accumulated.
    partially_consumed_tab: bool,
}

impl<'o> Parser<'o> {
    fn new(name: &str, options: &'o Options) -> Self {
        let tree = Tree::new(name);
        let root = tree.root();
        Self {
            options,
            tree,
            refmap: RefMap::new(),
            tip: root,
            oldtip: root,
            last_matched_container: root,
            all_closed: true,
            ln: String::new(),
            line_number: 0,
            offset: 0,
            column: 0,
            next_nonspace: 0,
            next_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
        }
    }

    /// Feed one logical line through the block state machine.
    fn incorporate_line(&mut self, ln: String) {
        self.ln = ln;
        self.line_number += 1;
        self.offset = 0;
        self.column = 0;
        self.blank = false;
        self.partially_consumed_tab = false;
        self.oldtip = self.tip;

        // Continuation pass: re-match the spine of open blocks, root to tip.
        let mut container = self.tree.root();
        loop {
            let Some(last) = self.tree.last_child(container) else {
                break;
            };
            if !self.tree[last].open {
                break;
            }
            container = last;
            self.find_next_nonspace();
            match block::check_continue(self, container) {
                BlockContinue::Matched => {}
                BlockContinue::NotMatched => {
                    container = self.tree[container]
                        .parent
                        .expect("open block without parent");
                    break;
                }
                BlockContinue::Finished => return,
            }
        }
        self.all_closed = container == self.oldtip;
        self.last_matched_container = container;

        // Block-start pass: open new blocks until a leaf claims the rest.
        let mut matched_leaf = self.tree[container].kind() != NodeKind::Paragraph
            && accepts_lines(self.tree[container].kind());
        while !matched_leaf {
            self.find_next_nonspace();
            // Plain paragraph lines skip the start scan entirely.
            if !self.indented() && !maybe_special(self.peek(self.next_nonspace)) {
                self.advance_next_nonspace();
                break;
            }
            match block::try_block_starts(self, container) {
                BlockStart::Container => container = self.tip,
                BlockStart::Leaf => {
                    container = self.tip;
                    matched_leaf = true;
                }
                BlockStart::None => {
                    self.advance_next_nonspace();
                    break;
                }
            }
        }

        if !self.all_closed && !self.blank && self.tree[self.tip].kind() == NodeKind::Paragraph {
            // Lazy continuation of the open paragraph.
            self.add_line();
            return;
        }

        self.close_unmatched_blocks();
        if self.blank {
            if let Some(last) = self.tree.last_child(container) {
                self.tree.get_mut(last).last_line_blank = true;
            }
        }

        let kind = self.tree[container].kind();
        let fenced = matches!(
            self.tree[container].data,
            NodeData::CodeBlock { fenced: true, .. }
        );
        let empty_item_started_here = kind == NodeKind::ListItem
            && self.tree.first_child(container).is_none()
            && self.tree[container].start_line == self.line_number;
        let last_line_blank = self.blank
            && !(kind == NodeKind::BlockQuote
                || (kind == NodeKind::CodeBlock && fenced)
                || empty_item_started_here);
        let mut cont = Some(container);
        while let Some(c) = cont {
            self.tree.get_mut(c).last_line_blank = last_line_blank;
            cont = self.tree[c].parent;
        }

        if accepts_lines(kind) {
            self.add_line();
            // Single-line HTML blocks of kinds 1-5 can close on the line
            // that opened them.
            if let NodeData::HtmlBlock { kind: html_kind } = self.tree[container].data {
                if (1..=5).contains(&html_kind)
                    && block::html_block_closes(html_kind, &self.ln[self.offset.min(self.ln.len())..])
                {
                    self.finalize(container);
                }
            }
        } else if self.offset < self.ln.len() && !self.blank {
            self.add_child(NodeData::Paragraph);
            self.advance_next_nonspace();
            self.add_line();
        }
    }

    /// Finalize everything still open and run the inline phase.
    fn finish(mut self) -> Tree {
        loop {
            let t = self.tip;
            self.finalize(t);
            if t == self.tree.root() {
                break;
            }
        }

        let mut stack = vec![self.tree.root()];
        let mut leaves = Vec::new();
        while let Some(id) = stack.pop() {
            match self.tree[id].kind() {
                NodeKind::Paragraph | NodeKind::Heading | NodeKind::TableCell => leaves.push(id),
                _ => stack.extend(self.tree.children(id)),
            }
        }
        debug!(
            "{}: inline phase over {} leaves, {} nodes total",
            self.tree.name(),
            leaves.len(),
            self.tree.len()
        );
        for id in leaves {
            inline::parse_block(&mut self.tree, id, self.options, &self.refmap);
        }
        self.tree
    }

    // ── cursor ──

    /// Byte at `pos` of the current line, `None` past the end.
    fn peek(&self, pos: usize) -> Option<u8> {
        self.ln.as_bytes().get(pos).copied()
    }

    /// The current line from `next_nonspace`, without the trailing `\n`.
    fn rest(&self) -> &str {
        let end = self.ln.len().saturating_sub(1);
        &self.ln[self.next_nonspace.min(end)..end]
    }

    fn indented(&self) -> bool {
        self.indent >= 4
    }

    fn find_next_nonspace(&mut self) {
        let bytes = self.ln.as_bytes();
        let mut i = self.offset;
        let mut cols = self.column;
        loop {
            match bytes.get(i) {
                Some(b' ') => {
                    i += 1;
                    cols += 1;
                }
                Some(b'\t') => {
                    i += 1;
                    cols += 4 - (cols % 4);
                }
                _ => break,
            }
        }
        self.blank = matches!(bytes.get(i), None | Some(b'\n'));
        self.next_nonspace = i;
        self.next_nonspace_column = cols;
        self.indent = cols - self.column;
    }

    /// Advance the cursor by `count` characters (or columns, when `columns`
    /// is set and tabs are in play).
    fn advance_offset(&mut self, mut count: usize, columns: bool) {
        let bytes = self.ln.as_bytes();
        while count > 0 {
            let Some(&c) = bytes.get(self.offset) else {
                break;
            };
            if c == b'\t' {
                let chars_to_tab = 4 - (self.column % 4);
                if columns {
                    self.partially_consumed_tab = chars_to_tab > count;
                    let advance = chars_to_tab.min(count);
                    self.column += advance;
                    if !self.partially_consumed_tab {
                        self.offset += 1;
                    }
                    count -= advance;
                } else {
                    self.partially_consumed_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partially_consumed_tab = false;
                self.offset += 1;
                self.column += 1;
                count -= 1;
            }
        }
    }

    fn advance_next_nonspace(&mut self) {
        self.offset = self.next_nonspace;
        self.column = self.next_nonspace_column;
        self.partially_consumed_tab = false;
    }

    // ── tree building ──

    /// Append the rest of the current line to the tip's accumulated text.
    fn add_line(&mut self) {
        let mut offset = self.offset;
        if self.partially_consumed_tab {
            // Skip over the tab and emit what's left of its stop as spaces.
            offset += 1;
            let spaces = 4 - (self.column % 4);
            let tip = self.tree.get_mut(self.tip);
            for _ in 0..spaces {
                tip.text.push(' ');
            }
        }
        let tail = &self.ln[offset.min(self.ln.len())..];
        self.tree.get_mut(self.tip).text.push_str(tail);
    }

    /// Open a new block as a child of the tip, finalizing blocks that
    /// cannot contain it first.
    fn add_child(&mut self, data: NodeData) -> NodeId {
        let kind = data.kind();
        while !can_contain(self.tree[self.tip].kind(), kind) {
            let t = self.tip;
            self.finalize(t);
        }
        let id = self.tree.add(data);
        self.tree.get_mut(id).start_line = self.line_number;
        self.tree.append_child(self.tip, id);
        self.tip = id;
        id
    }

    /// Close a block: mark it closed, run its finalization rule, and move
    /// the tip to its parent.
    fn finalize(&mut self, id: NodeId) {
        let parent = self.tree[id].parent;
        self.tree.get_mut(id).open = false;
        block::finalize_block(self, id);
        if let Some(p) = parent {
            self.tip = p;
        }
    }

    /// Finalize the blocks the continuation pass rejected, deepest first.
    fn close_unmatched_blocks(&mut self) {
        if self.all_closed {
            return;
        }
        while self.oldtip != self.last_matched_container {
            let parent = self.tree[self.oldtip]
                .parent
                .expect("open block without parent");
            self.finalize(self.oldtip);
            self.oldtip = parent;
        }
        self.all_closed = true;
    }
}

/// Whether `parent` may directly contain a `child` block.
fn can_contain(parent: NodeKind, child: NodeKind) -> bool {
    match parent {
        NodeKind::Document | NodeKind::BlockQuote | NodeKind::ListItem => {
            child != NodeKind::ListItem
        }
        NodeKind::List => child == NodeKind::ListItem,
        _ => false,
    }
}

/// Whether a block accumulates raw line content.
fn accepts_lines(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Paragraph | NodeKind::CodeBlock | NodeKind::HtmlBlock
    )
}

/// First bytes that can possibly open a block.
fn maybe_special(c: Option<u8>) -> bool {
    matches!(
        c,
        Some(b'#' | b'`' | b'~' | b'*' | b'+' | b'_' | b'=' | b'<' | b'>' | b'-' | b'0'..=b'9')
    )
}
