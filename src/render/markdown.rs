//! Canonicalizing markdown rendering.
//!
//! Reprints the tree as normalized markdown: ATX headings, `-` thematic
//! breaks, fenced code blocks, backslash hard breaks, resolved reference
//! links. Block containers render into a nested buffer and are prefixed
//! or indented on exit, so depth composes without per-line bookkeeping.

use crate::error::RenderError;
use crate::node::{ListData, ListKind, NodeData, NodeId, NodeKind, TableAlign, Tree};
use crate::options::Options;
use crate::walk::{walk, Visitor, WalkStatus};

/// Render a document tree as canonicalized markdown.
pub fn render(tree: &Tree, options: &Options) -> Result<String, RenderError> {
    let mut renderer = MarkdownRenderer {
        bufs: vec![String::new()],
        options,
    };
    walk(tree, tree.root(), &mut renderer)?;
    let mut out = renderer.bufs.pop().unwrap_or_default();
    // The document ends with exactly one blank line.
    out.truncate(out.trim_end().len());
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    Ok(out)
}

struct MarkdownRenderer<'o> {
    /// Buffer stack; containers that prefix or indent their content render
    /// into the top buffer and fold it into the one below on exit.
    bufs: Vec<String>,
    options: &'o Options,
}

impl MarkdownRenderer<'_> {
    fn out(&mut self) -> &mut String {
        self.bufs.last_mut().expect("buffer stack never empty")
    }

    fn push_str(&mut self, s: &str) {
        self.out().push_str(s);
    }

    fn push_buf(&mut self) {
        self.bufs.push(String::new());
    }

    fn pop_buf(&mut self) -> String {
        self.bufs.pop().expect("unbalanced buffer stack")
    }

    /// Whether an inline node sits inside a heading (where line breaks
    /// cannot be reprinted literally).
    fn inside_heading(tree: &Tree, node: NodeId) -> bool {
        let mut cur = tree.parent(node);
        while let Some(id) = cur {
            match tree.kind(id) {
                NodeKind::Heading => return true,
                NodeKind::Emphasis | NodeKind::Strong | NodeKind::Strikethrough => {
                    cur = tree.parent(id);
                }
                _ => return false,
            }
        }
        false
    }

    /// Whether a paragraph sits directly in a tight list item.
    fn in_tight_item(tree: &Tree, node: NodeId) -> bool {
        match tree.parent(node) {
            Some(parent) => matches!(
                tree[parent].data,
                NodeData::ListItem(ListData { tight: true, .. })
            ),
            None => false,
        }
    }

    /// Fold a finished list item buffer into the enclosing buffer, placing
    /// the marker on the first line and indenting the continuation lines.
    fn fold_item(&mut self, data: &ListData) {
        let content = self.pop_buf();
        // Task items carry whichever marker shape they were written with.
        let marker = if data.kind == ListKind::Ordered || data.bullet_char == 0 {
            format!("{}{} ", data.num.unwrap_or(data.start), data.delimiter as char)
        } else {
            format!("{} ", data.bullet_char as char)
        };
        let indent = " ".repeat(marker.len());
        let trimmed = content.trim_end();
        if trimmed.is_empty() {
            self.push_str(marker.trim_end());
            self.push_str("\n");
        } else {
            for (i, line) in trimmed.split('\n').enumerate() {
                if i == 0 {
                    self.push_str(&marker);
                } else if !line.is_empty() {
                    self.push_str(&indent);
                }
                self.push_str(line);
                self.push_str("\n");
            }
        }
        if !data.tight {
            self.push_str("\n");
        }
    }

    /// Fold a finished block quote buffer, prefixing every line.
    fn fold_block_quote(&mut self) {
        let content = self.pop_buf();
        for line in content.trim_end().split('\n') {
            if line.is_empty() {
                self.push_str(">\n");
            } else {
                self.push_str("> ");
                self.push_str(line);
                self.push_str("\n");
            }
        }
        self.push_str("\n");
    }

    fn code_span(&mut self, text: &str) {
        let longest = text
            .split(|c| c != '`')
            .map(str::len)
            .max()
            .unwrap_or(0);
        let fence = "`".repeat(longest + 1);
        let pad = text.starts_with('`') || text.ends_with('`');
        self.push_str(&fence);
        if pad {
            self.push_str(" ");
        }
        self.push_str(text);
        if pad {
            self.push_str(" ");
        }
        self.push_str(&fence);
    }

    fn code_block(&mut self, tree: &Tree, node: NodeId) {
        let NodeData::CodeBlock { ref info, .. } = tree[node].data else {
            return;
        };
        self.push_str("```");
        self.push_str(info);
        self.push_str("\n");
        let body = &tree[node].text;
        self.push_str(body);
        if !body.is_empty() && !body.ends_with('\n') {
            self.push_str("\n");
        }
        self.push_str("```\n\n");
    }

    fn link_suffix(&mut self, destination: &str, title: &Option<String>) {
        self.push_str("](");
        if destination.chars().any(char::is_whitespace) {
            self.push_str("<");
            self.push_str(destination);
            self.push_str(">");
        } else {
            self.push_str(destination);
        }
        if let Some(title) = title {
            if !title.is_empty() {
                self.push_str(" \"");
                self.push_str(title);
                self.push_str("\"");
            }
        }
        self.push_str(")");
    }

    /// Backslash-escape characters that would reparse as markup. The tree
    /// no longer records which characters were escaped in the source, so
    /// every literal occurrence of a marker character gets an escape.
    fn escape_text(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            if matches!(
                c,
                '\\' | '`' | '*' | '_' | '[' | ']' | '~' | '&' | '<' | '>' | '#' | '|'
            ) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    fn delimiter_row(&mut self, aligns: &[TableAlign]) {
        for align in aligns {
            self.push_str(match align {
                TableAlign::None => "|---",
                TableAlign::Left => "|:---",
                TableAlign::Center => "|:---:",
                TableAlign::Right => "|---:",
            });
        }
        self.push_str("|\n");
    }
}

impl Visitor for MarkdownRenderer<'_> {
    fn visit(
        &mut self,
        tree: &Tree,
        node: NodeId,
        entering: bool,
    ) -> Result<WalkStatus, RenderError> {
        match &tree[node].data {
            NodeData::Document => {}
            NodeData::Text => {
                if entering {
                    let raw = &tree[node].text;
                    if self.options.wants_text_filter() {
                        if let Some(filter) = self.options.text_filter {
                            self.push_str(&Self::escape_text(&filter(raw)));
                            return Ok(WalkStatus::Continue);
                        }
                    }
                    self.push_str(&Self::escape_text(raw));
                }
            }
            NodeData::SoftBreak => {
                if entering {
                    // A heading reprints on one line, so the break collapses
                    // to a space.
                    if Self::inside_heading(tree, node) {
                        self.push_str(" ");
                    } else {
                        self.push_str("\n");
                    }
                }
            }
            NodeData::HardBreak => {
                if entering {
                    // With soft-to-hard conversion on, every break renders
                    // hard anyway, so the backslash is noise.
                    if self.options.soft_break_as_hard_break {
                        self.push_str("\n");
                    } else {
                        self.push_str("\\\n");
                    }
                }
            }
            NodeData::CodeSpan => {
                if entering {
                    self.code_span(&tree[node].text);
                }
            }
            NodeData::Emphasis => {
                self.push_str("*");
            }
            NodeData::Strong => {
                self.push_str("**");
            }
            NodeData::Strikethrough => {
                self.push_str("~~");
            }
            NodeData::InlineHtml => {
                if entering {
                    self.push_str(&tree[node].text);
                }
            }
            NodeData::Link { destination, title } => {
                if entering {
                    self.push_str("[");
                } else {
                    self.link_suffix(destination, title);
                }
            }
            NodeData::Image { destination, title } => {
                if entering {
                    self.push_str("![");
                } else {
                    self.link_suffix(destination, title);
                }
            }
            NodeData::Paragraph => {
                if !entering {
                    if Self::in_tight_item(tree, node) {
                        self.push_str("\n");
                    } else {
                        self.push_str("\n\n");
                    }
                }
            }
            NodeData::Heading { level } => {
                if entering {
                    let hashes = "#".repeat(usize::from(*level));
                    self.push_str(&hashes);
                    self.push_str(" ");
                } else {
                    self.push_str("\n\n");
                }
            }
            NodeData::ThematicBreak => {
                if entering {
                    self.push_str("---\n\n");
                }
            }
            NodeData::CodeBlock { .. } => {
                if entering {
                    self.code_block(tree, node);
                }
            }
            NodeData::HtmlBlock { .. } => {
                if entering {
                    self.push_str(&tree[node].text);
                    self.push_str("\n\n");
                }
            }
            NodeData::BlockQuote => {
                if entering {
                    self.push_buf();
                } else {
                    self.fold_block_quote();
                }
            }
            NodeData::List(_) => {
                if !entering {
                    // Separate the list from the following block.
                    if !self.out().ends_with("\n\n") {
                        self.push_str("\n");
                    }
                }
            }
            NodeData::ListItem(data) => {
                if entering {
                    self.push_buf();
                } else {
                    self.fold_item(data);
                }
            }
            NodeData::TaskListItemMarker { checked } => {
                if entering {
                    self.push_str(if *checked { "[X]" } else { "[ ]" });
                }
            }
            NodeData::Table { .. } => {
                if !entering {
                    self.push_str("\n");
                }
            }
            NodeData::TableHead => {
                if !entering {
                    self.push_str("|\n");
                    let aligns = match tree.parent(node).map(|p| &tree[p].data) {
                        Some(NodeData::Table { aligns }) => aligns.clone(),
                        _ => Vec::new(),
                    };
                    self.delimiter_row(&aligns);
                }
            }
            NodeData::TableRow => {
                if !entering {
                    self.push_str("|\n");
                }
            }
            NodeData::TableCell { .. } => {
                if entering {
                    self.push_str("|");
                }
            }
        }
        Ok(WalkStatus::Continue)
    }
}
