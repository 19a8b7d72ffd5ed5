//! The document tree.
//!
//! Nodes live in a single arena owned by [`Tree`]; every reference between
//! nodes is a [`NodeId`] index. The parent/child/sibling links are pure
//! navigation, ownership never cycles. Renderers and custom visitors read
//! the tree through [`Tree`]'s accessors.

use std::fmt;
use std::ops::Index;

/// Index of a node in its [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Column alignment of a GFM table, taken from the delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableAlign {
    /// No alignment marker (`---`).
    #[default]
    None,
    /// `:---`
    Left,
    /// `:---:`
    Center,
    /// `---:`
    Right,
}

/// What kind of list a list or list item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// `*` / `-` / `+` bullets.
    Bullet,
    /// Numbered items with a `.` or `)` delimiter.
    Ordered,
    /// A GFM task list item (`[ ]` / `[x]`).
    Task,
}

/// Structural data shared by a list and its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListData {
    /// Bullet, ordered, or task.
    pub kind: ListKind,
    /// Whether the list renders tight (no `<p>` wrapping). Computed once at
    /// list finalization.
    pub tight: bool,
    /// The bullet character for bullet lists (`*`, `-`, `+`).
    pub bullet_char: u8,
    /// The start number of an ordered list.
    pub start: u32,
    /// The ordered-list delimiter (`.` or `)`).
    pub delimiter: u8,
    /// Content indent relative to the marker (the W+N rule).
    pub padding: usize,
    /// Indent of the marker itself.
    pub marker_offset: usize,
    /// Whether a task item is checked.
    pub checked: bool,
    /// The literal marker text (bullet char, or the digits of an ordered
    /// marker without its delimiter).
    pub marker: String,
    /// The item's ordinal in an ordered list, assigned at list finalization.
    pub num: Option<u32>,
}

impl Default for ListData {
    fn default() -> Self {
        Self {
            kind: ListKind::Bullet,
            tight: true,
            bullet_char: 0,
            start: 1,
            delimiter: b'.',
            padding: 0,
            marker_offset: 0,
            checked: false,
            marker: String::new(),
            num: None,
        }
    }
}

/// The tagged payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The document root.
    Document,
    /// A paragraph.
    Paragraph,
    /// An ATX or setext heading.
    Heading {
        /// Heading level, 1 through 6.
        level: u8,
    },
    /// A `>` block quote.
    BlockQuote,
    /// A `***`-style thematic break.
    ThematicBreak,
    /// A fenced or indented code block.
    CodeBlock {
        /// Fenced (as opposed to indented).
        fenced: bool,
        /// The fence character (`` ` `` or `~`).
        fence_char: u8,
        /// Length of the opening fence.
        fence_len: usize,
        /// Indent of the opening fence.
        fence_offset: usize,
        /// The trimmed, unescaped info string.
        info: String,
    },
    /// A leaf HTML block.
    HtmlBlock {
        /// The CommonMark HTML block kind, 1 through 7.
        kind: u8,
    },
    /// A bullet or ordered list.
    List(ListData),
    /// One item of a list.
    ListItem(ListData),
    /// A GFM table.
    Table {
        /// Column alignments fixed by the delimiter row.
        aligns: Vec<TableAlign>,
    },
    /// The header row of a table.
    TableHead,
    /// A body row of a table.
    TableRow,
    /// One cell of a table row.
    TableCell {
        /// The cell's column alignment.
        align: TableAlign,
    },
    /// A plain text run.
    Text,
    /// An inline code span.
    CodeSpan,
    /// `*emphasis*`
    Emphasis,
    /// `**strong**`
    Strong,
    /// `~~strikethrough~~`
    Strikethrough,
    /// A hard line break.
    HardBreak,
    /// A soft line break.
    SoftBreak,
    /// A raw inline HTML tag.
    InlineHtml,
    /// An inline or reference link.
    Link {
        /// The unescaped destination.
        destination: String,
        /// The unescaped title, if any.
        title: Option<String>,
    },
    /// An image.
    Image {
        /// The unescaped destination.
        destination: String,
        /// The unescaped title, if any.
        title: Option<String>,
    },
    /// The `[ ]` / `[x]` marker at the head of a task list item.
    TaskListItemMarker {
        /// Whether the box is checked.
        checked: bool,
    },
}

/// The discriminant of [`NodeData`], for dispatch in visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading,
    BlockQuote,
    ThematicBreak,
    CodeBlock,
    HtmlBlock,
    List,
    ListItem,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Text,
    CodeSpan,
    Emphasis,
    Strong,
    Strikethrough,
    HardBreak,
    SoftBreak,
    InlineHtml,
    Link,
    Image,
    TaskListItemMarker,
}

impl NodeData {
    /// The discriminant of this payload.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Document => NodeKind::Document,
            NodeData::Paragraph => NodeKind::Paragraph,
            NodeData::Heading { .. } => NodeKind::Heading,
            NodeData::BlockQuote => NodeKind::BlockQuote,
            NodeData::ThematicBreak => NodeKind::ThematicBreak,
            NodeData::CodeBlock { .. } => NodeKind::CodeBlock,
            NodeData::HtmlBlock { .. } => NodeKind::HtmlBlock,
            NodeData::List(_) => NodeKind::List,
            NodeData::ListItem(_) => NodeKind::ListItem,
            NodeData::Table { .. } => NodeKind::Table,
            NodeData::TableHead => NodeKind::TableHead,
            NodeData::TableRow => NodeKind::TableRow,
            NodeData::TableCell { .. } => NodeKind::TableCell,
            NodeData::Text => NodeKind::Text,
            NodeData::CodeSpan => NodeKind::CodeSpan,
            NodeData::Emphasis => NodeKind::Emphasis,
            NodeData::Strong => NodeKind::Strong,
            NodeData::Strikethrough => NodeKind::Strikethrough,
            NodeData::HardBreak => NodeKind::HardBreak,
            NodeData::SoftBreak => NodeKind::SoftBreak,
            NodeData::InlineHtml => NodeKind::InlineHtml,
            NodeData::Link { .. } => NodeKind::Link,
            NodeData::Image { .. } => NodeKind::Image,
            NodeData::TaskListItemMarker { .. } => NodeKind::TaskListItemMarker,
        }
    }
}

/// One node of the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// The node's tagged payload.
    pub data: NodeData,
    /// The node's raw text. For container blocks this accumulates unparsed
    /// line content during the block phase and is drained by the inline
    /// phase; for text-bearing leaves (`Text`, `CodeSpan`, `CodeBlock`,
    /// `HtmlBlock`, `InlineHtml`) it is the final content.
    pub text: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) open: bool,
    pub(crate) last_line_blank: bool,
    pub(crate) last_line_checked: bool,
    pub(crate) start_line: usize,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            text: String::new(),
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
            open: true,
            last_line_blank: false,
            last_line_checked: false,
            start_line: 0,
        }
    }

    /// The discriminant of this node's payload.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

/// An arena-allocated document tree.
pub struct Tree {
    name: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
        }
    }

    /// The diagnostic label this tree was parsed under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The document root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, unlinked nodes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The node's parent, if linked.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    /// The node's first child.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self[id].first_child
    }

    /// The node's last child.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self[id].last_child
    }

    /// The node's previous sibling.
    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self[id].prev
    }

    /// The node's next sibling.
    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self[id].next
    }

    /// Shorthand for `self[id].kind()`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self[id].kind()
    }

    /// Iterate over `id`'s children, front to back.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self[id].first_child;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self[id].next;
            Some(id)
        })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Allocate a detached node.
    pub(crate) fn add(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    /// Append a detached node as the last child of `parent`.
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self[child].parent.is_none(), "child must be detached");
        self.get_mut(child).parent = Some(parent);
        if let Some(last) = self[parent].last_child {
            self.get_mut(last).next = Some(child);
            self.get_mut(child).prev = Some(last);
        } else {
            self.get_mut(parent).first_child = Some(child);
        }
        self.get_mut(parent).last_child = Some(child);
    }

    /// Insert a detached node as the next sibling of `node`.
    pub(crate) fn insert_after(&mut self, node: NodeId, sibling: NodeId) {
        debug_assert!(self[sibling].parent.is_none(), "sibling must be detached");
        let parent = self[node].parent;
        let next = self[node].next;
        self.get_mut(sibling).parent = parent;
        self.get_mut(sibling).prev = Some(node);
        self.get_mut(sibling).next = next;
        self.get_mut(node).next = Some(sibling);
        match next {
            Some(n) => self.get_mut(n).prev = Some(sibling),
            None => {
                if let Some(p) = parent {
                    self.get_mut(p).last_child = Some(sibling);
                }
            }
        }
    }

    /// Detach a node (and its subtree) from the tree. The node stays in the
    /// arena but is no longer reachable from the root.
    pub(crate) fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = &self[id];
            (n.parent, n.prev, n.next)
        };
        match prev {
            Some(p) => self.get_mut(p).next = next,
            None => {
                if let Some(p) = parent {
                    self.get_mut(p).first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.get_mut(n).prev = prev,
            None => {
                if let Some(p) = parent {
                    self.get_mut(p).last_child = prev;
                }
            }
        }
        let n = self.get_mut(id);
        n.parent = None;
        n.prev = None;
        n.next = None;
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn rec(tree: &Tree, id: NodeId, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(
                f,
                "{:indent$}{:?} {:?}",
                "",
                tree[id].kind(),
                tree[id].text,
                indent = depth * 2
            )?;
            for child in tree.children(id) {
                rec(tree, child, depth + 1, f)?;
            }
            Ok(())
        }
        rec(self, self.root, 0, f)
    }
}
