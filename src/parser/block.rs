//! Per-block continuation and start rules of the block state machine.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{NodeData, NodeId, NodeKind};

use super::inline::link;
use super::{list, table, BlockContinue, BlockStart, Parser};

static ATX_HEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}(?:[ \t]+|$)").unwrap());
static ATX_TRAILER_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*#+[ \t]*$").unwrap());
static ATX_TRAILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+#+[ \t]*$").unwrap());
static SETEXT_HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:=+|-+)[ \t]*$").unwrap());
static THEMATIC_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:\*[ \t]*){3,}|(?:_[ \t]*){3,}|(?:-[ \t]*){3,})$").unwrap()
});
static TRAILING_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\n[ \t]*)+\n\z").unwrap());
static TRAILING_WHITESPACE_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\n[ \t]*)+\z").unwrap());

/// Open conditions for the seven CommonMark HTML block kinds (index 1-7).
static HTML_BLOCK_OPEN: Lazy<[Regex; 8]> = Lazy::new(|| {
    [
        Regex::new("$^").unwrap(), // unused slot 0
        Regex::new(r"(?i)^<(?:script|pre|textarea|style)(?:\s|>|$)").unwrap(),
        Regex::new(r"^<!--").unwrap(),
        Regex::new(r"^<\?").unwrap(),
        Regex::new(r"^<![A-Za-z]").unwrap(),
        Regex::new(r"^<!\[CDATA\[").unwrap(),
        Regex::new(
            r"(?i)^</?(?:address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h[123456]|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|section|source|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul)(?:\s|/?>|$)",
        )
        .unwrap(),
        Regex::new(&format!(r"^(?:{OPEN_TAG}|{CLOSE_TAG})[ \t]*$")).unwrap(),
    ]
});

/// Close conditions for HTML block kinds 1-5 (6 and 7 end on a blank line).
static HTML_BLOCK_CLOSE: Lazy<[Regex; 6]> = Lazy::new(|| {
    [
        Regex::new("$^").unwrap(), // unused slot 0
        Regex::new(r"(?i)</(?:script|pre|textarea|style)>").unwrap(),
        Regex::new(r"-->").unwrap(),
        Regex::new(r"\?>").unwrap(),
        Regex::new(r">").unwrap(),
        Regex::new(r"\]\]>").unwrap(),
    ]
});

const OPEN_TAG: &str = r#"<[A-Za-z][A-Za-z0-9-]*(?:[ \t]+[a-zA-Z_:][a-zA-Z0-9:._-]*(?:[ \t]*=[ \t]*(?:[^ \t"'=<>`]+|'[^']*'|"[^"]*"))?)*[ \t]*/?>"#;
const CLOSE_TAG: &str = r"</[A-Za-z][A-Za-z0-9-]*[ \t]*>";

/// Re-match an open block against the current line.
pub(super) fn check_continue(p: &mut Parser<'_>, container: NodeId) -> BlockContinue {
    match p.tree[container].data {
        NodeData::Document | NodeData::List(_) => BlockContinue::Matched,
        NodeData::BlockQuote => continue_block_quote(p),
        NodeData::ListItem(_) => continue_list_item(p, container),
        NodeData::CodeBlock { .. } => continue_code_block(p, container),
        NodeData::HtmlBlock { kind } => {
            if p.blank && (kind == 6 || kind == 7) {
                BlockContinue::NotMatched
            } else {
                BlockContinue::Matched
            }
        }
        NodeData::Paragraph => {
            if p.blank {
                BlockContinue::NotMatched
            } else {
                BlockContinue::Matched
            }
        }
        // Headings and thematic breaks never span lines; table nodes are
        // only built at paragraph finalization and are never open here.
        _ => BlockContinue::NotMatched,
    }
}

fn continue_block_quote(p: &mut Parser<'_>) -> BlockContinue {
    if !p.indented() && p.peek(p.next_nonspace) == Some(b'>') {
        p.advance_next_nonspace();
        p.advance_offset(1, false);
        if matches!(p.peek(p.offset), Some(b' ' | b'\t')) {
            p.advance_offset(1, true);
        }
        BlockContinue::Matched
    } else {
        BlockContinue::NotMatched
    }
}

fn continue_list_item(p: &mut Parser<'_>, container: NodeId) -> BlockContinue {
    let NodeData::ListItem(ref data) = p.tree[container].data else {
        unreachable!("list item continuation on non-item");
    };
    let content_indent = data.marker_offset + data.padding;
    if p.blank {
        if p.tree.first_child(container).is_none() {
            // Blank line after an empty item ends it.
            BlockContinue::NotMatched
        } else {
            p.advance_next_nonspace();
            BlockContinue::Matched
        }
    } else if p.indent >= content_indent {
        p.advance_offset(content_indent, true);
        BlockContinue::Matched
    } else {
        BlockContinue::NotMatched
    }
}

fn continue_code_block(p: &mut Parser<'_>, container: NodeId) -> BlockContinue {
    let NodeData::CodeBlock {
        fenced,
        fence_char,
        fence_len,
        fence_offset,
        ..
    } = p.tree[container].data
    else {
        unreachable!("code block continuation on non-code-block");
    };
    if fenced {
        if !p.indented() && p.peek(p.next_nonspace) == Some(fence_char) {
            if let Some(run) = closing_fence_len(p.rest(), fence_char) {
                if run >= fence_len {
                    p.finalize(container);
                    return BlockContinue::Finished;
                }
            }
        }
        // Skip the opening fence's indent on continuation lines.
        let mut i = fence_offset;
        while i > 0 && matches!(p.peek(p.offset), Some(b' ' | b'\t')) {
            p.advance_offset(1, true);
            i -= 1;
        }
        BlockContinue::Matched
    } else if p.indent >= 4 {
        p.advance_offset(4, true);
        BlockContinue::Matched
    } else if p.blank {
        p.advance_next_nonspace();
        BlockContinue::Matched
    } else {
        BlockContinue::NotMatched
    }
}

/// Length of a closing fence run at the start of `rest`, if the whole line
/// is a valid close (run of the fence char, then only spaces/tabs).
fn closing_fence_len(rest: &str, fence_char: u8) -> Option<usize> {
    let bytes = rest.as_bytes();
    let run = bytes.iter().take_while(|&&b| b == fence_char).count();
    if run >= 3 && bytes[run..].iter().all(|&b| b == b' ' || b == b'\t') {
        Some(run)
    } else {
        None
    }
}

/// Try every block start in priority order at the current position.
pub(super) fn try_block_starts(p: &mut Parser<'_>, container: NodeId) -> BlockStart {
    let starts: [fn(&mut Parser<'_>, NodeId) -> BlockStart; 8] = [
        try_block_quote,
        try_atx_heading,
        try_fenced_code,
        try_html_block,
        try_setext_heading,
        try_thematic_break,
        list::try_list_item,
        try_indented_code,
    ];
    for start in starts {
        let outcome = start(p, container);
        if outcome != BlockStart::None {
            return outcome;
        }
    }
    BlockStart::None
}

fn try_block_quote(p: &mut Parser<'_>, _container: NodeId) -> BlockStart {
    if p.indented() || p.peek(p.next_nonspace) != Some(b'>') {
        return BlockStart::None;
    }
    p.advance_next_nonspace();
    p.advance_offset(1, false);
    if matches!(p.peek(p.offset), Some(b' ' | b'\t')) {
        p.advance_offset(1, true);
    }
    p.close_unmatched_blocks();
    p.add_child(NodeData::BlockQuote);
    BlockStart::Container
}

fn try_atx_heading(p: &mut Parser<'_>, _container: NodeId) -> BlockStart {
    if p.indented() {
        return BlockStart::None;
    }
    let Some(m) = ATX_HEADING_MARKER.find(p.rest()) else {
        return BlockStart::None;
    };
    let level = m.as_str().trim_end().len() as u8;
    let marker_len = m.len();
    p.advance_next_nonspace();
    p.advance_offset(marker_len, false);
    p.close_unmatched_blocks();

    let end = p.ln.len() - 1;
    let rest = &p.ln[p.offset.min(end)..end];
    let content = if ATX_TRAILER_ONLY.is_match(rest) {
        ""
    } else {
        ATX_TRAILER.splitn(rest, 2).next().unwrap_or(rest)
    };
    let text = content.to_string();
    let heading = p.add_child(NodeData::Heading { level });
    p.tree.get_mut(heading).text = text;
    p.offset = p.ln.len();
    BlockStart::Leaf
}

fn try_fenced_code(p: &mut Parser<'_>, _container: NodeId) -> BlockStart {
    if p.indented() {
        return BlockStart::None;
    }
    let rest = p.rest();
    let bytes = rest.as_bytes();
    let Some(&fence_char) = bytes.first().filter(|&&b| b == b'`' || b == b'~') else {
        return BlockStart::None;
    };
    let fence_len = bytes.iter().take_while(|&&b| b == fence_char).count();
    if fence_len < 3 {
        return BlockStart::None;
    }
    // A backtick fence may not carry a backtick in its info string.
    if fence_char == b'`' && bytes[fence_len..].contains(&b'`') {
        return BlockStart::None;
    }
    let fence_offset = p.indent;
    p.close_unmatched_blocks();
    p.add_child(NodeData::CodeBlock {
        fenced: true,
        fence_char,
        fence_len,
        fence_offset,
        info: String::new(),
    });
    p.advance_next_nonspace();
    p.advance_offset(fence_len, false);
    BlockStart::Leaf
}

fn try_html_block(p: &mut Parser<'_>, container: NodeId) -> BlockStart {
    if p.indented() || p.peek(p.next_nonspace) != Some(b'<') {
        return BlockStart::None;
    }
    let rest = p.rest().to_string();
    for kind in 1..=7u8 {
        if !HTML_BLOCK_OPEN[kind as usize].is_match(&rest) {
            continue;
        }
        // Kind 7 may not interrupt a paragraph, not even lazily.
        if kind == 7
            && (p.tree[container].kind() == NodeKind::Paragraph
                || (!p.all_closed
                    && !p.blank
                    && p.tree[p.tip].kind() == NodeKind::Paragraph))
        {
            continue;
        }
        p.close_unmatched_blocks();
        // The offset stays put: leading spaces belong to the block.
        p.add_child(NodeData::HtmlBlock { kind });
        return BlockStart::Leaf;
    }
    BlockStart::None
}

fn try_setext_heading(p: &mut Parser<'_>, container: NodeId) -> BlockStart {
    if p.indented()
        || p.tree[container].kind() != NodeKind::Paragraph
        || !SETEXT_HEADING_LINE.is_match(p.rest())
    {
        return BlockStart::None;
    }
    let level = if p.peek(p.next_nonspace) == Some(b'=') {
        1
    } else {
        2
    };
    p.close_unmatched_blocks();

    // Resolve leading link reference definitions before converting.
    let mut text = std::mem::take(&mut p.tree.get_mut(container).text);
    while text.starts_with('[') {
        let consumed = link::parse_reference(&text, &mut p.refmap);
        if consumed == 0 {
            break;
        }
        text.drain(..consumed);
    }
    if text.is_empty() {
        // The whole paragraph was reference definitions; the line is not a
        // heading underline for anything. The emptied paragraph is dropped
        // at its own finalization.
        return BlockStart::None;
    }
    // The paragraph becomes the heading: relabeled in place, children and
    // position preserved.
    let node = p.tree.get_mut(container);
    node.data = NodeData::Heading { level };
    node.text = text;
    p.tip = container;
    p.offset = p.ln.len();
    BlockStart::Leaf
}

fn try_thematic_break(p: &mut Parser<'_>, _container: NodeId) -> BlockStart {
    if p.indented() || !THEMATIC_BREAK.is_match(p.rest()) {
        return BlockStart::None;
    }
    p.close_unmatched_blocks();
    p.add_child(NodeData::ThematicBreak);
    p.offset = p.ln.len();
    BlockStart::Leaf
}

fn try_indented_code(p: &mut Parser<'_>, _container: NodeId) -> BlockStart {
    if !p.indented() || p.blank || p.tree[p.tip].kind() == NodeKind::Paragraph {
        return BlockStart::None;
    }
    p.advance_offset(4, true);
    p.close_unmatched_blocks();
    p.add_child(NodeData::CodeBlock {
        fenced: false,
        fence_char: 0,
        fence_len: 0,
        fence_offset: 0,
        info: String::new(),
    });
    BlockStart::Leaf
}

/// Whether `line_rest` matches the close condition of an HTML block kind.
pub(super) fn html_block_closes(kind: u8, line_rest: &str) -> bool {
    (1..=5).contains(&kind) && HTML_BLOCK_CLOSE[kind as usize].is_match(line_rest)
}

/// Run a block's finalization rule after it closes.
pub(super) fn finalize_block(p: &mut Parser<'_>, id: NodeId) {
    match p.tree[id].kind() {
        NodeKind::Paragraph => finalize_paragraph(p, id),
        NodeKind::CodeBlock => finalize_code_block(p, id),
        NodeKind::HtmlBlock => finalize_html_block(p, id),
        NodeKind::List => list::finalize_list(p, id),
        _ => {}
    }
}

fn finalize_paragraph(p: &mut Parser<'_>, id: NodeId) {
    let mut text = std::mem::take(&mut p.tree.get_mut(id).text);
    while text.starts_with('[') {
        let consumed = link::parse_reference(&text, &mut p.refmap);
        if consumed == 0 {
            break;
        }
        text.drain(..consumed);
    }
    if !text.contains(|c: char| !c.is_whitespace()) {
        // Nothing left but reference definitions: the paragraph vanishes.
        p.tree.unlink(id);
        return;
    }
    if p.options.gfm_table && table::try_build_table(p, id, &text) {
        return;
    }
    p.tree.get_mut(id).text = text;
}

fn finalize_code_block(p: &mut Parser<'_>, id: NodeId) {
    let fenced = matches!(p.tree[id].data, NodeData::CodeBlock { fenced: true, .. });
    if fenced {
        // First accumulated line is the info string, the rest is content.
        let text = std::mem::take(&mut p.tree.get_mut(id).text);
        let (info_line, content) = match text.find('\n') {
            Some(nl) => (&text[..nl], &text[nl + 1..]),
            None => (text.as_str(), ""),
        };
        let info_string = super::inline::unescape(info_line.trim());
        let content = content.to_string();
        let node = p.tree.get_mut(id);
        if let NodeData::CodeBlock { ref mut info, .. } = node.data {
            *info = info_string;
        }
        node.text = content;
    } else {
        // Indented code drops trailing blank lines.
        let node = p.tree.get_mut(id);
        if let Some(m) = TRAILING_BLANK_LINES.find(&node.text) {
            let start = m.start();
            node.text.truncate(start);
            node.text.push('\n');
        }
    }
}

fn finalize_html_block(p: &mut Parser<'_>, id: NodeId) {
    // Trailing blank lines (including the final newline) are not content.
    let node = p.tree.get_mut(id);
    if let Some(m) = TRAILING_WHITESPACE_LINES.find(&node.text) {
        let start = m.start();
        node.text.truncate(start);
    }
}
