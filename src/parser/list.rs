//! List marker parsing, list/item starts, and list finalization.

use crate::node::{ListData, ListKind, NodeData, NodeId, NodeKind};

use super::{BlockStart, Parser};

/// Try to open a list item (and, when needed, its list) at the current
/// position.
pub(super) fn try_list_item(p: &mut Parser<'_>, container: NodeId) -> BlockStart {
    let in_list = p.tree[container].kind() == NodeKind::List;
    if p.indented() && !in_list {
        return BlockStart::None;
    }
    let Some(mut data) = parse_list_marker(p, container) else {
        return BlockStart::None;
    };
    if p.options.gfm_task_list_item {
        if let Some(checked) = task_marker(&p.ln.as_bytes()[p.offset.min(p.ln.len())..]) {
            data.kind = ListKind::Task;
            data.checked = checked;
        }
    }
    p.close_unmatched_blocks();

    // Reuse the enclosing list only for a compatible marker.
    let need_list = match &p.tree[p.tip].data {
        NodeData::List(open) if p.tree[p.tip].open => !lists_match(open, &data),
        _ => true,
    };
    if need_list {
        p.add_child(NodeData::List(data.clone()));
    }
    p.add_child(NodeData::ListItem(data));
    BlockStart::Container
}

/// Two list markers belong to the same list. Task and plain items mix
/// freely, so only the marker shape matters.
fn lists_match(a: &ListData, b: &ListData) -> bool {
    a.delimiter == b.delimiter && a.bullet_char == b.bullet_char
}

/// The GFM task marker at the start of an item's content, if any.
fn task_marker(content: &[u8]) -> Option<bool> {
    let checked = match content {
        [b'[', b' ', b']', ..] => false,
        [b'[', b'x' | b'X', b']', ..] => true,
        _ => return None,
    };
    match content.get(3) {
        None | Some(b' ' | b'\t' | b'\n') => Some(checked),
        _ => None,
    }
}

/// Parse a list marker at the current position, advancing the cursor past
/// the marker and computing the content padding (the W+N rule).
fn parse_list_marker(p: &mut Parser<'_>, container: NodeId) -> Option<ListData> {
    if p.indent >= 4 {
        return None;
    }
    let interrupts_paragraph = p.tree[container].kind() == NodeKind::Paragraph;
    let rest = p.rest().as_bytes();

    let mut data = ListData {
        marker_offset: p.indent,
        ..ListData::default()
    };
    let marker_len;
    match rest.first() {
        Some(&c @ (b'*' | b'+' | b'-')) => {
            data.kind = ListKind::Bullet;
            data.bullet_char = c;
            data.marker = (c as char).to_string();
            marker_len = 1;
        }
        Some(b'0'..=b'9') => {
            let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            let delimiter = match rest.get(digits) {
                Some(&d @ (b'.' | b')')) => d,
                _ => return None,
            };
            let digit_str = std::str::from_utf8(&rest[..digits]).ok()?;
            let start: u32 = digit_str.parse().ok()?;
            // An ordered list interrupts a paragraph only when it starts
            // at 1.
            if interrupts_paragraph && start != 1 {
                return None;
            }
            data.kind = ListKind::Ordered;
            data.start = start;
            data.delimiter = delimiter;
            data.marker = digit_str.to_string();
            marker_len = digits + 1;
        }
        _ => return None,
    }

    // The marker must be followed by whitespace or end the line.
    if !matches!(
        p.peek(p.next_nonspace + marker_len),
        None | Some(b' ' | b'\t' | b'\n')
    ) {
        return None;
    }
    // No marker may interrupt a paragraph with a blank first line.
    if interrupts_paragraph
        && !p.ln[p.next_nonspace + marker_len..]
            .contains(|c: char| !matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'))
    {
        return None;
    }

    p.advance_next_nonspace();
    p.advance_offset(marker_len, true);

    // Count spaces after the marker; more than four (or none, or a blank
    // item) collapses the padding to marker + one space.
    let spaces_start_col = p.column;
    let spaces_start_offset = p.offset;
    loop {
        p.advance_offset(1, true);
        let next = p.peek(p.offset);
        if p.column - spaces_start_col >= 5 || !matches!(next, Some(b' ' | b'\t')) {
            break;
        }
    }
    let blank_item = matches!(p.peek(p.offset), None | Some(b'\n'));
    let spaces_after_marker = p.column - spaces_start_col;
    if spaces_after_marker >= 5 || spaces_after_marker < 1 || blank_item {
        data.padding = marker_len + 1;
        p.column = spaces_start_col;
        p.offset = spaces_start_offset;
        p.partially_consumed_tab = false;
        if matches!(p.peek(p.offset), Some(b' ' | b'\t')) {
            p.advance_offset(1, true);
        }
    } else {
        data.padding = marker_len + spaces_after_marker;
    }
    Some(data)
}

/// Compute list tightness and ordered-item ordinals once all items are in.
pub(super) fn finalize_list(p: &mut Parser<'_>, list: NodeId) {
    let mut tight = true;
    let mut item = p.tree.first_child(list);
    'outer: while let Some(it) = item {
        let next_item = p.tree.next(it);
        // A blank line inside the list (but not after its last block)
        // makes the whole list loose.
        if ends_with_blank_line(p, it) && next_item.is_some() {
            tight = false;
            break;
        }
        let mut sub = p.tree.first_child(it);
        while let Some(s) = sub {
            let next_sub = p.tree.next(s);
            if ends_with_blank_line(p, s) && (next_item.is_some() || next_sub.is_some()) {
                tight = false;
                break 'outer;
            }
            sub = next_sub;
        }
        item = next_item;
    }

    if let NodeData::List(ref mut data) = p.tree.get_mut(list).data {
        data.tight = tight;
    }
    let mut start = 1;
    // Task items keep their marker shape; only ordered markers (no bullet
    // char) carry ordinals.
    let ordered = match &p.tree[list].data {
        NodeData::List(data) => {
            start = data.start;
            data.bullet_char == 0
        }
        _ => false,
    };

    let items: Vec<NodeId> = p.tree.children(list).collect();
    for (i, it) in items.into_iter().enumerate() {
        if let NodeData::ListItem(ref mut data) = p.tree.get_mut(it).data {
            data.tight = tight;
            if ordered {
                data.num = Some(start + i as u32);
            }
        }
    }
}

/// Whether a block's last content line was blank, memoized per node.
fn ends_with_blank_line(p: &mut Parser<'_>, mut block: NodeId) -> bool {
    loop {
        if p.tree[block].last_line_checked {
            return p.tree[block].last_line_blank;
        }
        let kind = p.tree[block].kind();
        if p.tree[block].last_line_blank {
            p.tree.get_mut(block).last_line_checked = true;
            return true;
        }
        if matches!(kind, NodeKind::List | NodeKind::ListItem) {
            if let Some(last) = p.tree.last_child(block) {
                p.tree.get_mut(block).last_line_checked = true;
                block = last;
                continue;
            }
        }
        p.tree.get_mut(block).last_line_checked = true;
        return false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Tree;
    use crate::options::Options;

    fn tree_of(input: &str) -> Tree {
        crate::parser::parse("t", input, &Options::default())
    }

    fn gfm_tree_of(input: &str) -> Tree {
        crate::parser::parse("t", input, &Options::default().gfm(true))
    }

    fn list_data(tree: &Tree, id: NodeId) -> &ListData {
        match &tree[id].data {
            NodeData::List(d) | NodeData::ListItem(d) => d,
            other => panic!("not a list node: {other:?}"),
        }
    }

    #[test]
    fn bullet_list_basic() {
        let tree = tree_of("- a\n- b\n");
        let list = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(list), NodeKind::List);
        let d = list_data(&tree, list);
        assert_eq!(d.kind, ListKind::Bullet);
        assert_eq!(d.bullet_char, b'-');
        assert!(d.tight);
        assert_eq!(tree.children(list).count(), 2);
    }

    #[test]
    fn ordered_list_start_and_ordinals() {
        let tree = tree_of("3. a\n1. b\n2. c\n");
        let list = tree.first_child(tree.root()).unwrap();
        let d = list_data(&tree, list);
        assert_eq!(d.kind, ListKind::Ordered);
        assert_eq!(d.start, 3);
        let nums: Vec<Option<u32>> = tree
            .children(list)
            .map(|it| list_data(&tree, it).num)
            .collect();
        assert_eq!(nums, vec![Some(3), Some(4), Some(5)]);
    }

    #[test]
    fn ten_digit_marker_rejected() {
        let tree = tree_of("1234567890. nope\n");
        let first = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(first), NodeKind::Paragraph);
    }

    #[test]
    fn ordered_interrupting_paragraph_needs_start_one() {
        let tree = tree_of("para\n2. nope\n");
        assert_eq!(
            tree.children(tree.root())
                .map(|c| tree.kind(c))
                .collect::<Vec<_>>(),
            vec![NodeKind::Paragraph]
        );
        let tree = tree_of("para\n1. yes\n");
        assert_eq!(
            tree.children(tree.root())
                .map(|c| tree.kind(c))
                .collect::<Vec<_>>(),
            vec![NodeKind::Paragraph, NodeKind::List]
        );
    }

    #[test]
    fn wide_marker_gap_collapses_padding() {
        // Five spaces after the marker: content is an indented chunk, the
        // item padding stays at marker + 1.
        let tree = tree_of("-     code\n");
        let list = tree.first_child(tree.root()).unwrap();
        let item = tree.first_child(list).unwrap();
        assert_eq!(list_data(&tree, item).padding, 2);
        let code = tree.first_child(item).unwrap();
        assert_eq!(tree.kind(code), NodeKind::CodeBlock);
    }

    #[test]
    fn loose_list_detected() {
        let tree = tree_of("- a\n\n- b\n");
        let list = tree.first_child(tree.root()).unwrap();
        assert!(!list_data(&tree, list).tight);
    }

    #[test]
    fn trailing_blank_keeps_list_tight() {
        let tree = tree_of("- a\n- b\n\npara\n");
        let list = tree.first_child(tree.root()).unwrap();
        assert!(list_data(&tree, list).tight);
    }

    #[test]
    fn changed_bullet_char_opens_new_list() {
        let tree = tree_of("- a\n* b\n");
        let kinds: Vec<NodeKind> = tree.children(tree.root()).map(|c| tree.kind(c)).collect();
        assert_eq!(kinds, vec![NodeKind::List, NodeKind::List]);
    }

    #[test]
    fn task_marker_detected_with_gfm() {
        let tree = gfm_tree_of("* [x] done\n* [ ] todo\n");
        let list = tree.first_child(tree.root()).unwrap();
        let items: Vec<NodeId> = tree.children(list).collect();
        assert_eq!(list_data(&tree, items[0]).kind, ListKind::Task);
        assert!(list_data(&tree, items[0]).checked);
        assert!(!list_data(&tree, items[1]).checked);
    }

    #[test]
    fn task_marker_detected_on_ordered_items() {
        let tree = gfm_tree_of("1. [x] done\n2. [ ] todo\n");
        let list = tree.first_child(tree.root()).unwrap();
        let items: Vec<NodeId> = tree.children(list).collect();
        assert_eq!(list_data(&tree, items[0]).kind, ListKind::Task);
        assert!(list_data(&tree, items[0]).checked);
        assert_eq!(list_data(&tree, items[1]).kind, ListKind::Task);
        assert_eq!(list_data(&tree, items[1]).num, Some(2));
    }

    #[test]
    fn task_marker_ignored_without_gfm() {
        let tree = tree_of("* [x] done\n");
        let list = tree.first_child(tree.root()).unwrap();
        let item = tree.first_child(list).unwrap();
        assert_eq!(list_data(&tree, item).kind, ListKind::Bullet);
    }

    #[test]
    fn nested_empty_item_stays_tight() {
        let tree = tree_of("- -\n");
        let outer = tree.first_child(tree.root()).unwrap();
        assert!(list_data(&tree, outer).tight);
        let outer_item = tree.first_child(outer).unwrap();
        let inner = tree.first_child(outer_item).unwrap();
        assert_eq!(tree.kind(inner), NodeKind::List);
        assert!(list_data(&tree, inner).tight);
    }
}
