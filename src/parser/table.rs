//! GFM table recognition.
//!
//! Tables are not line-level blocks: a finalized paragraph whose second
//! line is a delimiter row is relabeled into a table in place, so a failed
//! candidate costs nothing and simply stays a paragraph.

use crate::node::{NodeData, NodeId, TableAlign};

use super::Parser;

/// Try to rebuild a finalized paragraph as a table. Returns `false` (and
/// leaves the tree untouched) unless the whole candidate parses.
pub(super) fn try_build_table(p: &mut Parser<'_>, id: NodeId, text: &str) -> bool {
    let lines: Vec<&str> = text.split_terminator('\n').collect();
    if lines.len() < 2 {
        return false;
    }
    let Some(aligns) = parse_delimiter_row(lines[1]) else {
        return false;
    };
    let header = split_row(lines[0]);
    if header.is_empty() || header.len() > aligns.len() {
        return false;
    }

    // Committed: the paragraph becomes the table, children built fresh.
    let node = p.tree.get_mut(id);
    node.data = NodeData::Table {
        aligns: aligns.clone(),
    };
    node.text.clear();

    let head = p.tree.add(NodeData::TableHead);
    p.tree.append_child(id, head);
    append_cells(p, head, &header, &aligns);

    for line in &lines[2..] {
        let cells = split_row(line);
        let row = p.tree.add(NodeData::TableRow);
        p.tree.append_child(id, row);
        append_cells(p, row, &cells, &aligns);
    }
    true
}

fn append_cells(p: &mut Parser<'_>, row: NodeId, cells: &[String], aligns: &[TableAlign]) {
    for (i, align) in aligns.iter().enumerate() {
        let cell = p.tree.add(NodeData::TableCell { align: *align });
        // Rows narrower than the delimiter row pad with empty cells.
        p.tree.get_mut(cell).text = cells.get(i).cloned().unwrap_or_default();
        p.tree.append_child(row, cell);
    }
}

/// Parse a delimiter row into its column alignments, or reject it.
fn parse_delimiter_row(line: &str) -> Option<Vec<TableAlign>> {
    let trimmed = line.trim();
    if !trimmed.contains('|')
        || trimmed
            .bytes()
            .any(|b| !matches!(b, b'|' | b'-' | b':' | b' ' | b'\t'))
    {
        return None;
    }
    let cols = strip_outer_pipes(trimmed);
    if cols.is_empty() {
        return None;
    }
    let mut aligns = Vec::with_capacity(cols.len());
    for col in cols {
        aligns.push(column_align(col.trim())?);
    }
    Some(aligns)
}

/// The alignment of one `:?-+:?` delimiter column.
fn column_align(col: &str) -> Option<TableAlign> {
    let bytes = col.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let left = bytes[0] == b':';
    let right = bytes[bytes.len() - 1] == b':';
    let dashes = &bytes[usize::from(left)..bytes.len() - usize::from(right)];
    if dashes.is_empty() || dashes.iter().any(|&b| b != b'-') {
        return None;
    }
    Some(match (left, right) {
        (false, false) => TableAlign::None,
        (true, false) => TableAlign::Left,
        (true, true) => TableAlign::Center,
        (false, true) => TableAlign::Right,
    })
}

/// Split a row on unescaped pipes, dropping the outer empty columns and
/// trimming cell text. One escaping backslash is removed per cell; the
/// rest are left for the inline pass.
fn split_row(line: &str) -> Vec<String> {
    strip_outer_pipes(line.trim())
        .into_iter()
        .map(|cell| cell.trim().replacen("\\|", "|", 1))
        .collect()
}

/// Split on unescaped `|` and drop the empty leading/trailing columns a
/// `|`-delimited row produces.
fn strip_outer_pipes(line: &str) -> Vec<&str> {
    let mut cols = Vec::new();
    let bytes = line.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'|' => {
                cols.push(&line[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    cols.push(&line[start.min(line.len())..]);
    if cols.first().is_some_and(|c| c.trim().is_empty()) {
        cols.remove(0);
    }
    if cols.last().is_some_and(|c| c.trim().is_empty()) {
        cols.pop();
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, Tree};
    use crate::options::Options;

    fn tree_of(input: &str) -> Tree {
        crate::parser::parse("t", input, &Options::default().gfm(true))
    }

    /// Concatenated inline text per cell; cell content is parsed into
    /// child nodes, so the cell's own text is empty.
    fn cell_texts(tree: &Tree, row: NodeId) -> Vec<String> {
        tree.children(row)
            .map(|cell| tree.children(cell).map(|c| tree[c].text.clone()).collect())
            .collect()
    }

    #[test]
    fn basic_table() {
        let tree = tree_of("| a | b |\n| --- | --- |\n| 1 | 2 |\n");
        let table = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(table), NodeKind::Table);
        let head = tree.first_child(table).unwrap();
        assert_eq!(tree.kind(head), NodeKind::TableHead);
        assert_eq!(cell_texts(&tree, head), vec!["a", "b"]);
        let row = tree.next(head).unwrap();
        assert_eq!(tree.kind(row), NodeKind::TableRow);
        assert_eq!(cell_texts(&tree, row), vec!["1", "2"]);
    }

    #[test]
    fn alignment_markers() {
        let tree = tree_of("a | b | c\n:-: | ---: | :--\nx | y | z\n");
        let table = tree.first_child(tree.root()).unwrap();
        let NodeData::Table { ref aligns } = tree[table].data else {
            panic!("expected table");
        };
        assert_eq!(
            aligns,
            &vec![TableAlign::Center, TableAlign::Right, TableAlign::Left]
        );
    }

    #[test]
    fn header_wider_than_delimiter_rejects() {
        let tree = tree_of("a | b | c\n--- | ---\nx | y\n");
        let first = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(first), NodeKind::Paragraph);
    }

    #[test]
    fn narrow_body_row_padded() {
        let tree = tree_of("| a | b |\n| --- | --- |\n| only |\n");
        let table = tree.first_child(tree.root()).unwrap();
        let row = tree.next(tree.first_child(table).unwrap()).unwrap();
        assert_eq!(cell_texts(&tree, row), vec!["only", ""]);
    }

    #[test]
    fn escaped_pipe_is_literal() {
        let tree = tree_of("| a\\|b |\n| --- |\n");
        let table = tree.first_child(tree.root()).unwrap();
        let head = tree.first_child(table).unwrap();
        assert_eq!(cell_texts(&tree, head), vec!["a|b"]);
    }

    #[test]
    fn split_row_unescapes_one_pipe_per_cell() {
        assert_eq!(split_row("| a\\|b\\|c |"), vec!["a|b\\|c"]);
    }

    #[test]
    fn pipes_only_is_not_a_table() {
        let tree = tree_of("|||\n|||\n");
        let first = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(first), NodeKind::Paragraph);
    }

    #[test]
    fn tables_off_leaves_paragraph() {
        let tree = crate::parser::parse(
            "t",
            "| a |\n| --- |\n",
            &Options::default(),
        );
        let first = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(first), NodeKind::Paragraph);
    }
}
