//! Emphasis, strong emphasis, and strikethrough resolution.
//!
//! Delimiter runs are collected during the scan as plain text nodes plus
//! entries on a linked delimiter stack; [`InlineParser::process_emphasis`]
//! later pairs openers with closers bottom-up, honoring the flanking rules
//! and the multiple-of-3 restriction.

use crate::node::{NodeData, NodeId};

use super::InlineParser;

/// One delimiter run on the stack. Entries form a doubly linked list over
/// arena indices; unlinked entries are simply never visited again.
#[derive(Debug, Clone)]
pub(super) struct Delimiter {
    pub node: NodeId,
    pub ch: u8,
    /// Remaining (unconsumed) run length.
    pub length: usize,
    /// Original run length, for the multiple-of-3 rule.
    pub orig_length: usize,
    pub can_open: bool,
    pub can_close: bool,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

impl InlineParser<'_, '_> {
    /// Consume a delimiter run: emit its text node and, when the run can
    /// participate in emphasis, push a stack entry.
    pub(super) fn handle_delim(&mut self, ch: u8) {
        let (count, can_open, can_close) = self.scan_delims(ch);
        let start = self.pos;
        self.pos += count;
        let literal = self.subject[start..self.pos].to_string();
        let node = self.add_text(&literal);

        // Strikethrough is strict GFM: only runs of exactly two tildes
        // ever pair up.
        let eligible = (can_open || can_close) && (ch != b'~' || count == 2);
        if !eligible {
            return;
        }
        let index = self.delimiters.len();
        self.delimiters.push(Delimiter {
            node,
            ch,
            length: count,
            orig_length: count,
            can_open,
            can_close,
            prev: self.delim_top,
            next: None,
        });
        if let Some(top) = self.delim_top {
            self.delimiters[top].next = Some(index);
        }
        self.delim_top = Some(index);
    }

    /// Classify the delimiter run at the cursor: its length and whether it
    /// can open and/or close emphasis, per the flanking rules.
    fn scan_delims(&self, ch: u8) -> (usize, bool, bool) {
        let bytes = self.subject.as_bytes();
        let count = bytes[self.pos..]
            .iter()
            .take_while(|&&b| b == ch)
            .count();

        let before = self.subject[..self.pos].chars().next_back().unwrap_or('\n');
        let after = self.subject[self.pos + count..].chars().next().unwrap_or('\n');

        let before_ws = before.is_whitespace();
        let before_punct = is_punctuation(before);
        let after_ws = after.is_whitespace();
        let after_punct = is_punctuation(after);

        let left_flanking = !after_ws && (!after_punct || before_ws || before_punct);
        let right_flanking = !before_ws && (!before_punct || after_ws || after_punct);

        let (can_open, can_close) = if ch == b'_' {
            (
                left_flanking && (!right_flanking || before_punct),
                right_flanking && (!left_flanking || after_punct),
            )
        } else {
            (left_flanking, right_flanking)
        };
        (count, can_open, can_close)
    }

    /// Pair up delimiters above `stack_bottom` (exclusive floor; `None`
    /// processes the whole stack), leaving unmatched runs as literal text.
    pub(super) fn process_emphasis(&mut self, stack_bottom: Option<usize>) {
        let above = |i: usize, floor: Option<usize>| floor.map_or(true, |f| i > f);

        // Bottom of the searched range per (char, closer length % 3).
        let mut openers_bottom = [[stack_bottom; 3]; 3];

        // Start at the bottom-most delimiter above the floor.
        let mut closer_opt = self.delim_top;
        while let Some(c) = closer_opt {
            match self.delimiters[c].prev {
                Some(p) if above(p, stack_bottom) => closer_opt = Some(p),
                _ => break,
            }
        }

        while let Some(closer) = closer_opt {
            let ch = self.delimiters[closer].ch;
            if !self.delimiters[closer].can_close {
                closer_opt = self.delimiters[closer].next;
                continue;
            }

            // Walk back for the nearest compatible opener.
            let closer_orig = self.delimiters[closer].orig_length;
            let floor = openers_bottom[char_index(ch)][closer_orig % 3];
            let mut opener_opt = self.delimiters[closer].prev;
            let mut found = None;
            while let Some(o) = opener_opt {
                if !above(o, stack_bottom) || !above(o, floor) {
                    break;
                }
                let od = &self.delimiters[o];
                if od.can_open && od.ch == ch {
                    let odd_match = (self.delimiters[closer].can_open || od.can_close)
                        && closer_orig % 3 != 0
                        && (od.orig_length + closer_orig) % 3 == 0;
                    if !odd_match {
                        found = Some(o);
                        break;
                    }
                }
                opener_opt = od.prev;
            }

            match found {
                Some(opener) if ch == b'~' => {
                    let node = self.tree.add(NodeData::Strikethrough);
                    self.wrap_between(opener, closer, node);
                    self.consume_delimiter(opener, 2);
                    let next = self.delimiters[closer].next;
                    self.consume_delimiter(closer, 2);
                    closer_opt = next;
                }
                Some(opener) => {
                    let strong = self.delimiters[closer].length >= 2
                        && self.delimiters[opener].length >= 2;
                    let used = if strong { 2 } else { 1 };
                    let node = self.tree.add(if strong {
                        NodeData::Strong
                    } else {
                        NodeData::Emphasis
                    });
                    self.wrap_between(opener, closer, node);
                    self.consume_delimiter(opener, used);
                    if self.delimiters[closer].length == used {
                        let next = self.delimiters[closer].next;
                        self.consume_delimiter(closer, used);
                        closer_opt = next;
                    } else {
                        self.consume_delimiter(closer, used);
                        closer_opt = Some(closer);
                    }
                }
                None => {
                    openers_bottom[char_index(ch)][closer_orig % 3] =
                        self.delimiters[closer].prev;
                    let next = self.delimiters[closer].next;
                    if !self.delimiters[closer].can_open {
                        // A closer that can never open has no further use.
                        self.remove_delimiter(closer);
                    }
                    closer_opt = next;
                }
            }
        }

        // Whatever is left above the floor stays literal.
        while let Some(top) = self.delim_top {
            if !above(top, stack_bottom) {
                break;
            }
            self.remove_delimiter(top);
        }
    }

    /// Move the nodes strictly between the opener's and closer's text
    /// nodes into `wrapper`, inserted right after the opener's node, and
    /// drop the stack entries between the two.
    fn wrap_between(&mut self, opener: usize, closer: usize, wrapper: NodeId) {
        let from = self.delimiters[opener].node;
        let to = self.delimiters[closer].node;
        let mut cur = self.tree.next(from);
        while let Some(n) = cur {
            if n == to {
                break;
            }
            let next = self.tree.next(n);
            self.tree.unlink(n);
            self.tree.append_child(wrapper, n);
            cur = next;
        }
        self.tree.insert_after(from, wrapper);

        self.delimiters[opener].next = Some(closer);
        self.delimiters[closer].prev = Some(opener);
    }

    /// Shrink a delimiter by `used` characters, dropping its entry (and
    /// its emptied text node) when fully spent.
    fn consume_delimiter(&mut self, index: usize, used: usize) {
        let node = self.delimiters[index].node;
        let length = self.delimiters[index].length;
        debug_assert!(used <= length);
        let remaining = length - used;
        self.delimiters[index].length = remaining;
        let text = &mut self.tree.get_mut(node).text;
        text.truncate(remaining);
        if remaining == 0 {
            self.tree.unlink(node);
            self.remove_delimiter(index);
        }
    }

    /// Unlink a stack entry from the delimiter list.
    fn remove_delimiter(&mut self, index: usize) {
        let prev = self.delimiters[index].prev;
        let next = self.delimiters[index].next;
        if let Some(p) = prev {
            self.delimiters[p].next = next;
        }
        match next {
            Some(n) => self.delimiters[n].prev = prev,
            None => self.delim_top = prev,
        }
    }
}

/// Delimiter stack slot for a delimiter character.
fn char_index(ch: u8) -> usize {
    match ch {
        b'*' => 0,
        b'_' => 1,
        _ => 2,
    }
}

/// The punctuation class of the flanking rules: ASCII punctuation plus
/// anything that is neither alphanumeric nor whitespace.
fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use crate::node::{NodeId, NodeKind, Tree};
    use crate::options::Options;

    fn parse(input: &str) -> (Tree, NodeId) {
        let tree = crate::parser::parse("t", input, &Options::default());
        let para = tree.first_child(tree.root()).unwrap();
        (tree, para)
    }

    fn parse_gfm(input: &str) -> (Tree, NodeId) {
        let tree = crate::parser::parse("t", input, &Options::default().gfm(true));
        let para = tree.first_child(tree.root()).unwrap();
        (tree, para)
    }

    fn kinds(tree: &Tree, id: NodeId) -> Vec<NodeKind> {
        tree.children(id).map(|c| tree.kind(c)).collect()
    }

    #[test]
    fn single_star_emphasis() {
        let (tree, para) = parse("*hi*\n");
        assert_eq!(kinds(&tree, para), vec![NodeKind::Emphasis]);
        let em = tree.first_child(para).unwrap();
        assert_eq!(tree[tree.first_child(em).unwrap()].text, "hi");
    }

    #[test]
    fn double_star_strong() {
        let (tree, para) = parse("**hi**\n");
        assert_eq!(kinds(&tree, para), vec![NodeKind::Strong]);
    }

    #[test]
    fn triple_star_nests_emphasis_in_strong() {
        let (tree, para) = parse("***hi***\n");
        assert_eq!(kinds(&tree, para), vec![NodeKind::Emphasis]);
        let em = tree.first_child(para).unwrap();
        assert_eq!(kinds(&tree, em), vec![NodeKind::Strong]);
    }

    #[test]
    fn intraword_underscore_stays_literal() {
        let (tree, para) = parse("a_b_c\n");
        assert_eq!(kinds(&tree, para), vec![NodeKind::Text; 5].as_slice());
        let text: String = tree.children(para).map(|c| tree[c].text.clone()).collect();
        assert_eq!(text, "a_b_c");
    }

    #[test]
    fn intraword_star_works() {
        let (tree, para) = parse("a*b*c\n");
        assert!(kinds(&tree, para).contains(&NodeKind::Emphasis));
    }

    #[test]
    fn multiple_of_three_rule() {
        // *foo**bar**baz* : the inner ** pair must not grab the outer *.
        let (tree, para) = parse("*foo**bar**baz*\n");
        assert_eq!(kinds(&tree, para), vec![NodeKind::Emphasis]);
        let em = tree.first_child(para).unwrap();
        assert!(kinds(&tree, em).contains(&NodeKind::Strong));
    }

    #[test]
    fn unmatched_opener_stays_literal() {
        let (tree, para) = parse("*open\n");
        let text: String = tree.children(para).map(|c| tree[c].text.clone()).collect();
        assert_eq!(text, "*open");
    }

    #[test]
    fn strikethrough_requires_double_tilde() {
        let (tree, para) = parse_gfm("~~gone~~ ~not~\n");
        let ks = kinds(&tree, para);
        assert_eq!(ks[0], NodeKind::Strikethrough);
        assert!(!ks[1..].contains(&NodeKind::Strikethrough));
    }

    #[test]
    fn tilde_literal_without_gfm() {
        let (tree, para) = parse("~~gone~~\n");
        let text: String = tree.children(para).map(|c| tree[c].text.clone()).collect();
        assert_eq!(text, "~~gone~~");
    }

    #[test]
    fn tilde_star_precedence() {
        // ~~*~~Hi* : emphasis wins, the tildes stay literal.
        let (tree, para) = parse_gfm("~~*~~Hi*\n");
        let ks = kinds(&tree, para);
        assert_eq!(ks, vec![NodeKind::Text, NodeKind::Emphasis]);
        assert_eq!(tree[tree.first_child(para).unwrap()].text, "~~");
        let em = tree.children(para).nth(1).unwrap();
        let inner: String = tree.children(em).map(|c| tree[c].text.clone()).collect();
        assert_eq!(inner, "~~Hi");
    }

    #[test]
    fn cjk_emphasis() {
        let (tree, para) = parse("**莠**\n");
        assert_eq!(kinds(&tree, para), vec![NodeKind::Strong]);
    }
}
