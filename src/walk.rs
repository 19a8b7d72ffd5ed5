//! Generic tree-walk dispatch.
//!
//! Every node is visited twice, once entering and once exiting, so visitors
//! can emit matching open/close output without recursion of their own. The
//! walk itself is iterative; document depth never touches the call stack.

use crate::error::RenderError;
use crate::node::{NodeId, Tree};

/// Flow control returned by a [`Visitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    /// Keep walking.
    Continue,
    /// Skip this node's children. The exiting visit for the node itself
    /// still happens.
    SkipChildren,
    /// Abort the walk.
    Stop,
}

/// A tree-walk callback. Implemented by the built-in renderers and by any
/// custom traversal.
pub trait Visitor {
    /// Called twice per node: once with `entering == true` before its
    /// children, once with `entering == false` after them.
    fn visit(&mut self, tree: &Tree, node: NodeId, entering: bool)
        -> Result<WalkStatus, RenderError>;
}

/// Walk the subtree rooted at `root` in depth-first order, calling `visitor`
/// on enter and exit of every node.
pub fn walk(tree: &Tree, root: NodeId, visitor: &mut impl Visitor) -> Result<(), RenderError> {
    let mut node = root;
    let mut entering = true;

    loop {
        if entering {
            let status = visitor.visit(tree, node, true)?;
            match status {
                WalkStatus::Stop => return Ok(()),
                WalkStatus::SkipChildren => entering = false,
                WalkStatus::Continue => match tree.first_child(node) {
                    Some(child) => node = child,
                    None => entering = false,
                },
            }
        } else {
            if visitor.visit(tree, node, false)? == WalkStatus::Stop {
                return Ok(());
            }
            if node == root {
                return Ok(());
            }
            match tree.next(node) {
                Some(sibling) => {
                    node = sibling;
                    entering = true;
                }
                None => {
                    node = tree
                        .parent(node)
                        .expect("walked above the root of the traversal");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeData, NodeKind};

    /// Records `(kind, entering)` events, optionally cutting the walk short.
    struct Recorder {
        events: Vec<(NodeKind, bool)>,
        skip: Option<NodeKind>,
        stop: Option<NodeKind>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                skip: None,
                stop: None,
            }
        }
    }

    impl Visitor for Recorder {
        fn visit(
            &mut self,
            tree: &Tree,
            node: NodeId,
            entering: bool,
        ) -> Result<WalkStatus, RenderError> {
            let kind = tree.kind(node);
            self.events.push((kind, entering));
            if entering && self.skip == Some(kind) {
                return Ok(WalkStatus::SkipChildren);
            }
            if entering && self.stop == Some(kind) {
                return Ok(WalkStatus::Stop);
            }
            Ok(WalkStatus::Continue)
        }
    }

    fn sample_tree() -> Tree {
        let mut tree = Tree::new("t");
        let para = tree.add(NodeData::Paragraph);
        tree.append_child(tree.root(), para);
        let em = tree.add(NodeData::Emphasis);
        tree.append_child(para, em);
        let text = tree.add(NodeData::Text);
        tree.append_child(em, text);
        tree
    }

    #[test]
    fn enter_exit_pairs_in_order() {
        let tree = sample_tree();
        let mut rec = Recorder::new();
        walk(&tree, tree.root(), &mut rec).unwrap();
        assert_eq!(
            rec.events,
            vec![
                (NodeKind::Document, true),
                (NodeKind::Paragraph, true),
                (NodeKind::Emphasis, true),
                (NodeKind::Text, true),
                (NodeKind::Text, false),
                (NodeKind::Emphasis, false),
                (NodeKind::Paragraph, false),
                (NodeKind::Document, false),
            ]
        );
    }

    #[test]
    fn skip_children_still_exits() {
        let tree = sample_tree();
        let mut rec = Recorder::new();
        rec.skip = Some(NodeKind::Emphasis);
        walk(&tree, tree.root(), &mut rec).unwrap();
        assert_eq!(
            rec.events,
            vec![
                (NodeKind::Document, true),
                (NodeKind::Paragraph, true),
                (NodeKind::Emphasis, true),
                (NodeKind::Emphasis, false),
                (NodeKind::Paragraph, false),
                (NodeKind::Document, false),
            ]
        );
    }

    #[test]
    fn stop_aborts_immediately() {
        let tree = sample_tree();
        let mut rec = Recorder::new();
        rec.stop = Some(NodeKind::Emphasis);
        walk(&tree, tree.root(), &mut rec).unwrap();
        assert_eq!(rec.events.last(), Some(&(NodeKind::Emphasis, true)));
    }

    #[test]
    fn walk_from_subtree_root_stays_inside() {
        let tree = sample_tree();
        let para = tree.first_child(tree.root()).unwrap();
        let mut rec = Recorder::new();
        walk(&tree, para, &mut rec).unwrap();
        assert_eq!(rec.events.first(), Some(&(NodeKind::Paragraph, true)));
        assert_eq!(rec.events.last(), Some(&(NodeKind::Paragraph, false)));
    }
}
