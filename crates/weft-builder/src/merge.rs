//! Incremental reparse: diffs a fresh light tree against the previously built tree.

use salsa::Database;
use weft_syntax::{SyntaxKind, check_canceled};
use weft_tree::{DiffLog, DiffSink, Element, NodeId, SyntaxTree};

use crate::light::{LightNode, LightTree};

/// Three-valued answer of a node comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Equality {
    Yes,
    No,
    /// Equal as far as the node itself goes; the children decide.
    Unsure,
}

/// Outcome of [`Builder::reparse`](crate::Builder::reparse).
#[derive(Debug)]
pub enum Reparse {
    /// Edits that turn the old tree into the new parse.
    Merged(DiffLog),
    /// The trees were too deep to diff; this is the new tree built from scratch.
    Rebuilt(SyntaxTree),
}

struct Differ<'a, 'db> {
    db: &'db dyn Database,
    old: &'a SyntaxTree,
    new: &'a LightTree<'db>,
    sink: &'a mut dyn DiffSink,
    steps: usize,
}

pub(crate) fn merge(old: &SyntaxTree, new: &LightTree<'_>) -> DiffLog {
    let mut log = DiffLog::new();
    let mut differ = Differ { db: new.db(), old, new, sink: &mut log, steps: 0 };
    let (old_root, new_root) = (old.root(), new.root());
    if differ.types_equal(old_root, new_root) {
        differ.compare(old_root, new_root);
    } else {
        differ.replace(old_root, new_root);
    }
    log
}

impl Differ<'_, '_> {
    fn replace(&mut self, old: NodeId, new: LightNode) {
        self.sink.node_replaced(old, self.new.to_tree(new));
    }

    fn compare(&mut self, old: NodeId, new: LightNode) {
        self.steps += 1;
        check_canceled(self.db, self.steps);

        match self.deep_equal(old, new) {
            Equality::Yes => {}
            Equality::No => self.replace(old, new),
            Equality::Unsure => self.compare_unsure(old, new),
        }
    }

    fn diff_children(&mut self, old_parent: NodeId, new_parent: LightNode) {
        let old_tree = self.old;
        let old_children = old_tree.children(old_parent);
        let mut new_children = Vec::new();
        self.new.children(new_parent, &mut new_children);

        let mut start = 0;
        while start < old_children.len() && start < new_children.len() {
            if !self.same_node(old_children[start], new_children[start]) {
                break;
            }
            start += 1;
        }

        let mut old_end = old_children.len();
        let mut new_end = new_children.len();
        while old_end > start && new_end > start {
            if !self.same_node(old_children[old_end - 1], new_children[new_end - 1]) {
                break;
            }
            old_end -= 1;
            new_end -= 1;
        }

        let old_middle = &old_children[start..old_end];
        let new_middle = &new_children[start..new_end];
        let common = old_middle.len().min(new_middle.len());
        for (&old, &new) in old_middle.iter().zip(new_middle) {
            if self.types_equal(old, new) {
                self.compare(old, new);
            } else {
                self.replace(old, new);
            }
        }
        for &old in &old_middle[common..] {
            self.sink.node_deleted(old_parent, old);
        }
        for (offset, &new) in new_middle[common..].iter().enumerate() {
            let subtree = self.new.to_tree(new);
            self.sink.node_inserted(old_parent, subtree, start + common + offset);
        }
    }

    /// Compares a pair at the edges of a child list; false once the lists diverge.
    fn same_node(&mut self, old: NodeId, new: LightNode) -> bool {
        if !self.types_equal(old, new) {
            return false;
        }
        match self.deep_equal(old, new) {
            Equality::Yes => true,
            _ if !self.hashes_equal(old, new) => false,
            Equality::No => {
                self.replace(old, new);
                true
            }
            Equality::Unsure => {
                self.compare_unsure(old, new);
                true
            }
        }
    }

    fn compare_unsure(&mut self, old: NodeId, new: LightNode) {
        if self.old.is_leaf(old) || self.new.is_leaf(new) {
            self.replace(old, new);
        } else {
            self.diff_children(old, new);
        }
    }

    fn deep_equal(&self, old: NodeId, new: LightNode) -> Equality {
        let old_error = matches!(self.old.element(old), Element::Error { .. });
        let new_error = self.is_new_error(new);
        if old_error != new_error {
            return Equality::No;
        }
        if old_error {
            let message = self.new.error_message(new);
            return if self.old.error_message(old) == message.as_deref() {
                Equality::Unsure
            } else {
                Equality::No
            };
        }

        if let Some(comparator) = self.new.custom_comparator() {
            match comparator.compare(self.old, old, self.new, new) {
                Equality::Unsure => {}
                decided => return decided,
            }
        }

        if self.new.is_leaf(new) {
            return match self.old.element(old) {
                Element::Leaf { text, .. }
                | Element::Whitespace { text, .. }
                | Element::LazyLeaf { text, .. } => {
                    if **text == *self.new.text(new) { Equality::Yes } else { Equality::No }
                }
                _ => Equality::Unsure,
            };
        }
        Equality::Unsure
    }

    fn is_new_error(&self, new: LightNode) -> bool {
        self.new.kind(new) == SyntaxKind::ERROR && !self.new.is_leaf(new)
    }

    /// Old whitespace leaves match any whitespace kind.
    fn types_equal(&self, old: NodeId, new: LightNode) -> bool {
        let kind = self.new.kind(new);
        match self.old.element(old) {
            Element::Whitespace { .. } => {
                self.new.is_leaf(new) && self.new.language().whitespace().contains(kind)
            }
            Element::Error { .. } => self.is_new_error(new),
            element => element.kind() == kind,
        }
    }

    fn hashes_equal(&self, old: NodeId, new: LightNode) -> bool {
        self.old.text_matches(old, self.new.text(new))
    }
}
