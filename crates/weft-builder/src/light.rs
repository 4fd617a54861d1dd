//! Read-only view of a finished parse that never materializes nodes.
//!
//! Lazy regions of light-lazy kinds are parsed on first access by nested builders and stay
//! cached in the tree.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use salsa::Database;
use text_size::{TextRange, TextSize};
use weft_syntax::{Language, SyntaxKind};
use weft_tree::{SyntaxTree, TreeBuilder, TreeSink};

use crate::{Builder, CustomComparator};
use crate::materialize;
use crate::pool::{MarkerId, ProductionMarker};
use crate::production::Entry;

/// Node of a [`LightTree`]. Only meaningful for the tree that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LightNode {
    tree: u32,
    kind: NodeKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum NodeKind {
    Marker(MarkerId),
    Error(MarkerId),
    Token { index: u32, parent: MarkerId },
    Collapsed(MarkerId),
}

struct Nested<'db> {
    builder: Rc<Builder<'db>>,
    root: MarkerId,
    /// The lazy leaf this builder expanded; `None` for the outermost one.
    host: Option<LightNode>,
}

pub struct LightTree<'db> {
    trees: RefCell<Vec<Nested<'db>>>,
    expanded: RefCell<FxHashMap<LightNode, u32>>,
}

impl<'db> LightTree<'db> {
    pub(crate) fn new(mut builder: Builder<'db>) -> Self {
        let root = builder.prepare();
        Self {
            trees: RefCell::new(vec![Nested { builder: Rc::new(builder), root, host: None }]),
            expanded: RefCell::default(),
        }
    }

    fn builder(&self, tree: u32) -> Rc<Builder<'db>> {
        Rc::clone(&self.trees.borrow()[tree as usize].builder)
    }

    pub(crate) fn db(&self) -> &'db dyn Database {
        self.builder(0).db()
    }

    pub(crate) fn custom_comparator(&self) -> Option<Rc<dyn CustomComparator>> {
        self.builder(0).config().custom_comparator.clone()
    }

    pub fn language(&self) -> &'db dyn Language {
        self.builder(0).language()
    }

    pub fn root(&self) -> LightNode {
        LightNode { tree: 0, kind: NodeKind::Marker(self.trees.borrow()[0].root) }
    }

    /// The node for marker `id` of `tree`; a nested root stands for the leaf it expanded.
    fn lift(&self, tree: u32, id: MarkerId) -> LightNode {
        let trees = self.trees.borrow();
        let nested = &trees[tree as usize];
        match nested.host {
            Some(host) if nested.root == id => host,
            _ => LightNode { tree, kind: NodeKind::Marker(id) },
        }
    }

    pub fn parent(&self, node: LightNode) -> Option<LightNode> {
        let builder = self.builder(node.tree);
        let parent = match node.kind {
            NodeKind::Token { parent, .. } => Some(parent),
            NodeKind::Marker(id) if id == self.trees.borrow()[node.tree as usize].root => {
                let host = self.trees.borrow()[node.tree as usize].host;
                return host.and_then(|host| self.parent(host));
            }
            NodeKind::Marker(id) | NodeKind::Error(id) | NodeKind::Collapsed(id) => {
                builder.pool().parent(id)
            }
        };
        parent.map(|id| self.lift(node.tree, id))
    }

    pub fn kind(&self, node: LightNode) -> SyntaxKind {
        let builder = self.builder(node.tree);
        match node.kind {
            NodeKind::Marker(id) | NodeKind::Collapsed(id) => {
                builder.pool().start(id).kind.unwrap_or(SyntaxKind::ERROR)
            }
            NodeKind::Error(_) => SyntaxKind::ERROR,
            NodeKind::Token { index, .. } => builder.tokens().kind(index as usize),
        }
    }

    /// Token indices covered by `node` within its own builder.
    fn lexemes(builder: &Builder<'_>, node: LightNode) -> (usize, usize) {
        let pool = builder.pool();
        match node.kind {
            NodeKind::Marker(id) | NodeKind::Collapsed(id) => (
                pool.lexeme(Entry::Start(id)) as usize,
                pool.lexeme(Entry::End(id)) as usize,
            ),
            NodeKind::Error(id) => {
                let lexeme = pool.lexeme(Entry::Start(id)) as usize;
                (lexeme, lexeme)
            }
            NodeKind::Token { index, .. } => (index as usize, index as usize + 1),
        }
    }

    fn local_range(builder: &Builder<'_>, node: LightNode) -> TextRange {
        let (start, end) = Self::lexemes(builder, node);
        let tokens = builder.tokens();
        TextRange::new(tokens.start(start), tokens.start(end))
    }

    /// Range of `node` in the outermost text.
    pub fn range(&self, node: LightNode) -> TextRange {
        let builder = self.builder(node.tree);
        Self::local_range(&builder, node) + builder.offset()
    }

    pub fn start_offset(&self, node: LightNode) -> TextSize {
        self.range(node).start()
    }

    pub fn end_offset(&self, node: LightNode) -> TextSize {
        self.range(node).end()
    }

    pub fn text(&self, node: LightNode) -> &'db str {
        let builder = self.builder(node.tree);
        &builder.original_text()[Self::local_range(&builder, node)]
    }

    /// Message of an error point, or of a marker finished as an error.
    pub fn error_message(&self, node: LightNode) -> Option<String> {
        let builder = self.builder(node.tree);
        match node.kind {
            NodeKind::Error(id) | NodeKind::Marker(id) => {
                builder.pool().error_message(id).map(Into::into)
            }
            NodeKind::Token { .. } | NodeKind::Collapsed(_) => None,
        }
    }

    /// Tokens and collapsed markers are leaves; lazy leaves still have children.
    pub fn is_leaf(&self, node: LightNode) -> bool {
        matches!(node.kind, NodeKind::Token { .. } | NodeKind::Collapsed(_))
    }

    pub fn is_lazy(&self, node: LightNode) -> bool {
        self.is_leaf(node) && self.language().laziness(self.kind(node)).is_light()
    }

    /// Replaces the contents of `into` with the children of `node` and returns their number.
    pub fn children(&self, node: LightNode, into: &mut Vec<LightNode>) -> usize {
        into.clear();
        match node.kind {
            NodeKind::Marker(id) => self.marker_children(node.tree, id, into),
            NodeKind::Token { .. } | NodeKind::Collapsed(_) if self.is_lazy(node) => {
                let tree = self.expand(node);
                let root = self.trees.borrow()[tree as usize].root;
                self.marker_children(tree, root, into);
            }
            NodeKind::Token { .. } | NodeKind::Collapsed(_) | NodeKind::Error(_) => {}
        }
        into.len()
    }

    fn marker_children(&self, tree: u32, id: MarkerId, into: &mut Vec<LightNode>) {
        let builder = self.builder(tree);
        let pool = builder.pool();
        let tokens = builder.tokens();
        let language = builder.language();

        let push_tokens = |from: usize, to: usize, into: &mut Vec<LightNode>| {
            for index in from..to.min(tokens.len()) {
                let kind = tokens.kind(index);
                if !tokens.range(index).is_empty() || language.keeps_empty_leaf(kind) {
                    into.push(LightNode {
                        tree,
                        kind: NodeKind::Token { index: index as u32, parent: id },
                    });
                }
            }
        };

        let mut lexeme = pool.lexeme(Entry::Start(id)) as usize;
        for child in pool.children(id) {
            let start = pool.lexeme(Entry::Start(child)) as usize;
            push_tokens(lexeme, start, into);
            lexeme = lexeme.max(start);
            let kind = match pool.get(child) {
                ProductionMarker::Error(_) => NodeKind::Error(child),
                ProductionMarker::Start(_) => {
                    lexeme = lexeme.max(pool.lexeme(Entry::End(child)) as usize);
                    if pool.is_collapsed(child) {
                        NodeKind::Collapsed(child)
                    } else {
                        NodeKind::Marker(child)
                    }
                }
            };
            into.push(LightNode { tree, kind });
        }
        push_tokens(lexeme, pool.lexeme(Entry::End(id)) as usize, into);
    }

    /// Parses the lazy leaf `node` with a nested builder, once.
    fn expand(&self, node: LightNode) -> u32 {
        if let Some(&tree) = self.expanded.borrow().get(&node) {
            return tree;
        }

        let builder = self.builder(node.tree);
        let (start, end) = Self::lexemes(&builder, node);
        let mut nested = builder.nested(self.kind(node), start, end);
        let root = nested.prepare();

        let mut trees = self.trees.borrow_mut();
        let tree = trees.len() as u32;
        trees.push(Nested { builder: Rc::new(nested), root, host: Some(node) });
        drop(trees);

        self.expanded.borrow_mut().insert(node, tree);
        tree
    }

    /// Feeds the subtree of `node` to `sink`, the way a full build would.
    pub fn build_into(&self, node: LightNode, sink: &mut dyn TreeSink) {
        let builder = self.builder(node.tree);
        match node.kind {
            NodeKind::Marker(id) => materialize::bind(&builder, id, sink),
            NodeKind::Error(id) => {
                sink.start_error(builder.pool().error_message(id));
                sink.finish_node();
            }
            NodeKind::Token { index, .. } => {
                let index = index as usize;
                let kind = builder.tokens().kind(index);
                materialize::emit_leaf(&builder, kind, index, index + 1, false, sink);
            }
            NodeKind::Collapsed(id) => {
                let (start, end) = Self::lexemes(&builder, node);
                let kind = builder.pool().start(id).kind.unwrap_or(SyntaxKind::ERROR);
                materialize::emit_leaf(&builder, kind, start, end, true, sink);
            }
        }
    }

    pub(crate) fn to_tree(&self, node: LightNode) -> SyntaxTree {
        let mut sink = TreeBuilder::new();
        self.build_into(node, &mut sink);
        sink.finish()
    }
}
