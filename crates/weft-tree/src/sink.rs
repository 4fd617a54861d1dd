use la_arena::Arena;
use weft_syntax::{SyntaxKind, TokenSequence};

use crate::{Element, NodeData, NodeId, SyntaxTree};

/// How a leaf produced by the builder should be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafFlavor {
    Token,
    Whitespace,
    /// A collapsed region of a lazy kind. `tokens` is set when the kind reuses collapsed tokens.
    Lazy { tokens: Option<TokenSequence> },
}

#[derive(Debug, Clone)]
pub struct Leaf<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub flavor: LeafFlavor,
}

/// Receives the structure of a finished parse, node by node.
pub trait TreeSink {
    fn start_node(&mut self, kind: SyntaxKind);

    /// Starts an error node. Point errors are started and finished immediately.
    fn start_error(&mut self, message: Option<&str>);

    fn leaf(&mut self, leaf: Leaf<'_>);

    fn finish_node(&mut self);
}

const DEFAULT_TREE_DEPTH: usize = 128;

/// Builds a [`SyntaxTree`] from sink events.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Arena<NodeData>,
    opened: Vec<NodeId>,
    root: Option<NodeId>,
    depth_limit_exceeded: bool,
}

impl Drop for TreeBuilder {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.opened.is_empty() {
            panic!("you should call `TreeBuilder::finish()`");
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            opened: Vec::with_capacity(DEFAULT_TREE_DEPTH),
            root: None,
            depth_limit_exceeded: false,
        }
    }

    pub fn mark_depth_limit_exceeded(&mut self) {
        self.depth_limit_exceeded = true;
    }

    fn push(&mut self, element: Element) -> NodeId {
        let parent = self.opened.last().copied();
        let node = self.nodes.alloc(NodeData { element, parent, children: Vec::new() });
        match parent {
            Some(parent) => self.nodes[parent].children.push(node),
            None => {
                assert!(self.root.is_none(), "tree already has a root");
                self.root = Some(node);
            }
        }
        node
    }

    fn open(&mut self, element: Element) {
        let node = self.push(element);
        self.opened.push(node);
    }

    /// Finishes building and returns the tree.
    pub fn finish(mut self) -> SyntaxTree {
        assert!(self.opened.is_empty(), "unfinished nodes left in the tree builder");
        let root = self.root.take().expect("no nodes were built");
        SyntaxTree {
            nodes: std::mem::take(&mut self.nodes),
            root,
            depth_limit_exceeded: self.depth_limit_exceeded,
        }
    }
}

impl TreeSink for TreeBuilder {
    fn start_node(&mut self, kind: SyntaxKind) {
        self.open(Element::Composite { kind });
    }

    fn start_error(&mut self, message: Option<&str>) {
        self.open(Element::Error { message: message.map(Into::into) });
    }

    fn leaf(&mut self, leaf: Leaf<'_>) {
        let Leaf { kind, text, flavor } = leaf;
        let text = text.into();
        let element = match flavor {
            LeafFlavor::Token => Element::Leaf { kind, text },
            LeafFlavor::Whitespace => Element::Whitespace { kind, text },
            LeafFlavor::Lazy { tokens } => Element::LazyLeaf { kind, text, tokens },
        };
        self.push(element);
    }

    fn finish_node(&mut self) {
        self.opened.pop().expect("no opened nodes?");
    }
}
