use std::fmt::Write as _;

use la_arena::{Arena, Idx};
use text_size::{TextRange, TextSize};
use weft_errors::Diagnostic;
use weft_syntax::{Language, SyntaxKind, TokenSequence};

pub type NodeId = Idx<NodeData>;

/// Payload of a tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    Composite { kind: SyntaxKind },
    /// Point error, or a marker finished as an error. May have children.
    Error { message: Option<Box<str>> },
    Leaf { kind: SyntaxKind, text: Box<str> },
    Whitespace { kind: SyntaxKind, text: Box<str> },
    /// Collapsed region that can be parsed later, optionally carrying its own tokens.
    LazyLeaf { kind: SyntaxKind, text: Box<str>, tokens: Option<TokenSequence> },
}

impl Element {
    pub fn kind(&self) -> SyntaxKind {
        match *self {
            Element::Error { .. } => SyntaxKind::ERROR,
            Element::Composite { kind }
            | Element::Leaf { kind, .. }
            | Element::Whitespace { kind, .. }
            | Element::LazyLeaf { kind, .. } => kind,
        }
    }

    pub fn leaf_text(&self) -> Option<&str> {
        match self {
            Element::Leaf { text, .. }
            | Element::Whitespace { text, .. }
            | Element::LazyLeaf { text, .. } => Some(&**text),
            Element::Composite { .. } | Element::Error { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NodeData {
    pub(crate) element: Element,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// An owned, editable syntax tree.
#[derive(Clone, Debug)]
pub struct SyntaxTree {
    pub(crate) nodes: Arena<NodeData>,
    pub(crate) root: NodeId,
    pub(crate) depth_limit_exceeded: bool,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Set when the tree was built too deep for incremental merging.
    pub fn depth_limit_exceeded(&self) -> bool {
        self.depth_limit_exceeded
    }

    pub fn element(&self, node: NodeId) -> &Element {
        &self.nodes[node].element
    }

    pub fn kind(&self, node: NodeId) -> SyntaxKind {
        self.nodes[node].element.kind()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes[node].element.leaf_text().is_some()
    }

    pub fn error_message(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node].element {
            Element::Error { message } => message.as_deref(),
            _ => None,
        }
    }

    /// Leaves below `node` (or `node` itself), left to right.
    pub fn leaves(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![node];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                let data = &self.nodes[node];
                if data.element.leaf_text().is_some() {
                    return Some(node);
                }
                stack.extend(data.children.iter().rev());
            }
            None
        })
    }

    pub fn text(&self, node: NodeId) -> String {
        self.leaves(node).filter_map(|leaf| self.nodes[leaf].element.leaf_text()).collect()
    }

    pub fn text_len(&self, node: NodeId) -> TextSize {
        self.leaves(node)
            .filter_map(|leaf| self.nodes[leaf].element.leaf_text())
            .map(TextSize::of)
            .sum()
    }

    /// Compares the text of `node` with `text` without concatenating the leaves.
    pub fn text_matches(&self, node: NodeId, mut text: &str) -> bool {
        for leaf in self.leaves(node) {
            let Some(piece) = self.nodes[leaf].element.leaf_text() else { continue };
            match text.strip_prefix(piece) {
                Some(rest) => text = rest,
                None => return false,
            }
        }
        text.is_empty()
    }

    /// Offset range of `node` within the root.
    pub fn range(&self, node: NodeId) -> TextRange {
        let mut start = TextSize::new(0);
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            for &sibling in &self.nodes[parent].children {
                if sibling == current {
                    break;
                }
                start += self.text_len(sibling);
            }
            current = parent;
        }
        TextRange::at(start, self.text_len(node))
    }

    /// Error nodes that carry a message, in tree order.
    pub fn errors(&self) -> Vec<Diagnostic> {
        let mut errors = Vec::new();
        let mut offset = TextSize::new(0);
        self.collect_errors(self.root, &mut offset, &mut errors);
        errors
    }

    fn collect_errors(&self, node: NodeId, offset: &mut TextSize, errors: &mut Vec<Diagnostic>) {
        let data = &self.nodes[node];
        if let Some(text) = data.element.leaf_text() {
            *offset += TextSize::of(text);
            return;
        }
        let start = *offset;
        for &child in &data.children {
            self.collect_errors(child, offset, errors);
        }
        if let Element::Error { message: Some(message) } = &data.element {
            errors.push(Diagnostic::error(&**message, TextRange::new(start, *offset)));
        }
    }

    /// Takes the token sequence cached on a lazy leaf by a collapsing parse.
    pub fn take_cached_tokens(&mut self, node: NodeId) -> Option<TokenSequence> {
        match &mut self.nodes[node].element {
            Element::LazyLeaf { tokens, .. } => tokens.take(),
            _ => None,
        }
    }

    /// Indented `KIND@start..end` dump used by tests.
    pub fn debug_dump(&self, language: &dyn Language) -> String {
        let mut out = String::new();
        let mut offset = TextSize::new(0);
        self.dump_node(language, self.root, 0, &mut offset, &mut out);
        out
    }

    fn dump_node(
        &self,
        language: &dyn Language,
        node: NodeId,
        depth: usize,
        offset: &mut TextSize,
        out: &mut String,
    ) {
        let data = &self.nodes[node];
        let start = *offset;
        let end = start + self.text_len(node);
        let name = match data.element {
            Element::Error { .. } => "ERROR",
            _ => language.kind_name(data.element.kind()),
        };
        let indent = depth * 2;
        let _ = write!(out, "{:indent$}{name}@{start:?}..{end:?}", "");

        match &data.element {
            Element::Leaf { text, .. } | Element::Whitespace { text, .. } => {
                let _ = writeln!(out, " {text:?}");
            }
            Element::LazyLeaf { text, .. } => {
                let _ = writeln!(out, " {text:?} (lazy)");
            }
            Element::Error { message: Some(message) } => {
                let _ = writeln!(out, ": {message}");
            }
            Element::Error { message: None } | Element::Composite { .. } => {
                out.push('\n');
            }
        }

        if data.element.leaf_text().is_some() {
            *offset = end;
            return;
        }
        for &child in &data.children {
            self.dump_node(language, child, depth + 1, offset, out);
        }
    }

    /// Copies the nodes of `other` into this arena, returning the id of its root.
    fn transplant(&mut self, other: &SyntaxTree, node: NodeId, parent: Option<NodeId>) -> NodeId {
        let data = &other.nodes[node];
        let id = self.nodes.alloc(NodeData {
            element: data.element.clone(),
            parent,
            children: Vec::with_capacity(data.children.len()),
        });
        for &child in &data.children {
            let child = self.transplant(other, child, Some(id));
            self.nodes[id].children.push(child);
        }
        id
    }

    pub(crate) fn replace(&mut self, node: NodeId, subtree: &SyntaxTree) {
        let parent = self.nodes[node].parent;
        let new = self.transplant(subtree, subtree.root, parent);
        match parent {
            Some(parent) => {
                let children = &mut self.nodes[parent].children;
                if let Some(slot) = children.iter_mut().find(|it| **it == node) {
                    *slot = new;
                }
            }
            None => self.root = new,
        }
        self.nodes[node].parent = None;
    }

    pub(crate) fn remove(&mut self, parent: NodeId, node: NodeId) {
        self.nodes[parent].children.retain(|&it| it != node);
        self.nodes[node].parent = None;
    }

    pub(crate) fn insert(&mut self, parent: NodeId, subtree: &SyntaxTree, position: usize) {
        let new = self.transplant(subtree, subtree.root, Some(parent));
        let children = &mut self.nodes[parent].children;
        let position = position.min(children.len());
        children.insert(position, new);
    }
}

/// Tree equality by structure and text, ignoring arena layout.
impl PartialEq for SyntaxTree {
    fn eq(&self, other: &Self) -> bool {
        fn node_eq(a: &SyntaxTree, x: NodeId, b: &SyntaxTree, y: NodeId) -> bool {
            let (x, y) = (&a.nodes[x], &b.nodes[y]);
            x.element == y.element
                && x.children.len() == y.children.len()
                && x.children.iter().zip(&y.children).all(|(&x, &y)| node_eq(a, x, b, y))
        }
        node_eq(self, self.root, other, other.root)
    }
}

impl Eq for SyntaxTree {}
