//! Heavyweight syntax tree produced by the marker builder.
//!
//! Nodes own their text and live in an arena, so a tree can be edited in place by applying the
//! events of a [`DiffLog`].

mod diff;
mod sink;
mod tree;

/// Edit script against an existing tree.
pub use diff::{DiffEvent, DiffLog, DiffSink};
/// Node/leaf factory contract and its arena-backed implementation.
pub use sink::{Leaf, LeafFlavor, TreeBuilder, TreeSink};
/// The tree itself.
pub use tree::{Element, NodeData, NodeId, SyntaxTree};
