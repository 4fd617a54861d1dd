//! Marker-based tree builder.
//!
//! A hand-written parser walks the token stream of a [`Builder`] and brackets regions with
//! [`Marker`]s. Once parsing is done the recorded markers are turned into a
//! [`weft_tree::SyntaxTree`], exposed as a [`LightTree`], or diffed against the tree of a previous
//! parse.

mod binder;
mod builder;
mod config;
mod light;
mod marker;
mod materialize;
mod merge;
mod pool;
mod production;
#[cfg(test)]
mod tests;

/// Edge binders decide which neighbouring whitespace and comments a node owns.
pub use binder::{
    DefaultLeft, DefaultRight, EdgeBinder, EdgeTokens, GreedyLeft, GreedyRight, LeadingComments,
    TrailingComments,
};
/// The parser-facing builder.
pub use builder::{Builder, TokenRemapper, WhitespaceSkipped};
/// Builder settings and extension points.
pub use config::{BuilderConfig, CustomComparator, DEFAULT_REPARSE_DEPTH_LIMIT, LazyParser};
/// Node-free view of a finished parse.
pub use light::{LightNode, LightTree};
/// Handles to markers recorded by the builder.
pub use marker::{AsMarker, CompletedMarker, Marker};
/// Incremental reparse results.
pub use merge::{Equality, Reparse};
pub use pool::MarkerRef;
