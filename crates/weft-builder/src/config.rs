use std::fmt;
use std::rc::Rc;

use weft_syntax::SyntaxKind;
use weft_tree::{NodeId, SyntaxTree};

use crate::binder::{DefaultLeft, DefaultRight, EdgeBinder};
use crate::light::{LightNode, LightTree};
use crate::merge::Equality;
use crate::Builder;

/// Depth past which a reparse rebuilds the tree instead of merging it.
pub const DEFAULT_REPARSE_DEPTH_LIMIT: usize = 1000;

/// Parses the contents of a lazy region when a light tree expands it.
pub trait LazyParser {
    /// Drives `builder`, which covers exactly the region, until a single root marker of `kind`
    /// is done.
    fn parse(&self, kind: SyntaxKind, builder: &mut Builder<'_>);
}

/// Language-specific node equality consulted before the built-in merge rules.
///
/// Returning [`Equality::Unsure`] defers to the built-in rules.
pub trait CustomComparator {
    fn compare(
        &self,
        old: &SyntaxTree,
        old_node: NodeId,
        new: &LightTree<'_>,
        new_node: LightNode,
    ) -> Equality;
}

/// Settings shared by a builder and the nested builders it spawns.
#[derive(Clone)]
pub struct BuilderConfig {
    /// Binder for left edges of markers without an override.
    pub left_binder: Rc<dyn EdgeBinder>,
    /// Binder for right edges of markers and for error points.
    pub right_binder: Rc<dyn EdgeBinder>,
    /// Records marker creation sites and checks nesting on every `done`.
    pub debug_mode: bool,
    pub reparse_depth_limit: usize,
    /// Re-lex text whose tokens were cached by a collapsing parse and compare the results.
    pub verify_cached_tokens: bool,
    pub lazy_parser: Option<Rc<dyn LazyParser>>,
    pub custom_comparator: Option<Rc<dyn CustomComparator>>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            left_binder: Rc::new(DefaultLeft),
            right_binder: Rc::new(DefaultRight),
            debug_mode: false,
            reparse_depth_limit: DEFAULT_REPARSE_DEPTH_LIMIT,
            verify_cached_tokens: false,
            lazy_parser: None,
            custom_comparator: None,
        }
    }
}

impl BuilderConfig {
    pub fn debug() -> Self {
        Self { debug_mode: true, ..Self::default() }
    }
}

impl fmt::Debug for BuilderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderConfig")
            .field("debug_mode", &self.debug_mode)
            .field("reparse_depth_limit", &self.reparse_depth_limit)
            .field("verify_cached_tokens", &self.verify_cached_tokens)
            .field("lazy_parser", &self.lazy_parser.is_some())
            .field("custom_comparator", &self.custom_comparator.is_some())
            .finish_non_exhaustive()
    }
}
