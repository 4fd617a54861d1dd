//! Policies deciding where a marker edge lands inside a run of whitespace and comments.

use text_size::TextSize;
use weft_syntax::{KindSet, SyntaxKind};

/// The whitespace/comment tokens adjacent to a marker edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeTokens<'a> {
    pub(crate) kinds: &'a [SyntaxKind],
    /// One more entry than `kinds`.
    pub(crate) starts: &'a [TextSize],
    pub(crate) text: &'a str,
}

impl<'a> EdgeTokens<'a> {
    pub fn new(kinds: &'a [SyntaxKind], starts: &'a [TextSize], text: &'a str) -> Self {
        assert_eq!(kinds.len() + 1, starts.len());
        Self { kinds, starts, text }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kind(&self, index: usize) -> SyntaxKind {
        self.kinds[index]
    }

    pub fn text(&self, index: usize) -> &'a str {
        let start = usize::from(self.starts[index]);
        let end = usize::from(self.starts[index + 1]);
        &self.text[start..end]
    }
}

/// Chooses the position of a marker edge within `tokens`: `0` puts the edge before the whole
/// run, `tokens.len()` after it.
pub trait EdgeBinder {
    fn edge_position(&self, tokens: &EdgeTokens<'_>, at_stream_edge: bool) -> usize;

    /// Recursive binders may pull edges of earlier markers back to the chosen position.
    fn is_recursive(&self) -> bool {
        false
    }
}

/// Left edges skip leading whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLeft;

impl EdgeBinder for DefaultLeft {
    fn edge_position(&self, tokens: &EdgeTokens<'_>, _at_stream_edge: bool) -> usize {
        tokens.len()
    }
}

/// Right edges stop before trailing whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRight;

impl EdgeBinder for DefaultRight {
    fn edge_position(&self, _tokens: &EdgeTokens<'_>, _at_stream_edge: bool) -> usize {
        0
    }
}

/// Left edge that takes all preceding whitespace into the marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyLeft;

impl EdgeBinder for GreedyLeft {
    fn edge_position(&self, _tokens: &EdgeTokens<'_>, _at_stream_edge: bool) -> usize {
        0
    }
}

/// Right edge that takes all following whitespace into the marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyRight;

impl EdgeBinder for GreedyRight {
    fn edge_position(&self, tokens: &EdgeTokens<'_>, _at_stream_edge: bool) -> usize {
        tokens.len()
    }
}

/// Left edge that pulls in the comments directly above a declaration.
///
/// A blank line ends the attached block.
#[derive(Debug, Clone)]
pub struct LeadingComments {
    pub comments: KindSet,
}

impl EdgeBinder for LeadingComments {
    fn edge_position(&self, tokens: &EdgeTokens<'_>, _at_stream_edge: bool) -> usize {
        let mut position = tokens.len();
        for index in (0..tokens.len()).rev() {
            if self.comments.contains(tokens.kind(index)) {
                position = index;
            } else if tokens.text(index).matches('\n').count() > 1 {
                break;
            }
        }
        position
    }
}

/// Right edge that keeps comments on the same line as the end of the marker.
#[derive(Debug, Clone)]
pub struct TrailingComments {
    pub comments: KindSet,
}

impl EdgeBinder for TrailingComments {
    fn edge_position(&self, tokens: &EdgeTokens<'_>, _at_stream_edge: bool) -> usize {
        let mut position = 0;
        for index in 0..tokens.len() {
            if self.comments.contains(tokens.kind(index)) {
                position = index + 1;
            } else if tokens.text(index).contains('\n') {
                break;
            }
        }
        position
    }

    fn is_recursive(&self) -> bool {
        true
    }
}
