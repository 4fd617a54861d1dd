use std::ops::Range;

use salsa::Database;
use text_size::{TextRange, TextSize};
use weft_errors::InternalError;

use crate::{Lexer, SyntaxKind, check_canceled};

/// Materialized lexer output: `n` token kinds and `n + 1` start offsets, the last one being the
/// text length.
///
/// Offsets never decrease. Zero-width tokens are allowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSequence {
    starts: Vec<TextSize>,
    kinds: Vec<SyntaxKind>,
}

impl TokenSequence {
    /// Runs `lexer` over `text` to exhaustion.
    ///
    /// A lexer that moves backwards is reported and its offset clamped to the previous one,
    /// so the sequence stays monotonic.
    pub fn lex<'t>(db: &dyn Database, text: &'t str, lexer: &mut dyn Lexer<'t>) -> Self {
        let approx = Ord::max(10, text.len() / 5);
        let mut starts = Vec::with_capacity(approx + 1);
        let mut kinds = Vec::with_capacity(approx);

        lexer.start(text);
        let mut offset = TextSize::new(0);
        let mut step = 0;

        while let Some(kind) = lexer.token() {
            check_canceled(db, step);
            step += 1;

            let start = lexer.token_start();
            if start < offset {
                report_descending_offset(text, lexer, &starts, &kinds, offset);
            } else {
                offset = start;
            }

            starts.push(offset);
            kinds.push(kind);
            lexer.advance();
        }

        starts.push(TextSize::of(text));

        Self { starts, kinds }
    }

    /// Builds a sequence from already known parts, `starts` holding the trailing text length.
    pub fn from_parts(starts: Vec<TextSize>, kinds: Vec<SyntaxKind>) -> Self {
        assert_eq!(starts.len(), kinds.len() + 1, "token starts must include the end offset");
        debug_assert!(starts.is_sorted(), "token starts must not decrease");
        Self { starts, kinds }
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

    /// Start of token `index`; `start(len())` is the end of the text.
    pub fn start(&self, index: usize) -> TextSize {
        self.starts[index]
    }

    pub fn range(&self, index: usize) -> TextRange {
        TextRange::new(self.starts[index], self.starts[index + 1])
    }

    pub fn kinds(&self) -> &[SyntaxKind] {
        &self.kinds
    }

    pub fn starts(&self) -> &[TextSize] {
        &self.starts
    }

    /// Tokens `range` rebased to offset zero, ending at `text_len`.
    ///
    /// Used to hand a sub-range of an outer sequence to a nested builder.
    pub fn slice(&self, range: Range<usize>, text_len: TextSize) -> Self {
        let base = self.starts[range.start];
        let mut starts: Vec<_> = self.starts[range.clone()].iter().map(|&it| it - base).collect();
        starts.push(text_len);
        Self { starts, kinds: self.kinds[range].to_vec() }
    }

    pub fn remap(&mut self, index: usize, kind: SyntaxKind) {
        self.kinds[index] = kind;
    }
}

fn report_descending_offset<'t>(
    text: &'t str,
    lexer: &dyn Lexer<'t>,
    starts: &[TextSize],
    kinds: &[SyntaxKind],
    offset: TextSize,
) {
    let this_start = lexer.token_start();
    let this = TextRange::new(this_start, Ord::max(this_start, lexer.token_end()));

    let mut error = InternalError::new("Token sequence broken", text)
        .annotate(this, format!("this: {:?}", lexer.token()));
    if let (Some(&prev_start), Some(prev_kind)) = (starts.last(), kinds.last()) {
        error = error.annotate(TextRange::new(prev_start, offset), format!("prev: {prev_kind:?}"));
    }
    let index = kinds.len();
    let error = error.note(format!("token {index} starts at {this_start:?}, before {offset:?}"));

    tracing::error!("{error}");
}
