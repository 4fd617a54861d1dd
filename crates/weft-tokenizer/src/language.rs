use weft_syntax::{KindSet, Language, Laziness, Lexer, SyntaxKind};

use crate::Tokenizer;
use crate::kinds::{self, *};

const WHITESPACE_SET: KindSet = KindSet::new([WHITESPACE]);
const COMMENT_SET: KindSet = KindSet::new([LINE_COMMENT, BLOCK_COMMENT]);

/// The demo language: `let` bindings, `fn` items with lazily parsed bodies, and arithmetic.
///
/// `{ ... }` bodies are collapsed into a single lazy `BLOCK`; `[ ... ]` lists are lexed as one
/// `BRACKETED` token and re-lexed only when a light tree expands them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tiny;

impl Language for Tiny {
    fn kind_name(&self, kind: SyntaxKind) -> &'static str {
        kinds::name(kind)
    }

    fn whitespace(&self) -> &KindSet {
        &WHITESPACE_SET
    }

    fn comments(&self) -> &KindSet {
        &COMMENT_SET
    }

    fn is_left_bound(&self, kind: SyntaxKind) -> bool {
        kind == MODIFIER_LIST
    }

    fn laziness(&self, kind: SyntaxKind) -> Laziness {
        match kind {
            BLOCK => Laziness::Lazy { reuse_collapsed_tokens: true, light: true },
            BRACKETED => Laziness::Lazy { reuse_collapsed_tokens: false, light: true },
            _ => Laziness::Eager,
        }
    }

    fn lazy_lexer<'t>(&self, kind: SyntaxKind) -> Option<Box<dyn Lexer<'t> + 't>> {
        (kind == BRACKETED).then(|| Box::new(Tokenizer::bracketed()) as Box<dyn Lexer<'t> + 't>)
    }
}
