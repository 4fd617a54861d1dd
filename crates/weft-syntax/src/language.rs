use crate::{KindSet, Lexer, SyntaxKind};

/// How a kind behaves when a marker of that kind is collapsed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Laziness {
    /// A collapsed marker becomes a plain leaf.
    #[default]
    Eager,
    /// A collapsed marker becomes a chameleon: a leaf whose contents can be parsed later.
    Lazy {
        /// Heavy trees keep the collapsed token sequence so a later parse can skip lexing.
        reuse_collapsed_tokens: bool,
        /// Light trees expand the chameleon on demand with a nested builder.
        light: bool,
    },
}

impl Laziness {
    pub fn is_lazy(self) -> bool {
        matches!(self, Self::Lazy { .. })
    }

    pub fn is_light(self) -> bool {
        matches!(self, Self::Lazy { light: true, .. })
    }

    pub fn reuses_collapsed_tokens(self) -> bool {
        matches!(self, Self::Lazy { reuse_collapsed_tokens: true, .. })
    }
}

/// Per-language token classification consumed by the builder.
pub trait Language {
    /// Human readable name, used in tree dumps and diagnostics.
    fn kind_name(&self, kind: SyntaxKind) -> &'static str;

    fn whitespace(&self) -> &KindSet;

    fn comments(&self) -> &KindSet;

    /// Left-bound kinds stick to the preceding token when their span holds no real tokens.
    fn is_left_bound(&self, _kind: SyntaxKind) -> bool {
        false
    }

    /// Zero-width tokens are only turned into leaves for kinds that ask for it.
    fn keeps_empty_leaf(&self, _kind: SyntaxKind) -> bool {
        false
    }

    fn laziness(&self, _kind: SyntaxKind) -> Laziness {
        Laziness::Eager
    }

    /// Lexer used to expand a chameleon that the outer lexer produced as a single token.
    fn lazy_lexer<'t>(&self, _kind: SyntaxKind) -> Option<Box<dyn Lexer<'t> + 't>> {
        None
    }
}
