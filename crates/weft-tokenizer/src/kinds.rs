//! Token and node kinds of the demo language.

use weft_syntax::SyntaxKind;

macro_rules! kinds {
    ($($name:ident = $raw:literal,)*) => {
        $(pub const $name: SyntaxKind = SyntaxKind::new($raw);)*

        pub(crate) fn name(kind: SyntaxKind) -> &'static str {
            match kind.into_raw() {
                $($raw => stringify!($name),)*
                _ => "UNKNOWN_KIND",
            }
        }
    };
}

kinds! {
    ERROR = 0,

    WHITESPACE = 1,
    LINE_COMMENT = 2,
    BLOCK_COMMENT = 3,
    IDENT = 4,
    NUMBER = 5,
    PLUS = 6,
    MINUS = 7,
    STAR = 8,
    SLASH = 9,
    EQ = 10,
    SEMI = 11,
    COMMA = 12,
    L_PAREN = 13,
    R_PAREN = 14,
    L_BRACE = 15,
    R_BRACE = 16,
    L_BRACKET = 17,
    R_BRACKET = 18,
    LET_KW = 19,
    FN_KW = 20,
    PUB_KW = 21,
    BRACKETED = 22,
    UNKNOWN = 23,

    FILE = 32,
    LET_STMT = 33,
    EXPR_STMT = 34,
    BINARY_EXPR = 35,
    PAREN_EXPR = 36,
    NAME_REF = 37,
    LITERAL = 38,
    EXPR = 39,
    BLOCK = 40,
    FN_DEF = 41,
    MODIFIER_LIST = 42,
    LIST = 43,
}
