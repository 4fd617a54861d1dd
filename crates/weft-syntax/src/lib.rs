//! Token-level vocabulary shared by the builder and the trees it produces.
//!
//! A [`Lexer`] is run once per text to produce an immutable [`TokenSequence`]; everything
//! downstream addresses tokens by their index in that sequence.

mod cancel;
mod kind;
mod kind_set;
mod language;
mod lexer;
mod tokens;

pub use cancel::{CHECK_INTERVAL, check_canceled};
pub use kind::SyntaxKind;
pub use kind_set::KindSet;
pub use language::{Language, Laziness};
pub use lexer::Lexer;
pub use tokens::TokenSequence;
