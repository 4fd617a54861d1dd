use text_size::TextSize;

use crate::SyntaxKind;

/// Cursor-style lexer driven to exhaustion by [`TokenSequence::lex`](crate::TokenSequence::lex).
///
/// Token start offsets must never decrease.
pub trait Lexer<'t> {
    /// Restarts the lexer on `text`, positioned at its first token.
    fn start(&mut self, text: &'t str);

    /// Kind of the current token, `None` at the end of input.
    fn token(&self) -> Option<SyntaxKind>;

    fn token_start(&self) -> TextSize;

    fn token_end(&self) -> TextSize;

    fn advance(&mut self);
}
