mod cursor;
pub mod kinds;
mod language;

use cursor::{Cursor, EOF_CHAR};
use kinds::*;
pub use language::Tiny;
use text_size::TextSize;
use weft_syntax::{Lexer, SyntaxKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// `[ ... ]` is a single `BRACKETED` token.
    Outer,
    /// Brackets are ordinary punctuation.
    Bracketed,
}

/// Lexer for the demo language, driven through [`Lexer`].
pub struct Tokenizer<'t> {
    text: &'t str,
    cursor: Cursor<'t>,
    mode: Mode,
    current: Option<SyntaxKind>,
    start: TextSize,
    end: TextSize,
}

impl Default for Tokenizer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'t> Tokenizer<'t> {
    pub fn new() -> Self {
        Self::with_mode(Mode::Outer)
    }

    /// Lexer for the inside of a `BRACKETED` token.
    pub fn bracketed() -> Self {
        Self::with_mode(Mode::Bracketed)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            text: "",
            cursor: Cursor::new(""),
            mode,
            current: None,
            start: TextSize::new(0),
            end: TextSize::new(0),
        }
    }

    fn text(&self) -> &'t str {
        let start = usize::from(self.start);
        let end = start + usize::from(self.cursor.pos_within_token());
        &self.text[start..end]
    }

    fn next_token(&mut self) {
        self.start = self.end;
        if self.cursor.is_eof() {
            self.current = None;
            return;
        }

        let kind = self.syntax_kind();
        self.end = self.start + self.cursor.pos_within_token();
        self.cursor.reset_pos_within_token();
        self.current = Some(kind);
    }

    fn syntax_kind(&mut self) -> SyntaxKind {
        match self.cursor.advance() {
            c if c.is_whitespace() => {
                self.cursor.advance_while(char::is_whitespace);
                WHITESPACE
            }
            '/' if self.cursor.peek() == '/' => {
                self.cursor.advance_while(|c| c != '\n');
                LINE_COMMENT
            }
            '/' if self.cursor.peek() == '*' => {
                self.cursor.advance();
                self.block_comment();
                BLOCK_COMMENT
            }
            '+' => PLUS,
            '-' => MINUS,
            '*' => STAR,
            '/' => SLASH,
            '=' => EQ,
            ';' => SEMI,
            ',' => COMMA,
            '(' => L_PAREN,
            ')' => R_PAREN,
            '{' => L_BRACE,
            '}' => R_BRACE,
            '[' if self.mode == Mode::Outer => {
                self.bracketed_blob();
                BRACKETED
            }
            '[' => L_BRACKET,
            ']' => R_BRACKET,
            '0'..='9' => {
                self.cursor.advance_while(|c| c.is_ascii_digit() || c == '_');
                NUMBER
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                self.cursor.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');

                match self.text() {
                    "let" => LET_KW,
                    "fn" => FN_KW,
                    "pub" => PUB_KW,
                    _ => IDENT,
                }
            }
            _ => UNKNOWN,
        }
    }

    fn block_comment(&mut self) {
        loop {
            match self.cursor.advance() {
                '*' if self.cursor.peek() == '/' => {
                    self.cursor.advance();
                    return;
                }
                EOF_CHAR if self.cursor.is_eof() => return,
                _ => {}
            }
        }
    }

    fn bracketed_blob(&mut self) {
        let mut depth = 1;
        while depth > 0 && !self.cursor.is_eof() {
            match self.cursor.advance() {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
        }
    }
}

impl<'t> Lexer<'t> for Tokenizer<'t> {
    fn start(&mut self, text: &'t str) {
        self.text = text;
        self.cursor = Cursor::new(text);
        self.end = TextSize::new(0);
        self.next_token();
    }

    fn token(&self) -> Option<SyntaxKind> {
        self.current
    }

    fn token_start(&self) -> TextSize {
        self.start
    }

    fn token_end(&self) -> TextSize {
        self.end
    }

    fn advance(&mut self) {
        self.next_token();
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use weft_syntax::TokenSequence;

    use super::*;

    fn lex<'a>(text: &'a str, mut tokenizer: Tokenizer<'a>) -> Vec<(SyntaxKind, String)> {
        let db = salsa::DatabaseImpl::new();
        let tokens = TokenSequence::lex(&db, text, &mut tokenizer);
        (0..tokens.len())
            .map(|i| (tokens.kind(i), text[tokens.range(i)].to_string()))
            .collect()
    }

    #[rstest]
    #[case::ident("foo_1", IDENT)]
    #[case::keyword_let("let", LET_KW)]
    #[case::keyword_fn("fn", FN_KW)]
    #[case::keyword_pub("pub", PUB_KW)]
    #[case::number("1_000", NUMBER)]
    #[case::whitespace(" \n\t", WHITESPACE)]
    #[case::line_comment("// note", LINE_COMMENT)]
    #[case::block_comment("/* a * b */", BLOCK_COMMENT)]
    #[case::unterminated_comment("/* open", BLOCK_COMMENT)]
    #[case::bracketed("[a [b] c]", BRACKETED)]
    #[case::unknown("#", UNKNOWN)]
    fn single_token(#[case] text: &str, #[case] kind: SyntaxKind) {
        let tokens = lex(text, Tokenizer::new());
        assert_eq!(tokens, vec![(kind, text.to_string())]);
    }

    #[test]
    fn statement() {
        let kinds: Vec<_> =
            lex("let x = a+1;", Tokenizer::new()).into_iter().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![LET_KW, WHITESPACE, IDENT, WHITESPACE, EQ, WHITESPACE, IDENT, PLUS, NUMBER, SEMI]
        );
    }

    #[test]
    fn bracketed_mode_splits_brackets() {
        let tokens = lex("[a, b]", Tokenizer::bracketed());
        let kinds: Vec<_> = tokens.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![L_BRACKET, IDENT, COMMA, WHITESPACE, IDENT, R_BRACKET]);
    }

    #[test]
    fn tokens_cover_the_text() {
        let text = "fn f() { a * (b - 2) } // done";
        let joined: String =
            lex(text, Tokenizer::new()).into_iter().map(|(_, text)| text).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn restart_resets_state() {
        let db = salsa::DatabaseImpl::new();
        let mut tokenizer = Tokenizer::new();
        let first = TokenSequence::lex(&db, "a b", &mut tokenizer);
        let second = TokenSequence::lex(&db, "a b", &mut tokenizer);
        assert_eq!(first, second);
    }
}
