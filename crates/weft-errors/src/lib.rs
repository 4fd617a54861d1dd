//! Diagnostics for parse errors and for violated builder contracts.

use std::fmt::{self, Display};

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
pub use text_size::TextRange;
use text_size::TextSize;

/// A parse error recorded in a syntax tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    message: String,
    range: TextRange,
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn error(message: impl Into<String>, range: TextRange) -> Self {
        Self { message: message.into(), range }
    }

    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let message = Level::Error.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(Level::Error.span(self.range.into()).label("here"))
                .fold(true),
        );
        renderer.render(message)
    }
}

/// A broken invariant of the tree builder.
///
/// These are programming errors in the code driving the builder (or in the lexer feeding it),
/// never errors in the parsed text. They are rendered with as much surrounding source as is
/// useful and then either logged or raised as a panic.
#[derive(Debug)]
pub struct InternalError<'a> {
    title: String,
    text: &'a str,
    annotations: Vec<(TextRange, String)>,
    notes: Vec<String>,
}

impl<'a> InternalError<'a> {
    pub fn new(title: impl Into<String>, text: &'a str) -> Self {
        Self { title: title.into(), text, annotations: Vec::new(), notes: Vec::new() }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Points at `range` of the source text. Out-of-bounds ranges are clamped.
    pub fn annotate(mut self, range: TextRange, label: impl Into<String>) -> Self {
        let text_len = TextSize::of(self.text);
        let start = range.start().min(text_len);
        let end = range.end().clamp(start, text_len);
        self.annotations.push((TextRange::new(start, end), label.into()));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn render(&self) -> String {
        let mut message = Level::Error.title(&self.title);
        if !self.text.is_empty() && !self.annotations.is_empty() {
            let mut snippet = Snippet::source(self.text).fold(true);
            for (range, label) in &self.annotations {
                snippet = snippet.annotation(Level::Error.span((*range).into()).label(label));
            }
            message = message.snippet(snippet);
        }
        for note in &self.notes {
            message = message.footer(Level::Note.title(note));
        }
        Renderer::plain().render(message).to_string()
    }

    /// Aborts the current parse with the rendered report.
    #[track_caller]
    pub fn raise(self) -> ! {
        panic!("{self}")
    }
}

impl Display for InternalError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_renders_with_origin() {
        let text = "let = 1;";
        let diagnostic = Diagnostic::error("expected name", TextRange::new(4.into(), 5.into()));
        let report = diagnostic.render(&Renderer::plain(), "main.tiny", text).to_string();

        assert!(report.contains("error: expected name"), "{report}");
        assert!(report.contains("main.tiny"), "{report}");
        assert!(report.contains("let = 1;"), "{report}");
        assert!(report.contains("here"), "{report}");
    }

    #[test]
    fn internal_error_mentions_title_and_notes() {
        let report = InternalError::new("Marker already done", "let x = 1;")
            .annotate(TextRange::new(4.into(), 5.into()), "marker started here")
            .note("created at src/grammar.rs:10:5")
            .render();

        assert!(report.contains("Marker already done"), "{report}");
        assert!(report.contains("marker started here"), "{report}");
        assert!(report.contains("created at src/grammar.rs:10:5"), "{report}");
    }

    #[test]
    fn annotations_are_clamped_to_the_text() {
        let error = InternalError::new("broken", "ab").annotate(
            TextRange::new(1.into(), 40.into()),
            "past the end",
        );
        assert!(error.render().contains("broken"));
    }

    #[test]
    #[should_panic(expected = "Unbalanced tree")]
    fn raise_panics_with_rendered_report() {
        InternalError::new("Unbalanced tree", "").raise();
    }
}
