use std::panic::Location;
use std::rc::Rc;

use salsa::Database;
use text_size::{TextRange, TextSize};
use weft_errors::InternalError;
use weft_syntax::{KindSet, Language, Lexer, SyntaxKind, TokenSequence, check_canceled};
use weft_tree::{SyntaxTree, TreeBuilder};

use crate::binder::{DefaultRight, EdgeBinder, EdgeTokens};
use crate::config::BuilderConfig;
use crate::light::LightTree;
use crate::marker::{CompletedMarker, Marker};
use crate::materialize;
use crate::merge::{self, Reparse};
use crate::pool::{MarkerId, MarkerPool, MarkerRef, ProductionMarker};
use crate::production::{Entry, Production};

const UNBALANCED_MESSAGE: &str = "Unbalanced tree. Most probably caused by unbalanced markers. \
     Try enabling `BuilderConfig::debug_mode` to identify the exact location of the problem";

/// Reclassifies a token the first time the cursor reaches it.
pub type TokenRemapper<'db> = Box<dyn Fn(SyntaxKind, TextRange, &str) -> SyntaxKind + 'db>;

/// Observes every whitespace or comment token the cursor skips.
pub type WhitespaceSkipped<'db> = Box<dyn FnMut(SyntaxKind, TextRange) + 'db>;

/// The parser-facing side of the tree builder.
///
/// A parser moves the token cursor with [`advance`](Self::advance) and records structure with
/// [`mark`](Self::mark) and the [`Marker`] operations. Whitespace and comments are skipped by
/// the cursor and attached to nodes afterwards by the configured edge binders.
pub struct Builder<'db> {
    db: &'db dyn Database,
    language: &'db dyn Language,
    config: BuilderConfig,
    text: &'db str,
    /// Offset of `text` in the outermost document.
    offset: TextSize,
    tokens: TokenSequence,
    whitespace: KindSet,
    comments: KindSet,

    current: usize,
    cached_kind: Option<SyntaxKind>,
    token_checked: bool,
    remapper: Option<TokenRemapper<'db>>,
    whitespace_skipped: Option<WhitespaceSkipped<'db>>,
    advance_count: usize,

    pool: MarkerPool,
    production: Production,
    root: Option<MarkerId>,
    depth_limit_exceeded: bool,
}

impl<'db> Builder<'db> {
    pub fn new(
        db: &'db dyn Database,
        language: &'db dyn Language,
        text: &'db str,
        lexer: &mut dyn Lexer<'db>,
        config: BuilderConfig,
    ) -> Self {
        let tokens = TokenSequence::lex(db, text, lexer);
        Self::from_tokens(db, language, text, tokens, config)
    }

    /// Builder over tokens lexed elsewhere. `tokens` must end at the end of `text`.
    pub fn from_tokens(
        db: &'db dyn Database,
        language: &'db dyn Language,
        text: &'db str,
        tokens: TokenSequence,
        config: BuilderConfig,
    ) -> Self {
        debug_assert_eq!(tokens.start(tokens.len()), TextSize::of(text));
        Self {
            db,
            language,
            config,
            text,
            offset: TextSize::new(0),
            tokens,
            whitespace: language.whitespace().clone(),
            comments: language.comments().clone(),
            current: 0,
            cached_kind: None,
            token_checked: false,
            remapper: None,
            whitespace_skipped: None,
            advance_count: 0,
            pool: MarkerPool::default(),
            production: Production::default(),
            root: None,
            depth_limit_exceeded: false,
        }
    }

    /// Builder over the text of a lazy leaf, reusing the tokens its collapsing parse cached.
    ///
    /// Take the tokens with [`SyntaxTree::take_cached_tokens`]. With
    /// [`BuilderConfig::verify_cached_tokens`] the text is lexed again and must agree.
    pub fn reusing_tokens(
        db: &'db dyn Database,
        language: &'db dyn Language,
        text: &'db str,
        cached: Option<TokenSequence>,
        lexer: &mut dyn Lexer<'db>,
        config: BuilderConfig,
    ) -> Self {
        let tokens = match cached {
            Some(cached) => {
                if config.verify_cached_tokens {
                    let fresh = TokenSequence::lex(db, text, lexer);
                    if fresh != cached {
                        let counts =
                            format!("cached: {} tokens, fresh: {} tokens", cached.len(), fresh.len());
                        InternalError::new("Cached tokens differ from a fresh lexing", text)
                            .note(counts)
                            .raise();
                    }
                }
                cached
            }
            None => TokenSequence::lex(db, text, lexer),
        };
        Self::from_tokens(db, language, text, tokens, config)
    }

    /// Parses the lazy region spanning tokens `start..end` with a builder of its own.
    ///
    /// A region made of a single token is lexed again by the language's lazy lexer, if it has
    /// one; otherwise the nested builder sees this builder's tokens.
    pub(crate) fn nested(&self, kind: SyntaxKind, start: usize, end: usize) -> Builder<'db> {
        let range = TextRange::new(self.tokens.start(start), self.tokens.start(end));
        let text = &self.text[range];
        let tokens = match self.language.lazy_lexer(kind) {
            Some(mut lexer) if end - start == 1 => TokenSequence::lex(self.db, text, &mut *lexer),
            _ => self.tokens.slice(start..end, TextSize::of(text)),
        };

        let mut builder =
            Builder::from_tokens(self.db, self.language, text, tokens, self.config.clone());
        builder.offset = self.offset + range.start();
        match self.config.lazy_parser.clone() {
            Some(parser) => parser.parse(kind, &mut builder),
            None => {
                let marker = builder.mark();
                while !builder.eof() {
                    builder.advance();
                }
                marker.done(&mut builder, kind);
            }
        }
        builder.prepare();
        builder
    }

    pub(crate) fn db(&self) -> &'db dyn Database {
        self.db
    }

    pub(crate) fn language(&self) -> &'db dyn Language {
        self.language
    }

    pub(crate) fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub(crate) fn tokens(&self) -> &TokenSequence {
        &self.tokens
    }

    pub(crate) fn pool(&self) -> &MarkerPool {
        &self.pool
    }

    #[cfg(test)]
    pub(crate) fn production(&self) -> &Production {
        &self.production
    }

    pub(crate) fn whitespace(&self) -> &KindSet {
        &self.whitespace
    }

    /// Offset of this builder's text in the outermost document.
    pub fn offset(&self) -> TextSize {
        self.offset
    }

    pub fn original_text(&self) -> &'db str {
        self.text
    }

    fn is_trivia(&self, kind: SyntaxKind) -> bool {
        self.whitespace.contains(kind) || self.comments.contains(kind)
    }

    /// Treats `comments` as the comment tokens from now on.
    pub fn enforce_comment_tokens(&mut self, comments: KindSet) {
        self.comments = comments;
    }

    pub fn set_token_type_remapper(&mut self, remapper: Option<TokenRemapper<'db>>) {
        self.remapper = remapper;
        self.token_checked = false;
        self.cached_kind = None;
    }

    pub fn set_whitespace_skipped_callback(&mut self, callback: Option<WhitespaceSkipped<'db>>) {
        self.whitespace_skipped = callback;
    }

    /// Reports whether the cursor reached the end, skipping whitespace and comments first.
    pub fn eof(&mut self) -> bool {
        if !self.token_checked {
            self.token_checked = true;
            self.skip_whitespace();
        }
        self.current >= self.tokens.len()
    }

    /// Kind of the current token, `None` at the end of input.
    pub fn current_kind(&mut self) -> Option<SyntaxKind> {
        if let Some(kind) = self.cached_kind {
            return Some(kind);
        }
        if self.eof() {
            return None;
        }
        if self.remapper.is_some() {
            self.skip_whitespace();
            if self.current >= self.tokens.len() {
                return None;
            }
        }
        let kind = self.tokens.kind(self.current);
        self.cached_kind = Some(kind);
        Some(kind)
    }

    pub fn at(&mut self, kind: SyntaxKind) -> bool {
        self.current_kind() == Some(kind)
    }

    pub fn advance(&mut self) {
        self.advance_count += 1;
        check_canceled(self.db, self.advance_count);

        if self.eof() {
            return;
        }

        self.token_checked = false;
        self.current += 1;
        self.cached_kind = None;
    }

    fn skip_whitespace(&mut self) {
        while self.current < self.tokens.len() {
            let kind = self.remap_current();
            if !self.is_trivia(kind) {
                break;
            }
            if let Some(callback) = &mut self.whitespace_skipped {
                callback(kind, self.tokens.range(self.current));
            }
            self.current += 1;
            self.cached_kind = None;
        }
    }

    fn remap_current(&mut self) -> SyntaxKind {
        if let Some(kind) = self.cached_kind {
            return kind;
        }
        if let Some(remapper) = &self.remapper {
            let range = self.tokens.range(self.current);
            let kind = remapper(self.tokens.kind(self.current), range, self.text);
            self.tokens.remap(self.current, kind);
        }
        self.tokens.kind(self.current)
    }

    /// Kind of the token `steps` non-trivia tokens ahead of the current one.
    pub fn lookahead(&mut self, steps: usize) -> Option<SyntaxKind> {
        if self.eof() {
            return None;
        }
        let mut cursor = self.current;
        for _ in 0..steps {
            cursor += 1;
            while cursor < self.tokens.len() && self.is_trivia(self.tokens.kind(cursor)) {
                cursor += 1;
            }
        }
        (cursor < self.tokens.len()).then(|| self.tokens.kind(cursor))
    }

    /// Kind of the token `steps` away from the cursor, trivia included.
    pub fn raw_lookup(&self, steps: isize) -> Option<SyntaxKind> {
        self.current
            .checked_add_signed(steps)
            .filter(|&index| index < self.tokens.len())
            .map(|index| self.tokens.kind(index))
    }

    /// Start of the token `steps` away from the cursor; the text length past the last token.
    pub fn raw_token_start(&self, steps: isize) -> Option<TextSize> {
        let index = self.current.checked_add_signed(steps)?;
        Some(self.tokens.start(index.min(self.tokens.len())))
    }

    pub fn raw_token_index(&self) -> usize {
        self.current
    }

    /// Moves the cursor over `steps` tokens without skipping anything.
    pub fn raw_advance(&mut self, steps: usize) {
        let target = self.current + steps;
        if target > self.tokens.len() {
            tracing::error!(target, len = self.tokens.len(), "raw advance past the end of input");
        }
        self.current = target.min(self.tokens.len());
        self.token_checked = false;
        self.cached_kind = None;
    }

    pub fn remap_current_token(&mut self, kind: SyntaxKind) {
        if self.current < self.tokens.len() {
            self.tokens.remap(self.current, kind);
            self.cached_kind = None;
        }
    }

    pub fn token_text(&mut self) -> Option<&'db str> {
        if self.eof() {
            return None;
        }
        Some(&self.text[self.tokens.range(self.current)])
    }

    /// Offset of the current token in this builder's text.
    pub fn current_offset(&mut self) -> TextSize {
        if self.eof() {
            return TextSize::of(self.text);
        }
        self.tokens.start(self.current)
    }

    /// Starts a marker at the current token.
    #[track_caller]
    pub fn mark(&mut self) -> Marker {
        if !self.production.is_empty() {
            self.skip_whitespace();
        }
        let id = self.pool.alloc_start(self.current as u32);
        self.record_site(id);
        self.production.add_marker(id);
        Marker::new(self.pool.handle(id))
    }

    /// Records a parse error at the current token.
    ///
    /// A second error at the same token right after the first is ignored.
    pub fn error(&mut self, message: &str) {
        let lexeme = self.current as u32;
        let duplicate = match self.production.last() {
            Some(Entry::Start(last)) => {
                matches!(
                    self.pool.get(last),
                    ProductionMarker::Error(error) if error.lexeme == lexeme
                )
            }
            _ => false,
        };
        if duplicate {
            return;
        }
        let id = self.pool.alloc_error(lexeme, message);
        self.production.add_marker(id);
    }

    /// The marker done most recently, if it is still in the log.
    pub fn latest_done_marker(&self) -> Option<CompletedMarker> {
        let id = self.production.entries().iter().rev().find_map(|&entry| match entry {
            Entry::End(id) => Some(id),
            Entry::Start(_) => None,
        })?;
        let kind = self.pool.start(id).kind.unwrap_or(SyntaxKind::ERROR);
        Some(CompletedMarker::new(self.pool.handle(id), kind))
    }

    #[track_caller]
    fn record_site(&mut self, id: MarkerId) {
        if self.config.debug_mode {
            self.pool.set_debug_site(id, Location::caller());
        }
    }

    fn fatal(&self, title: &str) -> InternalError<'db> {
        InternalError::new(title, self.text)
    }

    /// An internal error pointing at the first token of `id`.
    fn fatal_at(&self, id: MarkerId, title: &str) -> InternalError<'db> {
        let lexeme = self.pool.lexeme(Entry::Start(id)) as usize;
        let range = if lexeme < self.tokens.len() {
            self.tokens.range(lexeme)
        } else {
            TextRange::empty(TextSize::of(self.text))
        };
        let mut error = self.fatal(title).annotate(range, "marker starts here");
        if let Some(site) = self.pool.debug_site(id) {
            error = error.note(format!("marker created at {site}"));
        }
        error
    }

    fn unbalanced(&self, id: Option<MarkerId>) -> ! {
        match id {
            Some(id) => self.fatal_at(id, UNBALANCED_MESSAGE).raise(),
            None => self.fatal(UNBALANCED_MESSAGE).raise(),
        }
    }

    #[track_caller]
    fn live(&self, marker: MarkerRef) -> MarkerId {
        if !self.pool.is_live(marker) {
            self.fatal("Marker has already been disposed").raise();
        }
        marker.id
    }

    fn index_of(&self, id: MarkerId) -> usize {
        self.production
            .index_of(&self.pool, id)
            .unwrap_or_else(|| self.fatal_at(id, "Marker has never been added").raise())
    }

    fn is_empty_span(&self, start: u32, end: u32) -> bool {
        (start..end).all(|index| self.is_trivia(self.tokens.kind(index as usize)))
    }

    /// Fails if a start marker in `entries[from..to]` is still open.
    fn check_no_open_markers(&self, id: MarkerId, from: usize, to: usize, title: &str) {
        let entries = self.production.entries().get(from..to).unwrap_or(&[]);
        for &entry in entries.iter().rev() {
            let Entry::Start(other) = entry else { continue };
            if self.pool.is_start(other) && self.pool.start(other).end.is_none() {
                let mut error = self.fatal_at(id, title);
                if let Some(site) = self.pool.debug_site(other) {
                    error = error.note(format!("open marker created at {site}"));
                }
                error.raise();
            }
        }
    }

    fn check_validity(&self, id: MarkerId, before: Option<MarkerId>) {
        if self.pool.start(id).end.is_some() {
            self.fatal_at(id, "Marker already done").raise();
        }

        if !self.config.debug_mode {
            return;
        }

        let index = self.index_of(id);
        let end = match before {
            Some(before) => {
                let end = self.index_of(before);
                if index >= end {
                    self.fatal_at(before, "'Before' marker precedes this one").raise();
                }
                end
            }
            None => self.production.len(),
        };
        self.check_no_open_markers(
            id,
            index + 1,
            end,
            "Another not done marker added after this one. Must be done before this.",
        );
    }

    fn process_done(
        &mut self,
        marker: MarkerRef,
        kind: SyntaxKind,
        message: Option<&str>,
        before: Option<MarkerRef>,
        left_bound: bool,
    ) {
        let id = self.live(marker);
        let before = before.map(|before| self.live(before));
        self.check_validity(id, before);

        let start = self.pool.start(id).start;
        let (end, anchor) = match before {
            Some(before) => (self.pool.start(before).start, Some(self.index_of(before))),
            None => (self.current as u32, None),
        };
        if left_bound && self.is_empty_span(start, end) {
            self.pool.set_left_binder(id, Rc::new(DefaultRight));
        }

        let done = self.pool.start_mut(id);
        done.end = Some(end);
        done.kind = Some(kind);
        if let Some(message) = message {
            self.pool.set_done_error(id, message);
        }
        self.production.add_done(id, anchor);
    }

    pub(crate) fn done_marker(
        &mut self,
        marker: MarkerRef,
        kind: SyntaxKind,
        before: Option<MarkerRef>,
    ) {
        let left_bound = self.language.is_left_bound(kind);
        self.process_done(marker, kind, None, before, left_bound);
    }

    pub(crate) fn collapse_marker(&mut self, marker: MarkerRef, kind: SyntaxKind) {
        self.done_marker(marker, kind, None);
        self.pool.set_collapsed(marker.id);
    }

    pub(crate) fn error_marker(
        &mut self,
        marker: MarkerRef,
        message: &str,
        before: Option<MarkerRef>,
    ) {
        self.process_done(marker, SyntaxKind::ERROR, Some(message), before, true);
    }

    /// Inserts an error point right before `before`, then closes `marker` after it.
    pub(crate) fn done_before_with_error(
        &mut self,
        marker: MarkerRef,
        kind: SyntaxKind,
        before: MarkerRef,
        message: &str,
    ) {
        let before_id = self.live(before);
        let anchor = self.index_of(before_id);
        let error = self.pool.alloc_error(self.pool.start(before_id).start, message);
        self.production.add_before(error, anchor);
        self.done_marker(marker, kind, Some(before));
    }

    pub(crate) fn rollback_marker(&mut self, marker: MarkerRef) {
        let id = self.live(marker);
        let index = self.index_of(id);
        if self.config.debug_mode {
            self.check_no_open_markers(
                id,
                index + 1,
                self.production.len(),
                "Another not done marker added after this one. Must be done before rolling back.",
            );
        }

        let start = self.pool.start(id).start;
        tracing::trace!(lexeme = start, dropped = self.production.len() - index, "rollback");

        self.current = start as usize;
        self.token_checked = true;
        self.cached_kind = None;
        self.production.rollback_to(&mut self.pool, index);
    }

    /// Removes `marker` from the log; whatever it enclosed moves to its parent.
    pub(crate) fn abandon_marker(&mut self, marker: MarkerRef) {
        let id = self.live(marker);
        if self.pool.start(id).end.is_some() {
            let Some(done) = self.production.index_of_done(id) else {
                self.fatal_at(id, "Marker has never been done").raise()
            };
            if self.config.debug_mode {
                let index = self.index_of(id);
                self.check_no_open_markers(
                    id,
                    index + 1,
                    done,
                    "Abandoned marker encloses a marker that is not done",
                );
            }
            self.production.remove(done);
        }
        let index = self.index_of(id);
        self.production.remove(index);
        self.pool.free(id);
    }

    #[track_caller]
    pub(crate) fn precede_marker(&mut self, marker: MarkerRef) -> Marker {
        let id = self.live(marker);
        let index = self.index_of(id);
        let new = self.pool.alloc_start(self.pool.start(id).start);
        self.record_site(new);
        self.production.add_before(new, index);
        Marker::new(self.pool.handle(new))
    }

    pub(crate) fn set_left_binder(&mut self, marker: MarkerRef, binder: Rc<dyn EdgeBinder>) {
        let id = self.live(marker);
        self.pool.set_left_binder(id, binder);
    }

    pub(crate) fn set_right_binder(&mut self, marker: MarkerRef, binder: Rc<dyn EdgeBinder>) {
        let id = self.live(marker);
        if self.pool.start(id).end.is_none() {
            self.fatal_at(id, "Cannot set the right edge binder of an unclosed marker").raise();
        }
        self.pool.set_right_binder(id, binder);
    }

    pub(crate) fn remap_marker_kind(&mut self, marker: MarkerRef, kind: SyntaxKind) {
        let id = self.live(marker);
        self.pool.start_mut(id).kind = Some(kind);
    }

    pub(crate) fn has_errors_after(&self, marker: MarkerRef) -> bool {
        let id = self.live(marker);
        self.production.has_errors_after(&self.pool, self.index_of(id))
    }

    /// Balances whitespace and links the markers into a tree, once.
    ///
    /// Whitespace the cursor skipped before the root marker is moved into the root.
    pub(crate) fn prepare(&mut self) -> MarkerId {
        if let Some(root) = self.root {
            return root;
        }

        let root = match self.production.entries().first() {
            None => self.fatal("Parser produced no markers").raise(),
            Some(&Entry::Start(root)) if self.pool.is_start(root) => root,
            Some(_) => self.unbalanced(None),
        };

        let root_start = self.pool.start(root).start;
        if root_start > 0 {
            if self.is_empty_span(0, root_start) {
                self.pool.set_lexeme(Entry::Start(root), 0);
            } else {
                let missed = self.kind_names(0..root_start as usize);
                let root_kind = self.pool.start(root).kind.unwrap_or(SyntaxKind::ERROR);
                let range = TextRange::up_to(self.tokens.start(root_start as usize));
                self.fatal(&format!(
                    "Tokens {missed:?} are outside of root element {:?}",
                    self.language.kind_name(root_kind)
                ))
                .annotate(range, "here")
                .raise();
            }
        }

        self.token_checked = true;
        self.balance_white_spaces();
        let max_depth = self.link_tree(root);

        let count = self.tokens.len();
        if self.current < count {
            let missed = self.kind_names(self.current..count);
            let range = TextRange::new(self.tokens.start(self.current), TextSize::of(self.text));
            self.fatal(&format!("Tokens {missed:?} were not inserted into the tree"))
                .annotate(range, "here")
                .raise();
        }
        let root_end = self.pool.start(root).end.unwrap_or_default() as usize;
        if root_end < count {
            let missed = self.kind_names(root_end..count);
            let root_kind = self.pool.start(root).kind.unwrap_or(SyntaxKind::ERROR);
            self.fatal(&format!(
                "Tokens {missed:?} are outside of root element {:?}",
                self.language.kind_name(root_kind)
            ))
            .annotate(TextRange::new(self.tokens.start(root_end), TextSize::of(self.text)), "here")
            .raise();
        }

        if max_depth > self.config.reparse_depth_limit {
            tracing::warn!(
                max_depth,
                limit = self.config.reparse_depth_limit,
                "tree is too deep for incremental reparse"
            );
            self.depth_limit_exceeded = true;
        }

        self.cached_kind = None;
        self.root = Some(root);
        root
    }

    fn kind_names(&self, range: std::ops::Range<usize>) -> Vec<&'static str> {
        self.tokens.kinds()[range].iter().map(|&kind| self.language.kind_name(kind)).collect()
    }

    fn edge_binder(&self, entry: Entry) -> Rc<dyn EdgeBinder> {
        let binder = match entry {
            Entry::Start(id) if self.pool.is_start(id) => {
                self.pool.left_binder(id).unwrap_or(&self.config.left_binder)
            }
            Entry::Start(_) => &self.config.right_binder,
            Entry::End(id) => self.pool.right_binder(id).unwrap_or(&self.config.right_binder),
        };
        Rc::clone(binder)
    }

    /// Moves every marker edge, except those of the root, to the position its binder picks
    /// within the adjacent whitespace and comments.
    pub(crate) fn balance_white_spaces(&mut self) {
        let count = self.tokens.len() as u32;
        let mut last_index = 0;

        for i in 1..self.production.len().saturating_sub(1) {
            check_canceled(self.db, i);

            let entry = self.production.get(i);
            if let Entry::Start(id) = entry {
                if self.pool.is_start(id) && self.pool.start(id).end.is_none() {
                    self.unbalanced(Some(id));
                }
            }

            let binder = self.edge_binder(entry);
            let recursive = binder.is_recursive();
            let previous = if recursive { 0 } else { self.pool.lexeme(self.production.get(i - 1)) };
            let lexeme = self.pool.lexeme(entry);

            let mut ws_start = lexeme.max(last_index);
            while ws_start > previous && self.is_trivia(self.tokens.kind(ws_start as usize - 1)) {
                ws_start -= 1;
            }
            let mut ws_end = lexeme;
            while ws_end < count && self.is_trivia(self.tokens.kind(ws_end as usize)) {
                ws_end += 1;
            }

            let mut resolved = lexeme;
            if ws_start < ws_end {
                let (start, end) = (ws_start as usize, ws_end as usize);
                let tokens = EdgeTokens::new(
                    &self.tokens.kinds()[start..end],
                    &self.tokens.starts()[start..=end],
                    self.text,
                );
                let at_edge = ws_start == 0 || ws_end == count;
                let position = binder.edge_position(&tokens, at_edge).min(end - start);
                resolved = ws_start + position as u32;
                self.pool.set_lexeme(entry, resolved);
                if recursive {
                    self.production.confine_markers_to_max_lexeme(&mut self.pool, i, resolved);
                }
            } else if lexeme < ws_start {
                resolved = ws_start;
                self.pool.set_lexeme(entry, resolved);
            }

            last_index = resolved;
        }
    }

    /// Builds parent and sibling links from the log and returns the maximal depth.
    fn link_tree(&mut self, root: MarkerId) -> usize {
        self.pool.reset_links(root);

        let mut stack = Vec::new();
        let mut current = Some(root);
        let mut last_error = None;
        let mut depth = 0usize;
        let mut max_depth = 0;

        for i in 1..self.production.len() {
            check_canceled(self.db, i);

            let entry = self.production.get(i);
            let Some(node) = current else {
                self.fatal_at(entry.id(), "Unexpected end of the production").raise()
            };
            match entry {
                Entry::Start(id) if self.pool.is_start(id) => {
                    self.pool.reset_links(id);
                    self.pool.add_child(node, id);
                    stack.push(node);
                    current = Some(id);
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                Entry::Start(id) => {
                    let lexeme = self.pool.lexeme(entry);
                    if last_error == Some(lexeme) {
                        continue;
                    }
                    last_error = Some(lexeme);
                    self.pool.reset_links(id);
                    self.pool.add_child(node, id);
                }
                Entry::End(id) => {
                    if id != node {
                        self.unbalanced(Some(id));
                    }
                    current = stack.pop();
                    depth = depth.saturating_sub(1);
                }
            }
        }

        if let Some(open) = current {
            self.unbalanced(Some(open));
        }
        max_depth
    }

    /// Materializes the tree.
    pub fn tree_built(mut self) -> SyntaxTree {
        let root = self.prepare();
        let mut sink = TreeBuilder::new();
        if self.depth_limit_exceeded {
            sink.mark_depth_limit_exceeded();
        }
        materialize::bind(&self, root, &mut sink);
        let tree = sink.finish();
        debug_assert_eq!(tree.text_len(tree.root()), TextSize::of(self.text));
        tree
    }

    /// Diffs the new parse against `old`, or rebuilds it when the tree is too deep.
    pub fn reparse(mut self, old: &SyntaxTree) -> Reparse {
        self.prepare();
        if self.depth_limit_exceeded || old.depth_limit_exceeded() {
            tracing::warn!("tree depth limit exceeded, rebuilding instead of merging");
            return Reparse::Rebuilt(self.tree_built());
        }

        let light = LightTree::new(self);
        let log = merge::merge(old, &light);
        tracing::debug!(events = log.len(), "merged reparse");
        Reparse::Merged(log)
    }

    /// The finished parse as a light tree, without materializing nodes.
    pub fn light_tree(mut self) -> LightTree<'db> {
        self.prepare();
        LightTree::new(self)
    }
}
