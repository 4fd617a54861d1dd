use std::rc::Rc;

use drop_bomb::DropBomb;
use weft_syntax::SyntaxKind;

use crate::binder::EdgeBinder;
use crate::pool::MarkerRef;
use crate::Builder;

/// Anything that names a marker of the log, open or done.
pub trait AsMarker {
    #[doc(hidden)]
    fn as_marker(&self) -> MarkerRef;
}

/// An open marker. Dropping it without closing or abandoning it panics.
pub struct Marker {
    marker: MarkerRef,
    bomb: DropBomb,
}

impl Marker {
    pub(crate) fn new(marker: MarkerRef) -> Self {
        Self { marker, bomb: DropBomb::new("Marker must be either completed or abandoned") }
    }

    /// Closes the marker at the current token as a node of `kind`.
    pub fn done(mut self, p: &mut Builder<'_>, kind: SyntaxKind) -> CompletedMarker {
        self.bomb.defuse();
        p.done_marker(self.marker, kind, None);
        CompletedMarker::new(self.marker, kind)
    }

    /// Like [`done`](Self::done), but the node becomes a single leaf covering its tokens.
    pub fn collapse(mut self, p: &mut Builder<'_>, kind: SyntaxKind) -> CompletedMarker {
        self.bomb.defuse();
        p.collapse_marker(self.marker, kind);
        CompletedMarker::new(self.marker, kind)
    }

    /// Closes the marker as an error node carrying `message`.
    pub fn error(mut self, p: &mut Builder<'_>, message: &str) -> CompletedMarker {
        self.bomb.defuse();
        p.error_marker(self.marker, message, None);
        CompletedMarker::new(self.marker, SyntaxKind::ERROR)
    }

    /// Closes the marker right before `before` starts.
    pub fn done_before(
        mut self,
        p: &mut Builder<'_>,
        kind: SyntaxKind,
        before: &impl AsMarker,
    ) -> CompletedMarker {
        self.bomb.defuse();
        p.done_marker(self.marker, kind, Some(before.as_marker()));
        CompletedMarker::new(self.marker, kind)
    }

    /// Closes the marker before `before` and reports `message` between the two.
    pub fn done_before_with_error(
        mut self,
        p: &mut Builder<'_>,
        kind: SyntaxKind,
        before: &impl AsMarker,
        message: &str,
    ) -> CompletedMarker {
        self.bomb.defuse();
        p.done_before_with_error(self.marker, kind, before.as_marker(), message);
        CompletedMarker::new(self.marker, kind)
    }

    pub fn error_before(
        mut self,
        p: &mut Builder<'_>,
        message: &str,
        before: &impl AsMarker,
    ) -> CompletedMarker {
        self.bomb.defuse();
        p.error_marker(self.marker, message, Some(before.as_marker()));
        CompletedMarker::new(self.marker, SyntaxKind::ERROR)
    }

    /// Restores the cursor to where the marker started and drops everything recorded since.
    pub fn rollback(mut self, p: &mut Builder<'_>) {
        self.bomb.defuse();
        p.rollback_marker(self.marker);
    }

    /// Forgets the marker; whatever it encloses stays in the tree.
    pub fn abandon(mut self, p: &mut Builder<'_>) {
        self.bomb.defuse();
        p.abandon_marker(self.marker);
    }

    /// Starts a new marker right before this one.
    #[track_caller]
    pub fn precede(&self, p: &mut Builder<'_>) -> Marker {
        p.precede_marker(self.marker)
    }

    pub fn set_left_binder(&self, p: &mut Builder<'_>, binder: Rc<dyn EdgeBinder>) {
        p.set_left_binder(self.marker, binder);
    }

    /// True if an error was recorded after this marker started.
    pub fn has_errors_after(&self, p: &Builder<'_>) -> bool {
        p.has_errors_after(self.marker)
    }
}

impl AsMarker for Marker {
    fn as_marker(&self) -> MarkerRef {
        self.marker
    }
}

/// A done marker.
#[derive(Debug, Clone, Copy)]
pub struct CompletedMarker {
    marker: MarkerRef,
    kind: SyntaxKind,
}

impl CompletedMarker {
    pub(crate) fn new(marker: MarkerRef, kind: SyntaxKind) -> Self {
        Self { marker, kind }
    }

    /// Starts a new marker that will enclose this one.
    #[track_caller]
    pub fn precede(self, p: &mut Builder<'_>) -> Marker {
        p.precede_marker(self.marker)
    }

    pub fn rollback(self, p: &mut Builder<'_>) {
        p.rollback_marker(self.marker);
    }

    /// Drops the node, splicing its children into the parent.
    pub fn abandon(self, p: &mut Builder<'_>) {
        p.abandon_marker(self.marker);
    }

    /// Overrides the binders used for this node; `None` keeps the current one.
    pub fn set_edge_binders(
        &self,
        p: &mut Builder<'_>,
        left: Option<Rc<dyn EdgeBinder>>,
        right: Option<Rc<dyn EdgeBinder>>,
    ) {
        if let Some(left) = left {
            p.set_left_binder(self.marker, left);
        }
        if let Some(right) = right {
            p.set_right_binder(self.marker, right);
        }
    }

    pub fn remap_kind(&mut self, p: &mut Builder<'_>, kind: SyntaxKind) {
        p.remap_marker_kind(self.marker, kind);
        self.kind = kind;
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn has_errors_after(&self, p: &Builder<'_>) -> bool {
        p.has_errors_after(self.marker)
    }
}

impl AsMarker for CompletedMarker {
    fn as_marker(&self) -> MarkerRef {
        self.marker
    }
}
