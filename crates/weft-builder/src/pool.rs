//! Id-addressed storage for production markers.
//!
//! Markers are recycled through two free-lists. Rarely used per-marker data lives in side tables
//! keyed by id, and is dropped together with the marker.

use std::panic::Location;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use weft_syntax::SyntaxKind;

use crate::binder::EdgeBinder;
use crate::production::Entry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct MarkerId(u32);

impl MarkerId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A marker id together with the generation it was handed out in.
///
/// Stays valid until the marker is rolled back or abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerRef {
    pub(crate) id: MarkerId,
    pub(crate) generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartMarker {
    pub(crate) start: u32,
    pub(crate) end: Option<u32>,
    pub(crate) kind: Option<SyntaxKind>,
    pub(crate) first_child: Option<MarkerId>,
    pub(crate) last_child: Option<MarkerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorMarker {
    pub(crate) lexeme: u32,
    pub(crate) message: Box<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProductionMarker {
    Start(StartMarker),
    Error(ErrorMarker),
}

#[derive(Debug)]
struct Slot {
    marker: ProductionMarker,
    parent: Option<MarkerId>,
    next: Option<MarkerId>,
    generation: u32,
    live: bool,
}

#[derive(Default)]
pub(crate) struct MarkerPool {
    slots: Vec<Slot>,
    free_starts: Vec<MarkerId>,
    free_errors: Vec<MarkerId>,

    debug_sites: FxHashMap<MarkerId, &'static Location<'static>>,
    left_binders: FxHashMap<MarkerId, Rc<dyn EdgeBinder>>,
    right_binders: FxHashMap<MarkerId, Rc<dyn EdgeBinder>>,
    collapsed: FxHashSet<MarkerId>,
    done_errors: FxHashMap<MarkerId, Box<str>>,
}

impl MarkerPool {
    fn alloc(&mut self, marker: ProductionMarker) -> MarkerId {
        let free = match marker {
            ProductionMarker::Start(_) => self.free_starts.pop(),
            ProductionMarker::Error(_) => self.free_errors.pop(),
        };
        match free {
            Some(id) => {
                let slot = &mut self.slots[id.index()];
                slot.marker = marker;
                slot.live = true;
                id
            }
            None => {
                let id = MarkerId(self.slots.len() as u32);
                let slot = Slot { marker, parent: None, next: None, generation: 0, live: true };
                self.slots.push(slot);
                id
            }
        }
    }

    pub(crate) fn alloc_start(&mut self, start: u32) -> MarkerId {
        self.alloc(ProductionMarker::Start(StartMarker {
            start,
            end: None,
            kind: None,
            first_child: None,
            last_child: None,
        }))
    }

    pub(crate) fn alloc_error(&mut self, lexeme: u32, message: &str) -> MarkerId {
        self.alloc(ProductionMarker::Error(ErrorMarker { lexeme, message: message.into() }))
    }

    /// Returns `id` to its free-list. The marker must no longer be reachable from the log.
    pub(crate) fn free(&mut self, id: MarkerId) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(slot.live, "marker freed twice");
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.parent = None;
        slot.next = None;
        match &mut slot.marker {
            ProductionMarker::Start(marker) => {
                marker.end = None;
                marker.kind = None;
                marker.first_child = None;
                marker.last_child = None;
                self.free_starts.push(id);
            }
            ProductionMarker::Error(marker) => {
                marker.message = Box::default();
                self.free_errors.push(id);
            }
        }
        self.debug_sites.remove(&id);
        self.left_binders.remove(&id);
        self.right_binders.remove(&id);
        self.collapsed.remove(&id);
        self.done_errors.remove(&id);
    }

    pub(crate) fn handle(&self, id: MarkerId) -> MarkerRef {
        MarkerRef { id, generation: self.slots[id.index()].generation }
    }

    /// True until `id` is freed; a recycled slot is allocated again.
    pub(crate) fn is_allocated(&self, id: MarkerId) -> bool {
        self.slots[id.index()].live
    }

    pub(crate) fn is_live(&self, marker: MarkerRef) -> bool {
        self.slots
            .get(marker.id.index())
            .is_some_and(|slot| slot.live && slot.generation == marker.generation)
    }

    pub(crate) fn get(&self, id: MarkerId) -> &ProductionMarker {
        &self.slots[id.index()].marker
    }

    pub(crate) fn is_start(&self, id: MarkerId) -> bool {
        matches!(self.get(id), ProductionMarker::Start(_))
    }

    /// The start marker `id`. Error markers are never addressed through handles.
    #[track_caller]
    pub(crate) fn start(&self, id: MarkerId) -> &StartMarker {
        match &self.slots[id.index()].marker {
            ProductionMarker::Start(marker) => marker,
            ProductionMarker::Error(_) => panic!("{id:?} is an error marker"),
        }
    }

    #[track_caller]
    pub(crate) fn start_mut(&mut self, id: MarkerId) -> &mut StartMarker {
        match &mut self.slots[id.index()].marker {
            ProductionMarker::Start(marker) => marker,
            ProductionMarker::Error(_) => panic!("{id:?} is an error marker"),
        }
    }

    pub(crate) fn lexeme(&self, entry: Entry) -> u32 {
        match (entry, self.get(entry.id())) {
            (Entry::Start(_), ProductionMarker::Start(marker)) => marker.start,
            (Entry::End(_), ProductionMarker::Start(marker)) => marker.end.unwrap_or(marker.start),
            (_, ProductionMarker::Error(marker)) => marker.lexeme,
        }
    }

    pub(crate) fn set_lexeme(&mut self, entry: Entry, lexeme: u32) {
        match (entry, &mut self.slots[entry.id().index()].marker) {
            (Entry::Start(_), ProductionMarker::Start(marker)) => marker.start = lexeme,
            (Entry::End(_), ProductionMarker::Start(marker)) => marker.end = Some(lexeme),
            (_, ProductionMarker::Error(marker)) => marker.lexeme = lexeme,
        }
    }

    pub(crate) fn parent(&self, id: MarkerId) -> Option<MarkerId> {
        self.slots[id.index()].parent
    }

    pub(crate) fn next(&self, id: MarkerId) -> Option<MarkerId> {
        self.slots[id.index()].next
    }

    pub(crate) fn first_child(&self, id: MarkerId) -> Option<MarkerId> {
        match self.get(id) {
            ProductionMarker::Start(marker) => marker.first_child,
            ProductionMarker::Error(_) => None,
        }
    }

    /// Forgets the tree links of `id` before the tree is linked again.
    pub(crate) fn reset_links(&mut self, id: MarkerId) {
        let slot = &mut self.slots[id.index()];
        slot.parent = None;
        slot.next = None;
        if let ProductionMarker::Start(marker) = &mut slot.marker {
            marker.first_child = None;
            marker.last_child = None;
        }
    }

    pub(crate) fn add_child(&mut self, parent: MarkerId, child: MarkerId) {
        self.slots[child.index()].parent = Some(parent);
        let last = self.start(parent).last_child;
        match last {
            Some(last) => self.slots[last.index()].next = Some(child),
            None => self.start_mut(parent).first_child = Some(child),
        }
        self.start_mut(parent).last_child = Some(child);
    }

    pub(crate) fn children(&self, id: MarkerId) -> impl Iterator<Item = MarkerId> + '_ {
        std::iter::successors(self.first_child(id), |&child| self.next(child))
    }

    pub(crate) fn set_debug_site(&mut self, id: MarkerId, site: &'static Location<'static>) {
        self.debug_sites.insert(id, site);
    }

    pub(crate) fn debug_site(&self, id: MarkerId) -> Option<&'static Location<'static>> {
        self.debug_sites.get(&id).copied()
    }

    pub(crate) fn set_left_binder(&mut self, id: MarkerId, binder: Rc<dyn EdgeBinder>) {
        self.left_binders.insert(id, binder);
    }

    pub(crate) fn left_binder(&self, id: MarkerId) -> Option<&Rc<dyn EdgeBinder>> {
        self.left_binders.get(&id)
    }

    pub(crate) fn set_right_binder(&mut self, id: MarkerId, binder: Rc<dyn EdgeBinder>) {
        self.right_binders.insert(id, binder);
    }

    pub(crate) fn right_binder(&self, id: MarkerId) -> Option<&Rc<dyn EdgeBinder>> {
        self.right_binders.get(&id)
    }

    pub(crate) fn set_collapsed(&mut self, id: MarkerId) {
        self.collapsed.insert(id);
    }

    pub(crate) fn is_collapsed(&self, id: MarkerId) -> bool {
        self.collapsed.contains(&id)
    }

    pub(crate) fn set_done_error(&mut self, id: MarkerId, message: &str) {
        self.done_errors.insert(id, message.into());
    }

    pub(crate) fn done_error(&self, id: MarkerId) -> Option<&str> {
        self.done_errors.get(&id).map(|message| &**message)
    }

    /// Message of an error marker, or of a start marker finished as an error.
    pub(crate) fn error_message(&self, id: MarkerId) -> Option<&str> {
        match self.get(id) {
            ProductionMarker::Error(marker) => Some(&marker.message),
            ProductionMarker::Start(_) => self.done_error(id),
        }
    }
}
