//! Walks the linked markers and feeds nodes and leaves to a [`TreeSink`].

use text_size::TextRange;
use weft_syntax::{SyntaxKind, check_canceled};
use weft_tree::{Leaf, LeafFlavor, TreeSink};

use crate::Builder;
use crate::pool::{MarkerId, ProductionMarker};
use crate::production::Entry;

#[derive(Clone, Copy)]
enum Item {
    /// About to visit this child.
    Child(MarkerId),
    /// All children of this marker were visited.
    Done(MarkerId),
}

fn first_item(p: &Builder<'_>, id: MarkerId) -> Item {
    p.pool().first_child(id).map_or(Item::Done(id), Item::Child)
}

/// Emits the subtree of `root`. The builder must be prepared.
pub(crate) fn bind(p: &Builder<'_>, root: MarkerId, sink: &mut dyn TreeSink) {
    let pool = p.pool();

    start_composite(p, root, sink);
    let mut lexeme = pool.start(root).start as usize;
    let mut parent = root;
    let mut item = first_item(p, root);
    let mut step = 0;

    loop {
        step += 1;
        check_canceled(p.db(), step);

        let item_lexeme = match item {
            Item::Child(id) => pool.lexeme(Entry::Start(id)),
            Item::Done(id) => pool.lexeme(Entry::End(id)),
        };
        lexeme = insert_leaves(p, lexeme, item_lexeme as usize, sink);

        let visited = match item {
            Item::Done(id) if id == root => break,
            Item::Done(id) => {
                sink.finish_node();
                parent = pool.parent(id).unwrap_or(root);
                id
            }
            Item::Child(id) => match pool.get(id) {
                ProductionMarker::Start(_) if !pool.is_collapsed(id) => {
                    start_composite(p, id, sink);
                    parent = id;
                    item = first_item(p, id);
                    continue;
                }
                ProductionMarker::Start(marker) => {
                    let end = marker.end.unwrap_or(marker.start) as usize;
                    let kind = marker.kind.unwrap_or(SyntaxKind::ERROR);
                    emit_leaf(p, kind, marker.start as usize, end, true, sink);
                    lexeme = lexeme.max(end);
                    id
                }
                ProductionMarker::Error(marker) => {
                    sink.start_error(Some(&marker.message));
                    sink.finish_node();
                    id
                }
            },
        };

        item = match pool.next(visited) {
            Some(next) => Item::Child(next),
            None => Item::Done(parent),
        };
    }

    sink.finish_node();
}

fn start_composite(p: &Builder<'_>, id: MarkerId, sink: &mut dyn TreeSink) {
    match p.pool().start(id).kind {
        Some(SyntaxKind::ERROR) => sink.start_error(p.pool().done_error(id)),
        Some(kind) => sink.start_node(kind),
        None => unreachable!("linked markers are done"),
    }
}

/// Emits the bare tokens `from..to` as leaves and returns where it stopped.
fn insert_leaves(p: &Builder<'_>, from: usize, to: usize, sink: &mut dyn TreeSink) -> usize {
    let tokens = p.tokens();
    let to = to.min(tokens.len());
    let mut current = from;
    while current < to {
        let kind = tokens.kind(current);
        if !tokens.range(current).is_empty() || p.language().keeps_empty_leaf(kind) {
            emit_leaf(p, kind, current, current + 1, false, sink);
        }
        current += 1;
    }
    current.max(from)
}

/// Emits one leaf spanning tokens `start..end`.
///
/// Collapsed leaves of a lazy kind that reuses collapsed tokens carry the tokens along.
pub(crate) fn emit_leaf(
    p: &Builder<'_>,
    kind: SyntaxKind,
    start: usize,
    end: usize,
    collapsed: bool,
    sink: &mut dyn TreeSink,
) {
    let tokens = p.tokens();
    let range = TextRange::new(tokens.start(start), tokens.start(end));
    let laziness = p.language().laziness(kind);
    let flavor = if laziness.is_lazy() {
        let cached = collapsed && laziness.reuses_collapsed_tokens() && start < end;
        LeafFlavor::Lazy { tokens: cached.then(|| tokens.slice(start..end, range.len())) }
    } else if p.whitespace().contains(kind) {
        LeafFlavor::Whitespace
    } else {
        LeafFlavor::Token
    };
    sink.leaf(Leaf { kind, text: &p.original_text()[range], flavor });
}
