//! The marker production log: the parse tree serialized as start and end entries.

use crate::pool::{MarkerId, MarkerPool, ProductionMarker};

/// How many trailing entries are scanned before falling back to binary search.
const LINEAR_SEARCH_LIMIT: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Entry {
    /// A marker starts here. Error markers only ever appear as starts.
    Start(MarkerId),
    /// The start marker is done here.
    End(MarkerId),
}

impl Entry {
    pub(crate) fn id(self) -> MarkerId {
        match self {
            Entry::Start(id) | Entry::End(id) => id,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Production {
    entries: Vec<Entry>,
}

impl Production {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Entry {
        self.entries[index]
    }

    pub(crate) fn last(&self) -> Option<Entry> {
        self.entries.last().copied()
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn add_marker(&mut self, id: MarkerId) {
        self.entries.push(Entry::Start(id));
    }

    /// Closes `id` at the end of the log, or right before the entry at `before`.
    pub(crate) fn add_done(&mut self, id: MarkerId, before: Option<usize>) {
        match before {
            Some(index) => self.entries.insert(index, Entry::End(id)),
            None => self.entries.push(Entry::End(id)),
        }
    }

    /// Inserts the start of `id` right before the entry at `anchor`.
    pub(crate) fn add_before(&mut self, id: MarkerId, anchor: usize) {
        self.entries.insert(anchor, Entry::Start(id));
    }

    pub(crate) fn remove(&mut self, index: usize) -> Entry {
        self.entries.remove(index)
    }

    /// Position of the start entry of `id`.
    ///
    /// Recent markers are found by a short backward scan. Older ones are located by binary
    /// search over lexeme indices, which never decrease along the log until whitespace
    /// balancing runs.
    pub(crate) fn index_of(&self, pool: &MarkerPool, id: MarkerId) -> Option<usize> {
        let target = Entry::Start(id);
        let tail = self.entries.len().saturating_sub(LINEAR_SEARCH_LIMIT);
        if let Some(offset) = self.entries[tail..].iter().rposition(|&entry| entry == target) {
            return Some(tail + offset);
        }

        let lexeme = pool.lexeme(target);
        let head = &self.entries[..tail];
        let first = head.partition_point(|&entry| pool.lexeme(entry) < lexeme);
        head[first..]
            .iter()
            .take_while(|&&entry| pool.lexeme(entry) == lexeme)
            .position(|&entry| entry == target)
            .map(|offset| first + offset)
    }

    /// Position of the end entry of `id`, scanning from the back.
    pub(crate) fn index_of_done(&self, id: MarkerId) -> Option<usize> {
        self.entries.iter().rposition(|&entry| entry == Entry::End(id))
    }

    /// Drops every entry from `index` on, freeing the markers they start.
    ///
    /// Markers that started before `index` but were closed inside the dropped range are
    /// opened again.
    pub(crate) fn rollback_to(&mut self, pool: &mut MarkerPool, index: usize) {
        for &entry in &self.entries[index..] {
            match entry {
                Entry::Start(id) => pool.free(id),
                // Markers started inside the range were freed at their start entry.
                Entry::End(id) if pool.is_allocated(id) => {
                    let marker = pool.start_mut(id);
                    marker.end = None;
                    marker.kind = None;
                }
                Entry::End(_) => {}
            }
        }
        self.entries.truncate(index);
    }

    /// True if an error marker, or a marker finished as an error, follows `index`.
    pub(crate) fn has_errors_after(&self, pool: &MarkerPool, index: usize) -> bool {
        self.entries[index + 1..].iter().any(|&entry| match entry {
            Entry::Start(id) => matches!(pool.get(id), ProductionMarker::Error(_)),
            Entry::End(id) => pool.done_error(id).is_some(),
        })
    }

    /// Pulls entries before `before` that lie at or past `lexeme` back to `lexeme`.
    ///
    /// Stops at the first entry that already lies before it; the root start is never moved.
    pub(crate) fn confine_markers_to_max_lexeme(
        &self,
        pool: &mut MarkerPool,
        before: usize,
        lexeme: u32,
    ) {
        for &entry in self.entries[1..before].iter().rev() {
            if pool.lexeme(entry) < lexeme {
                break;
            }
            pool.set_lexeme(entry, lexeme);
        }
    }
}
