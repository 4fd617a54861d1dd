use crate::{NodeId, SyntaxTree};

/// Receives the edits that turn an old tree into a freshly parsed one.
///
/// `old` and `parent` always name nodes of the old tree. Positions are child indices at the time
/// the event is applied, so events must be applied in the order they were emitted.
pub trait DiffSink {
    fn node_deleted(&mut self, parent: NodeId, old: NodeId);

    fn node_inserted(&mut self, parent: NodeId, subtree: SyntaxTree, position: usize);

    fn node_replaced(&mut self, old: NodeId, subtree: SyntaxTree);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEvent {
    Inserted { parent: NodeId, position: usize, subtree: SyntaxTree },
    Deleted { parent: NodeId, node: NodeId },
    Replaced { node: NodeId, subtree: SyntaxTree },
}

/// Recorded edit script, applied as one transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffLog {
    events: Vec<DiffEvent>,
}

impl DiffLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[DiffEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Applies every event to `tree`, in order.
    pub fn apply(self, tree: &mut SyntaxTree) {
        for event in self.events {
            match event {
                DiffEvent::Inserted { parent, position, subtree } => {
                    tree.insert(parent, &subtree, position);
                }
                DiffEvent::Deleted { parent, node } => tree.remove(parent, node),
                DiffEvent::Replaced { node, subtree } => tree.replace(node, &subtree),
            }
        }
    }
}

impl DiffSink for DiffLog {
    fn node_deleted(&mut self, parent: NodeId, old: NodeId) {
        self.events.push(DiffEvent::Deleted { parent, node: old });
    }

    fn node_inserted(&mut self, parent: NodeId, subtree: SyntaxTree, position: usize) {
        self.events.push(DiffEvent::Inserted { parent, position, subtree });
    }

    fn node_replaced(&mut self, old: NodeId, subtree: SyntaxTree) {
        self.events.push(DiffEvent::Replaced { node: old, subtree });
    }
}
