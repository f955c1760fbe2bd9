/// Linear undo/redo history over full graph snapshots
///
/// Each entry is a complete copy of the nodes and edges after a user action.
/// Flows are small, so whole copies are kept instead of diffs.

use crate::flow::types::{Edge, Node};

/// Full copy of a graph's nodes and edges, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// Ordered snapshots plus a cursor
///
/// Undo and redo past either end are no-ops, never errors.
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    entries: Vec<GraphSnapshot>,
    index: usize,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history whose first entry is `initial`
    pub fn with_initial(initial: GraphSnapshot) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    /// Record a post-mutation snapshot, discarding any abandoned redo branch
    pub fn push(&mut self, snapshot: GraphSnapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(snapshot);
        self.index = self.entries.len() - 1;
    }

    /// Step back one entry and return the snapshot to restore
    pub fn undo(&mut self) -> Option<&GraphSnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Step forward one entry and return the snapshot to restore
    pub fn redo(&mut self) -> Option<&GraphSnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// The snapshot at the cursor, if any entry exists
    pub fn current(&self) -> Option<&GraphSnapshot> {
        self.entries.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
