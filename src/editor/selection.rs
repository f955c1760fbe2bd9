/// Ephemeral editor selection
///
/// Not part of the flow record. Kept only so graph deletions and undo/redo can
/// drop references to elements that no longer exist.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub node: Option<String>,
    pub edge: Option<String>,
}

impl Selection {
    pub fn clear(&mut self) {
        self.node = None;
        self.edge = None;
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_none() && self.edge.is_none()
    }

    /// Drop the node selection if it points at `id`
    pub fn forget_node(&mut self, id: &str) {
        if self.node.as_deref() == Some(id) {
            self.node = None;
        }
    }

    /// Drop the edge selection if it points at `id`
    pub fn forget_edge(&mut self, id: &str) {
        if self.edge.as_deref() == Some(id) {
            self.edge = None;
        }
    }
}
