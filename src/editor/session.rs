/// Flow editing session
///
/// Couples a flow's graph with its undo history. Every user action that changes
/// the graph structure or layout records exactly one post-mutation snapshot;
/// rejected actions record nothing. Dragging and field edits change the graph in
/// place without a history entry.

use crate::editor::selection::Selection;
use crate::error::Result;
use crate::flow::approval;
use crate::flow::graph::{GraphModel, RemovedNode};
use crate::flow::history::HistoryStack;
use crate::flow::layout;
use crate::flow::types::{Edge, Flow, Node, NodeData, NodeType, Position};
use std::collections::BTreeSet;

/// Offset applied to a duplicated node so it does not sit on top of the original
pub const DUPLICATE_OFFSET: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct FlowEditor {
    flow: Flow,
    history: HistoryStack,
    selection: Selection,
}

impl FlowEditor {
    /// Open an editing session; the flow's current graph is the first history entry
    pub fn new(flow: Flow) -> Self {
        let history = HistoryStack::with_initial(flow.graph.snapshot());
        Self {
            flow,
            history,
            selection: Selection::default(),
        }
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn into_flow(self) -> Flow {
        self.flow
    }

    pub fn graph(&self) -> &GraphModel {
        &self.flow.graph
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Adopt status, timestamps and checkpoints from a flow returned by save/run
    ///
    /// The graph and history are left alone; edits made while the collaborator
    /// call was in flight are kept.
    pub fn sync_metadata(&mut self, committed: &Flow) {
        self.flow.status = committed.status;
        self.flow.updated_at = committed.updated_at;
        self.flow.last_run = committed.last_run;
        self.flow.intervention_points = committed.intervention_points.clone();
    }

    pub fn select_node(&mut self, id: &str) -> bool {
        if !self.flow.graph.contains_node(id) {
            return false;
        }
        self.selection.node = Some(id.to_string());
        true
    }

    pub fn select_edge(&mut self, id: &str) -> bool {
        if self.flow.graph.find_edge(id).is_none() {
            return false;
        }
        self.selection.edge = Some(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Add a node
    ///
    /// A human_approval node gets a pending approval checkpoint unless its
    /// payload says approval is not required.
    pub fn add_node(&mut self, node: Node) -> Result<&Node> {
        let needs_approval = node.node_type == NodeType::HumanApproval
            && node.data.approval_required != Some(false);
        let id = node.id.clone();

        self.flow.graph.add_node(node)?;
        if needs_approval {
            approval::request_approval(&mut self.flow, &id);
        }
        self.record();

        tracing::debug!("Editor added node '{}'", id);
        self.flow
            .graph
            .find_node(&id)
            .ok_or_else(|| crate::error::FlowError::NotFound(id))
    }

    /// Delete a node and its incident edges; unknown ids are a no-op
    pub fn delete_node(&mut self, id: &str) -> Option<RemovedNode> {
        let removed = self.flow.graph.remove_node(id)?;

        self.selection.forget_node(id);
        for edge in &removed.edges {
            self.selection.forget_edge(&edge.id);
        }
        self.record();

        Some(removed)
    }

    /// Copy a node (without its edges) under a fresh id, offset on the canvas
    pub fn duplicate_node(&mut self, id: &str) -> Result<Option<String>> {
        let Some(original) = self.flow.graph.find_node(id) else {
            return Ok(None);
        };

        let mut copy = Node::generated(original.node_type, format!("{} (copy)", original.label));
        copy.data = original.data.clone();
        copy.parent_id = original.parent_id.clone();
        copy.position = Position {
            x: original.position.x + DUPLICATE_OFFSET,
            y: original.position.y + DUPLICATE_OFFSET,
        };

        let new_id = self.add_node(copy)?.id.clone();
        Ok(Some(new_id))
    }

    /// Connect two nodes; the edge kind comes from the source type and handle
    pub fn connect(&mut self, source: &str, target: &str, handle: Option<&str>) -> Result<Edge> {
        let edge = self.flow.graph.connect(source, target, handle)?.clone();
        self.record();
        Ok(edge)
    }

    /// Delete an edge; unknown ids are a no-op
    pub fn delete_edge(&mut self, id: &str) -> Option<Edge> {
        let edge = self.flow.graph.remove_edge(id)?;
        self.selection.forget_edge(id);
        self.record();
        Some(edge)
    }

    /// Drag a node; no history entry
    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        self.flow.graph.update_node_position(id, position)
    }

    /// Replace a node's payload; no history entry
    pub fn update_node_data(&mut self, id: &str, data: NodeData) -> bool {
        self.flow.graph.update_node_data(id, data)
    }

    pub fn rename_node(&mut self, id: &str, label: impl Into<String>) -> bool {
        self.flow.graph.rename_node(id, label)
    }

    /// Auto-arrange every node on the type-grouped grid
    pub fn organize_layout(&mut self) {
        let nodes: Vec<Node> = self.flow.graph.nodes().cloned().collect();
        for node in layout::organize_layout(&nodes) {
            self.flow.graph.update_node_position(&node.id, node.position);
        }
        self.record();
    }

    /// Restore the previous snapshot; returns false at the start of history
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.flow.graph.restore(snapshot);
        self.prune_selection();
        true
    }

    /// Re-apply the next snapshot; returns false at the end of history
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.flow.graph.restore(snapshot);
        self.prune_selection();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Complete a node's approval checkpoint (see `approval::approve`)
    pub fn approve(&mut self, node_id: &str, approved: bool) -> bool {
        approval::complete_approval(&mut self.flow, node_id, approved)
    }

    pub fn pending_approvals(&self) -> BTreeSet<String> {
        approval::pending_approvals(&self.flow)
    }

    pub fn can_run(&self) -> bool {
        approval::can_run(&self.flow)
    }

    fn record(&mut self) {
        self.history.push(self.flow.graph.snapshot());
    }

    fn prune_selection(&mut self) {
        let graph = &self.flow.graph;
        if self
            .selection
            .node
            .as_deref()
            .is_some_and(|id| !graph.contains_node(id))
        {
            self.selection.node = None;
        }
        if self
            .selection
            .edge
            .as_deref()
            .is_some_and(|id| graph.find_edge(id).is_none())
        {
            self.selection.edge = None;
        }
    }
}
