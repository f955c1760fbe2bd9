/// Graph model for flow editing
///
/// Stores nodes and edges in a petgraph `StableDiGraph` arena with id lookup
/// tables on the side. Stable indices survive removals, so the id maps never need
/// rebuilding after a delete. Insertion order is tracked separately and is the
/// order every iterator yields, which keeps snapshots and exports deterministic.
///
/// Cycles, self-loops and parallel edges are all legal: loop bodies return to
/// their loop node. The only structural rule beyond referential integrity is
/// handle exclusivity on condition and approval nodes.

use crate::error::ValidationError;
use crate::flow::connection;
use crate::flow::history::GraphSnapshot;
use crate::flow::types::{Edge, Node, NodeData, Position};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::HashMap;

/// Mutable directed graph of a flow
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    /// Arena holding node and edge weights
    graph: StableDiGraph<Node, Edge>,
    /// Node id -> arena index
    node_index: HashMap<String, NodeIndex>,
    /// Edge id -> arena index
    edge_index: HashMap<String, EdgeIndex>,
    /// Insertion order of live nodes
    node_order: Vec<NodeIndex>,
    /// Insertion order of live edges
    edge_order: Vec<EdgeIndex>,
}

/// A deleted node together with the edges that were cascaded with it
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub edges: Vec<Edge>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from node and edge lists, validating every edge
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, ValidationError> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        for edge in edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    /// Insert a node; ids must be unique
    pub fn add_node(&mut self, node: Node) -> Result<&Node, ValidationError> {
        if self.node_index.contains_key(&node.id) {
            return Err(ValidationError::DuplicateNodeId(node.id));
        }

        tracing::debug!("Adding node '{}' (type: {})", node.id, node.node_type);
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        self.node_order.push(idx);

        Ok(&self.graph[idx])
    }

    /// Delete a node and every edge incident to it
    ///
    /// Unknown ids are a no-op and return `None`.
    pub fn remove_node(&mut self, id: &str) -> Option<RemovedNode> {
        let idx = self.node_index.remove(id)?;

        let incident: Vec<EdgeIndex> = self
            .edge_order
            .iter()
            .copied()
            .filter(|e| {
                self.graph
                    .edge_weight(*e)
                    .is_some_and(|edge| edge.source == id || edge.target == id)
            })
            .collect();

        let mut edges = Vec::with_capacity(incident.len());
        for edge_idx in incident {
            if let Some(edge) = self.detach_edge(edge_idx) {
                edges.push(edge);
            }
        }

        self.node_order.retain(|i| *i != idx);
        let node = self.graph.remove_node(idx)?;

        tracing::debug!(
            "Removed node '{}' with {} incident edge(s)",
            node.id,
            edges.len()
        );

        Some(RemovedNode { node, edges })
    }

    /// Insert an edge after validating endpoints and handle exclusivity
    ///
    /// The edge kind is (re)derived from the source node type; whatever kind the
    /// incoming value carried is discarded.
    pub fn add_edge(&mut self, mut edge: Edge) -> Result<&Edge, ValidationError> {
        if self.edge_index.contains_key(&edge.id) {
            return Err(ValidationError::DuplicateEdgeId(edge.id));
        }

        let source_idx = *self
            .node_index
            .get(&edge.source)
            .ok_or_else(|| ValidationError::UnknownNode(edge.source.clone()))?;
        let target_idx = *self
            .node_index
            .get(&edge.target)
            .ok_or_else(|| ValidationError::UnknownNode(edge.target.clone()))?;

        let source_type = self.graph[source_idx].node_type;

        if connection::is_exclusive_handle(source_type, edge.handle()) {
            let taken = self
                .graph
                .edges_directed(source_idx, Direction::Outgoing)
                .any(|e| e.weight().handle() == edge.handle());
            if taken {
                return Err(ValidationError::DuplicateHandle {
                    node: edge.source.clone(),
                    handle: edge.handle().unwrap_or_default().to_string(),
                });
            }
        }

        edge.classify_from(source_type);

        tracing::debug!(
            "Adding edge '{}': '{}' -> '{}' ({:?})",
            edge.id,
            edge.source,
            edge.target,
            edge.kind()
        );

        let id = edge.id.clone();
        let idx = self.graph.add_edge(source_idx, target_idx, edge);
        self.edge_index.insert(id, idx);
        self.edge_order.push(idx);

        Ok(&self.graph[idx])
    }

    /// Connect two nodes through an optional source handle, generating the edge id
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        handle: Option<&str>,
    ) -> Result<&Edge, ValidationError> {
        let id = format!("edge-{}", uuid::Uuid::new_v4().simple());
        self.add_edge(Edge::new(id, source, target, handle.map(str::to_string)))
    }

    /// Delete an edge by id; unknown ids are a no-op
    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let idx = *self.edge_index.get(id)?;
        let edge = self.detach_edge(idx)?;
        tracing::debug!("Removed edge '{}'", edge.id);
        Some(edge)
    }

    fn detach_edge(&mut self, idx: EdgeIndex) -> Option<Edge> {
        let edge = self.graph.remove_edge(idx)?;
        self.edge_index.remove(&edge.id);
        self.edge_order.retain(|i| *i != idx);
        Some(edge)
    }

    /// Move a node; returns false if the node does not exist
    pub fn update_node_position(&mut self, id: &str, position: Position) -> bool {
        match self.find_node_mut(id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Replace a node's payload; returns false if the node does not exist
    pub fn update_node_data(&mut self, id: &str, data: NodeData) -> bool {
        match self.find_node_mut(id) {
            Some(node) => {
                node.data = data;
                true
            }
            None => false,
        }
    }

    pub fn rename_node(&mut self, id: &str, label: impl Into<String>) -> bool {
        match self.find_node_mut(id) {
            Some(node) => {
                node.label = label.into();
                true
            }
            None => false,
        }
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.node_index
            .get(id)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let idx = *self.node_index.get(id)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn find_edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index
            .get(id)
            .and_then(|idx| self.graph.edge_weight(*idx))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.node_order
            .iter()
            .filter_map(move |idx| self.graph.node_weight(*idx))
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_order
            .iter()
            .filter_map(move |idx| self.graph.edge_weight(*idx))
    }

    /// Edges leaving `id`, in insertion order
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges().filter(move |edge| edge.source == id)
    }

    /// Edges entering `id`, in insertion order
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges().filter(move |edge| edge.target == id)
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_order.is_empty()
    }

    /// Full copy of the current nodes and edges
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    /// Replace the whole graph with a snapshot
    ///
    /// Duplicate ids and dangling edges are skipped, and every edge kind is
    /// recomputed from its source node.
    pub fn restore(&mut self, snapshot: &GraphSnapshot) {
        let mut graph = Self::new();

        for node in &snapshot.nodes {
            if graph.node_index.contains_key(&node.id) {
                tracing::warn!("Skipping duplicate node '{}' in snapshot", node.id);
                continue;
            }
            let idx = graph.graph.add_node(node.clone());
            graph.node_index.insert(node.id.clone(), idx);
            graph.node_order.push(idx);
        }

        for edge in &snapshot.edges {
            if graph.edge_index.contains_key(&edge.id) {
                tracing::warn!("Skipping duplicate edge '{}' in snapshot", edge.id);
                continue;
            }
            let endpoints = (
                graph.node_index.get(&edge.source).copied(),
                graph.node_index.get(&edge.target).copied(),
            );
            if let (Some(source), Some(target)) = endpoints {
                let mut edge = edge.clone();
                edge.classify_from(graph.graph[source].node_type);
                let id = edge.id.clone();
                let idx = graph.graph.add_edge(source, target, edge);
                graph.edge_index.insert(id, idx);
                graph.edge_order.push(idx);
            } else {
                tracing::warn!("Skipping dangling edge '{}' in snapshot", edge.id);
            }
        }

        *self = graph;
    }
}

impl PartialEq for GraphModel {
    fn eq(&self, other: &Self) -> bool {
        self.nodes().eq(other.nodes()) && self.edges().eq(other.edges())
    }
}
