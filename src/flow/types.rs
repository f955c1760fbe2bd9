/// Core flow type definitions
///
/// Defines flows, nodes, edges and human intervention checkpoints. Nodes and edges
/// serialize directly into the persisted flow record, so field names here follow
/// the camelCase interchange format used for export/import.

use crate::flow::connection;
use crate::flow::graph::GraphModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A flow as held in memory during an editing session
///
/// The graph lives in an arena-indexed `GraphModel`; everything else is record
/// metadata carried through save/run unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// Unique flow identifier (e.g., "flow-onboarding")
    pub id: String,
    /// Human-readable flow name
    pub name: String,
    pub description: Option<String>,
    /// Owning crew reference
    pub crew_id: Option<String>,
    /// Nodes and edges
    pub graph: GraphModel,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub status: FlowStatus,
    /// Human-in-the-loop checkpoints attached to nodes
    pub intervention_points: Vec<InterventionPoint>,
}

impl Flow {
    /// Create an empty idle flow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            crew_id: None,
            graph: GraphModel::new(),
            created_at: Utc::now(),
            updated_at: None,
            last_run: None,
            status: FlowStatus::Idle,
            intervention_points: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_crew(mut self, crew_id: impl Into<String>) -> Self {
        self.crew_id = Some(crew_id.into());
        self
    }
}

/// A single vertex in the flow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node identifier within the flow (e.g., "task-1")
    pub id: String,
    /// The node type, which drives edge classification and layout grouping
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Display label
    pub label: String,
    /// Type-specific payload; every field is optional
    #[serde(default)]
    pub data: NodeData,
    /// Canvas position, used only by layout and rendering
    #[serde(default)]
    pub position: Position,
    /// Optional grouping parent; not interpreted by the core
    #[serde(default, rename = "parentNode", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            data: NodeData::default(),
            position: Position::default(),
            parent_id: None,
        }
    }

    /// Create a node with a generated id of the form "{type}-{uuid}"
    pub fn generated(node_type: NodeType, label: impl Into<String>) -> Self {
        let id = format!("{}-{}", node_type, uuid::Uuid::new_v4().simple());
        Self::new(id, node_type, label)
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// The eight node types a flow can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Unit of work assigned to an agent
    Task,
    /// Branches on an expression via "true"/"false" handles
    Condition,
    /// Repeats its body a fixed number of iterations
    Loop,
    Parallel,
    Sequence,
    /// Entry trigger
    Event,
    /// Blocks the run until a human approves, branches via "approved"/"rejected"
    HumanApproval,
    /// Reads from or writes to a data source
    DataOperation,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Task,
        NodeType::Condition,
        NodeType::Loop,
        NodeType::Parallel,
        NodeType::Sequence,
        NodeType::Event,
        NodeType::HumanApproval,
        NodeType::DataOperation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Task => "task",
            NodeType::Condition => "condition",
            NodeType::Loop => "loop",
            NodeType::Parallel => "parallel",
            NodeType::Sequence => "sequence",
            NodeType::Event => "event",
            NodeType::HumanApproval => "human_approval",
            NodeType::DataOperation => "data_operation",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-node payload
///
/// Fields are optional and loosely typed by node type:
/// - `condition`: Condition nodes
/// - `iterations`: Loop nodes
/// - `tasks`, `agent_id`: Task nodes
/// - `approver`, `approval_required`: HumanApproval nodes
/// - `data_source`: DataOperation nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Semantic kind of an edge, derived from its source node and handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Default,
    Conditional,
    Success,
    Failure,
    Approval,
    Rejection,
}

impl EdgeKind {
    /// Every non-default edge is drawn animated
    pub fn is_animated(&self) -> bool {
        !matches!(self, EdgeKind::Default)
    }
}

/// Directed connection between two nodes
///
/// `kind` and `animated` are not settable by callers: they are assigned by
/// `connection::classify` when the edge enters a `GraphModel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    /// Source node ID
    pub source: String,
    /// Target node ID
    pub target: String,
    /// Which logical output of the source this edge leaves from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, rename = "type")]
    kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    animated: bool,
}

impl Edge {
    /// Create an unclassified edge; it gets its kind once added to a graph
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        source_handle: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle,
            kind: EdgeKind::Default,
            label: None,
            animated: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn animated(&self) -> bool {
        self.animated
    }

    pub fn handle(&self) -> Option<&str> {
        self.source_handle.as_deref()
    }

    /// Derive kind and animation from the source node type
    pub(crate) fn classify_from(&mut self, source_type: NodeType) {
        self.kind = connection::classify(source_type, self.handle());
        self.animated = self.kind.is_animated();
    }
}

/// Lifecycle status of a flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowStatus::Idle => "idle",
            FlowStatus::Running => "running",
            FlowStatus::Completed => "completed",
            FlowStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Human-in-the-loop checkpoint attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionPoint {
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: InterventionKind,
    pub status: InterventionStatus,
}

impl InterventionPoint {
    pub fn pending(node_id: impl Into<String>, kind: InterventionKind) -> Self {
        Self {
            node_id: node_id.into(),
            kind,
            status: InterventionStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InterventionStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    Approval,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    Pending,
    Completed,
}
