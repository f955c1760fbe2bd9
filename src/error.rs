/// Error taxonomy for the flow editor core
///
/// Validation failures are raised synchronously and leave the graph untouched.
/// Persistence failures come from the storage collaborator and are surfaced as-is.
use thiserror::Error;

/// A rejected graph mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("edge references unknown node: {0}")]
    UnknownNode(String),

    #[error("node id already exists: {0}")]
    DuplicateNodeId(String),

    #[error("edge id already exists: {0}")]
    DuplicateEdgeId(String),

    #[error("node {node} already has an outgoing edge on handle '{handle}'")]
    DuplicateHandle { node: String, handle: String },
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid connection: {0}")]
    Validation(#[from] ValidationError),

    #[error("flow has pending approvals: {}", nodes.join(", "))]
    ApprovalPending { nodes: Vec<String> },

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("flow not found: {0}")]
    NotFound(String),

    #[error("a save is already in progress for flow {0}")]
    SaveInProgress(String),

    #[error("a run is already in progress for flow {0}")]
    RunInProgress(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Wrap a storage-layer error.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
