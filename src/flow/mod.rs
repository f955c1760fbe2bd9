/// Flow Graph Layer
///
/// This module holds the flow graph model and everything that operates on it:
/// - Type definitions (Flow, Node, Edge, InterventionPoint)
/// - Edge classification rules
/// - Arena-indexed graph model and snapshot history
/// - Approval gating, auto-layout, serialization and templates
/// - Persistence collaborators (SQLite and in-memory)

// Core flow type definitions
pub mod types;

// Edge kind derivation from source node type and handle
pub mod connection;

// petgraph-backed mutable graph with referential invariants
pub mod graph;

// Undo/redo over full graph snapshots
pub mod history;

// Human approval checkpoints gating flow launches
pub mod approval;

// Deterministic grid auto-layout
pub mod layout;

// Persisted record conversion and JSON export/import
pub mod serializer;

// SQLite and in-memory persistence collaborators
pub mod storage;

// Built-in starting graphs
pub mod templates;

// Re-export commonly used types
pub use graph::GraphModel;
pub use history::{GraphSnapshot, HistoryStack};
pub use serializer::PersistedFlow;
pub use storage::{FlowPersistence, FlowStorage, InMemoryStorage};
pub use templates::FlowTemplate;
pub use types::{
    Edge, EdgeKind, Flow, FlowStatus, InterventionKind, InterventionPoint, InterventionStatus,
    Node, NodeData, NodeType, Position,
};
