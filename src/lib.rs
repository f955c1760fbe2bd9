/// crewflow: flow graph editor core for AI crew automation
///
/// This library provides the editable flow graph behind a crew automation
/// dashboard: typed nodes and edges, undo/redo history, human approval gating,
/// deterministic auto-layout, lossless serialization and the save/run lifecycle.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by every layer
pub mod error;

// Flow graph layer - types, graph model, history, approval, layout, serialization, storage
pub mod flow;

// Editing sessions - graph mutations recorded into undo/redo history
pub mod editor;

// Runtime coordination - save/run lifecycle and collaborator boundaries
pub mod runtime;

// Re-export commonly used types for external consumers
pub use editor::FlowEditor;
pub use error::{FlowError, Result, ValidationError};
pub use flow::{Edge, EdgeKind, Flow, FlowStatus, GraphModel, Node, NodeType, PersistedFlow};
pub use runtime::FlowLifecycle;
