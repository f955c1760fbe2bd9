/// Runtime Coordination
///
/// This module moves flows between the editor and the outside world. It handles:
/// - Save/run lifecycle with approval gating
/// - In-flight tracking so saves and runs cannot overlap with themselves
/// - Executor and notification collaborator boundaries

// Status state machine and save/run orchestration
pub mod lifecycle;

// Executor and notifier collaborator traits with default implementations
pub mod executor;

// Re-export main types
pub use executor::{
    FlowEvent, FlowExecutor, FlowNotifier, LoggingExecutor, QueueExecutor, RunOutcome,
    TracingNotifier,
};
pub use lifecycle::FlowLifecycle;
