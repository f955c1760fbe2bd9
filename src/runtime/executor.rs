/// Executor and notification collaborators
///
/// The core never walks a flow itself. A launched flow is handed to a
/// `FlowExecutor` fire-and-forget; its terminal `RunOutcome` is applied later
/// through `FlowLifecycle::finish_run`. Save and run results are also broadcast
/// to a `FlowNotifier` for user feedback.

use crate::flow::serializer::PersistedFlow;
use crate::flow::types::FlowStatus;
use tokio::sync::mpsc;

/// Receives launched flows
pub trait FlowExecutor: Send + Sync {
    /// Start executing `flow`; must not block
    fn launch(&self, flow: PersistedFlow);
}

/// Terminal outcome of a launched run, delivered out of band
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
}

impl RunOutcome {
    pub fn status(&self) -> FlowStatus {
        match self {
            RunOutcome::Completed => FlowStatus::Completed,
            RunOutcome::Failed(_) => FlowStatus::Error,
        }
    }
}

/// Hands launched flows to an executor task over an unbounded channel
#[derive(Debug, Clone)]
pub struct QueueExecutor {
    sender: mpsc::UnboundedSender<PersistedFlow>,
}

impl QueueExecutor {
    /// Create the executor and the receiving end the worker drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PersistedFlow>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl FlowExecutor for QueueExecutor {
    fn launch(&self, flow: PersistedFlow) {
        let flow_id = flow.id.clone();
        if self.sender.send(flow).is_err() {
            tracing::warn!("Executor queue closed, launch of flow '{}' dropped", flow_id);
        } else {
            tracing::debug!("Queued flow '{}' for execution", flow_id);
        }
    }
}

/// Executor that only logs launches; used when no worker is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExecutor;

impl FlowExecutor for LoggingExecutor {
    fn launch(&self, flow: PersistedFlow) {
        tracing::info!(
            "Launch requested for flow '{}' ({} nodes, {} edges); no executor attached",
            flow.id,
            flow.nodes.len(),
            flow.edges.len()
        );
    }
}

/// User-facing feedback about save and run attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Saved { flow_id: String },
    SaveFailed { flow_id: String, error: String },
    RunStarted { flow_id: String },
    RunFailed { flow_id: String, error: String },
    RunFinished { flow_id: String, status: FlowStatus },
}

/// Observes lifecycle events; must not influence them
pub trait FlowNotifier: Send + Sync {
    fn notify(&self, event: &FlowEvent);
}

/// Writes lifecycle events to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl FlowNotifier for TracingNotifier {
    fn notify(&self, event: &FlowEvent) {
        match event {
            FlowEvent::Saved { flow_id } => tracing::info!("Flow '{}' saved", flow_id),
            FlowEvent::SaveFailed { flow_id, error } => {
                tracing::error!("Saving flow '{}' failed: {}", flow_id, error)
            }
            FlowEvent::RunStarted { flow_id } => tracing::info!("Flow '{}' started", flow_id),
            FlowEvent::RunFailed { flow_id, error } => {
                tracing::warn!("Flow '{}' could not start: {}", flow_id, error)
            }
            FlowEvent::RunFinished { flow_id, status } => {
                tracing::info!("Flow '{}' finished with status {}", flow_id, status)
            }
        }
    }
}
