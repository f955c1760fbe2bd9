/// Flow lifecycle: save and run
///
/// Status moves idle -> running on launch, and running -> completed | error when
/// the executor reports back. Saves are allowed in every state and never touch
/// status. Each operation kind has its own in-flight flag: a second save while
/// one is pending is rejected, as is a second run, and the flag is released on
/// every exit path by a drop guard.

use crate::error::{FlowError, Result};
use crate::flow::approval;
use crate::flow::serializer::{from_persisted, to_persisted};
use crate::flow::storage::FlowPersistence;
use crate::flow::types::{Flow, FlowStatus};
use crate::runtime::executor::{FlowEvent, FlowExecutor, FlowNotifier, RunOutcome, TracingNotifier};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coordinates saves and launches against the external collaborators
pub struct FlowLifecycle {
    persistence: Arc<dyn FlowPersistence>,
    executor: Arc<dyn FlowExecutor>,
    notifier: Arc<dyn FlowNotifier>,
    saving: AtomicBool,
    running: AtomicBool,
}

impl std::fmt::Debug for FlowLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowLifecycle")
            .field("saving", &self.is_saving())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Holds an in-flight flag for the duration of one operation
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FlowLifecycle {
    pub fn new(persistence: Arc<dyn FlowPersistence>, executor: Arc<dyn FlowExecutor>) -> Self {
        Self {
            persistence,
            executor,
            notifier: Arc::new(TracingNotifier),
            saving: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn FlowNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Persist a flow, bumping `updated_at`
    ///
    /// Returns the flow as saved. On failure nothing is returned for the caller
    /// to adopt, so its own copy stays as it was.
    pub async fn save(&self, mut flow: Flow) -> Result<Flow> {
        let Some(_guard) = InFlight::acquire(&self.saving) else {
            tracing::warn!("Save of flow '{}' rejected: save already in flight", flow.id);
            return Err(FlowError::SaveInProgress(flow.id));
        };

        flow.updated_at = Some(Utc::now());
        let record = to_persisted(&flow);

        match self.persistence.save(&record).await {
            Ok(()) => {
                self.notifier.notify(&FlowEvent::Saved {
                    flow_id: flow.id.clone(),
                });
                Ok(flow)
            }
            Err(err) => {
                self.notifier.notify(&FlowEvent::SaveFailed {
                    flow_id: flow.id.clone(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Launch a flow
    ///
    /// Rejected with `ApprovalPending` while any approval checkpoint is open. On
    /// success the flow is marked running, persisted, and handed to the executor.
    pub async fn run(&self, mut flow: Flow) -> Result<Flow> {
        let Some(_guard) = InFlight::acquire(&self.running) else {
            tracing::warn!("Run of flow '{}' rejected: run already in flight", flow.id);
            return Err(FlowError::RunInProgress(flow.id));
        };

        let pending = approval::pending_approvals(&flow);
        if !pending.is_empty() {
            let err = FlowError::ApprovalPending {
                nodes: pending.into_iter().collect(),
            };
            self.notifier.notify(&FlowEvent::RunFailed {
                flow_id: flow.id.clone(),
                error: err.to_string(),
            });
            return Err(err);
        }

        let previous = flow.status;
        flow.status = FlowStatus::Running;
        flow.last_run = Some(Utc::now());
        let record = to_persisted(&flow);

        if let Err(err) = self.persistence.save(&record).await {
            self.notifier.notify(&FlowEvent::RunFailed {
                flow_id: flow.id.clone(),
                error: err.to_string(),
            });
            return Err(err);
        }

        tracing::info!("Flow '{}' transitioned {} -> {}", flow.id, previous, flow.status);
        self.executor.launch(record);
        self.notifier.notify(&FlowEvent::RunStarted {
            flow_id: flow.id.clone(),
        });

        Ok(flow)
    }

    /// Apply an executor's terminal report
    ///
    /// Only a running flow moves; reports for flows in any other state are
    /// ignored.
    pub fn finish_run(&self, mut flow: Flow, outcome: &RunOutcome) -> Flow {
        if flow.status != FlowStatus::Running {
            tracing::warn!(
                "Ignoring run report for flow '{}' in state {}",
                flow.id,
                flow.status
            );
            return flow;
        }

        flow.status = outcome.status();
        if let RunOutcome::Failed(reason) = outcome {
            tracing::error!("Flow '{}' failed: {}", flow.id, reason);
        }
        self.notifier.notify(&FlowEvent::RunFinished {
            flow_id: flow.id.clone(),
            status: flow.status,
        });
        flow
    }

    /// Load a flow through the persistence collaborator
    pub async fn load(&self, id: &str) -> Result<Flow> {
        let record = self.persistence.load(id).await?;
        from_persisted(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::serializer::PersistedFlow;
    use crate::flow::storage::InMemoryStorage;
    use crate::flow::types::{InterventionStatus, Node, NodeType};
    use crate::runtime::executor::QueueExecutor;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<FlowEvent>>,
    }

    impl FlowNotifier for RecordingNotifier {
        fn notify(&self, event: &FlowEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl FlowPersistence for FailingStorage {
        async fn save(&self, _flow: &PersistedFlow) -> Result<()> {
            Err(FlowError::Persistence("disk full".into()))
        }

        async fn load(&self, id: &str) -> Result<PersistedFlow> {
            Err(FlowError::NotFound(id.to_string()))
        }
    }

    /// Blocks every save until released
    #[derive(Default)]
    struct GatedStorage {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl FlowPersistence for GatedStorage {
        async fn save(&self, _flow: &PersistedFlow) -> Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }

        async fn load(&self, id: &str) -> Result<PersistedFlow> {
            Err(FlowError::NotFound(id.to_string()))
        }
    }

    fn gated_flow() -> Flow {
        let mut flow = Flow::new("flow-gated", "Gated");
        flow.graph
            .add_node(Node::new("start", NodeType::Event, "Start"))
            .unwrap();
        flow.graph
            .add_node(Node::new("gate", NodeType::HumanApproval, "Gate"))
            .unwrap();
        flow.graph.connect("start", "gate", None).unwrap();
        approval::request_approval(&mut flow, "gate");
        flow
    }

    #[tokio::test]
    async fn test_save_bumps_updated_at_and_keeps_status() {
        let storage = Arc::new(InMemoryStorage::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let lifecycle = FlowLifecycle::new(storage.clone(), Arc::new(QueueExecutor::channel().0))
            .with_notifier(notifier.clone());

        let mut flow = gated_flow();
        flow.status = FlowStatus::Completed;
        let saved = lifecycle.save(flow).await.unwrap();

        assert!(saved.updated_at.is_some());
        assert_eq!(saved.status, FlowStatus::Completed);
        assert_eq!(storage.load("flow-gated").await.unwrap(), to_persisted(&saved));
        assert!(!lifecycle.is_saving());
        assert_eq!(
            notifier.events.lock().unwrap().as_slice(),
            &[FlowEvent::Saved {
                flow_id: "flow-gated".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_run_rejected_while_pending() {
        let storage = Arc::new(InMemoryStorage::new());
        let (executor, mut launched) = QueueExecutor::channel();
        let lifecycle = FlowLifecycle::new(storage.clone(), Arc::new(executor));

        let err = lifecycle.run(gated_flow()).await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::ApprovalPending { ref nodes } if nodes == &vec!["gate".to_string()]
        ));
        assert!(storage.is_empty().await);
        assert!(launched.try_recv().is_err());
        assert!(!lifecycle.is_running());
    }

    #[tokio::test]
    async fn test_run_after_approval_launches() {
        let storage = Arc::new(InMemoryStorage::new());
        let (executor, mut launched) = QueueExecutor::channel();
        let lifecycle = FlowLifecycle::new(storage.clone(), Arc::new(executor));

        let flow = approval::approve(gated_flow(), "gate", true);
        let running = lifecycle.run(flow).await.unwrap();

        assert_eq!(running.status, FlowStatus::Running);
        assert!(running.last_run.is_some());
        assert_eq!(
            running.intervention_points[0].status,
            InterventionStatus::Completed
        );

        let record = launched.recv().await.unwrap();
        assert_eq!(record, to_persisted(&running));
        assert_eq!(storage.load("flow-gated").await.unwrap().status, FlowStatus::Running);
    }

    #[tokio::test]
    async fn test_save_failure_surfaces_and_clears_flag() {
        let notifier = Arc::new(RecordingNotifier::default());
        let lifecycle = FlowLifecycle::new(Arc::new(FailingStorage), Arc::new(QueueExecutor::channel().0))
            .with_notifier(notifier.clone());

        let err = lifecycle.save(gated_flow()).await.unwrap_err();
        assert!(matches!(err, FlowError::Persistence(ref msg) if msg == "disk full"));
        assert!(!lifecycle.is_saving());
        assert!(matches!(
            notifier.events.lock().unwrap()[0],
            FlowEvent::SaveFailed { .. }
        ));

        // flag is free again
        assert!(matches!(
            lifecycle.save(gated_flow()).await,
            Err(FlowError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_run_persistence_failure_does_not_launch() {
        let (executor, mut launched) = QueueExecutor::channel();
        let lifecycle = FlowLifecycle::new(Arc::new(FailingStorage), Arc::new(executor));

        let flow = approval::approve(gated_flow(), "gate", true);
        assert!(lifecycle.run(flow).await.is_err());
        assert!(launched.try_recv().is_err());
        assert!(!lifecycle.is_running());
    }

    #[tokio::test]
    async fn test_second_save_rejected_while_in_flight() {
        let storage = Arc::new(GatedStorage::default());
        let lifecycle = Arc::new(FlowLifecycle::new(
            storage.clone(),
            Arc::new(QueueExecutor::channel().0),
        ));

        let first = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.save(gated_flow()).await })
        };
        storage.entered.notified().await;
        assert!(lifecycle.is_saving());

        let err = lifecycle.save(gated_flow()).await.unwrap_err();
        assert!(matches!(err, FlowError::SaveInProgress(ref id) if id == "flow-gated"));

        // runs are tracked separately from saves
        assert!(!lifecycle.is_running());

        storage.release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(!lifecycle.is_saving());
    }

    #[tokio::test]
    async fn test_second_run_rejected_while_in_flight() {
        let storage = Arc::new(GatedStorage::default());
        let lifecycle = Arc::new(FlowLifecycle::new(
            storage.clone(),
            Arc::new(QueueExecutor::channel().0),
        ));
        let flow = approval::approve(gated_flow(), "gate", true);

        let first = {
            let lifecycle = lifecycle.clone();
            let flow = flow.clone();
            tokio::spawn(async move { lifecycle.run(flow).await })
        };
        storage.entered.notified().await;

        let err = lifecycle.run(flow).await.unwrap_err();
        assert!(matches!(err, FlowError::RunInProgress(_)));

        storage.release.notify_one();
        assert_eq!(first.await.unwrap().unwrap().status, FlowStatus::Running);
        assert!(!lifecycle.is_running());
    }

    #[tokio::test]
    async fn test_finish_run_transitions() {
        let lifecycle = FlowLifecycle::new(
            Arc::new(InMemoryStorage::new()),
            Arc::new(QueueExecutor::channel().0),
        );
        let flow = approval::approve(gated_flow(), "gate", true);
        let running = lifecycle.run(flow).await.unwrap();

        let done = lifecycle.finish_run(running.clone(), &RunOutcome::Completed);
        assert_eq!(done.status, FlowStatus::Completed);

        let failed = lifecycle.finish_run(running, &RunOutcome::Failed("agent crashed".into()));
        assert_eq!(failed.status, FlowStatus::Error);

        // not running: report ignored
        let idle = lifecycle.finish_run(gated_flow(), &RunOutcome::Completed);
        assert_eq!(idle.status, FlowStatus::Idle);
    }

    #[tokio::test]
    async fn test_load_roundtrip() {
        let storage = Arc::new(InMemoryStorage::new());
        let lifecycle = FlowLifecycle::new(storage, Arc::new(QueueExecutor::channel().0));

        let saved = lifecycle.save(gated_flow()).await.unwrap();
        let loaded = lifecycle.load("flow-gated").await.unwrap();
        assert_eq!(loaded, saved);
        assert!(matches!(
            lifecycle.load("missing").await,
            Err(FlowError::NotFound(_))
        ));
    }
}
