use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tradelink::workflows::marketplace::{
    AcceptancePolicy, EventPublisher, InMemoryMarketplaceStore, JobApplicationWorkflow,
    PublishError, WorkflowEvent,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MarketplaceWorkflow<E> = JobApplicationWorkflow<InMemoryMarketplaceStore, E>;

/// Notification sink for the long-running service: events are logged and
/// dropped.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogEvents;

impl EventPublisher for LogEvents {
    fn publish(&self, event: WorkflowEvent) -> Result<(), PublishError> {
        info!(event = event.name(), ?event, "workflow notification");
        Ok(())
    }
}

/// Logs like [`LogEvents`] and also keeps every event, so the demo can show
/// what would have been sent. Grows without bound; not for `serve`.
#[derive(Default, Clone)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl EventPublisher for EventLog {
    fn publish(&self, event: WorkflowEvent) -> Result<(), PublishError> {
        LogEvents.publish(event.clone())?;
        let mut guard = self
            .events
            .lock()
            .map_err(|_| PublishError::Transport("event log mutex poisoned".to_string()))?;
        guard.push(event);
        Ok(())
    }
}

impl EventLog {
    pub(crate) fn events(&self) -> Vec<WorkflowEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

pub(crate) fn build_workflow<E>(
    policy: AcceptancePolicy,
    events: E,
) -> (Arc<MarketplaceWorkflow<E>>, InMemoryMarketplaceStore)
where
    E: EventPublisher + 'static,
{
    let store = InMemoryMarketplaceStore::default();
    let workflow = JobApplicationWorkflow::new(Arc::new(store.clone()), Arc::new(events), policy);
    (Arc::new(workflow), store)
}
