use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::marketplace::domain::{
    AcceptancePolicy, Actor, Application, ApplicationId, ApplicationSubmission, Bid, Budget, Job,
    JobId, NewJob,
};
use crate::workflows::marketplace::repository::{
    Changeset, Committed, EventPublisher, MarketplaceRepository, PublishError, RepositoryError,
    WorkflowEvent,
};
use crate::workflows::marketplace::service::JobApplicationWorkflow;
use crate::workflows::marketplace::store::InMemoryMarketplaceStore;

pub(super) type MemoryWorkflow = JobApplicationWorkflow<InMemoryMarketplaceStore, MemoryEvents>;

pub(super) fn owner() -> Actor {
    Actor::customer("cust-olivia")
}

pub(super) fn admin() -> Actor {
    Actor::admin("admin-sam")
}

pub(super) fn trade(name: &str) -> Actor {
    Actor::tradesperson(format!("trade-{name}"))
}

pub(super) fn new_job() -> NewJob {
    NewJob {
        title: "Replace kitchen mixer tap".to_string(),
        description: "Dripping tap, new one already bought".to_string(),
        budget: Budget::range(8_000, 15_000),
        draft: false,
    }
}

pub(super) fn submission_for(actor: &Actor) -> ApplicationSubmission {
    ApplicationSubmission {
        tradesperson_id: actor.id.clone(),
        bid: Bid::fixed(12_000, 1),
        cover_letter: "Gas Safe registered, fitted dozens of these.".to_string(),
        availability: "Weekdays after 9am".to_string(),
    }
}

pub(super) fn build_workflow() -> (
    MemoryWorkflow,
    Arc<InMemoryMarketplaceStore>,
    Arc<MemoryEvents>,
) {
    build_workflow_with(AcceptancePolicy::default())
}

pub(super) fn build_workflow_with(
    policy: AcceptancePolicy,
) -> (
    MemoryWorkflow,
    Arc<InMemoryMarketplaceStore>,
    Arc<MemoryEvents>,
) {
    let store = Arc::new(InMemoryMarketplaceStore::default());
    let events = Arc::new(MemoryEvents::default());
    let workflow = JobApplicationWorkflow::new(store.clone(), events.clone(), policy);
    (workflow, store, events)
}

/// Posts a job for [`owner`] and submits one application per tradesperson name.
pub(super) fn seeded<R, E>(
    workflow: &JobApplicationWorkflow<R, E>,
    names: &[&str],
) -> (Job, Vec<Application>)
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let job = workflow.post_job(&owner(), new_job()).expect("job posted");
    let applications = names
        .iter()
        .map(|name| {
            let actor = trade(name);
            workflow
                .submit_application(&job.id, submission_for(&actor), &actor)
                .expect("application submitted")
        })
        .collect();
    (job, applications)
}

#[derive(Default)]
pub(super) struct MemoryEvents {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }

    pub(super) fn clear(&self) {
        self.events.lock().expect("event mutex poisoned").clear();
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: WorkflowEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct OfflineEvents;

impl EventPublisher for OfflineEvents {
    fn publish(&self, _event: WorkflowEvent) -> Result<(), PublishError> {
        Err(PublishError::Transport("smtp relay offline".to_string()))
    }
}

/// Delegates to the in-memory store but fails every commit once armed.
#[derive(Default)]
pub(super) struct FailingCommitStore {
    pub(super) inner: InMemoryMarketplaceStore,
    pub(super) armed: Mutex<bool>,
}

impl FailingCommitStore {
    pub(super) fn arm(&self) {
        *self.armed.lock().expect("flag mutex poisoned") = true;
    }
}

impl MarketplaceRepository for FailingCommitStore {
    fn next_job_id(&self) -> Result<JobId, RepositoryError> {
        self.inner.next_job_id()
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert_job(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.fetch_job(id)
    }

    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        self.inner.next_application_id()
    }

    fn insert_application(
        &self,
        job: &Job,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.inner.insert_application(job, application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        self.inner.applications_for_job(job_id)
    }

    fn commit(&self, changeset: Changeset) -> Result<Committed, RepositoryError> {
        if *self.armed.lock().expect("flag mutex poisoned") {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        self.inner.commit(changeset)
    }
}

type Interleaved = Box<dyn FnOnce(&InMemoryMarketplaceStore) + Send>;

/// Runs a competing write right after the workflow has read the job's
/// applications, simulating a concurrent request.
pub(super) struct InterleavingStore {
    pub(super) inner: InMemoryMarketplaceStore,
    pending: Mutex<Option<Interleaved>>,
}

impl InterleavingStore {
    pub(super) fn new(inner: InMemoryMarketplaceStore) -> Self {
        Self {
            inner,
            pending: Mutex::new(None),
        }
    }

    pub(super) fn interleave(&self, action: Interleaved) {
        *self.pending.lock().expect("interleave mutex poisoned") = Some(action);
    }
}

impl MarketplaceRepository for InterleavingStore {
    fn next_job_id(&self) -> Result<JobId, RepositoryError> {
        self.inner.next_job_id()
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert_job(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.fetch_job(id)
    }

    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        self.inner.next_application_id()
    }

    fn insert_application(
        &self,
        job: &Job,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.inner.insert_application(job, application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        let applications = self.inner.applications_for_job(job_id)?;
        let action = self
            .pending
            .lock()
            .expect("interleave mutex poisoned")
            .take();
        if let Some(action) = action {
            action(&self.inner);
        }
        Ok(applications)
    }

    fn commit(&self, changeset: Changeset) -> Result<Committed, RepositoryError> {
        self.inner.commit(changeset)
    }
}

pub(super) struct UnavailableStore;

impl MarketplaceRepository for UnavailableStore {
    fn next_job_id(&self) -> Result<JobId, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_job(&self, _job: Job) -> Result<Job, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_job(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_application(
        &self,
        _job: &Job,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications_for_job(&self, _job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(&self, _changeset: Changeset) -> Result<Committed, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
