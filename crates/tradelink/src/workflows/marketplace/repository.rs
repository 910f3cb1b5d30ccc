use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Job, JobId, JobStatus, NoteAuthor, UserId,
};

/// Set of entity writes that must land together or not at all.
///
/// Each entity carries the `version` it was read at; the repository compares
/// it with the stored version before writing and bumps it on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub jobs: Vec<Job>,
    pub applications: Vec<Application>,
}

impl Changeset {
    pub fn job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn application(mut self, application: Application) -> Self {
        self.applications.push(application);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.applications.is_empty()
    }
}

/// Entities as stored after a successful commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Committed {
    pub jobs: Vec<Job>,
    pub applications: Vec<Application>,
}

/// Storage abstraction so the workflow service can be exercised in isolation.
pub trait MarketplaceRepository: Send + Sync {
    /// Allocates the identifier for a job about to be inserted.
    fn next_job_id(&self) -> Result<JobId, RepositoryError>;
    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError>;
    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;

    fn next_application_id(&self) -> Result<ApplicationId, RepositoryError>;
    /// Inserts an application against `job` as it was read. The job's stored
    /// version must still match and is bumped, so any commit planned against
    /// the previous set of applications fails with
    /// [`RepositoryError::Conflict`].
    ///
    /// Fails with [`RepositoryError::Duplicate`] when the tradesperson already
    /// applied to the job.
    fn insert_application(
        &self,
        job: &Job,
        application: Application,
    ) -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError>;

    /// Atomic conditional write of every entity in the changeset.
    fn commit(&self, changeset: Changeset) -> Result<Committed, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Duplicate,
    #[error("stale write: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, push, in-app messaging adapters).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: WorkflowEvent) -> Result<(), PublishError>;
}

/// Status changes announced to the notification subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    JobPosted {
        job_id: JobId,
        customer_id: UserId,
    },
    ApplicationSubmitted {
        application_id: ApplicationId,
        job_id: JobId,
        tradesperson_id: UserId,
    },
    ApplicationStatusChanged {
        application_id: ApplicationId,
        job_id: JobId,
        tradesperson_id: UserId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    JobStatusChanged {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    NoteAppended {
        application_id: ApplicationId,
        author: NoteAuthor,
    },
}

impl WorkflowEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::JobPosted { .. } => "job_posted",
            WorkflowEvent::ApplicationSubmitted { .. } => "application_submitted",
            WorkflowEvent::ApplicationStatusChanged { .. } => "application_status_changed",
            WorkflowEvent::JobStatusChanged { .. } => "job_status_changed",
            WorkflowEvent::NoteAppended { .. } => "note_appended",
        }
    }
}

/// Event dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Publisher that drops every event, for callers without a notification sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEvents;

impl EventPublisher for DiscardEvents {
    fn publish(&self, _event: WorkflowEvent) -> Result<(), PublishError> {
        Ok(())
    }
}
