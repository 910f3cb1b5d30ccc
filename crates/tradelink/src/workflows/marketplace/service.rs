use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    AcceptancePolicy, AcceptedApplication, Actor, Application, ApplicationId,
    ApplicationNotes, ApplicationStatus, ApplicationSubmission, Job, JobId, JobStatus, NewJob,
    Role, UserId,
};
use super::repository::{
    Changeset, Committed, EventPublisher, MarketplaceRepository, RepositoryError, WorkflowEvent,
};
use super::transitions::{
    note_author, plan_acceptance, plan_application_transition, plan_job_transition,
    AcceptancePlan, EntityKind, TransitionError, TransitionPlan,
};

/// Job/application lifecycle operations over a transactional repository.
///
/// Every mutating call reads, validates and commits a single changeset; the
/// repository's version check rejects writes based on a stale read.
pub struct JobApplicationWorkflow<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
    policy: AcceptancePolicy,
}

impl<R, E> JobApplicationWorkflow<R, E>
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, events: Arc<E>, policy: AcceptancePolicy) -> Self {
        Self {
            repository,
            events,
            policy,
        }
    }

    pub fn policy(&self) -> AcceptancePolicy {
        self.policy
    }

    /// Post a job owned by the calling customer.
    pub fn post_job(&self, actor: &Actor, new_job: NewJob) -> Result<Job, WorkflowError> {
        if actor.role == Role::Tradesperson {
            return Err(TransitionError::unauthorized(actor, "post jobs").into());
        }

        let title = new_job.title.trim();
        if title.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "job title must not be empty".to_string(),
            ));
        }
        new_job.budget.validate().map_err(WorkflowError::InvalidInput)?;

        let now = Utc::now();
        let job = Job {
            id: self.repository.next_job_id()?,
            title: title.to_string(),
            description: new_job.description.trim().to_string(),
            customer_id: actor.id.clone(),
            status: if new_job.draft {
                JobStatus::Draft
            } else {
                JobStatus::Open
            },
            selected_tradesperson_id: None,
            budget: new_job.budget,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let stored = self.repository.insert_job(job)?;
        info!(job_id = %stored.id, customer_id = %stored.customer_id, status = %stored.status, "job posted");
        self.announce(WorkflowEvent::JobPosted {
            job_id: stored.id.clone(),
            customer_id: stored.customer_id.clone(),
        });

        Ok(stored)
    }

    /// Submit a bid against an open job.
    pub fn submit_application(
        &self,
        job_id: &JobId,
        submission: ApplicationSubmission,
        actor: &Actor,
    ) -> Result<Application, WorkflowError> {
        if actor.role != Role::Tradesperson || actor.id != submission.tradesperson_id {
            return Err(TransitionError::unauthorized(
                actor,
                format!("apply to job {job_id} as {}", submission.tradesperson_id),
            )
            .into());
        }

        let job = self.load_job(job_id)?;
        if job.is_owned_by(actor) {
            return Err(TransitionError::unauthorized(actor, "apply to their own job").into());
        }
        if job.status != JobStatus::Open {
            return Err(WorkflowError::ClosedForApplications {
                job_id: job.id,
                status: job.status,
            });
        }
        submission.bid.validate().map_err(WorkflowError::InvalidInput)?;

        let now = Utc::now();
        let application = Application {
            id: self.repository.next_application_id()?,
            job_id: job.id.clone(),
            tradesperson_id: submission.tradesperson_id,
            status: ApplicationStatus::Pending,
            bid: submission.bid,
            cover_letter: submission.cover_letter.trim().to_string(),
            availability: submission.availability.trim().to_string(),
            notes: ApplicationNotes::default(),
            submitted_at: now,
            updated_at: now,
            version: 0,
        };

        let tradesperson_id = application.tradesperson_id.clone();
        // The insert is conditional on the job version read above, so it
        // cannot land on a job that was accepted or closed in the meantime.
        let stored = match self.repository.insert_application(&job, application) {
            Ok(stored) => stored,
            Err(RepositoryError::Duplicate) => {
                return Err(WorkflowError::DuplicateApplication {
                    job_id: job.id,
                    tradesperson_id,
                })
            }
            Err(other) => return Err(other.into()),
        };

        info!(application_id = %stored.id, job_id = %stored.job_id, tradesperson_id = %stored.tradesperson_id, "application submitted");
        self.announce(WorkflowEvent::ApplicationSubmitted {
            application_id: stored.id.clone(),
            job_id: stored.job_id.clone(),
            tradesperson_id: stored.tradesperson_id.clone(),
        });

        Ok(stored)
    }

    /// Move an application along its lifecycle. Acceptance is routed through
    /// [`Self::accept_application`] so sibling rejection always happens.
    pub fn transition_application(
        &self,
        application_id: &ApplicationId,
        to: ApplicationStatus,
        actor: &Actor,
    ) -> Result<Application, WorkflowError> {
        if to == ApplicationStatus::Accepted {
            return self
                .accept_application(application_id, actor)
                .map(|accepted| accepted.application);
        }

        let application = self.load_application(application_id)?;
        let job = self.load_job(&application.job_id)?;

        if plan_application_transition(actor, &job, &application, to)? == TransitionPlan::Unchanged
        {
            debug!(application_id = %application.id, status = %to, "application already in requested status");
            return Ok(application);
        }

        let from = application.status;
        let mut updated = application;
        updated.status = to;
        updated.updated_at = Utc::now();

        // Owner moves depend on the job being open; carrying the job in the
        // changeset makes the commit fail if it changed since the read.
        let mut changeset = Changeset::default().application(updated);
        if to != ApplicationStatus::Withdrawn {
            changeset = changeset.job(job);
        }

        let mut committed = self.repository.commit(changeset)?;
        let stored = take_application(&mut committed, application_id)?;

        info!(application_id = %stored.id, job_id = %stored.job_id, %from, %to, actor = %actor.id, "application status changed");
        self.announce(WorkflowEvent::ApplicationStatusChanged {
            application_id: stored.id.clone(),
            job_id: stored.job_id.clone(),
            tradesperson_id: stored.tradesperson_id.clone(),
            from,
            to,
        });

        Ok(stored)
    }

    /// Accept one application and apply the side-effects on the job and its
    /// competing applications in a single commit.
    pub fn accept_application(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
    ) -> Result<AcceptedApplication, WorkflowError> {
        let target = self.load_application(application_id)?;
        let job = self.load_job(&target.job_id)?;
        let siblings = self.repository.applications_for_job(&job.id)?;

        let (reject, start_job) =
            match plan_acceptance(actor, &job, &target, &siblings, self.policy)? {
                AcceptancePlan::Unchanged => {
                    debug!(application_id = %target.id, "application already accepted");
                    return Ok(AcceptedApplication {
                        application: target,
                        job,
                        rejected: Vec::new(),
                    });
                }
                AcceptancePlan::Apply { reject, start_job } => (reject, start_job),
            };

        let now = Utc::now();
        let previous_target_status = target.status;
        let previous_job_status = job.status;

        let mut accepted = target;
        accepted.status = ApplicationStatus::Accepted;
        accepted.updated_at = now;

        // The selection follows the job into in-progress; a job held open
        // picks it up from the accepted application when it is started.
        let mut job = job;
        if start_job {
            job.status = JobStatus::InProgress;
            job.selected_tradesperson_id = Some(accepted.tradesperson_id.clone());
        }
        job.updated_at = now;

        let mut rejected_previous = Vec::with_capacity(reject.len());
        let mut changeset = Changeset::default().job(job).application(accepted);
        for mut sibling in siblings
            .into_iter()
            .filter(|sibling| reject.contains(&sibling.id))
        {
            rejected_previous.push((sibling.id.clone(), sibling.status));
            sibling.status = ApplicationStatus::Rejected;
            sibling.updated_at = now;
            changeset = changeset.application(sibling);
        }

        let mut committed = self.repository.commit(changeset)?;
        let application = take_application(&mut committed, application_id)?;
        let job = take_job(&mut committed, &application.job_id)?;

        info!(
            application_id = %application.id,
            job_id = %job.id,
            rejected = rejected_previous.len(),
            job_status = %job.status,
            "application accepted"
        );

        self.announce(WorkflowEvent::ApplicationStatusChanged {
            application_id: application.id.clone(),
            job_id: job.id.clone(),
            tradesperson_id: application.tradesperson_id.clone(),
            from: previous_target_status,
            to: ApplicationStatus::Accepted,
        });
        for sibling in &committed.applications {
            let from = rejected_previous
                .iter()
                .find(|(id, _)| id == &sibling.id)
                .map(|(_, status)| *status)
                .unwrap_or(ApplicationStatus::Pending);
            self.announce(WorkflowEvent::ApplicationStatusChanged {
                application_id: sibling.id.clone(),
                job_id: job.id.clone(),
                tradesperson_id: sibling.tradesperson_id.clone(),
                from,
                to: ApplicationStatus::Rejected,
            });
        }
        if job.status != previous_job_status {
            self.announce(WorkflowEvent::JobStatusChanged {
                job_id: job.id.clone(),
                from: previous_job_status,
                to: job.status,
            });
        }

        Ok(AcceptedApplication {
            application,
            job,
            rejected: rejected_previous.into_iter().map(|(id, _)| id).collect(),
        })
    }

    /// Move a job along its lifecycle.
    pub fn transition_job(
        &self,
        job_id: &JobId,
        to: JobStatus,
        actor: &Actor,
    ) -> Result<Job, WorkflowError> {
        let job = self.load_job(job_id)?;
        let accepted = if to.has_selected_tradesperson() && !job.status.is_terminal() {
            self.repository
                .applications_for_job(job_id)?
                .into_iter()
                .find(|application| application.status == ApplicationStatus::Accepted)
        } else {
            None
        };

        if plan_job_transition(actor, &job, to, accepted.is_some())? == TransitionPlan::Unchanged {
            debug!(job_id = %job.id, status = %to, "job already in requested status");
            return Ok(job);
        }

        let from = job.status;
        let mut updated = job;
        updated.status = to;
        updated.updated_at = Utc::now();
        updated.selected_tradesperson_id = if to.has_selected_tradesperson() {
            accepted.map(|application| application.tradesperson_id)
        } else {
            None
        };

        let mut committed = self.repository.commit(Changeset::default().job(updated))?;
        let stored = take_job(&mut committed, job_id)?;

        info!(job_id = %stored.id, %from, %to, actor = %actor.id, admin = actor.is_admin(), "job status changed");
        self.announce(WorkflowEvent::JobStatusChanged {
            job_id: stored.id.clone(),
            from,
            to,
        });

        Ok(stored)
    }

    /// Append free text to the caller's side of the application notes.
    pub fn append_note(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        text: &str,
    ) -> Result<Application, WorkflowError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "note text must not be empty".to_string(),
            ));
        }

        let mut application = self.load_application(application_id)?;
        let job = self.load_job(&application.job_id)?;
        let author = note_author(actor, &job, &application)?;

        application.notes.append(author, text);
        application.updated_at = Utc::now();

        let mut committed = self
            .repository
            .commit(Changeset::default().application(application))?;
        let stored = take_application(&mut committed, application_id)?;

        debug!(application_id = %stored.id, ?author, "note appended");
        self.announce(WorkflowEvent::NoteAppended {
            application_id: stored.id.clone(),
            author,
        });

        Ok(stored)
    }

    pub fn job(&self, job_id: &JobId, actor: &Actor) -> Result<Job, WorkflowError> {
        let job = self.load_job(job_id)?;
        if job.status == JobStatus::Draft && !job.is_owned_by(actor) && !actor.is_admin() {
            return Err(not_found(EntityKind::Job, &job.id.0));
        }
        Ok(job)
    }

    pub fn application(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, WorkflowError> {
        let application = self.load_application(application_id)?;
        let job = self.load_job(&application.job_id)?;

        if application.is_submitted_by(actor) || job.is_owned_by(actor) || actor.is_admin() {
            Ok(application)
        } else {
            Err(TransitionError::unauthorized(
                actor,
                format!("view application {application_id}"),
            )
            .into())
        }
    }

    /// Owners and admins see every application; tradespeople only their own.
    pub fn applications_for_job(
        &self,
        job_id: &JobId,
        actor: &Actor,
    ) -> Result<Vec<Application>, WorkflowError> {
        let job = self.load_job(job_id)?;
        let applications = self.repository.applications_for_job(job_id)?;

        if job.is_owned_by(actor) || actor.is_admin() {
            return Ok(applications);
        }
        if actor.role == Role::Tradesperson {
            return Ok(applications
                .into_iter()
                .filter(|application| application.is_submitted_by(actor))
                .collect());
        }

        Err(TransitionError::unauthorized(
            actor,
            format!("list applications for job {job_id}"),
        )
        .into())
    }

    fn load_job(&self, job_id: &JobId) -> Result<Job, WorkflowError> {
        self.repository
            .fetch_job(job_id)?
            .ok_or_else(|| not_found(EntityKind::Job, &job_id.0))
    }

    fn load_application(&self, application_id: &ApplicationId) -> Result<Application, WorkflowError> {
        self.repository
            .fetch_application(application_id)?
            .ok_or_else(|| not_found(EntityKind::Application, &application_id.0))
    }

    /// Notifications are fire-and-forget: a failed publish never undoes a
    /// committed transition.
    fn announce(&self, event: WorkflowEvent) {
        let name = event.name();
        if let Err(err) = self.events.publish(event) {
            warn!(event = name, error = %err, "failed to publish workflow event");
        }
    }
}

fn not_found(entity: EntityKind, id: &str) -> WorkflowError {
    WorkflowError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn take_application(
    committed: &mut Committed,
    id: &ApplicationId,
) -> Result<Application, WorkflowError> {
    let index = committed
        .applications
        .iter()
        .position(|application| &application.id == id)
        .ok_or_else(|| incomplete_commit(EntityKind::Application, &id.0))?;
    Ok(committed.applications.remove(index))
}

fn take_job(committed: &mut Committed, id: &JobId) -> Result<Job, WorkflowError> {
    let index = committed
        .jobs
        .iter()
        .position(|job| &job.id == id)
        .ok_or_else(|| incomplete_commit(EntityKind::Job, &id.0))?;
    Ok(committed.jobs.remove(index))
}

fn incomplete_commit(entity: EntityKind, id: &str) -> WorkflowError {
    WorkflowError::Repository(RepositoryError::Unavailable(format!(
        "commit did not return {entity} {id}"
    )))
}

/// Error raised by the workflow service.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("concurrent modification detected: {0}")]
    Conflict(String),
    #[error("tradesperson {tradesperson_id} already applied to job {job_id}")]
    DuplicateApplication {
        job_id: JobId,
        tradesperson_id: UserId,
    },
    #[error("job {job_id} is {status} and not accepting applications")]
    ClosedForApplications { job_id: JobId, status: JobStatus },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl WorkflowError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            WorkflowError::Transition(TransitionError::Unauthorized { .. })
        )
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            WorkflowError::Transition(TransitionError::InvalidTransition { .. })
        )
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(detail) => WorkflowError::Conflict(detail),
            other => WorkflowError::Repository(other),
        }
    }
}
