//! Pure lifecycle rules for jobs and applications.
//!
//! Every check runs in the same order: role, idempotence, state table, then the
//! preconditions attached to the table row. Nothing here touches storage.

use std::fmt;

use super::domain::{
    AcceptancePolicy, Actor, Application, ApplicationId, ApplicationStatus, Job, JobStatus,
    NoteAuthor, Role, UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Job,
    Application,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Job => f.write_str("job"),
            EntityKind::Application => f.write_str("application"),
        }
    }
}

/// Rule violations raised before any state is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{actor} ({}) is not permitted to {action}", .role.label())]
    Unauthorized {
        actor: UserId,
        role: Role,
        action: String,
    },
    #[error("{entity} {id} cannot move from {from} to {to}: {reason}")]
    InvalidTransition {
        entity: EntityKind,
        id: String,
        from: &'static str,
        to: &'static str,
        reason: String,
    },
}

impl TransitionError {
    pub(crate) fn unauthorized(actor: &Actor, action: impl Into<String>) -> Self {
        TransitionError::Unauthorized {
            actor: actor.id.clone(),
            role: actor.role,
            action: action.into(),
        }
    }

    fn application(
        application: &Application,
        to: ApplicationStatus,
        reason: impl Into<String>,
    ) -> Self {
        TransitionError::InvalidTransition {
            entity: EntityKind::Application,
            id: application.id.0.clone(),
            from: application.status.label(),
            to: to.label(),
            reason: reason.into(),
        }
    }

    fn job(job: &Job, to: JobStatus, reason: impl Into<String>) -> Self {
        TransitionError::InvalidTransition {
            entity: EntityKind::Job,
            id: job.id.0.clone(),
            from: job.status.label(),
            to: to.label(),
            reason: reason.into(),
        }
    }
}

/// Outcome of a validated single-entity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Entity already sits in the requested status.
    Unchanged,
    Apply,
}

/// Outcome of a validated acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptancePlan {
    Unchanged,
    Apply {
        reject: Vec<ApplicationId>,
        start_job: bool,
    },
}

/// Edges of the application graph. Acceptance is listed here but always
/// executed through [`plan_acceptance`].
pub fn application_edge_exists(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;

    matches!(
        (from, to),
        (Pending, Shortlisted)
            | (Pending, Accepted)
            | (Pending, Rejected)
            | (Shortlisted, Accepted)
            | (Shortlisted, Rejected)
            | (Shortlisted, Pending)
            | (Pending, Withdrawn)
            | (Shortlisted, Withdrawn)
    )
}

/// Edges of the job graph available to the job owner.
pub fn job_edge_exists(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;

    matches!(
        (from, to),
        (Draft, Open)
            | (Draft, Canceled)
            | (Open, InProgress)
            | (InProgress, Completed)
            | (Open, Canceled)
    )
}

/// Withdrawal belongs to the applicant, everything else to the job owner
/// (admins may stand in for the owner, never for the applicant).
pub fn authorize_application_transition(
    actor: &Actor,
    job: &Job,
    application: &Application,
    to: ApplicationStatus,
) -> Result<(), TransitionError> {
    let permitted = match to {
        ApplicationStatus::Withdrawn => application.is_submitted_by(actor),
        _ => job.is_owned_by(actor) || actor.is_admin(),
    };

    if permitted {
        Ok(())
    } else {
        Err(TransitionError::unauthorized(
            actor,
            format!("mark application {} as {}", application.id, to.label()),
        ))
    }
}

pub fn plan_application_transition(
    actor: &Actor,
    job: &Job,
    application: &Application,
    to: ApplicationStatus,
) -> Result<TransitionPlan, TransitionError> {
    authorize_application_transition(actor, job, application, to)?;

    if application.status == to {
        return Ok(TransitionPlan::Unchanged);
    }

    if !application_edge_exists(application.status, to) {
        return Err(TransitionError::application(
            application,
            to,
            "transition is not defined",
        ));
    }

    if to != ApplicationStatus::Withdrawn && job.status != JobStatus::Open {
        return Err(TransitionError::application(
            application,
            to,
            format!("job {} is {}, not open", job.id, job.status),
        ));
    }

    Ok(TransitionPlan::Apply)
}

/// Validates the accept side-effect and works out which siblings it rejects.
///
/// `siblings` may include the target itself; it is skipped.
pub fn plan_acceptance(
    actor: &Actor,
    job: &Job,
    target: &Application,
    siblings: &[Application],
    policy: AcceptancePolicy,
) -> Result<AcceptancePlan, TransitionError> {
    authorize_application_transition(actor, job, target, ApplicationStatus::Accepted)?;

    if target.status == ApplicationStatus::Accepted {
        return Ok(AcceptancePlan::Unchanged);
    }

    if !target.status.is_live() {
        return Err(TransitionError::application(
            target,
            ApplicationStatus::Accepted,
            "only pending or shortlisted applications can be accepted",
        ));
    }

    if job.status != JobStatus::Open {
        return Err(TransitionError::application(
            target,
            ApplicationStatus::Accepted,
            format!("job {} is {}, not open", job.id, job.status),
        ));
    }

    let others = siblings.iter().filter(|sibling| sibling.id != target.id);

    if let Some(accepted) = others
        .clone()
        .find(|sibling| sibling.status == ApplicationStatus::Accepted)
    {
        return Err(TransitionError::application(
            target,
            ApplicationStatus::Accepted,
            format!("application {} is already accepted", accepted.id),
        ));
    }

    let reject = others
        .filter(|sibling| match sibling.status {
            ApplicationStatus::Pending => true,
            ApplicationStatus::Shortlisted => policy.reject_shortlisted_on_accept,
            _ => false,
        })
        .map(|sibling| sibling.id.clone())
        .collect();

    Ok(AcceptancePlan::Apply {
        reject,
        start_job: policy.start_job_on_accept,
    })
}

/// Owner moves follow [`job_edge_exists`]; admins may move a job between any
/// statuses except out of a terminal one. Either way a job only enters
/// in-progress or completed with an accepted application to select.
pub fn plan_job_transition(
    actor: &Actor,
    job: &Job,
    to: JobStatus,
    has_accepted_application: bool,
) -> Result<TransitionPlan, TransitionError> {
    if !job.is_owned_by(actor) && !actor.is_admin() {
        return Err(TransitionError::unauthorized(
            actor,
            format!("move job {} to {}", job.id, to.label()),
        ));
    }

    if job.status == to {
        return Ok(TransitionPlan::Unchanged);
    }

    if job.status.is_terminal() {
        return Err(TransitionError::job(job, to, "job is closed"));
    }

    if !actor.is_admin() && !job_edge_exists(job.status, to) {
        return Err(TransitionError::job(job, to, "transition is not defined"));
    }

    if to.has_selected_tradesperson() && !has_accepted_application {
        return Err(TransitionError::job(
            job,
            to,
            "no application has been accepted",
        ));
    }

    Ok(TransitionPlan::Apply)
}

/// Decides which note slot the actor writes to.
pub fn note_author(
    actor: &Actor,
    job: &Job,
    application: &Application,
) -> Result<NoteAuthor, TransitionError> {
    if job.is_owned_by(actor) {
        Ok(NoteAuthor::Customer)
    } else if application.is_submitted_by(actor) {
        Ok(NoteAuthor::Tradesperson)
    } else {
        Err(TransitionError::unauthorized(
            actor,
            format!("add notes to application {}", application.id),
        ))
    }
}
