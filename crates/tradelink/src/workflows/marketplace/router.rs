use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, ApplicationId, ApplicationStatus, ApplicationSubmission, Bid, JobId, JobStatus, NewJob,
    Role, UserId,
};
use super::repository::{EventPublisher, MarketplaceRepository, RepositoryError};
use super::service::{JobApplicationWorkflow, WorkflowError};
use super::transitions::TransitionError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Caller identity forwarded by the authenticating gateway.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| unauthenticated(format!("missing {ACTOR_ID_HEADER} header")))?;
        let raw_role = header(ACTOR_ROLE_HEADER)
            .ok_or_else(|| unauthenticated(format!("missing {ACTOR_ROLE_HEADER} header")))?;
        let role = Role::parse(&raw_role)
            .ok_or_else(|| unauthenticated(format!("unknown actor role '{raw_role}'")))?;

        Ok(RequestActor(Actor::new(id, role)))
    }
}

fn unauthenticated(message: String) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": message, "kind": "unauthenticated" })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    #[serde(default)]
    pub tradesperson_id: Option<UserId>,
    pub bid: Bid,
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub availability: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct JobStatusRequest {
    pub status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

/// Router builder exposing the job and application lifecycle endpoints.
pub fn marketplace_router<R, E>(workflow: Arc<JobApplicationWorkflow<R, E>>) -> Router
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/jobs", post(post_job_handler::<R, E>))
        .route("/api/v1/jobs/:job_id", get(job_handler::<R, E>))
        .route(
            "/api/v1/jobs/:job_id/status",
            post(job_status_handler::<R, E>),
        )
        .route(
            "/api/v1/jobs/:job_id/applications",
            get(list_applications_handler::<R, E>).post(submit_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(application_status_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/accept",
            post(accept_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/notes",
            post(note_handler::<R, E>),
        )
        .with_state(workflow)
}

type WorkflowState<R, E> = State<Arc<JobApplicationWorkflow<R, E>>>;

pub(crate) async fn post_job_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Json(new_job): Json<NewJob>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.post_job(&actor, new_job) {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(job_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.job(&JobId(job_id), &actor) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_status_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(job_id): Path<String>,
    Json(request): Json<JobStatusRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.transition_job(&JobId(job_id), request.status, &actor) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_applications_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(job_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.applications_for_job(&JobId(job_id), &actor) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(job_id): Path<String>,
    Json(request): Json<SubmitApplicationRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    let submission = ApplicationSubmission {
        tradesperson_id: request
            .tradesperson_id
            .unwrap_or_else(|| actor.id.clone()),
        bid: request.bid,
        cover_letter: request.cover_letter,
        availability: request.availability,
    };

    match workflow.submit_application(&JobId(job_id), submission, &actor) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn application_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(application_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.application(&ApplicationId(application_id), &actor) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn application_status_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(application_id): Path<String>,
    Json(request): Json<ApplicationStatusRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.transition_application(&ApplicationId(application_id), request.status, &actor)
    {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn accept_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(application_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.accept_application(&ApplicationId(application_id), &actor) {
        Ok(accepted) => (StatusCode::OK, Json(accepted)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn note_handler<R, E>(
    State(workflow): WorkflowState<R, E>,
    RequestActor(actor): RequestActor,
    Path(application_id): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    E: EventPublisher + 'static,
{
    match workflow.append_note(&ApplicationId(application_id), &actor, &request.text) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: WorkflowError) -> Response {
    let (status, kind) = match &err {
        WorkflowError::Transition(TransitionError::Unauthorized { .. }) => {
            (StatusCode::FORBIDDEN, "unauthorized")
        }
        WorkflowError::Transition(TransitionError::InvalidTransition { .. }) => {
            (StatusCode::CONFLICT, "invalid_transition")
        }
        WorkflowError::NotFound { .. } | WorkflowError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        WorkflowError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        WorkflowError::DuplicateApplication { .. } => {
            (StatusCode::CONFLICT, "duplicate_application")
        }
        WorkflowError::ClosedForApplications { .. } => {
            (StatusCode::CONFLICT, "closed_for_applications")
        }
        WorkflowError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        WorkflowError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unavailable"),
    };

    let payload = json!({
        "error": err.to_string(),
        "kind": kind,
    });
    (status, Json(payload)).into_response()
}
