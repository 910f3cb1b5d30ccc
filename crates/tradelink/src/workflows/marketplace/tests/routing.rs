use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::marketplace::domain::{AcceptancePolicy, Actor, JobStatus};
use crate::workflows::marketplace::router::{
    self, marketplace_router, NoteRequest, RequestActor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER,
};
use crate::workflows::marketplace::service::JobApplicationWorkflow;

fn request(method: &str, uri: &str, actor: Option<&Actor>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, actor.id.0.as_str())
            .header(ACTOR_ROLE_HEADER, actor.role.label());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

#[tokio::test]
async fn post_job_route_creates_open_job() {
    let (workflow, _, _) = build_workflow();
    let app = marketplace_router(Arc::new(workflow));

    let response = app
        .oneshot(request(
            "POST",
            "/api/v1/jobs",
            Some(&owner()),
            Some(json!({
                "title": "Fix leaking radiator valve",
                "budget": { "type": "fixed", "min_amount": 9500 }
            })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "open");
    assert_eq!(payload["customer_id"], "cust-olivia");
    assert_eq!(payload["budget"]["currency"], "GBP");
}

#[tokio::test]
async fn missing_actor_headers_are_unauthenticated() {
    let (workflow, _, _) = build_workflow();
    let app = marketplace_router(Arc::new(workflow));

    let response = app
        .oneshot(request(
            "POST",
            "/api/v1/jobs",
            None,
            Some(json!({ "title": "x", "budget": { "type": "negotiable" } })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "unauthenticated");
}

#[tokio::test]
async fn unknown_role_is_unauthenticated() {
    let (workflow, _, _) = build_workflow();
    let app = marketplace_router(Arc::new(workflow));

    let response = app
        .oneshot(
            Request::get("/api/v1/jobs/job-000001")
                .header(ACTOR_ID_HEADER, "someone")
                .header(ACTOR_ROLE_HEADER, "landlord")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn accept_route_returns_job_and_rejections() {
    let (workflow, _, _) = build_workflow();
    let (job, apps) = seeded(&workflow, &["alex", "blake"]);
    let app = marketplace_router(Arc::new(workflow));

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{}/accept", apps[0].id),
            Some(&owner()),
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["application"]["status"], "accepted");
    assert_eq!(payload["job"]["id"], job.id.0.as_str());
    assert_eq!(payload["job"]["status"], "in-progress");
    assert_eq!(payload["rejected"], json!([apps[1].id.0.as_str()]));
}

#[tokio::test]
async fn status_route_maps_role_violation_to_forbidden() {
    let (workflow, _, _) = build_workflow();
    let (_, apps) = seeded(&workflow, &["alex"]);
    let app = marketplace_router(Arc::new(workflow));

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{}/status", apps[0].id),
            Some(&trade("alex")),
            Some(json!({ "status": "shortlisted" })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "unauthorized");
}

#[tokio::test]
async fn job_status_route_maps_invalid_transition_to_conflict() {
    let (workflow, _, _) = build_workflow();
    let (job, _) = seeded(&workflow, &["alex"]);
    let app = marketplace_router(Arc::new(workflow));

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/v1/jobs/{}/status", job.id),
            Some(&owner()),
            Some(json!({ "status": "completed" })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "invalid_transition");
}

#[tokio::test]
async fn submit_route_defaults_tradesperson_to_caller() {
    let (workflow, _, _) = build_workflow();
    let (job, _) = seeded(&workflow, &[]);
    let app = marketplace_router(Arc::new(workflow));
    let alex = trade("alex");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/jobs/{}/applications", job.id),
            Some(&alex),
            Some(json!({
                "bid": { "type": "hourly", "amount": 4500, "estimate": { "hours": 6 } },
                "cover_letter": "Available this week."
            })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["tradesperson_id"], "trade-alex");
    assert_eq!(payload["status"], "pending");

    let duplicate = app
        .oneshot(request(
            "POST",
            &format!("/api/v1/jobs/{}/applications", job.id),
            Some(&alex),
            Some(json!({ "bid": { "type": "negotiable" } })),
        ))
        .await
        .expect("route executes");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    let payload = read_json_body(duplicate).await;
    assert_eq!(payload["kind"], "duplicate_application");
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (workflow, _, _) = build_workflow();

    let response = router::job_handler::<_, MemoryEvents>(
        State(Arc::new(workflow)),
        RequestActor(owner()),
        Path("job-missing".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn note_handler_rejects_blank_text() {
    let (workflow, _, _) = build_workflow();
    let (_, apps) = seeded(&workflow, &["alex"]);

    let response = router::note_handler::<_, MemoryEvents>(
        State(Arc::new(workflow)),
        RequestActor(owner()),
        Path(apps[0].id.0.clone()),
        Json(NoteRequest {
            text: " ".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repository_failure_maps_to_internal_error() {
    let workflow = Arc::new(JobApplicationWorkflow::new(
        Arc::new(UnavailableStore),
        Arc::new(MemoryEvents::default()),
        AcceptancePolicy::default(),
    ));

    let response = router::list_applications_handler::<UnavailableStore, MemoryEvents>(
        State(workflow),
        RequestActor(owner()),
        Path("job-000001".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "unavailable");
}

#[tokio::test]
async fn closed_job_rejects_submissions_with_conflict() {
    let (workflow, _, _) = build_workflow();
    let (job, _) = seeded(&workflow, &[]);
    workflow
        .transition_job(&job.id, JobStatus::Canceled, &owner())
        .expect("owner cancels");
    let app = marketplace_router(Arc::new(workflow));

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/v1/jobs/{}/applications", job.id),
            Some(&trade("alex")),
            Some(json!({ "bid": { "type": "negotiable" } })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "closed_for_applications");
}

