use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::domain::{RegistrationForm, WizardStep};
use super::validation::{assemble, validate_step, RegistrationError};

#[derive(Debug, Deserialize)]
pub struct StepCheckRequest {
    pub step: WizardStep,
    #[serde(default)]
    pub form: RegistrationForm,
}

/// Stateless wizard endpoints; the client keeps the step cursor.
pub fn registration_router() -> Router {
    Router::new()
        .route("/api/v1/registrations", post(submit_handler))
        .route("/api/v1/registrations/validate", post(validate_handler))
}

pub(crate) async fn validate_handler(Json(request): Json<StepCheckRequest>) -> Response {
    match validate_step(request.step, &request.form) {
        Ok(()) => {
            let next = request.step.next().unwrap_or(request.step);
            (
                StatusCode::OK,
                Json(json!({
                    "step": request.step,
                    "next_step": next,
                })),
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler(Json(form): Json<RegistrationForm>) -> Response {
    match assemble(&form) {
        Ok(registration) => {
            info!(
                skills = registration.skills.len(),
                certified = registration.certification.is_some(),
                insured = registration.insurance.is_some(),
                "tradesperson registration assembled"
            );
            (StatusCode::CREATED, Json(registration)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: RegistrationError) -> Response {
    let fields = match &err {
        RegistrationError::MissingFields { fields, .. } => fields.clone(),
        _ => Vec::new(),
    };

    let payload = json!({
        "error": err.to_string(),
        "kind": "registration_invalid",
        "step": err.step(),
        "fields": fields,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = registration_router()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).expect("encode")))
                    .expect("request"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json payload"))
    }

    #[tokio::test]
    async fn validate_reports_missing_fields() {
        let (status, payload) = call(
            "/api/v1/registrations/validate",
            json!({ "step": "location", "form": { "address": "1 High St", "city": "Leeds" } }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(payload["step"], "location");
        assert_eq!(payload["fields"], json!(["state", "postal_code"]));
    }

    #[tokio::test]
    async fn validate_returns_next_step() {
        let (status, payload) = call(
            "/api/v1/registrations/validate",
            json!({ "step": "skills", "form": { "skills": ["roofing"] } }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["next_step"], "location");
    }

    #[tokio::test]
    async fn submit_rejects_bad_postcode() {
        let (status, payload) = call(
            "/api/v1/registrations",
            json!({
                "email": "sam@example.com",
                "password": "copper-pipe-42",
                "confirm_password": "copper-pipe-42",
                "first_name": "Sam",
                "last_name": "Patel",
                "phone_number": "07700 900123",
                "skills": ["plumbing"],
                "address": "350 5th Ave",
                "city": "New York",
                "state": "NY",
                "postal_code": "10001"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(payload["step"], "location");
    }
}
