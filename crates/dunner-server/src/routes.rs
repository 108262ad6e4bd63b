use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use dunner_ports::inbound::{EscalationRunner, VerificationSweeper};

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<dyn EscalationRunner>,
    pub sweeper: Arc<dyn VerificationSweeper>,
    pub cron_secret: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cron/escalations", post(run_escalations))
        .route("/cron/verification-sweep", post(run_verification_sweep))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// The cron scheduler authenticates with a shared bearer secret; anything
/// else gets a 401 and no work happens.
fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == secret)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "invalid or missing bearer token" })),
    )
        .into_response()
}

async fn run_escalations(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&headers, &state.cron_secret) {
        return unauthorized();
    }

    match state.runner.run(Utc::now()).await {
        Ok(summary) => (StatusCode::OK, Json(json!({ "summary": summary }))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "escalation run aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn run_verification_sweep(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&headers, &state.cron_secret) {
        return unauthorized();
    }

    match state.sweeper.sweep(Utc::now()).await {
        Ok(summary) => (StatusCode::OK, Json(json!({ "summary": summary }))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "verification sweep aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
