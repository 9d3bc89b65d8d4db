//! Thin HTTP dispatch surface.
//!
//! `POST /events` feeds lifecycle notifications to the handler, and
//! `POST /reconcile` forces a drain cycle (the same cycle the scheduler
//! runs). Everything else the process does goes through these two paths.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tracing::error;

use crate::admission::{AdmissionController, AdmissionError, EnqueueOutcome};
use crate::notify::{self, NotifyOutcome};
use crate::reconcile;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AdmissionController>,
    pub page_size: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(post_event))
        .route("/reconcile", post(post_reconcile))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn post_event(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match notify::handle_raw(&state.controller, &body).await {
        Ok(outcome) => {
            let label = match outcome {
                NotifyOutcome::Enqueued(EnqueueOutcome::Queued) => "queued",
                NotifyOutcome::Enqueued(EnqueueOutcome::Started { .. }) => "started",
                NotifyOutcome::Completed => "completed",
                NotifyOutcome::Errored => "errored",
                NotifyOutcome::Ignored => "ignored",
            };
            (StatusCode::OK, Json(json!({ "outcome": label }))).into_response()
        }
        Err(e) => admission_error_response(e),
    }
}

async fn post_reconcile(State(state): State<AppState>) -> impl IntoResponse {
    match reconcile::run_cycle(&state.controller, state.page_size).await {
        Ok(stats) => (StatusCode::OK, Json(json!(stats))).into_response(),
        Err(e) => admission_error_response(e),
    }
}

fn admission_error_response(e: AdmissionError) -> axum::response::Response {
    error!(error = %e, "request failed");
    let code = match e {
        AdmissionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AdmissionError::Invoke(_) => StatusCode::BAD_GATEWAY,
    };
    (code, Json(json!({ "error": e.to_string() }))).into_response()
}
