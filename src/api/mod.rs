//! HTTP surface
//!
//! One webhook endpoint. The gateway expects a fast 200 regardless of what
//! we do with the event, so the handler acks immediately and runs the
//! pipeline as a background task.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::debug;

use crate::engine::{self, PipelineDeps};

/// Build the application router
pub fn router(deps: Arc<PipelineDeps>) -> Router {
    Router::new()
        .route("/webhooks/evolution", post(receive_event))
        .route("/health", get(health))
        .with_state(deps)
}

async fn receive_event(
    State(deps): State<Arc<PipelineDeps>>,
    Json(payload): Json<Value>,
) -> StatusCode {
    debug!("webhook event received");
    tokio::spawn(async move {
        engine::run_pipeline(&deps, payload).await;
    });
    StatusCode::OK
}

async fn health() -> &'static str {
    "ok"
}
