//! HTTP Surface (C8).
//!
//! `axum` router over the execution pipeline. One `AppState`, cheaply
//! `Clone`d (everything inside is an `Arc` or already `Send + Sync`),
//! shared into every handler, the same shared-state-behind-a-clone shape
//! the teacher's engine traits use for their handles.

use crate::admission::AdmissionController;
use crate::config::AppConfig;
use crate::limits::ResourceLimits;
use crate::metrics::Metrics;
use crate::orchestrator::{self, OrchestratorOutcome};
use crate::registry::RuntimeRegistry;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

struct Inner {
    registry: RuntimeRegistry,
    admission: AdmissionController,
    metrics: Metrics,
    limits: ResourceLimits,
}

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self(Arc::new(Inner {
            registry: RuntimeRegistry::from_config(config),
            admission: AdmissionController::new(
                config.server.max_concurrent_requests,
                config.server.max_queue_size,
            ),
            metrics: Metrics::new(),
            limits: ResourceLimits::from_config(&config.resource_limits),
        }))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/sandbox/health", get(health))
        .route("/metrics", get(metrics))
        .route("/v1/sandbox/run", post(run))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    runtimes: std::collections::HashMap<String, bool>,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        runtimes: state.0.registry.enabled_entries(),
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.0.metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

#[derive(Deserialize)]
struct RunRequest {
    language: String,
    code: String,
}

#[derive(Serialize)]
struct QueueFullBody {
    detail: &'static str,
}

async fn run(State(state): State<AppState>, Json(request): Json<RunRequest>) -> Response {
    let outcome = orchestrator::handle_run(
        &state.0.registry,
        &state.0.admission,
        &state.0.metrics,
        &state.0.limits,
        &request.language,
        &request.code,
    )
    .await;

    match outcome {
        OrchestratorOutcome::Envelope(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        OrchestratorOutcome::QueueFull => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(QueueFullBody {
                detail: "Too Many Requests: Queue Full",
            }),
        )
            .into_response(),
    }
}
