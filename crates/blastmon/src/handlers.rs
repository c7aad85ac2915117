//! HTTP request handlers: scrape endpoint, health and status.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{debug, error, warn};

use blastmon_core::{FamilyStatus, MetricCollector, TextExposition};

use crate::state::{AppState, lock};

/// Content type of the Prometheus text format.
const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

// ============================================================
// Metrics
// ============================================================

/// Runs one scrape. Partial failures still return 200 with whatever was
/// collected.
pub(crate) async fn handle_metrics(State(state): AppState) -> Result<Response, StatusCode> {
    let body = tokio::task::spawn_blocking(move || {
        let mut inner = lock(&state);
        if inner.closed {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }

        let mut exposition = TextExposition::new();
        match inner.orchestrator.collect(&mut exposition) {
            Ok(()) => {}
            Err(e) if e.only_no_instances() => {
                debug!(families = ?e.families().collect::<Vec<_>>(), "inactive families omitted");
            }
            Err(e) => warn!(error = %e, "scrape partially failed"),
        }

        exposition.render().map_err(|e| {
            error!(error = %e, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    })
    .await
    .map_err(|e| {
        error!(error = %e, "scrape task failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response())
}

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Status
// ============================================================

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    collector: String,
    version: &'static str,
    last_scrape_ms: Option<f64>,
    families: Vec<FamilyStatus>,
}

pub(crate) async fn handle_status(State(state): AppState) -> Json<StatusResponse> {
    let inner = lock(&state);
    let orchestrator = &inner.orchestrator;
    Json(StatusResponse {
        collector: orchestrator.name().to_string(),
        version: blastmon_core::VERSION,
        last_scrape_ms: orchestrator
            .last_timing()
            .map(|t| t.total.as_secs_f64() * 1000.0),
        families: orchestrator.status().to_vec(),
    })
}
