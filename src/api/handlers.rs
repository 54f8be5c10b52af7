//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use tracing::warn;

use crate::app::AppState;
use crate::domain::HealthResponse;

/// Content type of the Prometheus text exposition format
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus scrape endpoint.
///
/// In scrape mode every metric is refreshed concurrently before rendering.
/// Refresh failures, and refreshes still running at the scrape deadline,
/// only leave stale values behind; the scrape itself always succeeds.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.refreshes_on_scrape()
        && tokio::time::timeout(state.scrape_deadline, state.service.refresh_all())
            .await
            .is_err()
    {
        warn!(
            deadline = ?state.scrape_deadline,
            "Scrape refresh exceeded deadline, serving stale values"
        );
    }

    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

/// Detailed health check of the upstream sources
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Liveness probe
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
