//! Prometheus metrics endpoint.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};

use crate::state::AppState;

/// Metrics routes (at root level).
pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(prometheus_metrics))
}

/// Metrics in Prometheus text format.
async fn prometheus_metrics() -> impl IntoResponse {
    match crate::metrics::get_metrics() {
        Ok(output) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("Content-Type", "text/plain; charset=utf-8")],
            format!("Failed to gather metrics: {e}"),
        ),
    }
}
