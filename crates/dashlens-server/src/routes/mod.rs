//! API route handlers.
//!
//! Organized by resource: lineage (`/dag`), test reports (`/errors`),
//! cache administration (`/cache`), health and metrics.

pub mod cache;
pub mod dag;
pub mod errors;
pub mod health;
pub mod metrics;

use axum::{
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::state::AppState;

pub(crate) static X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub(crate) static X_COMPUTE_TIME_MS: HeaderName = HeaderName::from_static("x-compute-time-ms");

/// Create the complete API router.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/dag/:id", get(dag::get_dag).post(dag::post_dag))
        .route("/errors/:id", get(errors::get_errors))
        .route("/cache/stats", get(cache::cache_stats))
        .route("/cache/clear", post(cache::cache_clear))
        .merge(health::health_routes())
        .merge(metrics::metrics_routes())
        .with_state(state)
}

/// Successful read response with cache headers.
pub(crate) fn cached_read_response(
    body: Value,
    cache_hit: bool,
    compute_time_ms: u64,
    max_age_secs: u32,
) -> Response {
    (
        StatusCode::OK,
        [
            (
                header::CACHE_CONTROL,
                format!("public, max-age={max_age_secs}"),
            ),
            (
                X_CACHE.clone(),
                if cache_hit { "HIT" } else { "MISS" }.to_string(),
            ),
            (X_COMPUTE_TIME_MS.clone(), compute_time_ms.to_string()),
        ],
        Json(body),
    )
        .into_response()
}

/// Substitute a sentinel for an absent cache-key element.
pub(crate) fn key_part<'a>(value: Option<&'a str>, sentinel: &'a str) -> &'a str {
    value.unwrap_or(sentinel)
}
