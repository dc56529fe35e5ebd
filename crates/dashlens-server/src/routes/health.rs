//! Health and readiness routes.
//!
//! - `/health` - liveness: the process is up
//! - `/ready` - readiness: the manifest loads and the cache answers

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::{debug, warn};

use crate::state::AppState;

/// Health routes (at root level).
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/", get(root))
}

/// Service info response.
#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    description: &'static str,
}

/// Root endpoint - basic info.
async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "dashlens",
        version: env!("CARGO_PKG_VERSION"),
        description: "Data-lineage and observability engine",
    })
}

/// Health status response.
#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Liveness probe; succeeds whenever the server is up.
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        timestamp: chrono::Utc::now(),
    })
}

/// Individual readiness checks.
#[derive(Debug, Serialize)]
struct ReadinessChecks {
    manifest: bool,
    cache: bool,
}

/// Readiness status response.
#[derive(Debug, Serialize)]
struct ReadinessStatus {
    ready: bool,
    checks: ReadinessChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

/// Readiness probe: verifies the manifest artifact parses and the cache
/// responds.
async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessStatus>, (StatusCode, Json<ReadinessStatus>)> {
    let mut checks = ReadinessChecks {
        manifest: false,
        cache: false,
    };
    let mut errors: Vec<String> = Vec::new();

    match state.store.load_manifest().await {
        Ok(bundle) => {
            checks.manifest = true;
            debug!(signature = %bundle.signature, "Manifest readiness check passed");
        }
        Err(e) => {
            let message = format!("Manifest check failed: {e}");
            warn!("{message}");
            errors.push(message);
        }
    }

    // Exercise the cache lock; a probe lookup is enough.
    let _ = state.cache.get("__health_check__").await;
    checks.cache = true;

    let ready = checks.manifest && checks.cache;
    let status = ReadinessStatus {
        ready,
        checks,
        errors: if errors.is_empty() {
            None
        } else {
            Some(errors)
        },
    };

    if ready {
        Ok(Json(status))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(status)))
    }
}
