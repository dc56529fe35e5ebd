//! Test-report route: `GET /errors/:id`.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{info, instrument};

use dashlens::report::{tests_for, TestFilter, TestType};
use dashlens::{cache_get_json, cache_set_json, comparison, CacheLayer, CheckStatus, ComparisonParams};

use crate::error::{ApiError, Result};
use crate::routes::{cached_read_response, key_part};
use crate::state::AppState;

/// Query parameters for the errors endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorsQuery {
    /// `freshness`, `volume`, `quality` or `other`.
    pub test_type: Option<String>,
    /// `pass`, `fail` or `unknown`.
    pub status_filter: Option<String>,
    /// `"true"` bypasses the response cache.
    pub fresh: Option<String>,
    pub current_snapshot: Option<String>,
    pub previous_snapshot: Option<String>,
    pub current_manifest_path: Option<String>,
    pub current_catalog_path: Option<String>,
    pub previous_manifest_path: Option<String>,
    pub previous_catalog_path: Option<String>,
}

impl ErrorsQuery {
    fn comparison_params(&self) -> ComparisonParams {
        ComparisonParams {
            current_snapshot: self.current_snapshot.clone(),
            previous_snapshot: self.previous_snapshot.clone(),
            current_manifest_path: self.current_manifest_path.clone(),
            current_catalog_path: self.current_catalog_path.clone(),
            previous_manifest_path: self.previous_manifest_path.clone(),
            previous_catalog_path: self.previous_catalog_path.clone(),
        }
    }

    fn filter(&self) -> Result<TestFilter> {
        let test_type = self
            .test_type
            .as_deref()
            .map(str::parse::<TestType>)
            .transpose()
            .map_err(ApiError::BadRequest)?;
        let status = self
            .status_filter
            .as_deref()
            .map(str::parse::<CheckStatus>)
            .transpose()
            .map_err(ApiError::BadRequest)?;
        Ok(TestFilter { test_type, status })
    }

    fn cache_key(&self, node_id: &str) -> String {
        [
            "errors",
            node_id,
            key_part(self.test_type.as_deref(), "all"),
            key_part(self.status_filter.as_deref(), "all"),
            key_part(self.current_snapshot.as_deref(), "current"),
            key_part(self.current_manifest_path.as_deref(), "current"),
            key_part(self.current_catalog_path.as_deref(), "current"),
            key_part(self.previous_snapshot.as_deref(), "auto"),
            key_part(self.previous_manifest_path.as_deref(), "auto"),
            key_part(self.previous_catalog_path.as_deref(), "auto"),
        ]
        .join(":")
    }
}

/// GET /errors/:id - the classified test report for one node.
#[instrument(skip(state, query), fields(node_id = %id))]
pub async fn get_errors(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ErrorsQuery>,
) -> Result<Response> {
    let start = Instant::now();
    let result = run_errors(&state, &id, &query, start).await;
    match &result {
        Ok(_) => crate::metrics::record_request("errors", start.elapsed().as_secs_f64()),
        Err(e) => crate::metrics::record_error("errors", e.code()),
    }
    result
}

async fn run_errors(
    state: &AppState,
    id: &str,
    query: &ErrorsQuery,
    start: Instant,
) -> Result<Response> {
    let filter = query.filter()?;
    let fresh = query.fresh.as_deref() == Some("true");
    let cache_key = query.cache_key(id);

    if !fresh {
        if let Some(mut envelope) = cache_get_json::<Value>(&state.cache, &cache_key).await {
            crate::metrics::record_cache_lookup("errors", true);
            envelope["cached"] = json!(true);
            envelope["computeTimeMs"] = json!(0);
            return Ok(cached_read_response(
                envelope,
                true,
                0,
                state.config.errors_max_age_secs,
            ));
        }
        crate::metrics::record_cache_lookup("errors", false);
    }

    let pair = comparison::resolve(
        &state.store,
        &state.snapshots,
        &query.comparison_params(),
    )
    .await?;
    let report = tests_for(id, &pair, &state.checks, Utc::now(), filter)?;

    let compute_time_ms = start.elapsed().as_millis() as u64;
    let (total, failing) = (report.total_tests, report.failing_tests);
    let envelope = json!({
        "data": report,
        "cached": false,
        "computeTimeMs": compute_time_ms,
    });

    cache_set_json(&state.cache, &cache_key, &envelope, CacheLayer::Hot, None).await?;

    info!(
        node_id = %id,
        total_tests = total,
        failing_tests = failing,
        compute_time_ms,
        "Assembled test report"
    );
    Ok(cached_read_response(
        envelope,
        false,
        compute_time_ms,
        state.config.errors_max_age_secs,
    ))
}
