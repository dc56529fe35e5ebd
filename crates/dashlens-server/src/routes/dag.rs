//! Lineage routes: `GET /dag/:id` and `POST /dag/:id?action=invalidate`.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{info, instrument};

use dashlens::{
    broad_checks, cache_get_json, cache_set_json, compute_dag, comparison, CacheLayer,
    CancelToken, ComparisonParams, LineageOptions, SlotSource, MAX_DEPTH_LIMIT,
};

use crate::error::{ApiError, Result};
use crate::routes::{cached_read_response, key_part};
use crate::state::AppState;

/// Query parameters for the lineage endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DagQuery {
    pub max_depth: Option<u32>,
    /// `"true"` bypasses the response cache.
    pub fresh: Option<String>,
    pub current_snapshot: Option<String>,
    pub previous_snapshot: Option<String>,
    pub current_manifest_path: Option<String>,
    pub current_catalog_path: Option<String>,
    pub previous_manifest_path: Option<String>,
    pub previous_catalog_path: Option<String>,
}

impl DagQuery {
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

    /// Cache key with `current`/`auto` sentinels for absent values.
    fn cache_key(&self, node_id: &str, max_depth: u32) -> String {
        [
            "dag",
            node_id,
            &max_depth.to_string(),
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

/// GET /dag/:id - the enriched lineage view around one node.
#[instrument(skip(state, query), fields(node_id = %id))]
pub async fn get_dag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DagQuery>,
) -> Result<Response> {
    let start = Instant::now();
    let result = run_dag(&state, &id, &query, start).await;
    match &result {
        Ok(_) => crate::metrics::record_request("dag", start.elapsed().as_secs_f64()),
        Err(e) => crate::metrics::record_error("dag", e.code()),
    }
    result
}

async fn run_dag(
    state: &AppState,
    id: &str,
    query: &DagQuery,
    start: Instant,
) -> Result<Response> {
    let fresh = query.fresh.as_deref() == Some("true");
    let max_depth = query
        .max_depth
        .unwrap_or(state.config.default_max_depth)
        .min(MAX_DEPTH_LIMIT);
    let cache_key = query.cache_key(id, max_depth);

    if !fresh {
        if let Some(mut envelope) = cache_get_json::<Value>(&state.cache, &cache_key).await {
            crate::metrics::record_cache_lookup("dag", true);
            envelope["cached"] = json!(true);
            envelope["computeTimeMs"] = json!(0);
            return Ok(cached_read_response(
                envelope,
                true,
                0,
                state.config.lineage_max_age_secs,
            ));
        }
        crate::metrics::record_cache_lookup("dag", false);
    }

    let pair = comparison::resolve(
        &state.store,
        &state.snapshots,
        &query.comparison_params(),
    )
    .await?;
    let bundle = pair
        .current
        .bundle
        .clone()
        .ok_or_else(|| ApiError::Internal("current slot carries no manifest".to_string()))?;

    let validated = match pair.current.source {
        SlotSource::Current => state.store.ensure_validated(&bundle).await,
        _ => true,
    };

    let now = Utc::now();
    let cancel = CancelToken::new();
    let options = LineageOptions {
        catalog: pair.current.catalog.as_deref(),
        freshness: pair.current.freshness.as_deref(),
        now,
        cancel: cancel.clone(),
    };
    let mut view = compute_dag(&bundle, id, max_depth, &options)?;
    for node in view.nodes_mut() {
        let checks = broad_checks(&node.unique_id, &pair, &state.checks, now);
        node.observability = Some(checks);
    }

    let compute_time_ms = start.elapsed().as_millis() as u64;
    let (parent_count, child_count) = (view.parents.len(), view.children.len());
    let envelope = json!({
        "data": view,
        "cached": false,
        "computeTimeMs": compute_time_ms,
        "nodeId": id,
        "metadata": {
            "manifestVersion": bundle.metadata.dbt_version,
            "generatedAt": bundle.metadata.generated_at,
            "catalogVersion": pair.current.catalog.as_deref()
                .and_then(|c| c.metadata.generated_at.clone()),
            "manifestValidated": validated,
            "comparison": {
                "current": pair.current.source.tag(),
                "previous": pair.previous.source.tag(),
            },
        },
    });

    // A cancelled request skips the cache write; nothing was committed.
    if !cancel.is_cancelled() {
        cache_set_json(&state.cache, &cache_key, &envelope, CacheLayer::Warm, None).await?;
    }

    info!(
        node_id = %id,
        max_depth,
        parents = parent_count,
        children = child_count,
        compute_time_ms,
        "Computed lineage view"
    );
    Ok(cached_read_response(
        envelope,
        false,
        compute_time_ms,
        state.config.lineage_max_age_secs,
    ))
}

/// Query parameters for the POST action endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DagActionQuery {
    pub action: Option<String>,
}

/// POST /dag/:id?action=invalidate - drop cached lineage views for a node.
#[instrument(skip(state, query), fields(node_id = %id))]
pub async fn post_dag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DagActionQuery>,
) -> Result<Json<Value>> {
    match query.action.as_deref() {
        Some("invalidate") => {
            let invalidated = state.cache.delete_prefix(&format!("dag:{id}:")).await;
            info!(node_id = %id, invalidated, "Invalidated cached lineage views");
            Ok(Json(json!({
                "success": true,
                "nodeId": id,
                "invalidatedCount": invalidated,
            })))
        }
        other => {
            crate::metrics::record_error("dag", "bad_request");
            Err(ApiError::BadRequest(format!(
                "unknown action: {}",
                other.unwrap_or("<missing>")
            )))
        }
    }
}
