//! Cache administration routes: `GET /cache/stats`, `POST /cache/clear`.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use dashlens::CacheLayer;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Query parameters for the stats endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsQuery {
    /// Restrict the entry listing to one layer.
    pub layer: Option<String>,
}

/// GET /cache/stats - counters, per-layer breakdown and entry listing.
#[instrument(skip(state, query))]
pub async fn cache_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>> {
    let layer = query
        .layer
        .as_deref()
        .map(str::parse::<CacheLayer>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let snapshot = state.cache.snapshot(layer).await;
    Ok(Json(json!({
        "timestamp": Utc::now(),
        "cache": {
            "totalItems": snapshot.total_items,
            "byLayer": snapshot.by_layer,
            "entries": snapshot.entries,
        },
        "performance": {
            "hits": snapshot.totals.hits,
            "misses": snapshot.totals.misses,
            "evictions": snapshot.totals.evictions,
            "expirations": snapshot.totals.expirations,
            "hitRate": snapshot.totals.hit_rate(),
        },
        "ttl": {
            "hot": CacheLayer::Hot.default_ttl().as_secs(),
            "warm": CacheLayer::Warm.default_ttl().as_secs(),
            "cold": CacheLayer::Cold.default_ttl().as_secs(),
        },
    })))
}

/// Body for the clear endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ClearRequest {
    /// `clear-all` or `clear-layer`.
    pub action: String,
    #[serde(default)]
    pub layer: Option<String>,
}

/// POST /cache/clear - destroy cache entries wholesale or per layer.
#[instrument(skip(state, request))]
pub async fn cache_clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<Value>> {
    match request.action.as_str() {
        "clear-all" => {
            let cleared = state.cache.clear().await;
            state.store.clear_all().await;
            info!(cleared, "Cleared all cache layers and memoized artifacts");
            Ok(Json(json!({
                "success": true,
                "action": "clear-all",
                "totalItemsCleared": cleared,
                "clearedAt": Utc::now(),
            })))
        }
        "clear-layer" => {
            let layer = request
                .layer
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("clear-layer requires a layer".to_string()))?
                .parse::<CacheLayer>()
                .map_err(ApiError::BadRequest)?;
            let cleared = state.cache.invalidate_layer(layer).await;
            info!(layer = layer.as_str(), cleared, "Cleared cache layer");
            Ok(Json(json!({
                "success": true,
                "action": "clear-layer",
                "layer": layer.as_str(),
                "totalItemsCleared": cleared,
                "clearedAt": Utc::now(),
            })))
        }
        other => Err(ApiError::BadRequest(format!("unknown action: {other}"))),
    }
}
