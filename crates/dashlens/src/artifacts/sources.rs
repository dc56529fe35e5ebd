//! Source-freshness artifact parsing and caching.
//!
//! The sources file is optional. When present it is the highest-priority
//! freshness signal for the nodes it covers. Two shapes are accepted: the
//! standard `{"results": [...]}` layout and a direct id → entry map.
//! Parsed maps are cached per absolute path and re-read when the file's
//! modification instant changes.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{LensError, Result};

/// Freshness signal for one source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceFreshness {
    pub max_loaded_at: Option<String>,
    pub snapshotted_at: Option<String>,
    pub status: Option<String>,
}

/// Parsed sources artifact: unique id → freshness signal.
pub type FreshnessMap = HashMap<String, SourceFreshness>;

#[derive(Deserialize)]
struct FreshnessResult {
    unique_id: String,
    #[serde(flatten)]
    freshness: SourceFreshness,
}

fn parse_freshness(bytes: &[u8], path: &Path) -> Result<FreshnessMap> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| LensError::ArtifactMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if let Some(results) = value.get("results").and_then(Value::as_array) {
        let mut map = FreshnessMap::new();
        for entry in results {
            if let Ok(result) = serde_json::from_value::<FreshnessResult>(entry.clone()) {
                map.insert(result.unique_id, result.freshness);
            }
        }
        return Ok(map);
    }

    // Fall back to a direct map. Non-object members are skipped.
    let mut map = FreshnessMap::new();
    if let Value::Object(obj) = value {
        for (id, entry) in obj {
            if let Ok(freshness) = serde_json::from_value::<SourceFreshness>(entry) {
                map.insert(id, freshness);
            }
        }
    }
    Ok(map)
}

struct CachedFreshness {
    modified: Option<SystemTime>,
    map: Arc<FreshnessMap>,
}

/// Per-path cache of parsed sources artifacts, validated against mtime.
#[derive(Default)]
pub struct FreshnessCache {
    entries: RwLock<HashMap<PathBuf, CachedFreshness>>,
}

impl FreshnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the sources artifact at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist; freshness simply
    /// falls back to the other signal sources in that case.
    pub async fn load(&self, path: &Path) -> Result<Option<Arc<FreshnessMap>>> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = metadata.modified().ok();

        {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.get(path) {
                if cached.modified == modified {
                    return Ok(Some(Arc::clone(&cached.map)));
                }
            }
        }

        let bytes = tokio::fs::read(path).await?;
        let map = Arc::new(parse_freshness(&bytes, path)?);
        debug!(path = %path.display(), entries = map.len(), "Loaded sources freshness artifact");

        let mut entries = self.entries.write().await;
        entries.insert(
            path.to_path_buf(),
            CachedFreshness {
                modified,
                map: Arc::clone(&map),
            },
        );
        Ok(Some(map))
    }

    /// Drop every cached map.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
