//! Application state shared by all handlers.

use std::path::PathBuf;
use std::sync::Arc;

use dashlens::{ArtifactStore, CheckConfig, SnapshotStore, TieredCache};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding `manifest.json`, `catalog.json`, backups and the
    /// snapshot tree. Caller-supplied artifact paths are confined to it.
    pub artifact_root: PathBuf,
    /// Enable permissive CORS headers.
    pub cors_enabled: bool,
    /// `Cache-Control: max-age` for lineage responses, seconds.
    pub lineage_max_age_secs: u32,
    /// `Cache-Control: max-age` for errors responses, seconds.
    pub errors_max_age_secs: u32,
    /// Traversal depth applied when the request does not specify one.
    pub default_max_depth: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from("."),
            cors_enabled: true,
            lineage_max_age_secs: 1800,
            errors_max_age_secs: 300,
            default_max_depth: 10,
        }
    }
}

impl ServerConfig {
    /// Set the artifact root directory.
    #[must_use]
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = root.into();
        self
    }

    /// Enable or disable CORS.
    #[must_use]
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }
}

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Memoized current artifact pair.
    pub store: Arc<ArtifactStore>,
    /// Point-in-time snapshot tree.
    pub snapshots: Arc<SnapshotStore>,
    /// Tiered response cache.
    pub cache: Arc<TieredCache>,
    /// Broad-check thresholds.
    pub checks: Arc<CheckConfig>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build state from a server configuration, reading check thresholds
    /// from the environment.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_checks(config, CheckConfig::from_env())
    }

    /// Build state with explicit check thresholds. Tests use this to stay
    /// independent of the process environment.
    pub fn with_checks(config: ServerConfig, checks: CheckConfig) -> Self {
        let store = Arc::new(ArtifactStore::new(config.artifact_root.clone()));
        let snapshots = Arc::new(SnapshotStore::new(config.artifact_root.clone()));
        Self {
            store,
            snapshots,
            cache: Arc::new(TieredCache::new()),
            checks: Arc::new(checks),
            config: Arc::new(config),
        }
    }
}
