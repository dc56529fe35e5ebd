//! dashlens — data-lineage and observability engine.
//!
//! dashlens sits on top of the build artifacts produced by an upstream
//! data-transformation toolchain — a *manifest* (the declarative asset
//! graph) and a *catalog* (per-asset physical statistics) — and answers
//! runtime questions about them:
//!
//! 1. **Lineage**: the bounded upstream/downstream closure around any
//!    asset, with shortest-path depths ([`lineage::compute_dag`]).
//! 2. **Broad checks**: schema drift, volume drift and freshness lag
//!    against a previous point-in-time baseline ([`checks::broad_checks`]).
//! 3. **Test reports**: declared tests classified into
//!    freshness/volume/quality plus synthetic broad-check tests
//!    ([`report::tests_for`]).
//!
//! Baselines come from labelled snapshot directories, explicit artifact
//! paths or `*_backup.json` files, resolved once per request by
//! [`comparison::resolve`]. Results are memoized in a tiered TTL cache
//! ([`cache::TieredCache`]). The engine executes nothing and connects to
//! no warehouse: artifacts are read-only inputs.
//!
//! The HTTP surface lives in the `dashlens-server` crate.

pub mod artifacts;
pub mod cache;
pub mod checks;
pub mod comparison;
pub mod config;
pub mod error;
pub mod lineage;
pub mod reference;
pub mod report;

// Re-exports for convenience
pub use artifacts::{
    ArtifactStore, Catalog, CatalogNode, FreshnessMap, Manifest, ManifestBundle, ManifestNode,
    NodeKind, SnapshotStore, SourceFreshness, StatValue, ValidationReport,
};
pub use cache::{cache_get_json, cache_set_json, AggregateStats, CacheLayer, KeyStats, TieredCache};
pub use checks::{
    broad_checks, BroadChecks, CheckStatus, FreshnessCheck, FreshnessSource, SchemaCheck,
    TypeChange, VolumeCheck,
};
pub use comparison::{resolve, ArtifactSlot, ComparisonPair, ComparisonParams, SlotSource};
pub use config::CheckConfig;
pub use error::{LensError, Result};
pub use lineage::{
    compute_dag, CancelToken, DepthBlock, LineageNode, LineageOptions, LineageView,
    MAX_DEPTH_LIMIT,
};
pub use reference::{classify, ReferenceClassification};
pub use report::{tests_for, Severity, TestEntry, TestFilter, TestReport, TestType};
