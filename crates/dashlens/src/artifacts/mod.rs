//! Build-artifact ingestion: manifest, catalog, source freshness, and the
//! point-in-time snapshot tree.

pub mod catalog;
pub mod manifest;
pub mod snapshot;
pub mod sources;
pub mod store;

pub use catalog::{Catalog, CatalogColumn, CatalogNode, StatValue};
pub use manifest::{
    ColumnSpec, DependsOn, Manifest, ManifestMetadata, ManifestNode, NodeConfig, NodeKind,
    TestMetadata,
};
pub use snapshot::{SnapshotArtifacts, SnapshotStore};
pub use sources::{FreshnessCache, FreshnessMap, SourceFreshness};
pub use store::{
    load_catalog_file, load_manifest_file, signature_of, validate_bundle, ArtifactStore,
    ManifestBundle, NodeCounts, ValidationReport,
};
