//! Point-in-time comparison resolution.
//!
//! Every request is served against a `(current, previous)` pair of artifact
//! slots. The current slot defaults to the in-process bundle; the previous
//! slot is discovered from an explicit snapshot label, explicit paths, the
//! `*_backup.json` pair, or the most recent snapshot whose `generated_at`
//! differs from the current bundle's. Resolution happens exactly once per
//! request and the bound slots are read-only thereafter.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::artifacts::catalog::{Catalog, CatalogNode};
use crate::artifacts::manifest::ManifestNode;
use crate::artifacts::snapshot::SnapshotStore;
use crate::artifacts::sources::{FreshnessMap, SourceFreshness};
use crate::artifacts::store::{
    load_catalog_file, load_manifest_file, ArtifactStore, ManifestBundle, CATALOG_BACKUP_FILE,
    MANIFEST_BACKUP_FILE,
};
use crate::error::{LensError, Result};

/// Caller-supplied comparison parameters, all optional.
#[derive(Debug, Clone, Default)]
pub struct ComparisonParams {
    pub current_snapshot: Option<String>,
    pub previous_snapshot: Option<String>,
    pub current_manifest_path: Option<String>,
    pub current_catalog_path: Option<String>,
    pub previous_manifest_path: Option<String>,
    pub previous_catalog_path: Option<String>,
}

/// Where a slot's artifacts came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSource {
    /// The memoized in-process bundle.
    Current,
    /// An explicitly requested snapshot label.
    Snapshot(String),
    /// Explicit manifest/catalog paths.
    ExplicitPaths,
    /// The `manifest_backup.json`/`catalog_backup.json` pair.
    Backup,
    /// The auto-selected most recent differing snapshot.
    AutoSnapshot(String),
    /// No baseline available.
    None,
}

impl SlotSource {
    /// Stable tag for response envelopes and cache keys.
    pub fn tag(&self) -> String {
        match self {
            SlotSource::Current => "current".to_string(),
            SlotSource::Snapshot(label) => format!("snapshot:{label}"),
            SlotSource::ExplicitPaths => "explicit-paths".to_string(),
            SlotSource::Backup => "backup".to_string(),
            SlotSource::AutoSnapshot(label) => format!("auto-snapshot:{label}"),
            SlotSource::None => "none".to_string(),
        }
    }
}

/// One side of a comparison: artifacts plus their provenance.
#[derive(Clone, Debug)]
pub struct ArtifactSlot {
    pub bundle: Option<Arc<ManifestBundle>>,
    pub catalog: Option<Arc<Catalog>>,
    pub freshness: Option<Arc<FreshnessMap>>,
    pub source: SlotSource,
}

impl ArtifactSlot {
    /// The empty slot: no artifacts, source tag `none`.
    pub fn empty() -> Self {
        Self {
            bundle: None,
            catalog: None,
            freshness: None,
            source: SlotSource::None,
        }
    }

    /// Manifest node lookup within this slot.
    pub fn node(&self, id: &str) -> Option<&ManifestNode> {
        self.bundle.as_deref().and_then(|b| b.get(id))
    }

    /// Catalog entry lookup within this slot.
    pub fn catalog_entry(&self, id: &str) -> Option<&CatalogNode> {
        self.catalog.as_deref().and_then(|c| c.get(id))
    }

    /// Freshness entry lookup within this slot.
    pub fn freshness_entry(&self, id: &str) -> Option<&SourceFreshness> {
        self.freshness.as_deref().and_then(|f| f.get(id))
    }
}

/// The resolved `(current, previous)` pair.
#[derive(Clone, Debug)]
pub struct ComparisonPair {
    pub current: ArtifactSlot,
    pub previous: ArtifactSlot,
}

/// Resolve a caller-supplied artifact path against the working root.
///
/// The path is lexically normalized and rejected unless it stays inside the
/// root and names a `.json` file. This is the only input-validation rule
/// the engine owes its callers.
pub fn resolve_safe_path(root: &Path, candidate: &str) -> Result<PathBuf> {
    let joined = root.join(candidate);
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(LensError::InvalidParameter(format!(
                        "path escapes working directory: {candidate}"
                    )));
                }
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    if !normalized.starts_with(root) {
        return Err(LensError::InvalidParameter(format!(
            "path escapes working directory: {candidate}"
        )));
    }
    if normalized.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(LensError::InvalidParameter(format!(
            "artifact path must end in .json: {candidate}"
        )));
    }
    Ok(normalized)
}

async fn load_explicit_pair(
    root: &Path,
    manifest_path: &str,
    catalog_path: &str,
) -> Result<ArtifactSlot> {
    let manifest_path = resolve_safe_path(root, manifest_path)?;
    let catalog_path = resolve_safe_path(root, catalog_path)?;
    let bundle = Arc::new(load_manifest_file(&manifest_path).await?);
    let catalog = load_catalog_file(&catalog_path).await?.map(Arc::new);
    Ok(ArtifactSlot {
        bundle: Some(bundle),
        catalog,
        freshness: None,
        source: SlotSource::ExplicitPaths,
    })
}

async fn load_snapshot_slot(
    snapshots: &SnapshotStore,
    label: &str,
    auto: bool,
) -> Result<ArtifactSlot> {
    let artifacts = snapshots.load(label).await?;
    Ok(ArtifactSlot {
        bundle: Some(artifacts.bundle),
        catalog: artifacts.catalog,
        freshness: artifacts.freshness,
        source: if auto {
            SlotSource::AutoSnapshot(label.to_string())
        } else {
            SlotSource::Snapshot(label.to_string())
        },
    })
}

async fn resolve_current(
    store: &ArtifactStore,
    snapshots: &SnapshotStore,
    params: &ComparisonParams,
) -> Result<ArtifactSlot> {
    if let Some(label) = &params.current_snapshot {
        return load_snapshot_slot(snapshots, label, false).await;
    }

    match (&params.current_manifest_path, &params.current_catalog_path) {
        (Some(manifest), Some(catalog)) => load_explicit_pair(store.root(), manifest, catalog).await,
        (None, None) => {
            let bundle = store.load_manifest().await?;
            let catalog = store.load_catalog().await?;
            let freshness = store.load_default_sources().await?;
            Ok(ArtifactSlot {
                bundle: Some(bundle),
                catalog,
                freshness,
                source: SlotSource::Current,
            })
        }
        _ => Err(LensError::InvalidParameter(
            "currentManifestPath and currentCatalogPath must be provided together".to_string(),
        )),
    }
}

async fn resolve_previous(
    store: &ArtifactStore,
    snapshots: &SnapshotStore,
    params: &ComparisonParams,
    current: &ArtifactSlot,
) -> Result<ArtifactSlot> {
    if let Some(label) = &params.previous_snapshot {
        return load_snapshot_slot(snapshots, label, false).await;
    }

    match (&params.previous_manifest_path, &params.previous_catalog_path) {
        (Some(manifest), Some(catalog)) => {
            return load_explicit_pair(store.root(), manifest, catalog).await;
        }
        (None, None) => {}
        _ => {
            return Err(LensError::InvalidParameter(
                "previousManifestPath and previousCatalogPath must be provided together"
                    .to_string(),
            ))
        }
    }

    let manifest_backup = store.root().join(MANIFEST_BACKUP_FILE);
    let catalog_backup = store.root().join(CATALOG_BACKUP_FILE);
    let have_backups = tokio::fs::try_exists(&manifest_backup).await.unwrap_or(false)
        && tokio::fs::try_exists(&catalog_backup).await.unwrap_or(false);
    if have_backups {
        let bundle = Arc::new(load_manifest_file(&manifest_backup).await?);
        let catalog = load_catalog_file(&catalog_backup).await?.map(Arc::new);
        return Ok(ArtifactSlot {
            bundle: Some(bundle),
            catalog,
            freshness: None,
            source: SlotSource::Backup,
        });
    }

    // Auto-select: most recent snapshot captured at a different instant
    // than the current bundle.
    let current_stamp = current
        .bundle
        .as_deref()
        .and_then(|b| b.metadata.generated_at.clone());
    let mut labels = snapshots.list().await?;
    labels.sort_unstable();
    for label in labels.iter().rev() {
        match snapshots.generated_at(label).await {
            Ok(stamp) if stamp.is_some() && stamp != current_stamp => {
                debug!(label = %label, "Auto-selected previous snapshot");
                return load_snapshot_slot(snapshots, label, true).await;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(label = %label, error = %e, "Skipping unreadable snapshot");
            }
        }
    }

    Ok(ArtifactSlot::empty())
}

/// Resolve the `(current, previous)` artifact pair for one request.
pub async fn resolve(
    store: &ArtifactStore,
    snapshots: &SnapshotStore,
    params: &ComparisonParams,
) -> Result<ComparisonPair> {
    let current = resolve_current(store, snapshots, params).await?;
    let previous = resolve_previous(store, snapshots, params, &current).await?;
    Ok(ComparisonPair { current, previous })
}
