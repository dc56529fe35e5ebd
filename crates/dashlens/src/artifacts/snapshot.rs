//! Labelled point-in-time snapshot directories.
//!
//! A snapshot is a directory under `samples/adventureworks-batches/{label}`
//! holding a `manifest.json`/`catalog.json` pair, an optional
//! `sources.json` and a `summary.json`. A sibling `index.json` lists the
//! available labels in insertion order; when it is absent the directory is
//! scanned instead.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifacts::catalog::Catalog;
use crate::artifacts::manifest::ManifestMetadata;
use crate::artifacts::sources::{FreshnessCache, FreshnessMap};
use crate::artifacts::store::{
    load_catalog_file, load_manifest_file, ManifestBundle, CATALOG_FILE, MANIFEST_FILE,
    SOURCES_FILE,
};
use crate::error::{LensError, Result};

/// Snapshot directory root, relative to the artifact root.
pub const SNAPSHOT_ROOT: &str = "samples/adventureworks-batches";
/// Label listing file, sibling to the snapshot directories.
pub const INDEX_FILE: &str = "index.json";

/// Artifacts loaded from one snapshot directory.
#[derive(Debug)]
pub struct SnapshotArtifacts {
    pub label: String,
    pub bundle: Arc<ManifestBundle>,
    pub catalog: Option<Arc<Catalog>>,
    pub freshness: Option<Arc<FreshnessMap>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexFile {
    Labels { labels: Vec<String> },
    Bare(Vec<String>),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ManifestHead {
    metadata: ManifestMetadata,
}

/// Read-only access to the snapshot directory tree.
pub struct SnapshotStore {
    root: PathBuf,
    freshness: FreshnessCache,
}

impl SnapshotStore {
    /// Create a snapshot store under the given artifact root.
    pub fn new(artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            root: artifact_root.into().join(SNAPSHOT_ROOT),
            freshness: FreshnessCache::new(),
        }
    }

    /// The snapshot tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate a label and return its directory path.
    ///
    /// Labels are plain directory names; separators and dot-traversal are
    /// rejected so a label can never escape the snapshot tree.
    pub fn snapshot_dir(&self, label: &str) -> Result<PathBuf> {
        if label.is_empty()
            || label.contains('/')
            || label.contains('\\')
            || label == "."
            || label == ".."
        {
            return Err(LensError::InvalidParameter(format!(
                "invalid snapshot label: {label:?}"
            )));
        }
        Ok(self.root.join(label))
    }

    /// List available snapshot labels.
    ///
    /// Prefers `index.json` (insertion order); falls back to a sorted
    /// directory scan. An absent tree yields an empty list.
    pub async fn list(&self) -> Result<Vec<String>> {
        let index_path = self.root.join(INDEX_FILE);
        match tokio::fs::read(&index_path).await {
            Ok(bytes) => {
                let index: IndexFile =
                    serde_json::from_slice(&bytes).map_err(|e| LensError::ArtifactMalformed {
                        path: index_path,
                        reason: e.to_string(),
                    })?;
                Ok(match index {
                    IndexFile::Labels { labels } => labels,
                    IndexFile::Bare(labels) => labels,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.scan_labels().await,
            Err(e) => Err(e.into()),
        }
    }

    async fn scan_labels(&self) -> Result<Vec<String>> {
        let mut reader = match tokio::fs::read_dir(&self.root).await {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut labels = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    labels.push(name.to_string());
                }
            }
        }
        labels.sort_unstable();
        Ok(labels)
    }

    /// Load the full artifact triple for one snapshot.
    pub async fn load(&self, label: &str) -> Result<SnapshotArtifacts> {
        let dir = self.snapshot_dir(label)?;
        let bundle = Arc::new(load_manifest_file(&dir.join(MANIFEST_FILE)).await?);
        let catalog = load_catalog_file(&dir.join(CATALOG_FILE)).await?.map(Arc::new);
        let freshness = self.freshness.load(&dir.join(SOURCES_FILE)).await?;
        Ok(SnapshotArtifacts {
            label: label.to_string(),
            bundle,
            catalog,
            freshness,
        })
    }

    /// Read only the `generated_at` stamp of a snapshot's manifest.
    ///
    /// Cheap relative to [`SnapshotStore::load`]; used by the auto-previous
    /// rule to skip snapshots taken at the same instant as the current
    /// bundle.
    pub async fn generated_at(&self, label: &str) -> Result<Option<String>> {
        let path = self.snapshot_dir(label)?.join(MANIFEST_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let head: ManifestHead =
            serde_json::from_slice(&bytes).map_err(|e| LensError::ArtifactMalformed {
                path,
                reason: e.to_string(),
            })?;
        Ok(head.metadata.generated_at)
    }
}
