// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

//! Artifact loading, memoization and the inverse-dependency index.
//!
//! The store owns the process-wide view of the current artifact pair. The
//! manifest is parsed once into a [`ManifestBundle`] — the merged node view
//! plus the child index — and shared as an immutable `Arc` snapshot;
//! requests take the snapshot under a read lock and compute without holding
//! any lock. A signature over the manifest metadata and node counts drives
//! advisory re-validation when the on-disk artifact is swapped underneath a
//! running process.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::artifacts::catalog::Catalog;
use crate::artifacts::manifest::{Manifest, ManifestMetadata, ManifestNode};
use crate::artifacts::sources::{FreshnessCache, FreshnessMap};
use crate::error::{LensError, Result};

/// Default artifact file names at the store root.
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CATALOG_FILE: &str = "catalog.json";
pub const SOURCES_FILE: &str = "sources.json";
pub const MANIFEST_BACKUP_FILE: &str = "manifest_backup.json";
pub const CATALOG_BACKUP_FILE: &str = "catalog_backup.json";

/// Node counts backing the bundle signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub nodes: usize,
    pub sources: usize,
    pub macros: usize,
}

/// The combined in-memory representation of one manifest.
///
/// Immutable once constructed; shared by `Arc`.
#[derive(Debug)]
pub struct ManifestBundle {
    pub metadata: ManifestMetadata,
    /// Merged node view: `nodes ∪ sources ∪ macros`, keyed by unique id.
    pub nodes: BTreeMap<String, ManifestNode>,
    /// Inverse of `depends_on`: parent id → child ids in insertion order.
    ///
    /// Keys may be dangling (no entry in `nodes`); such parents carry a
    /// child list but are never traversed from.
    pub child_index: HashMap<String, Vec<String>>,
    pub counts: NodeCounts,
    pub signature: String,
}

impl ManifestBundle {
    /// Build the merged view and child index from a parsed manifest.
    pub fn from_manifest(manifest: Manifest) -> Self {
        let counts = NodeCounts {
            nodes: manifest.nodes.len(),
            sources: manifest.sources.len(),
            macros: manifest.macros.len(),
        };
        let signature = signature_of(&manifest.metadata, counts);

        let mut nodes: BTreeMap<String, ManifestNode> = BTreeMap::new();
        let collections = [manifest.nodes, manifest.sources, manifest.macros];
        for collection in collections {
            for (id, mut node) in collection {
                if node.unique_id.is_empty() {
                    node.unique_id = id.clone();
                }
                // First collection wins on id collisions across maps.
                nodes.entry(id).or_insert(node);
            }
        }

        let mut child_index: HashMap<String, Vec<String>> = HashMap::new();
        for (id, node) in &nodes {
            for parent in node.parent_ids() {
                child_index
                    .entry(parent.to_string())
                    .or_default()
                    .push(id.clone());
            }
        }

        Self {
            metadata: manifest.metadata,
            nodes,
            child_index,
            counts,
            signature,
        }
    }

    /// Look up a node in the merged view.
    pub fn get(&self, id: &str) -> Option<&ManifestNode> {
        self.nodes.get(id)
    }

    /// Direct children of a node, possibly empty.
    pub fn children_of(&self, id: &str) -> &[String] {
        self.child_index.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Bundle signature: `"{dbt_version}:{generated_at}:{|nodes|}:{|sources|}:{|macros|}"`.
pub fn signature_of(metadata: &ManifestMetadata, counts: NodeCounts) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        metadata.dbt_version.as_deref().unwrap_or("unknown"),
        metadata.generated_at.as_deref().unwrap_or("unknown"),
        counts.nodes,
        counts.sources,
        counts.macros,
    )
}

/// Advisory structural validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub metadata_present: bool,
    pub node_union_nonempty: bool,
    /// One representative id per dependency cycle found.
    pub cycle_members: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.metadata_present && self.node_union_nonempty && self.cycle_members.is_empty()
    }
}

/// Structurally validate a bundle: metadata presence, non-empty node union,
/// and cycle detection over the dependency graph.
///
/// Cycles are detected with an iterative DFS carrying an explicit
/// recursion-stack set, so arbitrarily deep chains cannot exhaust the call
/// stack. Detection is advisory; a cyclic manifest still loads.
pub fn validate_bundle(bundle: &ManifestBundle) -> ValidationReport {
    let mut report = ValidationReport {
        metadata_present: bundle.metadata.dbt_version.is_some()
            || bundle.metadata.generated_at.is_some()
            || bundle.metadata.dbt_schema_version.is_some(),
        node_union_nonempty: !bundle.nodes.is_empty(),
        cycle_members: Vec::new(),
    };

    let mut visited: HashSet<&str> = HashSet::new();
    let mut cyclic: HashSet<&str> = HashSet::new();

    for start in bundle.nodes.keys() {
        if visited.contains(start.as_str()) {
            continue;
        }
        // Frames of (node, next-parent-index) emulate the recursion stack.
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        let mut on_stack: HashSet<&str> = HashSet::new();
        on_stack.insert(start.as_str());

        while let Some((id, next)) = stack.pop() {
            let parents = bundle
                .nodes
                .get(id)
                .map(ManifestNode::parent_ids)
                .unwrap_or_default();
            if next < parents.len() {
                stack.push((id, next + 1));
                let parent = parents[next];
                if on_stack.contains(parent) {
                    cyclic.insert(parent);
                } else if !visited.contains(parent) && bundle.nodes.contains_key(parent) {
                    // Re-borrow the key from the bundle so the lifetime
                    // outlives this frame.
                    if let Some((key, _)) = bundle.nodes.get_key_value(parent) {
                        stack.push((key.as_str(), 0));
                        on_stack.insert(key.as_str());
                    }
                }
            } else {
                visited.insert(id);
                on_stack.remove(id);
            }
        }
    }

    report.cycle_members = cyclic.into_iter().map(String::from).collect();
    report.cycle_members.sort_unstable();
    report
}

enum CatalogState {
    Unloaded,
    Missing,
    Loaded(Arc<Catalog>),
}

/// Loader and memoizer for the current artifact pair.
pub struct ArtifactStore {
    root: PathBuf,
    bundle: RwLock<Option<Arc<ManifestBundle>>>,
    catalog: RwLock<CatalogState>,
    freshness: FreshnessCache,
    last_validated: RwLock<Option<String>>,
}

impl ArtifactStore {
    /// Create a store rooted at the artifact directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bundle: RwLock::new(None),
            catalog: RwLock::new(CatalogState::Unloaded),
            freshness: FreshnessCache::new(),
            last_validated: RwLock::new(None),
        }
    }

    /// The artifact root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load (or return the memoized) current manifest bundle.
    pub async fn load_manifest(&self) -> Result<Arc<ManifestBundle>> {
        {
            let guard = self.bundle.read().await;
            if let Some(bundle) = guard.as_ref() {
                return Ok(Arc::clone(bundle));
            }
        }

        let path = self.root.join(MANIFEST_FILE);
        let bundle = Arc::new(load_manifest_file(&path).await?);
        info!(
            signature = %bundle.signature,
            nodes = bundle.counts.nodes,
            sources = bundle.counts.sources,
            macros = bundle.counts.macros,
            "Loaded manifest bundle"
        );

        let mut guard = self.bundle.write().await;
        // Another request may have loaded concurrently; keep the first.
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }
        *guard = Some(Arc::clone(&bundle));
        Ok(bundle)
    }

    /// Load (or return the memoized) current catalog.
    ///
    /// A missing catalog is not an error: downstream checks degrade to
    /// `unknown` without physical statistics.
    pub async fn load_catalog(&self) -> Result<Option<Arc<Catalog>>> {
        {
            let guard = self.catalog.read().await;
            match &*guard {
                CatalogState::Loaded(catalog) => return Ok(Some(Arc::clone(catalog))),
                CatalogState::Missing => return Ok(None),
                CatalogState::Unloaded => {}
            }
        }

        let path = self.root.join(CATALOG_FILE);
        let loaded = load_catalog_file(&path).await?;

        let mut guard = self.catalog.write().await;
        match loaded {
            Some(catalog) => {
                let catalog = Arc::new(catalog);
                *guard = CatalogState::Loaded(Arc::clone(&catalog));
                Ok(Some(catalog))
            }
            None => {
                warn!(path = %path.display(), "Catalog artifact missing; checks will run without statistics");
                *guard = CatalogState::Missing;
                Ok(None)
            }
        }
    }

    /// Load the sources-freshness artifact at `path` (mtime-cached).
    pub async fn load_sources(&self, path: &Path) -> Result<Option<Arc<FreshnessMap>>> {
        self.freshness.load(path).await
    }

    /// Load the sources-freshness artifact at the default root location.
    pub async fn load_default_sources(&self) -> Result<Option<Arc<FreshnessMap>>> {
        self.load_sources(&self.root.join(SOURCES_FILE)).await
    }

    /// Drop every memoized artifact, forcing a reload on next access.
    pub async fn clear_all(&self) {
        *self.bundle.write().await = None;
        *self.catalog.write().await = CatalogState::Unloaded;
        self.freshness.clear().await;
        *self.last_validated.write().await = None;
        debug!("Artifact store cleared");
    }

    /// Re-validate the bundle if its signature changed since the last
    /// validation. Returns the advisory pass/fail outcome for the bundle's
    /// current signature.
    pub async fn ensure_validated(&self, bundle: &ManifestBundle) -> bool {
        {
            let guard = self.last_validated.read().await;
            if guard.as_deref() == Some(bundle.signature.as_str()) {
                return true;
            }
        }

        let report = validate_bundle(bundle);
        if !report.metadata_present {
            warn!("Manifest metadata section missing");
        }
        if !report.node_union_nonempty {
            warn!("Manifest node union is empty");
        }
        if !report.cycle_members.is_empty() {
            warn!(
                cycles = report.cycle_members.len(),
                members = ?report.cycle_members,
                "Dependency cycles detected in manifest"
            );
        }

        *self.last_validated.write().await = Some(bundle.signature.clone());
        report.passed()
    }
}

/// Read and parse a manifest file into a bundle. Not memoized; used for
/// snapshots, backups and explicit paths as well as the store root.
pub async fn load_manifest_file(path: &Path) -> Result<ManifestBundle> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LensError::ArtifactMissing {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    let manifest: Manifest =
        serde_json::from_slice(&bytes).map_err(|e| LensError::ArtifactMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(ManifestBundle::from_manifest(manifest))
}

/// Read and parse a catalog file. `Ok(None)` when the file is absent.
pub async fn load_catalog_file(path: &Path) -> Result<Option<Catalog>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let catalog: Catalog =
        serde_json::from_slice(&bytes).map_err(|e| LensError::ArtifactMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(Some(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::manifest::DependsOn;

    fn node(id: &str, deps: &[&str]) -> ManifestNode {
        ManifestNode {
            unique_id: id.to_string(),
            name: id.rsplit('.').next().unwrap_or(id).to_string(),
            depends_on: DependsOn {
                nodes: deps.iter().map(|s| s.to_string()).collect(),
                macros: Vec::new(),
            },
            ..Default::default()
        }
    }

    fn bundle_of(nodes: Vec<ManifestNode>) -> ManifestBundle {
        let manifest = Manifest {
            metadata: ManifestMetadata {
                dbt_version: Some("1.7.0".to_string()),
                generated_at: Some("2026-01-01T00:00:00Z".to_string()),
                ..Default::default()
            },
            nodes: nodes
                .into_iter()
                .map(|n| (n.unique_id.clone(), n))
                .collect(),
            sources: HashMap::new(),
            macros: HashMap::new(),
        };
        ManifestBundle::from_manifest(manifest)
    }

    #[test]
    fn test_child_index_inverts_depends_on() {
        let bundle = bundle_of(vec![
            node("model.p.a", &["model.p.b"]),
            node("model.p.b", &["model.p.c"]),
            node("model.p.c", &[]),
        ]);
        assert_eq!(bundle.children_of("model.p.b"), ["model.p.a"]);
        assert_eq!(bundle.children_of("model.p.c"), ["model.p.b"]);
        assert!(bundle.children_of("model.p.a").is_empty());
    }

    #[test]
    fn test_child_index_exactly_covers_edges() {
        // Every (parent, child) pair in the index must come from a
        // depends_on edge, and every edge must appear.
        let bundle = bundle_of(vec![
            node("model.p.a", &["model.p.b", "model.p.c"]),
            node("model.p.b", &["model.p.c"]),
            node("model.p.c", &[]),
        ]);
        let mut pairs: Vec<(String, String)> = bundle
            .child_index
            .iter()
            .flat_map(|(p, cs)| cs.iter().map(move |c| (p.clone(), c.clone())))
            .collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("model.p.b".to_string(), "model.p.a".to_string()),
                ("model.p.c".to_string(), "model.p.a".to_string()),
                ("model.p.c".to_string(), "model.p.b".to_string()),
            ]
        );
    }

    #[test]
    fn test_dangling_parent_gets_child_list() {
        let bundle = bundle_of(vec![node("model.p.a", &["model.p.ghost"])]);
        assert_eq!(bundle.children_of("model.p.ghost"), ["model.p.a"]);
        assert!(bundle.get("model.p.ghost").is_none());
    }

    #[test]
    fn test_duplicate_dependency_indexed_once() {
        let mut n = node("model.p.a", &["model.p.b", "model.p.b"]);
        n.depends_on.macros.push("model.p.b".to_string());
        let bundle = bundle_of(vec![n, node("model.p.b", &[])]);
        assert_eq!(bundle.children_of("model.p.b"), ["model.p.a"]);
    }

    #[test]
    fn test_unique_id_filled_from_key() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"nodes": {"model.p.a": {"name": "a"}}, "metadata": {}}"#,
        )
        .unwrap();
        let bundle = ManifestBundle::from_manifest(manifest);
        assert_eq!(bundle.get("model.p.a").unwrap().unique_id, "model.p.a");
    }

    #[test]
    fn test_signature_format() {
        let bundle = bundle_of(vec![node("model.p.a", &[])]);
        assert_eq!(bundle.signature, "1.7.0:2026-01-01T00:00:00Z:1:0:0");
    }

    #[test]
    fn test_signature_unknown_metadata() {
        let metadata = ManifestMetadata::default();
        let sig = signature_of(&metadata, NodeCounts::default());
        assert_eq!(sig, "unknown:unknown:0:0:0");
    }

    #[test]
    fn test_validate_clean_bundle_passes() {
        let bundle = bundle_of(vec![
            node("model.p.a", &["model.p.b"]),
            node("model.p.b", &[]),
        ]);
        let report = validate_bundle(&bundle);
        assert!(report.passed());
        assert!(report.cycle_members.is_empty());
    }

    #[test]
    fn test_validate_detects_cycle() {
        let bundle = bundle_of(vec![
            node("model.p.a", &["model.p.b"]),
            node("model.p.b", &["model.p.c"]),
            node("model.p.c", &["model.p.a"]),
        ]);
        let report = validate_bundle(&bundle);
        assert!(!report.passed());
        assert!(!report.cycle_members.is_empty());
    }

    #[test]
    fn test_validate_self_loop() {
        let bundle = bundle_of(vec![node("model.p.a", &["model.p.a"])]);
        let report = validate_bundle(&bundle);
        assert_eq!(report.cycle_members, vec!["model.p.a".to_string()]);
    }

    #[test]
    fn test_validate_deep_chain_does_not_overflow() {
        // 50k-node linear chain; recursion would blow the stack.
        let mut nodes = Vec::new();
        for i in 0..50_000 {
            let deps = if i + 1 < 50_000 {
                vec![format!("model.p.n{}", i + 1)]
            } else {
                vec![]
            };
            let dep_refs: Vec<&str> = deps.iter().map(String::as_str).collect();
            nodes.push(node(&format!("model.p.n{i}"), &dep_refs));
        }
        let bundle = bundle_of(nodes);
        let report = validate_bundle(&bundle);
        assert!(report.passed());
    }

    #[test]
    fn test_validate_empty_union_fails() {
        let bundle = bundle_of(vec![]);
        let report = validate_bundle(&bundle);
        assert!(!report.node_union_nonempty);
        assert!(!report.passed());
    }

    async fn store_with_artifacts(manifest: &str, catalog: Option<&str>) -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        if let Some(catalog) = catalog {
            std::fs::write(dir.path().join(CATALOG_FILE), catalog).unwrap();
        }
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    const MINIMAL_MANIFEST: &str = r#"{
        "metadata": {"dbt_version": "1.7.0", "generated_at": "2026-01-01T00:00:00Z"},
        "nodes": {"model.p.a": {"unique_id": "model.p.a", "name": "a", "resource_type": "model"}},
        "sources": {},
        "macros": {}
    }"#;

    #[tokio::test]
    async fn test_store_memoizes_manifest() {
        let (_dir, store) = store_with_artifacts(MINIMAL_MANIFEST, None).await;
        let first = store.load_manifest().await.unwrap();
        let second = store.load_manifest().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_store_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load_manifest().await.unwrap_err();
        assert!(matches!(err, LensError::ArtifactMissing { .. }));
    }

    #[tokio::test]
    async fn test_store_malformed_manifest() {
        let (_dir, store) = store_with_artifacts("{broken", None).await;
        let err = store.load_manifest().await.unwrap_err();
        assert!(matches!(err, LensError::ArtifactMalformed { .. }));
    }

    #[tokio::test]
    async fn test_store_missing_catalog_is_none() {
        let (_dir, store) = store_with_artifacts(MINIMAL_MANIFEST, None).await;
        assert!(store.load_catalog().await.unwrap().is_none());
        // Memoized as missing; second call also None.
        assert!(store.load_catalog().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_clear_all_reloads() {
        let (dir, store) = store_with_artifacts(MINIMAL_MANIFEST, None).await;
        let first = store.load_manifest().await.unwrap();
        assert_eq!(first.counts.nodes, 1);

        // Swap the artifact and clear: the new bundle must be visible.
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{
                "metadata": {"dbt_version": "1.8.0", "generated_at": "2026-02-01T00:00:00Z"},
                "nodes": {
                    "model.p.a": {"unique_id": "model.p.a"},
                    "model.p.b": {"unique_id": "model.p.b"}
                },
                "sources": {}, "macros": {}
            }"#,
        )
        .unwrap();
        store.clear_all().await;
        let second = store.load_manifest().await.unwrap();
        assert_eq!(second.counts.nodes, 2);
        assert_ne!(first.signature, second.signature);
    }

    #[tokio::test]
    async fn test_ensure_validated_runs_once_per_signature() {
        let (_dir, store) = store_with_artifacts(MINIMAL_MANIFEST, None).await;
        let bundle = store.load_manifest().await.unwrap();
        assert!(store.ensure_validated(&bundle).await);
        // Second call short-circuits on the unchanged signature.
        assert!(store.ensure_validated(&bundle).await);
    }
}
