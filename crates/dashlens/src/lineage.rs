//! Lineage traversal: bounded transitive closures with shortest-path depths.
//!
//! Upstream edges come from `depends_on`, downstream edges from the child
//! index. Both traversals use an explicit work stack with a depth map that
//! doubles as the visited set: a node is re-pushed only when a strictly
//! shorter path to it is found, so cycles terminate and the recorded depth
//! is the shortest-path distance. Deep chains cannot exhaust the call
//! stack because nothing recurses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::artifacts::catalog::{Catalog, CatalogNode};
use crate::artifacts::manifest::{ManifestNode, NodeKind};
use crate::artifacts::sources::FreshnessMap;
use crate::artifacts::store::ManifestBundle;
use crate::checks::{resolve_last_updated, BroadChecks};
use crate::error::{LensError, Result};
use crate::reference::{classify, ReferenceClassification};

/// Hard ceiling on traversal depth; caller-supplied depths are clamped.
pub const MAX_DEPTH_LIMIT: u32 = 100;

/// Cooperative cancellation flag shared with the request scope.
///
/// The traversal checks the token at every node visit and abandons with
/// [`LensError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A column in the merged manifest/catalog view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
}

/// One enriched node of a lineage view.
#[derive(Debug, Clone, Serialize)]
pub struct LineageNode {
    pub unique_id: String,
    pub name: String,
    pub resource_type: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materialized: Option<String>,
    pub columns: BTreeMap<String, ColumnInfo>,
    pub meta: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub reference: ReferenceClassification,
    pub children: Vec<String>,
    /// Broad-check block, attached by the request layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<BroadChecks>,
}

/// Shortest-path depth maxima in both directions.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DepthBlock {
    pub upstream: u32,
    pub downstream: u32,
}

/// The computed lineage subgraph around one root.
#[derive(Debug, Clone, Serialize)]
pub struct LineageView {
    pub root: LineageNode,
    pub parents: Vec<LineageNode>,
    pub children: Vec<LineageNode>,
    pub parent_depths: BTreeMap<String, u32>,
    pub child_depths: BTreeMap<String, u32>,
    pub depth: DepthBlock,
}

impl LineageView {
    /// Every node of the view, root included.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut LineageNode> {
        std::iter::once(&mut self.root)
            .chain(self.parents.iter_mut())
            .chain(self.children.iter_mut())
    }
}

/// Inputs shared by a single traversal request.
pub struct LineageOptions<'a> {
    pub catalog: Option<&'a Catalog>,
    pub freshness: Option<&'a FreshnessMap>,
    pub now: DateTime<Utc>,
    pub cancel: CancelToken,
}

/// Compute the bounded lineage view around `root_id`.
///
/// Fails with [`LensError::NodeNotFound`] when the root is absent from the
/// merged node view. `max_depth` is clamped to `[0, 100]`.
pub fn compute_dag(
    bundle: &ManifestBundle,
    root_id: &str,
    max_depth: u32,
    opts: &LineageOptions<'_>,
) -> Result<LineageView> {
    let root_node = bundle
        .get(root_id)
        .ok_or_else(|| LensError::NodeNotFound(root_id.to_string()))?;
    let max_depth = max_depth.min(MAX_DEPTH_LIMIT);

    // Dangling parent ids are recorded at their candidate depth like any
    // other dependency; traversal stops at them on its own because they
    // have no node to read edges from.
    let parent_depths = traverse(root_id, max_depth, &opts.cancel, |node_id| {
        bundle
            .get(node_id)
            .map(|n| n.parent_ids())
            .unwrap_or_default()
    })?;

    let child_depths = traverse(root_id, max_depth, &opts.cancel, |node_id| {
        bundle.children_of(node_id).iter().map(String::as_str).collect()
    })?;

    let depth = DepthBlock {
        upstream: parent_depths.values().copied().max().unwrap_or(0),
        downstream: child_depths.values().copied().max().unwrap_or(0),
    };

    // Depth maps are BTreeMaps, so iterating yields unique_id order and
    // identical inputs produce identical outputs.
    let parents = enrich_all(bundle, &parent_depths, opts);
    let children = enrich_all(bundle, &child_depths, opts);
    let root = enrich_node(bundle, root_id, root_node, opts);

    Ok(LineageView {
        root,
        parents,
        children,
        parent_depths,
        child_depths,
        depth,
    })
}

/// Explicit-stack shortest-path traversal from `root` along `edges`.
///
/// Depth 0 belongs to the root and never enters the map; the root is never
/// re-enqueued, which is what makes cycles through the root terminate.
fn traverse<'a, F>(
    root: &str,
    max_depth: u32,
    cancel: &CancelToken,
    edges: F,
) -> Result<BTreeMap<String, u32>>
where
    F: Fn(&str) -> Vec<&'a str>,
{
    let mut depths: BTreeMap<String, u32> = BTreeMap::new();
    let mut stack: Vec<(String, u32)> = vec![(root.to_string(), 0)];

    while let Some((id, depth)) = stack.pop() {
        if cancel.is_cancelled() {
            return Err(LensError::Cancelled);
        }
        if depth >= max_depth {
            continue;
        }
        for next in edges(&id) {
            if next == root {
                continue;
            }
            let candidate = depth + 1;
            match depths.get(next) {
                Some(&recorded) if recorded <= candidate => {}
                _ => {
                    depths.insert(next.to_string(), candidate);
                    stack.push((next.to_string(), candidate));
                }
            }
        }
    }

    Ok(depths)
}

fn enrich_all(
    bundle: &ManifestBundle,
    depths: &BTreeMap<String, u32>,
    opts: &LineageOptions<'_>,
) -> Vec<LineageNode> {
    depths
        .keys()
        .filter_map(|id| bundle.get(id).map(|node| enrich_node(bundle, id, node, opts)))
        .collect()
}

/// Merge catalog-derived fields into one manifest node.
fn enrich_node(
    bundle: &ManifestBundle,
    id: &str,
    node: &ManifestNode,
    opts: &LineageOptions<'_>,
) -> LineageNode {
    let catalog_entry = opts.catalog.and_then(|c| c.get(id));
    let freshness_entry = opts.freshness.and_then(|f| f.get(id));

    let mut columns: BTreeMap<String, ColumnInfo> = node
        .columns
        .iter()
        .map(|(name, spec)| {
            (
                name.clone(),
                ColumnInfo {
                    data_type: spec.data_type.clone(),
                    description: spec.description.clone(),
                    index: None,
                },
            )
        })
        .collect();
    if let Some(entry) = catalog_entry {
        for (name, column) in &entry.columns {
            let info = columns.entry(name.clone()).or_default();
            if column.type_name.is_some() {
                info.data_type = column.type_name.clone();
            }
            info.index = column.index;
            if info.description.is_none() {
                info.description = column.comment.clone();
            }
        }
    }

    let row_count = catalog_entry
        .and_then(CatalogNode::row_count)
        .map(|v| v.round() as i64);
    let (last_updated, _) =
        resolve_last_updated(Some(node), catalog_entry, freshness_entry, opts.now);

    LineageNode {
        unique_id: id.to_string(),
        name: node.name.clone(),
        resource_type: node.resource_type,
        database: node.database.clone(),
        schema: node.schema.clone(),
        description: node.description.clone(),
        tags: node.tags.clone(),
        materialized: node.config.materialized.clone(),
        columns,
        meta: node.meta.clone(),
        row_count,
        last_updated,
        reference: classify(node),
        children: bundle.children_of(id).to_vec(),
        observability: None,
    }
}
