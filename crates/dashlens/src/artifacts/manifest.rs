//! Manifest artifact data model.
//!
//! The manifest is the declarative graph produced by the upstream
//! transformation toolchain: every model, seed, source, test and macro with
//! its dependencies, tags, columns and free-form metadata. The shapes here
//! model only the fields the engine reads; everything is `#[serde(default)]`
//! so sparsely-populated artifacts parse without ceremony.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Top-level manifest metadata block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestMetadata {
    pub dbt_schema_version: Option<String>,
    pub dbt_version: Option<String>,
    pub generated_at: Option<String>,
}

/// Node kind, as declared by `resource_type`.
///
/// Anything the engine does not recognize collapses to `Other` rather than
/// failing the parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Model,
    Seed,
    Test,
    Source,
    Snapshot,
    Macro,
    #[default]
    Other,
}

impl NodeKind {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Model => "model",
            NodeKind::Seed => "seed",
            NodeKind::Test => "test",
            NodeKind::Source => "source",
            NodeKind::Snapshot => "snapshot",
            NodeKind::Macro => "macro",
            NodeKind::Other => "other",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "model" => NodeKind::Model,
            "seed" => NodeKind::Seed,
            "test" => NodeKind::Test,
            "source" => NodeKind::Source,
            "snapshot" => NodeKind::Snapshot,
            "macro" => NodeKind::Macro,
            _ => NodeKind::Other,
        }
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(NodeKind::parse(&raw))
    }
}

/// A column as declared in the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub description: Option<String>,
    pub data_type: Option<String>,
}

/// Direct dependencies of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependsOn {
    pub nodes: Vec<String>,
    pub macros: Vec<String>,
}

/// Generic-test metadata attached to test nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestMetadata {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub kwargs: serde_json::Map<String, Value>,
}

impl TestMetadata {
    /// The column the generic test is attached to, when present.
    pub fn column_name(&self) -> Option<&str> {
        self.kwargs.get("column_name").and_then(Value::as_str)
    }
}

/// The subset of node config the engine reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub materialized: Option<String>,
    pub severity: Option<String>,
}

/// One entry of the manifest's `nodes`/`sources`/`macros` maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestNode {
    pub unique_id: String,
    pub name: String,
    pub resource_type: NodeKind,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub columns: BTreeMap<String, ColumnSpec>,
    pub meta: serde_json::Map<String, Value>,
    pub config: NodeConfig,
    pub depends_on: DependsOn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_metadata: Option<TestMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_key_name: Option<String>,
    /// Legacy numeric creation hint, interpreted by the freshness check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<f64>,
}

impl ManifestNode {
    /// Direct parent ids: `depends_on.nodes ∪ depends_on.macros`, with
    /// duplicates removed while preserving first-seen order.
    pub fn parent_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.depends_on
            .nodes
            .iter()
            .chain(self.depends_on.macros.iter())
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Look up a string-valued meta key.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Look up a truthy meta flag (`true` or `"true"`).
    pub fn meta_flag(&self, key: &str) -> bool {
        match self.meta.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// The parsed manifest file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub metadata: ManifestMetadata,
    pub nodes: HashMap<String, ManifestNode>,
    pub sources: HashMap<String, ManifestNode>,
    pub macros: HashMap<String, ManifestNode>,
}
