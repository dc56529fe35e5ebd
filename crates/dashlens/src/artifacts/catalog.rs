//! Catalog artifact data model.
//!
//! The catalog is the physical counterpart of the manifest: per-asset
//! column types, row counts and modification hints as observed in the
//! warehouse. Statistics values arrive either as bare primitives or as
//! `{"value": ...}` wrappers depending on the producing adapter, so the
//! model keeps them opaque behind [`StatValue`] accessors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Top-level catalog metadata block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogMetadata {
    pub dbt_schema_version: Option<String>,
    pub dbt_version: Option<String>,
    pub generated_at: Option<String>,
}

/// Physical table metadata for one catalog entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogTableMeta {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    /// Some adapters stamp a modification hint directly into the metadata.
    pub updated_at: Option<String>,
}

/// A column as observed in the warehouse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogColumn {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub index: Option<u64>,
    pub name: Option<String>,
    pub nullable: Option<bool>,
    pub comment: Option<String>,
}

/// One statistics value: a bare primitive or a `{"value": ...}` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Wrapped { value: Value },
    Plain(Value),
}

impl StatValue {
    /// The underlying JSON value, unwrapping `{"value": ...}`.
    pub fn raw(&self) -> &Value {
        match self {
            StatValue::Wrapped { value } => value,
            StatValue::Plain(value) => value,
        }
    }

    /// Numeric view, tolerating numbers and numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self.raw() {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        self.raw().as_str()
    }
}

/// One entry of the catalog's `nodes`/`sources` maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogNode {
    pub metadata: CatalogTableMeta,
    pub columns: BTreeMap<String, CatalogColumn>,
    pub stats: BTreeMap<String, StatValue>,
}

impl CatalogNode {
    /// Numeric statistic by key.
    pub fn stat_f64(&self, key: &str) -> Option<f64> {
        self.stats.get(key).and_then(StatValue::as_f64)
    }

    /// String statistic by key.
    pub fn stat_str(&self, key: &str) -> Option<&str> {
        self.stats.get(key).and_then(StatValue::as_str)
    }

    /// Row count from `num_rows`, falling back to `row_count`.
    pub fn row_count(&self) -> Option<f64> {
        self.stat_f64("num_rows").or_else(|| self.stat_f64("row_count"))
    }
}

/// The parsed catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub metadata: CatalogMetadata,
    pub nodes: HashMap<String, CatalogNode>,
    pub sources: HashMap<String, CatalogNode>,
}

impl Catalog {
    /// Look up an entry across `nodes` and `sources`.
    pub fn get(&self, id: &str) -> Option<&CatalogNode> {
        self.nodes.get(id).or_else(|| self.sources.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_value_plain_number() {
        let v: StatValue = serde_json::from_str("1234").unwrap();
        assert_eq!(v.as_f64(), Some(1234.0));
    }

    #[test]
    fn test_stat_value_wrapped_number() {
        let v: StatValue = serde_json::from_str(r#"{"value": 42}"#).unwrap();
        assert_eq!(v.as_f64(), Some(42.0));
    }

    #[test]
    fn test_stat_value_wrapper_with_extra_fields() {
        // Adapter-produced stats carry id/label/include alongside value.
        let v: StatValue = serde_json::from_str(
            r##"{"id": "num_rows", "label": "# Rows", "value": 19820, "include": true}"##,
        )
        .unwrap();
        assert_eq!(v.as_f64(), Some(19820.0));
    }

    #[test]
    fn test_stat_value_numeric_string() {
        let v: StatValue = serde_json::from_str(r#""1,024""#).unwrap();
        assert_eq!(v.as_f64(), Some(1024.0));
        let v: StatValue = serde_json::from_str(r#"{"value": "512"}"#).unwrap();
        assert_eq!(v.as_f64(), Some(512.0));
    }

    #[test]
    fn test_stat_value_non_numeric() {
        let v: StatValue = serde_json::from_str(r#""yesterday""#).unwrap();
        assert_eq!(v.as_f64(), None);
        assert_eq!(v.as_str(), Some("yesterday"));
    }

    #[test]
    fn test_row_count_prefers_num_rows() {
        let node: CatalogNode = serde_json::from_str(
            r#"{"stats": {"num_rows": {"value": 100}, "row_count": 999}}"#,
        )
        .unwrap();
        assert_eq!(node.row_count(), Some(100.0));
    }

    #[test]
    fn test_row_count_falls_back_to_row_count() {
        let node: CatalogNode =
            serde_json::from_str(r#"{"stats": {"row_count": "250"}}"#).unwrap();
        assert_eq!(node.row_count(), Some(250.0));
    }

    #[test]
    fn test_row_count_absent() {
        let node: CatalogNode = serde_json::from_str(r#"{"stats": {}}"#).unwrap();
        assert_eq!(node.row_count(), None);
    }

    #[test]
    fn test_catalog_get_checks_sources() {
        let catalog: Catalog = serde_json::from_str(
            r#"{
                "nodes": {"model.p.a": {}},
                "sources": {"source.p.raw.orders": {"stats": {"num_rows": 7}}}
            }"#,
        )
        .unwrap();
        assert!(catalog.get("model.p.a").is_some());
        assert_eq!(
            catalog.get("source.p.raw.orders").unwrap().row_count(),
            Some(7.0)
        );
        assert!(catalog.get("model.p.missing").is_none());
    }

    #[test]
    fn test_column_type_rename() {
        let node: CatalogNode = serde_json::from_str(
            r#"{"columns": {"id": {"type": "bigint", "index": 1, "comment": "pk"}}}"#,
        )
        .unwrap();
        assert_eq!(node.columns["id"].type_name.as_deref(), Some("bigint"));
        assert_eq!(node.columns["id"].index, Some(1));
    }

    #[test]
    fn test_table_meta_type_rename() {
        let node: CatalogNode = serde_json::from_str(
            r#"{"metadata": {"type": "BASE TABLE", "schema": "sales", "name": "orders"}}"#,
        )
        .unwrap();
        assert_eq!(node.metadata.type_name.as_deref(), Some("BASE TABLE"));
    }
}
