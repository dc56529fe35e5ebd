// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

//! Reference-data classification.
//!
//! Slow-changing reference entities (dimensions, lookups, seeds) earn a
//! much longer freshness threshold. Classification is a pure function of
//! the node's normalized attributes; the first matching rule wins and its
//! name is recorded so the UI can explain the decision.

use serde::Serialize;

use crate::artifacts::manifest::{ManifestNode, NodeKind};

/// Tags that mark a node as reference data.
const REFERENCE_TAGS: &[&str] = &["ref", "reference", "lookup", "static", "dimension"];

/// Known slow-changing reference entities, lower-cased.
const REFERENCE_TABLE_NAMES: &[&str] = &[
    "addresstype",
    "contacttype",
    "countryregion",
    "culture",
    "currency",
    "department",
    "phonenumbertype",
    "productcategory",
    "productsubcategory",
    "salesreason",
    "scrapreason",
    "shipmethod",
    "stateprovince",
    "unitmeasure",
];

/// Canonical two-column key/value shapes.
const KEY_VALUE_COLUMN_PAIRS: &[(&str, &str)] = &[
    ("id", "name"),
    ("id", "description"),
    ("code", "name"),
    ("code", "description"),
    ("key", "value"),
    ("type", "description"),
    ("status", "description"),
];

/// Classification outcome with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceClassification {
    pub is_reference: bool,
    pub reason: String,
}

impl ReferenceClassification {
    fn yes(reason: &str) -> Self {
        Self {
            is_reference: true,
            reason: reason.to_string(),
        }
    }

    fn no() -> Self {
        Self {
            is_reference: false,
            reason: "not_reference".to_string(),
        }
    }
}

/// Classify a node as reference-like or not. First match wins.
pub fn classify(node: &ManifestNode) -> ReferenceClassification {
    if node.meta_flag("reference_table") {
        return ReferenceClassification::yes("meta.reference_table");
    }

    if node.meta_str("data_class") == Some("reference") {
        return ReferenceClassification::yes("meta.data_class=reference");
    }

    if node
        .tags
        .iter()
        .any(|t| REFERENCE_TAGS.contains(&t.to_lowercase().as_str()))
    {
        return ReferenceClassification::yes("tag");
    }

    if node.resource_type == NodeKind::Seed
        || node.config.materialized.as_deref() == Some("seed")
    {
        return ReferenceClassification::yes("seed");
    }

    let name = node.name.to_lowercase();
    if REFERENCE_TABLE_NAMES.contains(&name.as_str()) {
        return ReferenceClassification::yes("hardcoded_table_name");
    }

    if name.contains("lookup")
        || name.contains("reference")
        || name.contains("_type")
        || name.contains("_reason")
    {
        return ReferenceClassification::yes("name_pattern");
    }

    if matches_key_value_shape(node) {
        return ReferenceClassification::yes("key_value_columns");
    }

    ReferenceClassification::no()
}

/// A node whose column set is exactly one of the canonical key/value pairs.
fn matches_key_value_shape(node: &ManifestNode) -> bool {
    if node.columns.len() != 2 {
        return false;
    }
    let mut names: Vec<String> = node.columns.keys().map(|c| c.to_lowercase()).collect();
    names.sort_unstable();
    KEY_VALUE_COLUMN_PAIRS.iter().any(|(a, b)| {
        let mut pair = [a.to_string(), b.to_string()];
        pair.sort_unstable();
        names[0] == pair[0] && names[1] == pair[1]
    })
}
