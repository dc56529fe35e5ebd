//! Broad operational checks: schema drift, volume drift, freshness lag.
//!
//! Each check compares the current artifact slot against the previous one
//! and reports `pass`/`fail`/`unknown`. `unknown` always means "no
//! baseline or no signal", never "error". The combined style key names the
//! failing checks in the fixed order `schema, volume, freshness` and is
//! consumed by the UI for color selection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::artifacts::catalog::CatalogNode;
use crate::artifacts::manifest::ManifestNode;
use crate::artifacts::sources::SourceFreshness;
use crate::comparison::ComparisonPair;
use crate::config::CheckConfig;
use crate::reference::{classify, ReferenceClassification};

/// Upper bound for the legacy created-at heuristic: 50 years in seconds.
const LEGACY_CREATED_AT_MAX_SECONDS: f64 = 50.0 * 365.0 * 24.0 * 3600.0;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Unknown,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(CheckStatus::Pass),
            "fail" => Ok(CheckStatus::Fail),
            "unknown" => Ok(CheckStatus::Unknown),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// One column whose declared type changed between baselines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeChange {
    pub column: String,
    pub previous: String,
    pub current: String,
}

/// Schema drift between the previous and current column sets.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaCheck {
    pub status: CheckStatus,
    pub added_columns: Vec<String>,
    pub removed_columns: Vec<String>,
    pub type_changes: Vec<TypeChange>,
}

/// Row-count deviation against the previous baseline.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeCheck {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_row_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_row_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation_pct: Option<f64>,
    pub threshold_pct: f64,
}

/// Which signal produced the `last_updated` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FreshnessSource {
    SourcesArtifact,
    CatalogStats,
    ManifestMeta,
    ManifestCreatedAtLegacy,
    Unknown,
}

/// Staleness of the node against its freshness threshold.
#[derive(Debug, Clone, Serialize)]
pub struct FreshnessCheck {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag_minutes: Option<i64>,
    pub threshold_minutes: i64,
    pub is_reference_like: bool,
    pub freshness_source: FreshnessSource,
}

/// The three checks plus the derived style key.
#[derive(Debug, Clone, Serialize)]
pub struct BroadChecks {
    pub schema: SchemaCheck,
    pub volume: VolumeCheck,
    pub freshness: FreshnessCheck,
    pub style_key: String,
    pub fail_count: u32,
}

/// Parse a loosely-typed timestamp value: RFC 3339, a handful of naive
/// formats, or an epoch number (milliseconds when implausibly large for
/// seconds).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            let v = n.as_f64()?;
            if v <= 0.0 {
                return None;
            }
            let secs = if v > 1e12 { v / 1000.0 } else { v };
            DateTime::from_timestamp(secs as i64, 0)
        }
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

/// Legacy compatibility: a manifest `created_at` in `(0, 50y)` seconds is
/// read as "seconds before now". Removing this requires re-baselining any
/// artifact still relying on it.
pub fn legacy_created_at_seconds_ago(value: f64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if value > 0.0 && value < LEGACY_CREATED_AT_MAX_SECONDS {
        let millis = (value * 1000.0) as i64;
        now.checked_sub_signed(chrono::Duration::milliseconds(millis))
    } else {
        None
    }
}

const CATALOG_STAT_KEYS: &[&str] = &["max_loaded_at", "last_modified", "updated_at"];
const MANIFEST_META_KEYS: &[&str] = &["last_updated_at", "max_loaded_at", "modified_at", "updated_at"];

/// Resolve `last_updated` from the first available signal, recording which
/// source produced it.
pub fn resolve_last_updated(
    node: Option<&ManifestNode>,
    catalog: Option<&CatalogNode>,
    freshness: Option<&SourceFreshness>,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, FreshnessSource) {
    if let Some(entry) = freshness {
        let ts = entry
            .max_loaded_at
            .as_deref()
            .and_then(parse_timestamp_str)
            .or_else(|| entry.snapshotted_at.as_deref().and_then(parse_timestamp_str));
        if let Some(ts) = ts {
            return (Some(ts), FreshnessSource::SourcesArtifact);
        }
    }

    if let Some(entry) = catalog {
        let ts = CATALOG_STAT_KEYS
            .iter()
            .find_map(|key| entry.stats.get(*key).and_then(|v| parse_timestamp(v.raw())))
            .or_else(|| {
                entry
                    .metadata
                    .updated_at
                    .as_deref()
                    .and_then(parse_timestamp_str)
            });
        if let Some(ts) = ts {
            return (Some(ts), FreshnessSource::CatalogStats);
        }
    }

    if let Some(node) = node {
        let ts = MANIFEST_META_KEYS
            .iter()
            .find_map(|key| node.meta.get(*key).and_then(parse_timestamp));
        if let Some(ts) = ts {
            return (Some(ts), FreshnessSource::ManifestMeta);
        }

        if let Some(created_at) = node.created_at {
            if let Some(ts) = legacy_created_at_seconds_ago(created_at, now) {
                return (Some(ts), FreshnessSource::ManifestCreatedAtLegacy);
            }
        }
    }

    (None, FreshnessSource::Unknown)
}

/// Column → declared type, merging manifest and catalog and preferring the
/// catalog's physical type.
pub fn column_types(
    node: Option<&ManifestNode>,
    catalog: Option<&CatalogNode>,
) -> BTreeMap<String, String> {
    let mut types = BTreeMap::new();
    if let Some(node) = node {
        for (name, spec) in &node.columns {
            types.insert(name.clone(), spec.data_type.clone().unwrap_or_default());
        }
    }
    if let Some(catalog) = catalog {
        for (name, column) in &catalog.columns {
            let slot = types.entry(name.clone()).or_default();
            if let Some(physical) = &column.type_name {
                *slot = physical.clone();
            }
        }
    }
    types
}

/// Schema check: added/removed columns and type changes against baseline.
pub fn schema_check(
    current: &BTreeMap<String, String>,
    previous: &BTreeMap<String, String>,
) -> SchemaCheck {
    let added_columns: Vec<String> = current
        .keys()
        .filter(|c| !previous.contains_key(*c))
        .cloned()
        .collect();
    let removed_columns: Vec<String> = previous
        .keys()
        .filter(|c| !current.contains_key(*c))
        .cloned()
        .collect();
    let type_changes: Vec<TypeChange> = current
        .iter()
        .filter_map(|(column, cur_type)| {
            let prev_type = previous.get(column)?;
            if prev_type != cur_type {
                Some(TypeChange {
                    column: column.clone(),
                    previous: prev_type.clone(),
                    current: cur_type.clone(),
                })
            } else {
                None
            }
        })
        .collect();

    let status = if previous.is_empty() {
        CheckStatus::Unknown
    } else if !added_columns.is_empty() || !removed_columns.is_empty() || !type_changes.is_empty() {
        CheckStatus::Fail
    } else {
        CheckStatus::Pass
    };

    SchemaCheck {
        status,
        added_columns,
        removed_columns,
        type_changes,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Volume check: row-count deviation against the configured threshold.
pub fn volume_check(
    current_rows: Option<f64>,
    previous_rows: Option<f64>,
    threshold_pct: f64,
) -> VolumeCheck {
    let deviation_pct = match (current_rows, previous_rows) {
        (Some(cur), Some(prev)) if prev > 0.0 => Some(round2((cur - prev) / prev * 100.0)),
        _ => None,
    };
    let status = match deviation_pct {
        Some(dev) if dev.abs() > threshold_pct => CheckStatus::Fail,
        Some(_) => CheckStatus::Pass,
        None => CheckStatus::Unknown,
    };
    VolumeCheck {
        status,
        current_row_count: current_rows.map(|v| v.round() as i64),
        previous_row_count: previous_rows.map(|v| v.round() as i64),
        deviation_pct,
        threshold_pct,
    }
}

/// Freshness check: lag of `last_updated` against the applicable threshold.
pub fn freshness_check(
    node: Option<&ManifestNode>,
    catalog: Option<&CatalogNode>,
    freshness: Option<&SourceFreshness>,
    reference: &ReferenceClassification,
    config: &CheckConfig,
    now: DateTime<Utc>,
) -> FreshnessCheck {
    let threshold_minutes = if reference.is_reference {
        config.reference_freshness_threshold_minutes
    } else {
        config.freshness_threshold_minutes
    };

    let (last_updated, freshness_source) = resolve_last_updated(node, catalog, freshness, now);
    let lag_minutes = last_updated.map(|ts| {
        let seconds = (now - ts).num_seconds();
        ((seconds as f64 / 60.0).round() as i64).max(0)
    });
    let status = match lag_minutes {
        Some(lag) if lag > threshold_minutes => CheckStatus::Fail,
        Some(_) => CheckStatus::Pass,
        None => CheckStatus::Unknown,
    };

    FreshnessCheck {
        status,
        last_updated,
        lag_minutes,
        threshold_minutes,
        is_reference_like: reference.is_reference,
        freshness_source,
    }
}

/// Derived style key: failing check names joined with `+` in the fixed
/// order `schema, volume, freshness`; `none` when nothing fails.
pub fn style_key(schema: CheckStatus, volume: CheckStatus, freshness: CheckStatus) -> String {
    let failing: Vec<&str> = [
        ("schema", schema),
        ("volume", volume),
        ("freshness", freshness),
    ]
    .iter()
    .filter(|(_, status)| *status == CheckStatus::Fail)
    .map(|(name, _)| *name)
    .collect();

    if failing.is_empty() {
        "none".to_string()
    } else {
        failing.join("+")
    }
}

/// Evaluate all three checks for one node against a comparison pair.
pub fn broad_checks(
    node_id: &str,
    pair: &ComparisonPair,
    config: &CheckConfig,
    now: DateTime<Utc>,
) -> BroadChecks {
    let current_node = pair.current.node(node_id);
    let previous_node = pair.previous.node(node_id);
    let current_catalog = pair.current.catalog_entry(node_id);
    let previous_catalog = pair.previous.catalog_entry(node_id);

    let current_types = column_types(current_node, current_catalog);
    let previous_types = column_types(previous_node, previous_catalog);
    let schema = schema_check(&current_types, &previous_types);

    let volume = volume_check(
        current_catalog.and_then(CatalogNode::row_count),
        previous_catalog.and_then(CatalogNode::row_count),
        config.volume_threshold_pct,
    );

    let reference = current_node.map(classify).unwrap_or(ReferenceClassification {
        is_reference: false,
        reason: "not_reference".to_string(),
    });
    let freshness = freshness_check(
        current_node,
        current_catalog,
        pair.current.freshness_entry(node_id),
        &reference,
        config,
        now,
    );

    let style_key = style_key(schema.status, volume.status, freshness.status);
    let fail_count = [schema.status, volume.status, freshness.status]
        .iter()
        .filter(|s| **s == CheckStatus::Fail)
        .count() as u32;

    BroadChecks {
        schema,
        volume,
        freshness,
        style_key,
        fail_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn types(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(c, t)| (c.to_string(), t.to_string()))
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    // ==================== Schema check ====================

    #[test]
    fn test_schema_added_removed_type_change() {
        let previous = types(&[("a", "int"), ("b", "text")]);
        let current = types(&[("a", "bigint"), ("c", "text")]);
        let check = schema_check(&current, &previous);

        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.added_columns, vec!["c"]);
        assert_eq!(check.removed_columns, vec!["b"]);
        assert_eq!(
            check.type_changes,
            vec![TypeChange {
                column: "a".to_string(),
                previous: "int".to_string(),
                current: "bigint".to_string(),
            }]
        );
    }

    #[test]
    fn test_schema_identical_passes() {
        let cols = types(&[("a", "int"), ("b", "text")]);
        let check = schema_check(&cols, &cols.clone());
        assert_eq!(check.status, CheckStatus::Pass);
        assert!(check.added_columns.is_empty());
        assert!(check.removed_columns.is_empty());
        assert!(check.type_changes.is_empty());
    }

    #[test]
    fn test_schema_no_baseline_unknown() {
        let current = types(&[("a", "int")]);
        let check = schema_check(&current, &BTreeMap::new());
        assert_eq!(check.status, CheckStatus::Unknown);
        // Added columns are still reported for display purposes.
        assert_eq!(check.added_columns, vec!["a"]);
    }

    // ==================== Volume check ====================

    #[test]
    fn test_volume_within_threshold_passes() {
        let check = volume_check(Some(1100.0), Some(1000.0), 25.0);
        assert_eq!(check.status, CheckStatus::Pass);
        assert_eq!(check.deviation_pct, Some(10.0));
    }

    #[test]
    fn test_volume_beyond_threshold_fails() {
        let check = volume_check(Some(1300.0), Some(1000.0), 25.0);
        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.deviation_pct, Some(30.0));
        assert_eq!(check.current_row_count, Some(1300));
        assert_eq!(check.previous_row_count, Some(1000));
    }

    #[test]
    fn test_volume_shrink_fails_symmetrically() {
        let check = volume_check(Some(700.0), Some(1000.0), 25.0);
        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.deviation_pct, Some(-30.0));
    }

    #[test]
    fn test_volume_zero_previous_unknown() {
        let check = volume_check(Some(500.0), Some(0.0), 25.0);
        assert_eq!(check.status, CheckStatus::Unknown);
        assert_eq!(check.deviation_pct, None);
        assert_eq!(check.previous_row_count, Some(0));
    }

    #[test]
    fn test_volume_missing_counts_unknown() {
        assert_eq!(volume_check(None, Some(10.0), 25.0).status, CheckStatus::Unknown);
        assert_eq!(volume_check(Some(10.0), None, 25.0).status, CheckStatus::Unknown);
        assert_eq!(volume_check(None, None, 25.0).status, CheckStatus::Unknown);
    }

    #[test]
    fn test_volume_exactly_at_threshold_passes() {
        let check = volume_check(Some(1250.0), Some(1000.0), 25.0);
        assert_eq!(check.status, CheckStatus::Pass);
    }

    // ==================== Timestamp parsing ====================

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_timestamp(&Value::String("2026-06-01T06:00:00Z".into())).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 6, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_formats() {
        assert!(parse_timestamp(&Value::String("2026-06-01T06:00:00".into())).is_some());
        assert!(parse_timestamp(&Value::String("2026-06-01 06:00:00".into())).is_some());
        assert!(parse_timestamp(&Value::String("2026-06-01".into())).is_some());
    }

    #[test]
    fn test_parse_epoch_seconds_and_millis() {
        let secs = parse_timestamp(&serde_json::json!(1_750_000_000)).unwrap();
        let millis = parse_timestamp(&serde_json::json!(1_750_000_000_000u64)).unwrap();
        assert_eq!(secs, millis);
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_timestamp(&Value::String("soon".into())).is_none());
        assert!(parse_timestamp(&Value::Bool(true)).is_none());
        assert!(parse_timestamp(&serde_json::json!(-5)).is_none());
    }

    // ==================== Legacy created-at ====================

    #[test]
    fn test_legacy_created_at_in_range() {
        let ts = legacy_created_at_seconds_ago(21_600.0, now()).unwrap();
        assert_eq!(ts, now() - chrono::Duration::hours(6));
    }

    #[test]
    fn test_legacy_created_at_guardrail() {
        assert!(legacy_created_at_seconds_ago(0.0, now()).is_none());
        assert!(legacy_created_at_seconds_ago(-10.0, now()).is_none());
        // Modern epoch stamps exceed the 50-year window and are rejected.
        assert!(legacy_created_at_seconds_ago(1_750_000_000.0, now()).is_none());
    }

    // ==================== last_updated resolution ====================

    fn node_with_meta(key: &str, value: Value) -> ManifestNode {
        let mut node = ManifestNode::default();
        node.meta.insert(key.to_string(), value);
        node
    }

    #[test]
    fn test_resolution_prefers_sources_artifact() {
        let freshness = SourceFreshness {
            max_loaded_at: Some("2026-06-01T06:00:00Z".to_string()),
            ..Default::default()
        };
        let node = node_with_meta("updated_at", "2026-01-01T00:00:00Z".into());
        let (ts, source) = resolve_last_updated(Some(&node), None, Some(&freshness), now());
        assert_eq!(source, FreshnessSource::SourcesArtifact);
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2026, 6, 1, 6, 0, 0).unwrap()));
    }

    #[test]
    fn test_resolution_sources_snapshotted_at_fallback() {
        let freshness = SourceFreshness {
            snapshotted_at: Some("2026-06-01T05:00:00Z".to_string()),
            ..Default::default()
        };
        let (_, source) = resolve_last_updated(None, None, Some(&freshness), now());
        assert_eq!(source, FreshnessSource::SourcesArtifact);
    }

    #[test]
    fn test_resolution_catalog_stats() {
        let catalog: CatalogNode = serde_json::from_str(
            r#"{"stats": {"last_modified": {"value": "2026-06-01T03:00:00Z"}}}"#,
        )
        .unwrap();
        let (ts, source) = resolve_last_updated(None, Some(&catalog), None, now());
        assert_eq!(source, FreshnessSource::CatalogStats);
        assert!(ts.is_some());
    }

    #[test]
    fn test_resolution_catalog_metadata_updated_at() {
        let catalog: CatalogNode = serde_json::from_str(
            r#"{"metadata": {"updated_at": "2026-06-01T02:00:00Z"}, "stats": {}}"#,
        )
        .unwrap();
        let (_, source) = resolve_last_updated(None, Some(&catalog), None, now());
        assert_eq!(source, FreshnessSource::CatalogStats);
    }

    #[test]
    fn test_resolution_manifest_meta() {
        let node = node_with_meta("last_updated_at", "2026-06-01T06:00:00Z".into());
        let (_, source) = resolve_last_updated(Some(&node), None, None, now());
        assert_eq!(source, FreshnessSource::ManifestMeta);
    }

    #[test]
    fn test_resolution_legacy_created_at() {
        let mut node = ManifestNode::default();
        node.created_at = Some(3600.0);
        let (ts, source) = resolve_last_updated(Some(&node), None, None, now());
        assert_eq!(source, FreshnessSource::ManifestCreatedAtLegacy);
        assert_eq!(ts, Some(now() - chrono::Duration::hours(1)));
    }

    #[test]
    fn test_resolution_nothing_unknown() {
        let (ts, source) = resolve_last_updated(Some(&ManifestNode::default()), None, None, now());
        assert_eq!(ts, None);
        assert_eq!(source, FreshnessSource::Unknown);
    }

    // ==================== Freshness check ====================

    #[test]
    fn test_freshness_reference_threshold() {
        // Six hours stale: fails the 180-minute default, passes the
        // 7-day reference threshold.
        let mut node = node_with_meta("updated_at", "2026-06-01T06:00:00Z".into());
        node.tags.push("reference".to_string());
        let reference = classify(&node);
        assert!(reference.is_reference);

        let config = CheckConfig::default();
        let check = freshness_check(Some(&node), None, None, &reference, &config, now());
        assert_eq!(check.status, CheckStatus::Pass);
        assert_eq!(check.lag_minutes, Some(360));
        assert_eq!(check.threshold_minutes, 10_080);
        assert!(check.is_reference_like);
        assert_eq!(check.freshness_source, FreshnessSource::ManifestMeta);
    }

    #[test]
    fn test_freshness_non_reference_fails() {
        let node = node_with_meta("updated_at", "2026-06-01T06:00:00Z".into());
        let reference = classify(&node);
        let config = CheckConfig::default();
        let check = freshness_check(Some(&node), None, None, &reference, &config, now());
        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.lag_minutes, Some(360));
        assert_eq!(check.threshold_minutes, 180);
    }

    #[test]
    fn test_freshness_no_signal_unknown() {
        let node = ManifestNode::default();
        let reference = classify(&node);
        let config = CheckConfig::default();
        let check = freshness_check(Some(&node), None, None, &reference, &config, now());
        assert_eq!(check.status, CheckStatus::Unknown);
        assert_eq!(check.lag_minutes, None);
        assert_eq!(check.freshness_source, FreshnessSource::Unknown);
    }

    #[test]
    fn test_freshness_future_timestamp_clamps_to_zero() {
        let node = node_with_meta("updated_at", "2026-06-01T13:00:00Z".into());
        let reference = classify(&node);
        let config = CheckConfig::default();
        let check = freshness_check(Some(&node), None, None, &reference, &config, now());
        assert_eq!(check.lag_minutes, Some(0));
        assert_eq!(check.status, CheckStatus::Pass);
    }

    // ==================== Style key ====================

    #[test]
    fn test_style_key_combinations() {
        use CheckStatus::{Fail, Pass, Unknown};
        assert_eq!(style_key(Pass, Pass, Pass), "none");
        assert_eq!(style_key(Unknown, Unknown, Unknown), "none");
        assert_eq!(style_key(Fail, Pass, Pass), "schema");
        assert_eq!(style_key(Pass, Fail, Pass), "volume");
        assert_eq!(style_key(Pass, Pass, Fail), "freshness");
        assert_eq!(style_key(Fail, Fail, Pass), "schema+volume");
        assert_eq!(style_key(Fail, Pass, Fail), "schema+freshness");
        assert_eq!(style_key(Pass, Fail, Fail), "volume+freshness");
        assert_eq!(style_key(Fail, Fail, Fail), "schema+volume+freshness");
    }

    #[test]
    fn test_freshness_source_serialization() {
        assert_eq!(
            serde_json::to_value(FreshnessSource::SourcesArtifact).unwrap(),
            "sources-artifact"
        );
        assert_eq!(
            serde_json::to_value(FreshnessSource::ManifestCreatedAtLegacy).unwrap(),
            "manifest-created-at-legacy"
        );
    }
}
