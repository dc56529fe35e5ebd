//! Test enumeration, classification and the per-node test report.
//!
//! The manifest carries test definitions but no run results, so every
//! declared test reports status `unknown`; the three synthetic broad-check
//! tests carry the live pass/fail signal. Filtering happens last and never
//! changes the failing count.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::artifacts::manifest::{ManifestNode, NodeKind};
use crate::checks::{broad_checks, BroadChecks, CheckStatus, VolumeCheck};
use crate::comparison::ComparisonPair;
use crate::config::CheckConfig;
use crate::error::{LensError, Result};

/// Test classification buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Freshness,
    Volume,
    Quality,
    Other,
}

impl std::str::FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "freshness" => Ok(TestType::Freshness),
            "volume" => Ok(TestType::Volume),
            "quality" => Ok(TestType::Quality),
            "other" => Ok(TestType::Other),
            unknown => Err(format!("unknown test type: {unknown}")),
        }
    }
}

/// Test severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One test in the report.
#[derive(Debug, Clone, Serialize)]
pub struct TestEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub status: CheckStatus,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
}

/// Which artifacts the report was computed against.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonDescriptor {
    pub current: String,
    pub previous: String,
}

/// The assembled per-node report.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub total_tests: usize,
    pub failing_tests: usize,
    pub tests: Vec<TestEntry>,
    pub volume: VolumeCheck,
    pub broad_checks: BroadChecks,
    pub comparison: ComparisonDescriptor,
}

/// Post-assembly filters from the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestFilter {
    pub test_type: Option<TestType>,
    pub status: Option<CheckStatus>,
}

const GENERIC_FRESHNESS: &[&str] = &["dbt_freshness", "freshness"];
const GENERIC_QUALITY: &[&str] = &["unique", "not_null", "relationships", "accepted_values"];

/// Classify one test node.
///
/// Generic-test metadata wins when it carries the expected namespace
/// (absent or `dbt`); otherwise the lowercased test name is matched by
/// substring.
pub fn classify_test(node: &ManifestNode) -> TestType {
    if let Some(metadata) = &node.test_metadata {
        let namespace_ok =
            metadata.namespace.is_none() || metadata.namespace.as_deref() == Some("dbt");
        if namespace_ok {
            if let Some(name) = metadata.name.as_deref() {
                if GENERIC_FRESHNESS.contains(&name) {
                    return TestType::Freshness;
                }
                if GENERIC_QUALITY.contains(&name) {
                    return TestType::Quality;
                }
                return TestType::Other;
            }
        }
    }

    let name = node.name.to_lowercase();
    if name.contains("freshness") {
        TestType::Freshness
    } else if name.contains("row_count") || name.contains("volume") || name.contains("not_empty") {
        TestType::Volume
    } else if name.contains("not_null")
        || name.contains("unique")
        || name.contains("accepted_values")
        || name.contains("relationships")
        || name.contains("type_check")
    {
        TestType::Quality
    } else {
        TestType::Other
    }
}

fn severity_of(node: &ManifestNode) -> Severity {
    match node.config.severity.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("error") => Severity::Error,
        _ => Severity::Warning,
    }
}

fn declared_test_entry(node: &ManifestNode) -> TestEntry {
    let (name, column_name) = match &node.test_metadata {
        Some(metadata) => (
            metadata.name.clone().unwrap_or_else(|| node.name.clone()),
            metadata.column_name().map(String::from),
        ),
        None => (node.name.clone(), None),
    };
    TestEntry {
        id: node.unique_id.clone(),
        name,
        test_type: classify_test(node),
        status: CheckStatus::Unknown,
        severity: severity_of(node),
        description: node.description.clone(),
        column_name,
    }
}

fn check_severity(status: CheckStatus) -> Severity {
    if status == CheckStatus::Fail {
        Severity::Error
    } else {
        Severity::Warning
    }
}

fn synthetic_tests(node_id: &str, checks: &BroadChecks) -> Vec<TestEntry> {
    let schema_description = if checks.schema.status == CheckStatus::Unknown {
        "no schema baseline available".to_string()
    } else {
        format!(
            "{} column(s) added, {} removed, {} type change(s)",
            checks.schema.added_columns.len(),
            checks.schema.removed_columns.len(),
            checks.schema.type_changes.len(),
        )
    };

    let volume_description = match (
        checks.volume.current_row_count,
        checks.volume.previous_row_count,
        checks.volume.deviation_pct,
    ) {
        (Some(cur), Some(prev), Some(dev)) => {
            format!("row count {cur} vs {prev} ({dev:+.1}%)")
        }
        _ => "row-count data incomplete".to_string(),
    };

    let freshness_description = match checks.freshness.lag_minutes {
        Some(lag) => format!(
            "last updated {lag} minute(s) ago (threshold {})",
            checks.freshness.threshold_minutes
        ),
        None => "no freshness signal available".to_string(),
    };

    vec![
        TestEntry {
            id: format!("broad_check.schema_drift.{node_id}"),
            name: "schema_drift".to_string(),
            test_type: TestType::Quality,
            status: checks.schema.status,
            severity: check_severity(checks.schema.status),
            description: Some(schema_description),
            column_name: None,
        },
        TestEntry {
            id: format!("broad_check.volume_change.{node_id}"),
            name: "volume_change".to_string(),
            test_type: TestType::Volume,
            status: checks.volume.status,
            severity: check_severity(checks.volume.status),
            description: Some(volume_description),
            column_name: None,
        },
        TestEntry {
            id: format!("broad_check.freshness_lag.{node_id}"),
            name: "freshness_lag".to_string(),
            test_type: TestType::Freshness,
            status: checks.freshness.status,
            severity: check_severity(checks.freshness.status),
            description: Some(freshness_description),
            column_name: None,
        },
    ]
}

/// Assemble the test report for one node against a comparison pair.
pub fn tests_for(
    node_id: &str,
    pair: &ComparisonPair,
    config: &CheckConfig,
    now: DateTime<Utc>,
    filter: TestFilter,
) -> Result<TestReport> {
    let bundle = pair
        .current
        .bundle
        .as_deref()
        .ok_or_else(|| LensError::Internal("current slot carries no manifest".to_string()))?;
    if bundle.get(node_id).is_none() {
        return Err(LensError::NodeNotFound(node_id.to_string()));
    }

    let mut tests: Vec<TestEntry> = bundle
        .nodes
        .values()
        .filter(|node| node.resource_type == NodeKind::Test)
        .filter(|node| {
            node.depends_on.nodes.iter().any(|d| d == node_id)
                || node.file_key_name.as_deref() == Some(node_id)
        })
        .map(declared_test_entry)
        .collect();
    tests.sort_by(|a, b| a.id.cmp(&b.id));

    let checks = broad_checks(node_id, pair, config, now);
    tests.extend(synthetic_tests(node_id, &checks));

    let total_tests = tests.len();
    // Counted before filtering so hiding a category cannot hide failures.
    let failing_tests = tests
        .iter()
        .filter(|t| t.status == CheckStatus::Fail)
        .count();

    if let Some(wanted) = filter.test_type {
        tests.retain(|t| t.test_type == wanted);
    }
    if let Some(wanted) = filter.status {
        tests.retain(|t| t.status == wanted);
    }

    Ok(TestReport {
        total_tests,
        failing_tests,
        tests,
        volume: checks.volume.clone(),
        comparison: ComparisonDescriptor {
            current: pair.current.source.tag(),
            previous: pair.previous.source.tag(),
        },
        broad_checks: checks,
    })
}
