//! Threshold configuration for broad checks.
//!
//! Thresholds are read from environment variables at startup and passed
//! down into the evaluators; nothing in the engine reads the environment
//! after construction. Non-finite or negative values fall back to the
//! defaults with a warning.

use tracing::warn;

/// Volume deviation threshold, percent.
pub const VOLUME_THRESHOLD_PCT: &str = "OBS_VOLUME_THRESHOLD_PCT";
/// Freshness lag threshold for ordinary nodes, minutes.
pub const FRESHNESS_THRESHOLD_MINUTES: &str = "OBS_FRESHNESS_THRESHOLD_MINUTES";
/// Freshness lag threshold for reference-like nodes, minutes.
pub const REFERENCE_FRESHNESS_THRESHOLD_MINUTES: &str = "OBS_REFERENCE_FRESHNESS_THRESHOLD_MINUTES";

const DEFAULT_VOLUME_THRESHOLD_PCT: f64 = 25.0;
const DEFAULT_FRESHNESS_THRESHOLD_MINUTES: i64 = 180;
// 7 days: slow-changing reference data earns a much longer leash.
const DEFAULT_REFERENCE_FRESHNESS_THRESHOLD_MINUTES: i64 = 7 * 24 * 60;

/// Thresholds used by the broad-checks evaluator.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Volume check fails when `|deviation_pct|` exceeds this.
    pub volume_threshold_pct: f64,
    /// Freshness check fails when the lag exceeds this (non-reference nodes).
    pub freshness_threshold_minutes: i64,
    /// Freshness threshold applied to reference-like nodes.
    pub reference_freshness_threshold_minutes: i64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            volume_threshold_pct: DEFAULT_VOLUME_THRESHOLD_PCT,
            freshness_threshold_minutes: DEFAULT_FRESHNESS_THRESHOLD_MINUTES,
            reference_freshness_threshold_minutes: DEFAULT_REFERENCE_FRESHNESS_THRESHOLD_MINUTES,
        }
    }
}

impl CheckConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            volume_threshold_pct: env_f64(VOLUME_THRESHOLD_PCT, DEFAULT_VOLUME_THRESHOLD_PCT),
            freshness_threshold_minutes: env_minutes(
                FRESHNESS_THRESHOLD_MINUTES,
                DEFAULT_FRESHNESS_THRESHOLD_MINUTES,
            ),
            reference_freshness_threshold_minutes: env_minutes(
                REFERENCE_FRESHNESS_THRESHOLD_MINUTES,
                DEFAULT_REFERENCE_FRESHNESS_THRESHOLD_MINUTES,
            ),
        }
    }

    /// Set the volume deviation threshold (percent).
    #[must_use]
    pub fn with_volume_threshold_pct(mut self, pct: f64) -> Self {
        self.volume_threshold_pct = pct;
        self
    }

    /// Set the freshness threshold for ordinary nodes (minutes).
    #[must_use]
    pub fn with_freshness_threshold_minutes(mut self, minutes: i64) -> Self {
        self.freshness_threshold_minutes = minutes;
        self
    }

    /// Set the freshness threshold for reference-like nodes (minutes).
    #[must_use]
    pub fn with_reference_freshness_threshold_minutes(mut self, minutes: i64) -> Self {
        self.reference_freshness_threshold_minutes = minutes;
        self
    }
}

/// Read a float from the environment; non-finite or negative values fall
/// back to the default.
fn env_f64(name: &str, default: f64) -> f64 {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                warn!(var = name, value = %raw, default, "Invalid threshold value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a minute count from the environment; negative values fall back.
fn env_minutes(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(v) if v >= 0 => v,
            _ => {
                warn!(var = name, value = %raw, default, "Invalid threshold value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckConfig::default();
        assert_eq!(config.volume_threshold_pct, 25.0);
        assert_eq!(config.freshness_threshold_minutes, 180);
        assert_eq!(config.reference_freshness_threshold_minutes, 10_080);
    }

    #[test]
    fn test_builders() {
        let config = CheckConfig::default()
            .with_volume_threshold_pct(10.0)
            .with_freshness_threshold_minutes(60)
            .with_reference_freshness_threshold_minutes(1440);
        assert_eq!(config.volume_threshold_pct, 10.0);
        assert_eq!(config.freshness_threshold_minutes, 60);
        assert_eq!(config.reference_freshness_threshold_minutes, 1440);
    }

    // Environment-dependent parsing is exercised through the helpers with
    // unique variable names so parallel tests cannot interfere.

    #[test]
    fn test_env_f64_valid() {
        std::env::set_var("DASHLENS_TEST_F64_VALID", "12.5");
        assert_eq!(env_f64("DASHLENS_TEST_F64_VALID", 25.0), 12.5);
        std::env::remove_var("DASHLENS_TEST_F64_VALID");
    }

    #[test]
    fn test_env_f64_negative_falls_back() {
        std::env::set_var("DASHLENS_TEST_F64_NEG", "-3");
        assert_eq!(env_f64("DASHLENS_TEST_F64_NEG", 25.0), 25.0);
        std::env::remove_var("DASHLENS_TEST_F64_NEG");
    }

    #[test]
    fn test_env_f64_non_finite_falls_back() {
        std::env::set_var("DASHLENS_TEST_F64_NAN", "NaN");
        assert_eq!(env_f64("DASHLENS_TEST_F64_NAN", 25.0), 25.0);
        std::env::set_var("DASHLENS_TEST_F64_NAN", "inf");
        assert_eq!(env_f64("DASHLENS_TEST_F64_NAN", 25.0), 25.0);
        std::env::remove_var("DASHLENS_TEST_F64_NAN");
    }

    #[test]
    fn test_env_f64_garbage_falls_back() {
        std::env::set_var("DASHLENS_TEST_F64_BAD", "lots");
        assert_eq!(env_f64("DASHLENS_TEST_F64_BAD", 25.0), 25.0);
        std::env::remove_var("DASHLENS_TEST_F64_BAD");
    }

    #[test]
    fn test_env_minutes_valid_and_invalid() {
        std::env::set_var("DASHLENS_TEST_MIN", "90");
        assert_eq!(env_minutes("DASHLENS_TEST_MIN", 180), 90);
        std::env::set_var("DASHLENS_TEST_MIN", "-1");
        assert_eq!(env_minutes("DASHLENS_TEST_MIN", 180), 180);
        std::env::remove_var("DASHLENS_TEST_MIN");
    }

    #[test]
    fn test_env_unset_uses_default() {
        assert_eq!(env_f64("DASHLENS_TEST_UNSET_F64", 25.0), 25.0);
        assert_eq!(env_minutes("DASHLENS_TEST_UNSET_MIN", 180), 180);
    }
}
