//! Prometheus metrics for the API surface.
//!
//! Counters and histograms are created once behind a `OnceLock` and
//! registered to a private registry exported at `GET /metrics`.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

struct ServerMetrics {
    registry: Registry,
    request_counter: IntCounterVec,
    request_duration: Histogram,
    cache_lookups: IntCounterVec,
    error_counter: IntCounterVec,
}

static METRICS: OnceLock<ServerMetrics> = OnceLock::new();

#[allow(clippy::expect_used)] // Static metric creation cannot fail with valid options
fn get_or_init_metrics() -> &'static ServerMetrics {
    METRICS.get_or_init(|| {
        let registry = Registry::new();

        let request_counter = IntCounterVec::new(
            Opts::new(
                "dashlens_requests_total",
                "Total number of HTTP requests by endpoint and status",
            ),
            &["endpoint", "status"],
        )
        .expect("Failed to create request_counter");

        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "dashlens_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )
        .expect("Failed to create request_duration");

        let cache_lookups = IntCounterVec::new(
            Opts::new(
                "dashlens_cache_lookups_total",
                "Response-cache lookups by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        )
        .expect("Failed to create cache_lookups");

        let error_counter = IntCounterVec::new(
            Opts::new(
                "dashlens_errors_total",
                "Total number of errors by endpoint and kind",
            ),
            &["endpoint", "kind"],
        )
        .expect("Failed to create error_counter");

        for (collector, name) in [
            (
                Box::new(request_counter.clone()) as Box<dyn prometheus::core::Collector>,
                "dashlens_requests_total",
            ),
            (Box::new(request_duration.clone()), "dashlens_request_duration_seconds"),
            (Box::new(cache_lookups.clone()), "dashlens_cache_lookups_total"),
            (Box::new(error_counter.clone()), "dashlens_errors_total"),
        ] {
            if let Err(err) = registry.register(collector) {
                tracing::warn!(metric_name = name, error = %err, "Failed to register Prometheus metric");
            }
        }

        ServerMetrics {
            registry,
            request_counter,
            request_duration,
            cache_lookups,
            error_counter,
        }
    })
}

/// Record a successful request.
pub fn record_request(endpoint: &str, duration_seconds: f64) {
    let metrics = get_or_init_metrics();
    metrics
        .request_counter
        .with_label_values(&[endpoint, "success"])
        .inc();
    metrics.request_duration.observe(duration_seconds);
}

/// Record a response-cache lookup outcome.
pub fn record_cache_lookup(endpoint: &str, hit: bool) {
    let metrics = get_or_init_metrics();
    metrics
        .cache_lookups
        .with_label_values(&[endpoint, if hit { "hit" } else { "miss" }])
        .inc();
}

/// Record a failed request.
pub fn record_error(endpoint: &str, kind: &str) {
    let metrics = get_or_init_metrics();
    metrics
        .request_counter
        .with_label_values(&[endpoint, "error"])
        .inc();
    metrics
        .error_counter
        .with_label_values(&[kind, endpoint])
        .inc();
}

/// Export all metrics in Prometheus text format.
pub fn get_metrics() -> Result<String, String> {
    let metrics = get_or_init_metrics();
    let encoder = TextEncoder::new();
    let families = metrics.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {e}"))?;
    String::from_utf8(buffer).map_err(|e| format!("Failed to convert metrics to string: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration_and_export() {
        record_request("dag", 0.05);
        record_cache_lookup("dag", true);
        record_cache_lookup("errors", false);
        record_error("dag", "not_found");

        let exported = get_metrics().unwrap();
        assert!(exported.contains("# HELP"));
        assert!(exported.contains("dashlens_requests_total"));
        assert!(exported.contains("dashlens_request_duration_seconds"));
        assert!(exported.contains("dashlens_cache_lookups_total"));
        assert!(exported.contains("dashlens_errors_total"));
    }

    #[test]
    fn test_record_cache_outcomes() {
        record_cache_lookup("dag", true);
        record_cache_lookup("dag", false);
        let exported = get_metrics().unwrap();
        assert!(exported.contains("hit"));
        assert!(exported.contains("miss"));
    }
}
