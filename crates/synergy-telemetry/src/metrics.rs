//! Prometheus metrics for Synergy.
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed with [`init_metrics`], so a missing or broken
//! exporter can never fail a request.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `synergy_requests_total` | Counter | `method`, `status` | Pipeline invocations |
//! | `synergy_request_duration_seconds` | Histogram | `method` | Pipeline latency |
//! | `synergy_in_flight_requests` | Gauge | - | Requests inside the pipeline |
//! | `synergy_controller_invocations_total` | Counter | `controller`, `method`, `status` | Controller attempts |
//! | `synergy_resolution_cache_total` | Counter | `result` | Cache hits, misses and evictions |
//! | `synergy_validation_failures_total` | Counter | `side` | Validator rejections |
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use synergy_telemetry::metrics::{record_cache, record_request, CacheOutcome};
//!
//! record_request("read", "success", Duration::from_millis(3));
//! record_cache(CacheOutcome::Hit);
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Address for the Prometheus scrape listener. Without one the recorder
    /// is installed and metrics are available through [`render_metrics`].
    pub addr: Option<String>,
}

/// Outcome of a resolution cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A cached controller was used.
    Hit,
    /// No usable entry was found.
    Miss,
    /// An entry was dropped (capacity, expiry or schema change).
    Evict,
}

impl CacheOutcome {
    /// Returns the metric label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Evict => "evict",
        }
    }
}

/// Installs the Prometheus recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidAddress`] for an unparsable listener
/// address and [`TelemetryError::MetricsInit`] if a recorder is already
/// installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    match &config.addr {
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        }
        None => {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let _ = METRICS_HANDLE.set(handle);
        }
    }

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` unless the recorder was installed without a listener.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "synergy_requests_total",
        "Total number of requests processed by a pipeline"
    );
    describe_histogram!(
        "synergy_request_duration_seconds",
        "Pipeline processing time in seconds"
    );
    describe_gauge!(
        "synergy_in_flight_requests",
        "Number of requests currently inside a pipeline"
    );
    describe_counter!(
        "synergy_controller_invocations_total",
        "Controller invocations by controller, method and outcome"
    );
    describe_counter!(
        "synergy_resolution_cache_total",
        "Resolution cache lookups by result"
    );
    describe_counter!(
        "synergy_validation_failures_total",
        "Validator rejections by side"
    );
}

/// Records a completed pipeline invocation.
///
/// `status` is the response status or, for failures, the error kind.
pub fn record_request(method: &str, status: &str, duration: Duration) {
    counter!(
        "synergy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "synergy_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records one controller attempt.
pub fn record_controller_invocation(controller: &str, method: &str, status: &str) {
    counter!(
        "synergy_controller_invocations_total",
        "controller" => controller.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Records a resolution cache event.
pub fn record_cache(outcome: CacheOutcome) {
    counter!("synergy_resolution_cache_total", "result" => outcome.as_str()).increment(1);
}

/// Records a validator rejection.
pub fn record_validation_failure(side: &str) {
    counter!("synergy_validation_failures_total", "side" => side.to_string()).increment(1);
}

/// Keeps the in-flight gauge raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("synergy_in_flight_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("synergy_in_flight_requests").decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_disabled() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert!(config.addr.is_none());
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: Some("not-an-address".to_string()),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_recording_without_recorder() {
        record_request("read", "success", Duration::from_millis(10));
        record_controller_invocation("mem", "read", "not_found");
        record_cache(CacheOutcome::Miss);
        record_validation_failure("request");
        drop(InFlightGuard::new());
    }

    #[test]
    fn test_cache_outcome_labels() {
        assert_eq!(CacheOutcome::Hit.as_str(), "hit");
        assert_eq!(CacheOutcome::Miss.as_str(), "miss");
        assert_eq!(CacheOutcome::Evict.as_str(), "evict");
    }
}
