//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use serde::{Deserialize, Serialize};

/// Dispatcher section.
///
/// Controls the resolution cache and the caching default for new requests.
///
/// # Example
///
/// ```
/// use synergy_config::DispatcherConfig;
///
/// let config = DispatcherConfig::default();
/// assert!(config.allow_controller_caching);
/// assert_eq!(config.cache_capacity, 10_000);
/// assert_eq!(config.cache_ttl_secs, None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Whether new requests may use the resolution cache.
    #[serde(default = "default_true")]
    pub allow_controller_caching: bool,

    /// Maximum number of cached resolutions. `0` disables the cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Lifetime of a cached resolution in seconds. `None` keeps entries
    /// until they are evicted for capacity.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            allow_controller_caching: true,
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: None,
        }
    }
}

fn default_cache_capacity() -> usize {
    10_000
}

/// Transformation stages section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    /// Expand `${NAME}` references in resource names.
    #[serde(default = "default_true")]
    pub expand_environment_variables: bool,

    /// Base path for relative resource names. Unset disables path resolution.
    #[serde(default)]
    pub resource_root: Option<String>,

    /// Items key that asks for a text body on reads.
    #[serde(default = "default_text_hint_key")]
    pub text_hint_key: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            expand_environment_variables: true,
            resource_root: None,
            text_hint_key: default_text_hint_key(),
        }
    }
}

fn default_text_hint_key() -> String {
    "as_text".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `synergy_middleware=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder.
    #[serde(default)]
    pub enabled: bool,

    /// Address for the Prometheus scrape endpoint. Unset keeps the recorder
    /// in-process only.
    #[serde(default)]
    pub addr: Option<String>,
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name attached to request logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "synergy".to_string()
}

fn default_true() -> bool {
    true
}
