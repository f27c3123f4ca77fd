//! Main configuration types.
//!
//! This module provides the top-level [`SynergyConfig`] struct and its builder.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ConfigError, DispatcherConfig, LogFormat, TelemetryConfigSection, TransformConfig};

/// Complete Synergy configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use synergy_config::SynergyConfig;
///
/// let config = SynergyConfig::default();
/// assert!(config.dispatcher.allow_controller_caching);
/// assert!(config.transforms.expand_environment_variables);
/// assert_eq!(config.telemetry.service_name, "synergy");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SynergyConfig {
    /// Dispatcher and resolution cache.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Transformation stages.
    #[serde(default)]
    pub transforms: TransformConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl SynergyConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> SynergyConfigBuilder {
        SynergyConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the cache TTL is zero
    /// - the service name, log level or text hint key is empty
    /// - the resource root is set but empty
    /// - metrics are enabled with an unparsable scrape address
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.cache_ttl_secs == Some(0) {
            return Err(ConfigError::invalid_value(
                "dispatcher.cache_ttl_secs",
                "must be greater than zero when set",
            ));
        }

        if self.transforms.text_hint_key.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "transforms.text_hint_key",
                "must not be empty",
            ));
        }

        if self
            .transforms
            .resource_root
            .as_deref()
            .is_some_and(|root| root.trim().is_empty())
        {
            return Err(ConfigError::invalid_value(
                "transforms.resource_root",
                "must not be empty when set",
            ));
        }

        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        if self.telemetry.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                "must not be empty",
            ));
        }

        if self.telemetry.metrics.enabled {
            if let Some(addr) = &self.telemetry.metrics.addr {
                if addr.parse::<std::net::SocketAddr>().is_err() {
                    return Err(ConfigError::invalid_value(
                        "telemetry.metrics.addr",
                        format!("invalid socket address: {addr}"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the cache TTL as a duration.
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.dispatcher.cache_ttl_secs.map(Duration::from_secs)
    }

    /// Converts the telemetry section into the telemetry crate's configuration.
    ///
    /// ```
    /// use synergy_config::SynergyConfig;
    ///
    /// let telemetry = SynergyConfig::development().telemetry_config();
    /// assert!(!telemetry.logging.json_format);
    /// assert_eq!(telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn telemetry_config(&self) -> synergy_telemetry::TelemetryConfig {
        let section = &self.telemetry;
        let mut logging = match section.logging.format {
            LogFormat::Json => synergy_telemetry::LogConfig::production(),
            LogFormat::Pretty => synergy_telemetry::LogConfig::development(),
        };
        logging.enabled = section.logging.enabled;
        logging.level.clone_from(&section.logging.level);

        synergy_telemetry::TelemetryConfig {
            service_name: section.service_name.clone(),
            metrics: synergy_telemetry::MetricsConfig {
                enabled: section.metrics.enabled,
                addr: section.metrics.addr.clone(),
            },
            logging,
        }
    }

    /// Development preset: pretty debug logs.
    ///
    /// ```
    /// use synergy_config::{LogFormat, SynergyConfig};
    ///
    /// let config = SynergyConfig::development();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config
    }

    /// Production preset: JSON info logs and metrics on.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.metrics.enabled = true;
        config
    }
}

/// Builder for [`SynergyConfig`].
#[derive(Debug, Default)]
pub struct SynergyConfigBuilder {
    dispatcher: Option<DispatcherConfig>,
    transforms: Option<TransformConfig>,
    telemetry: Option<TelemetryConfigSection>,
}

impl SynergyConfigBuilder {
    /// Creates a builder with every section unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispatcher section.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: DispatcherConfig) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Sets the transforms section.
    #[must_use]
    pub fn transforms(mut self, transforms: TransformConfig) -> Self {
        self.transforms = Some(transforms);
        self
    }

    /// Sets the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfigSection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> SynergyConfig {
        SynergyConfig {
            dispatcher: self.dispatcher.unwrap_or_default(),
            transforms: self.transforms.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }
}
