//! Typed configuration for Synergy pipelines.
//!
//! - TOML and JSON configuration files
//! - `.env` files and `PREFIX__SECTION__KEY` environment overrides
//! - Strict parsing (unknown fields are rejected)
//!
//! The root type is [`SynergyConfig`]:
//!
//! - [`DispatcherConfig`] - caching default, cache capacity and TTL
//! - [`TransformConfig`] - which transformation stages run
//! - [`TelemetryConfigSection`] - logging and metrics
//!
//! # Example
//!
//! ```no_run
//! use synergy_config::ConfigLoader;
//!
//! # fn main() -> Result<(), synergy_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("synergy.toml")?
//!     .with_env_prefix("SYNERGY")
//!     .load()?;
//!
//! println!("cache capacity: {}", config.dispatcher.cache_capacity);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [dispatcher]
//! allow_controller_caching = true
//! cache_capacity = 10000
//! cache_ttl_secs = 300
//!
//! [transforms]
//! expand_environment_variables = true
//! resource_root = "/srv/data"
//! text_hint_key = "as_text"
//!
//! [telemetry]
//! service_name = "resource-gateway"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9100"
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
