//! # Synergy
//!
//! **Pipeline-based CRUD resource dispatcher**
//!
//! Synergy routes `Create`/`Read`/`Update`/`Delete` requests for named
//! resources through an ordered chain of middleware stages to one of many
//! registered controllers:
//!
//! - **Two-phase stages**: each stage may rewrite the request on the way in
//!   and the result on the way out
//! - **Fan-out reads**: a read tries candidates in registration order until
//!   one reports success
//! - **Exact writes**: a write needs exactly one candidate controller
//! - **Sticky resolution**: the controller that served a name is cached and
//!   reused without searching again
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use synergy::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("SYNERGY").load()?;
//!     synergy::init_telemetry(&config)?;
//!
//!     let registry = Arc::new(ControllerRegistry::new());
//!     registry.register(MemoryController::new("cache"));
//!     registry.register(FileController::new("disk", "/srv/data"));
//!
//!     let assembly = synergy::assemble(&config, registry);
//!     let defaults = synergy::request_defaults(&config);
//!
//!     let response = assembly
//!         .pipeline
//!         .process(defaults.apply(Request::read("file", "a.txt")))
//!         .await?;
//!     println!("{:?}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Telemetry → EnvExpand → PathResolve → Codecs → Dispatcher → Controller
//!                                                              ↓
//! Result  ← Telemetry ← EnvExpand ← PathResolve ← Codecs ←─────┘
//! ```

#![doc(html_root_url = "https://docs.rs/synergy/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assembly;

pub use assembly::{
    assemble, assemble_with, init_telemetry, request_defaults, Assembly, RequestDefaults,
};

// Re-export core types
pub use synergy_core as core;

// Re-export pipeline and dispatcher types
pub use synergy_middleware as middleware;

// Re-export configuration types
pub use synergy_config as config;

// Re-export telemetry types
pub use synergy_telemetry as telemetry;

// Re-export reference controllers
pub use synergy_controllers as controllers;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use synergy::prelude::*;
/// ```
pub mod prelude {
    pub use synergy_core::{
        Controller, ControllerFilter, DispatchError, DispatchResult, ErrorKind, Method, Payload,
        Request, Response, Schema, StatusCode,
    };

    pub use synergy_middleware::{
        ControllerRegistry, Dispatcher, Middleware, Next, Pipeline, PipelineContext,
    };

    // Stages
    pub use synergy_middleware::{
        RecoveryMiddleware, RuleValidator, TelemetryMiddleware, ValidationMiddleware,
    };

    pub use synergy_config::{ConfigLoader, SynergyConfig};

    pub use synergy_controllers::{FileController, MemoryController};

    pub use crate::{assemble, request_defaults, Assembly};
}
