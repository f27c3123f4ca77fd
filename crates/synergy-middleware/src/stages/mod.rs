//! Pipeline stages.
//!
//! Stages are ordinary [`Middleware`](crate::Middleware) values; which ones
//! run, and in what order, is decided when the pipeline is assembled.
//!
//! ## Observation
//!
//! - [`telemetry`] - structured request logs and metrics
//! - [`validation`] - pluggable request and response validation
//! - [`recovery`] - turns "nobody could take this" failures into `NotFound`
//!
//! ## Transformation
//!
//! Request-side stages rewrite the top of the resource name or data stack
//! before delegating; response-side stages rewrite the top of the body
//! stack of successful responses. All of them only push.
//!
//! - [`env`] - `${NAME}` expansion in resource names
//! - [`path`] - relative names resolved against a base path
//! - [`text`] - text to bytes on writes, bytes to text on hinted reads
//! - [`json`] - JSON encode on writes, decode on hinted reads

pub mod env;
pub mod json;
pub mod path;
pub mod recovery;
pub mod telemetry;
pub mod text;
pub mod validation;

pub use env::EnvExpandMiddleware;
pub use json::{JsonDecodeMiddleware, JsonEncodeMiddleware, RESPONSE_TYPE_KEY};
pub use path::PathResolveMiddleware;
pub use recovery::{RecoveredError, RecoveryMiddleware};
pub use telemetry::{TelemetryMiddleware, TelemetryRecord};
pub use text::{BytesToTextMiddleware, TextToBytesMiddleware, DEFAULT_TEXT_HINT};
pub use validation::{FnValidator, RuleValidator, ValidationMiddleware, Validator};
