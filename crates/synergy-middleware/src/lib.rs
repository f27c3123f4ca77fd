//! # Synergy Middleware
//!
//! The request pipeline and the controller dispatcher for Synergy.
//!
//! A request enters the head of a [`Pipeline`], passes through each stage in
//! order, and reaches the terminal [`Dispatcher`], which resolves a
//! controller from the [`ControllerRegistry`] and invokes it. The result then
//! unwinds back through the same stages in reverse.
//!
//! ```text
//! Request → Telemetry → EnvExpand → PathResolve → JsonEncode → TextToBytes → Dispatcher
//!                                                                               ↓
//! Result  ← Telemetry ← EnvExpand ← PathResolve ← JsonDecode ← BytesToText ←────┘
//! ```
//!
//! ## Resolution policy
//!
//! | Method               | Candidates | Outcome                                   |
//! |----------------------|------------|-------------------------------------------|
//! | Read                 | 0..n       | first `Success` in registry order, else `NotFound` |
//! | Create/Update/Delete | exactly 1  | that controller's result                  |
//! | Create/Update/Delete | 0          | `ZeroMatch`                               |
//! | Create/Update/Delete | 2..n       | `AmbiguousMatch`                          |
//! | any                  | schema undeclared | `SchemaMismatch`                   |
//!
//! Successful resolutions are remembered in a per-dispatcher
//! [`ResolutionCache`] keyed by the effective resource name.
//!
//! ## Cancellation
//!
//! Every invocation carries a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! in its [`PipelineContext`]. Cancelling it fails the request with
//! `DispatchError::Cancelled` at the next stage boundary or while a
//! controller is running.

#![doc(html_root_url = "https://docs.rs/synergy-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod dispatch;
pub mod middleware;
pub mod pipeline;
pub mod stages;

// Re-export main types at crate root
pub use context::PipelineContext;
pub use dispatch::{CacheConfig, CacheStats, ControllerRegistry, Dispatcher, ResolutionCache};
pub use middleware::{BoxFuture, Endpoint, FnEndpoint, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, SharedMiddleware};
pub use stages::{
    BytesToTextMiddleware, EnvExpandMiddleware, FnValidator, JsonDecodeMiddleware,
    JsonEncodeMiddleware, PathResolveMiddleware, RecoveryMiddleware, RuleValidator,
    TelemetryMiddleware, TextToBytesMiddleware, ValidationMiddleware, Validator,
};
