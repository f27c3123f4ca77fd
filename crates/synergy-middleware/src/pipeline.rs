//! Ordered middleware pipeline.
//!
//! A [`Pipeline`] is assembled once from an ordered list of stages and a
//! terminal [`Endpoint`] (normally the [`Dispatcher`](crate::Dispatcher)).
//! It is immutable afterwards and can serve any number of concurrent
//! requests; each invocation walks the same stage slice with its own
//! [`PipelineContext`].
//!
//! ```text
//! Request → stage 1 → stage 2 → … → stage n → Endpoint
//!                                                 ↓
//! Result  ← stage 1 ← stage 2 ← … ← stage n ←─────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use synergy_core::{fixtures::RecordingController, Request};
//! use synergy_middleware::{ControllerRegistry, Dispatcher, Pipeline, TelemetryMiddleware};
//!
//! # tokio_test::block_on(async {
//! let registry = Arc::new(ControllerRegistry::new());
//! registry.register(RecordingController::found("mem", "memory"));
//!
//! let pipeline = Pipeline::builder()
//!     .add_stage(TelemetryMiddleware::new("docs"))
//!     .build(Dispatcher::new(registry));
//!
//! let response = pipeline.process(Request::read("memory", "greeting")).await.unwrap();
//! assert!(response.is_success());
//! assert_eq!(pipeline.stage_names(), vec!["telemetry"]);
//! # });
//! ```

use crate::context::PipelineContext;
use crate::middleware::{Endpoint, Middleware, Next};
use std::fmt;
use std::sync::Arc;
use synergy_core::{DispatchResult, Request, Response};
use tokio_util::sync::CancellationToken;

/// A type-erased middleware that can be stored in a vector.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// An immutable, ordered chain of stages ending in an endpoint.
pub struct Pipeline {
    stages: Vec<SharedMiddleware>,
    endpoint: Arc<dyn Endpoint>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request with a fresh context.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage or by the endpoint.
    pub async fn process(&self, request: Request) -> DispatchResult<Response> {
        let mut ctx = PipelineContext::new();
        self.process_with(&mut ctx, request).await
    }

    /// Processes a request that can be cancelled through `token`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`](synergy_core::DispatchError::Cancelled)
    /// once the token fires, or the first error raised by the chain.
    pub async fn process_cancellable(
        &self,
        request: Request,
        token: CancellationToken,
    ) -> DispatchResult<Response> {
        let mut ctx = PipelineContext::with_cancellation(token);
        self.process_with(&mut ctx, request).await
    }

    /// Processes a request with a caller-provided context, leaving any
    /// extensions the stages stored in it for the caller to inspect.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage or by the endpoint.
    pub async fn process_with(
        &self,
        ctx: &mut PipelineContext,
        request: Request,
    ) -> DispatchResult<Response> {
        Next::new(&self.stages, self.endpoint.as_ref())
            .run(ctx, request)
            .await
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Pipeline`].
///
/// Stages run in the order they are added.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<SharedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a stage that is shared with other pipelines.
    #[must_use]
    pub fn add_shared_stage(mut self, middleware: SharedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Appends a stage only when `enabled` is true.
    #[must_use]
    pub fn add_stage_if<M: Middleware>(self, enabled: bool, middleware: M) -> Self {
        if enabled {
            self.add_stage(middleware)
        } else {
            self
        }
    }

    /// Finishes the pipeline with `endpoint` as its terminal node.
    #[must_use]
    pub fn build<E: Endpoint>(self, endpoint: E) -> Pipeline {
        self.build_shared(Arc::new(endpoint))
    }

    /// Finishes the pipeline with a shared endpoint, so the caller can keep
    /// a handle to it (for example to clear a dispatcher's cache).
    #[must_use]
    pub fn build_shared(self, endpoint: Arc<dyn Endpoint>) -> Pipeline {
        Pipeline {
            stages: self.stages,
            endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxFuture, FnEndpoint};
    use synergy_core::{ErrorKind, Payload};

    struct Rename {
        suffix: &'static str,
    }

    impl Middleware for Rename {
        fn name(&self) -> &'static str {
            "rename"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut PipelineContext,
            mut request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, DispatchResult<Response>> {
            Box::pin(async move {
                let renamed = format!("{}{}", request.resource_name(), self.suffix);
                request.push_resource_name(renamed);
                next.run(ctx, request).await
            })
        }
    }

    fn names_endpoint() -> impl Endpoint {
        FnEndpoint::new(|request: Request| async move {
            let names: Vec<String> = request.resource_names().iter().cloned().collect();
            Ok(Response::success(
                request.resource_name(),
                Payload::text(names.join("|")),
            ))
        })
    }

    #[tokio::test]
    async fn test_stages_run_in_registration_order() {
        let pipeline = Pipeline::builder()
            .add_stage(Rename { suffix: ".a" })
            .add_stage(Rename { suffix: ".b" })
            .build(names_endpoint());

        let response = pipeline.process(Request::read("file", "x")).await.unwrap();
        assert_eq!(response.resource_name(), "x.a.b");
        assert_eq!(response.body().as_text(), Some("x.a.b|x.a|x"));
    }

    #[tokio::test]
    async fn test_add_stage_if() {
        let pipeline = Pipeline::builder()
            .add_stage_if(false, Rename { suffix: ".skipped" })
            .add_stage_if(true, Rename { suffix: ".kept" })
            .build(names_endpoint());

        assert_eq!(pipeline.stage_count(), 1);
        let response = pipeline.process(Request::read("file", "x")).await.unwrap();
        assert_eq!(response.resource_name(), "x.kept");
    }

    #[tokio::test]
    async fn test_shared_stage_in_two_pipelines() {
        let shared: SharedMiddleware = Arc::new(Rename { suffix: ".s" });
        let first = Pipeline::builder()
            .add_shared_stage(Arc::clone(&shared))
            .build(names_endpoint());
        let second = Pipeline::builder()
            .add_shared_stage(shared)
            .build(names_endpoint());

        assert_eq!(first.stage_names(), second.stage_names());
    }

    #[tokio::test]
    async fn test_process_cancellable() {
        let pipeline = Pipeline::builder().build(names_endpoint());
        let token = CancellationToken::new();
        token.cancel();

        let err = pipeline
            .process_cancellable(Request::read("file", "x"), token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.resource_name(), Some("x"));
    }
}
