//! Core middleware trait and chain cursor.
//!
//! A pipeline is an ordered slice of [`Middleware`] stages ending in an
//! [`Endpoint`]. Each stage receives the request by value together with a
//! [`Next`] cursor over the remaining stages, so stage `i` runs its "before"
//! phase before stage `i + 1` and its "after" phase after it. Not calling
//! `next.run` short-circuits the rest of the chain.
//!
//! # Example
//!
//! ```
//! use synergy_core::{DispatchResult, Request, Response};
//! use synergy_middleware::{BoxFuture, Middleware, Next, PipelineContext};
//!
//! struct Uppercase;
//!
//! impl Middleware for Uppercase {
//!     fn name(&self) -> &'static str {
//!         "uppercase"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut PipelineContext,
//!         mut request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, DispatchResult<Response>> {
//!         Box::pin(async move {
//!             let upper = request.resource_name().to_uppercase();
//!             request.push_resource_name(upper);
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use crate::context::PipelineContext;
use std::future::Future;
use synergy_core::{DispatchError, DispatchResult, Request, Response};

pub use synergy_core::BoxFuture;

/// A pipeline stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once; not calling it short-circuits.
/// - A stage only pushes onto the request name and data stacks; it never
///   pops values placed by earlier stages.
/// - An error returned by `next.run()` aborts the invocation unless the stage
///   is explicitly a recovery stage.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Processes the request, delegating to `next` for the rest of the chain.
    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>>;
}

/// The terminal node of a pipeline.
pub trait Endpoint: Send + Sync + 'static {
    /// Produces the response for a request that passed every stage.
    fn call<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
    ) -> BoxFuture<'a, DispatchResult<Response>>;
}

/// Cursor over the remaining stages of a pipeline.
///
/// Consumed by [`Next::run`], so each stage can delegate at most once.
pub struct Next<'a> {
    stages: &'a [std::sync::Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Creates a cursor at the start of `stages`.
    pub fn new(stages: &'a [std::sync::Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self { stages, endpoint }
    }

    /// Returns the number of stages left before the endpoint.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    /// Invokes the next stage, or the endpoint when none remain.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] without entering the next stage
    /// if the context has been cancelled, and otherwise whatever the rest of
    /// the chain returns.
    pub async fn run(self, ctx: &mut PipelineContext, request: Request) -> DispatchResult<Response> {
        if ctx.is_cancelled() {
            return Err(DispatchError::cancelled(request.resource_name()));
        }

        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    endpoint: self.endpoint,
                };
                stage.process(ctx, request, next).await
            }
            None => self.endpoint.call(ctx, request).await,
        }
    }
}

/// An endpoint built from a closure. Useful for tests and adapters.
///
/// ```
/// use synergy_core::{Request, Response};
/// use synergy_middleware::FnEndpoint;
///
/// let endpoint = FnEndpoint::new(|request: Request| async move {
///     Ok(Response::not_found(request.resource_name()))
/// });
/// ```
pub struct FnEndpoint<F> {
    func: F,
}

impl<F> FnEndpoint<F> {
    /// Wraps `func` as an endpoint.
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Request) -> Fut,
        Fut: Future<Output = DispatchResult<Response>>,
    {
        Self { func }
    }
}

impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Response>> + Send + 'static,
{
    fn call<'a>(
        &'a self,
        _ctx: &'a mut PipelineContext,
        request: Request,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin((self.func)(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synergy_core::{ErrorKind, Payload};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Trail(Vec<String>);

    struct Recording {
        name: &'static str,
    }

    impl Middleware for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut PipelineContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, DispatchResult<Response>> {
            Box::pin(async move {
                push_trail(ctx, format!("before:{}", self.name));
                let result = next.run(ctx, request).await;
                push_trail(ctx, format!("after:{}", self.name));
                result
            })
        }
    }

    fn push_trail(ctx: &mut PipelineContext, entry: String) {
        if !ctx.has_extension::<Trail>() {
            ctx.set_extension(Trail::default());
        }
        if let Some(trail) = ctx.get_extension_mut::<Trail>() {
            trail.0.push(entry);
        }
    }

    fn echo() -> impl Endpoint {
        FnEndpoint::new(|request: Request| async move {
            let name = request.resource_name().to_string();
            Ok(Response::success(name.clone(), Payload::text(name)))
        })
    }

    #[tokio::test]
    async fn test_stack_discipline() {
        let stages: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Recording { name: "a" }),
            Arc::new(Recording { name: "b" }),
            Arc::new(Recording { name: "c" }),
        ];
        let endpoint = echo();
        let mut ctx = PipelineContext::new();

        let next = Next::new(&stages, &endpoint);
        assert_eq!(next.remaining(), 3);
        let response = next.run(&mut ctx, Request::read("file", "x")).await.unwrap();
        assert!(response.is_success());

        let trail = ctx.get_extension::<Trail>().unwrap();
        assert_eq!(
            trail.0,
            vec!["before:a", "before:b", "before:c", "after:c", "after:b", "after:a"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        struct Stop;

        impl Middleware for Stop {
            fn name(&self) -> &'static str {
                "stop"
            }

            fn process<'a>(
                &'a self,
                _ctx: &'a mut PipelineContext,
                request: Request,
                _next: Next<'a>,
            ) -> BoxFuture<'a, DispatchResult<Response>> {
                Box::pin(async move { Ok(Response::not_found(request.resource_name())) })
            }
        }

        let stages: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(Stop), Arc::new(Recording { name: "never" })];
        let endpoint = echo();
        let mut ctx = PipelineContext::new();

        let response = Next::new(&stages, &endpoint)
            .run(&mut ctx, Request::read("file", "x"))
            .await
            .unwrap();
        assert!(!response.is_success());
        assert!(!ctx.has_extension::<Trail>());
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_chain() {
        let stages: Vec<Arc<dyn Middleware>> = vec![Arc::new(Recording { name: "a" })];
        let endpoint = echo();
        let token = CancellationToken::new();
        token.cancel();
        let mut ctx = PipelineContext::with_cancellation(token);

        let err = Next::new(&stages, &endpoint)
            .run(&mut ctx, Request::read("file", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(!ctx.has_extension::<Trail>());
    }
}
