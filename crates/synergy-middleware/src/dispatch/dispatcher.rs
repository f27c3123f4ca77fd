//! The terminal dispatcher.
//!
//! # Resolution policy
//!
//! 1. **Cache check.** When the request allows controller caching and the
//!    cache holds a controller for the effective resource name (same schema),
//!    that controller is invoked directly. No candidate search happens.
//! 2. **Candidate enumeration.** Otherwise every registered controller whose
//!    `can_handle` accepts the request is collected, in registration order.
//!    If none exists *and* no controller declares the schema at all, the
//!    request fails with `SchemaMismatch`.
//! 3. **Reads** fan out: candidates are tried in order until one returns
//!    `Success`, which is cached and returned. Later candidates are never
//!    invoked. If none succeeds, the last `NotFound` is returned.
//! 4. **Writes** (create, update, delete) require exactly one candidate.
//!    Zero fails with `ZeroMatch`, several with `AmbiguousMatch`. The single
//!    candidate is cached and invoked once; its response is returned as is.
//!
//! # Cache identity
//!
//! The cache key is the resource name on top of the request's name stack
//! *when the request reaches the dispatcher*. A stage that rewrites the name
//! before dispatch (environment expansion, path resolution) therefore changes
//! which entry is used; a rewrite after dispatch does not. This coupling is
//! kept as is.
//!
//! A cached controller stays in use even if it is later removed from the
//! registry or would no longer match. Call [`Dispatcher::invalidate`] or
//! [`Dispatcher::clear_cache`] after changing the registry, or send the
//! request with caching disabled to force a fresh resolution.

use crate::context::PipelineContext;
use crate::dispatch::cache::{CacheConfig, ResolutionCache};
use crate::dispatch::registry::ControllerRegistry;
use crate::middleware::{BoxFuture, Endpoint};
use std::sync::Arc;
use synergy_core::{
    DispatchError, DispatchResult, Method, Request, Response, SharedController,
};
use synergy_telemetry::metrics::record_controller_invocation;
use tracing::debug;

/// Resolves the controller for a request and invokes it.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ControllerRegistry>,
    cache: ResolutionCache,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry` with the default cache.
    #[must_use]
    pub fn new(registry: Arc<ControllerRegistry>) -> Self {
        Self::with_cache_config(registry, CacheConfig::default())
    }

    /// Creates a dispatcher with a custom cache configuration.
    #[must_use]
    pub fn with_cache_config(registry: Arc<ControllerRegistry>, config: CacheConfig) -> Self {
        Self {
            registry,
            cache: ResolutionCache::new(config),
        }
    }

    /// Returns the controller registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.registry
    }

    /// Returns the resolution cache.
    #[must_use]
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Drops the cached resolution for `resource_name`.
    pub fn invalidate(&self, resource_name: &str) -> bool {
        self.cache.remove(resource_name)
    }

    /// Drops every cached resolution.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolves and invokes the controller for `request`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidMethod`] for [`Method::None`]
    /// - [`DispatchError::SchemaMismatch`] when no controller declares the schema
    /// - [`DispatchError::ZeroMatch`] / [`DispatchError::AmbiguousMatch`] for writes
    /// - [`DispatchError::Cancelled`] when the context is cancelled mid-invocation
    /// - any error returned by the invoked controller
    pub async fn dispatch(
        &self,
        ctx: &PipelineContext,
        request: &Request,
    ) -> DispatchResult<Response> {
        let method = request.method();
        if method == Method::None {
            return Err(DispatchError::invalid_method(request.resource_name(), method));
        }

        let caching = request.allow_controller_caching();
        if caching {
            if let Some(controller) = self.cache.get(request.resource_name(), request.schema()) {
                return self.invoke(ctx, &controller, request).await;
            }
        }

        let candidates = self.registry.candidates(request);
        debug!(
            request_id = %request.id(),
            method = %method,
            resource = request.resource_name(),
            schema = %request.schema(),
            filter = request.controller_filter().map(|f| f.label()),
            candidates = candidates.len(),
            "Resolving controller"
        );

        if candidates.is_empty() && !self.registry.declares_schema(request.schema()) {
            return Err(DispatchError::schema_mismatch(
                request.resource_name(),
                request.schema().clone(),
            ));
        }

        if method == Method::Read {
            self.read(ctx, request, &candidates, caching).await
        } else {
            self.write(ctx, request, &candidates, caching).await
        }
    }

    async fn read(
        &self,
        ctx: &PipelineContext,
        request: &Request,
        candidates: &[SharedController],
        caching: bool,
    ) -> DispatchResult<Response> {
        let mut response = Response::not_found(request.resource_name());

        for controller in candidates {
            debug!(
                request_id = %request.id(),
                controller = controller.name(),
                resource = request.resource_name(),
                "Trying controller"
            );
            response = self.invoke(ctx, controller, request).await?;

            if response.is_success() {
                debug!(controller = controller.name(), "Controller resolved resource");
                if caching {
                    self.cache.insert(
                        request.resource_name(),
                        request.schema(),
                        Arc::clone(controller),
                    );
                }
                return Ok(response);
            }

            debug!(controller = controller.name(), "Controller reported not found");
        }

        Ok(response)
    }

    async fn write(
        &self,
        ctx: &PipelineContext,
        request: &Request,
        candidates: &[SharedController],
        caching: bool,
    ) -> DispatchResult<Response> {
        match candidates {
            [] => Err(DispatchError::zero_match(
                request.resource_name(),
                request.schema().clone(),
                request.method(),
            )),
            [controller] => {
                if caching {
                    self.cache.insert(
                        request.resource_name(),
                        request.schema(),
                        Arc::clone(controller),
                    );
                }
                self.invoke(ctx, controller, request).await
            }
            _ => Err(DispatchError::ambiguous_match(
                request.resource_name(),
                request.method(),
                candidates.iter().map(|c| c.name().to_string()).collect(),
            )),
        }
    }

    async fn invoke(
        &self,
        ctx: &PipelineContext,
        controller: &SharedController,
        request: &Request,
    ) -> DispatchResult<Response> {
        let result = tokio::select! {
            biased;
            () = ctx.cancellation_token().cancelled() => {
                Err(DispatchError::cancelled(request.resource_name()))
            }
            result = controller.invoke(request) => result,
        };

        let outcome = match &result {
            Ok(response) => response.status().as_str(),
            Err(err) => err.kind().as_str(),
        };
        record_controller_invocation(controller.name(), request.method().as_str(), outcome);

        result
    }
}

impl Endpoint for Dispatcher {
    fn call<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move { self.dispatch(ctx, &request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synergy_core::fixtures::RecordingController;
    use synergy_core::{ControllerFilter, ErrorKind};
    use tokio_util::sync::CancellationToken;

    fn dispatcher(controllers: Vec<RecordingController>) -> Dispatcher {
        Dispatcher::new(Arc::new(controllers.into_iter().collect()))
    }

    #[tokio::test]
    async fn test_none_method_rejected_before_resolution() {
        let recorder = RecordingController::found("mem", "file");
        let dispatcher = dispatcher(vec![recorder.clone()]);

        let request = Request::new(Method::None, "file", "a");
        let err = dispatcher
            .dispatch(&PipelineContext::new(), &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMethod);
        assert_eq!(recorder.call_count(), 0);
        assert!(dispatcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_read_stops_at_first_success() {
        let first = RecordingController::not_found("mem", "file");
        let second = RecordingController::found("disk", "file");
        let third = RecordingController::found("net", "file");
        let dispatcher = dispatcher(vec![first.clone(), second.clone(), third.clone()]);

        let response = dispatcher
            .dispatch(&PipelineContext::new(), &Request::read("file", "a.txt"))
            .await
            .unwrap();

        assert_eq!(response.body().as_text(), Some("disk:a.txt"));
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 1);
        assert_eq!(third.call_count(), 0);
        assert_eq!(dispatcher.cache().peek("a.txt").as_deref(), Some("disk"));
    }

    #[tokio::test]
    async fn test_read_exhausted_is_not_found_and_uncached() {
        let dispatcher = dispatcher(vec![
            RecordingController::not_found("mem", "file"),
            RecordingController::not_found("disk", "file"),
        ]);

        let response = dispatcher
            .dispatch(&PipelineContext::new(), &Request::read("file", "a.txt"))
            .await
            .unwrap();

        assert!(!response.is_success());
        assert_eq!(response.resource_name(), "a.txt");
        assert!(dispatcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_read_with_filtered_out_candidates_is_not_found() {
        let dispatcher = dispatcher(vec![RecordingController::found("mem", "file")]);
        let request = Request::read("file", "a.txt").with_filter(ControllerFilter::by_name("disk"));

        let response = dispatcher
            .dispatch(&PipelineContext::new(), &request)
            .await
            .unwrap();
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_undeclared_schema_is_schema_mismatch() {
        let dispatcher = dispatcher(vec![RecordingController::found("mem", "memory")]);

        for request in [Request::read("sql", "t"), Request::delete("sql", "t")] {
            let err = dispatcher
                .dispatch(&PipelineContext::new(), &request)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        }
    }

    #[tokio::test]
    async fn test_write_zero_match_when_filter_rejects_all() {
        let dispatcher = dispatcher(vec![RecordingController::found("mem", "file")]);
        let request =
            Request::create("file", "x.txt", "body").with_filter(ControllerFilter::by_tag("none"));

        let err = dispatcher
            .dispatch(&PipelineContext::new(), &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZeroMatch);
        assert_eq!(err.resource_name(), Some("x.txt"));
    }

    #[tokio::test]
    async fn test_write_ambiguous_names_candidates() {
        let a = RecordingController::found("a", "file");
        let b = RecordingController::found("b", "file");
        let dispatcher = dispatcher(vec![a.clone(), b.clone()]);

        let err = dispatcher
            .dispatch(&PipelineContext::new(), &Request::create("file", "x.txt", "body"))
            .await
            .unwrap_err();

        match err {
            DispatchError::AmbiguousMatch {
                resource,
                candidates,
                ..
            } => {
                assert_eq!(resource, "x.txt");
                assert_eq!(candidates, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(a.call_count() + b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_write_not_found_returned_unmodified() {
        let only = RecordingController::not_found("disk", "file");
        let dispatcher = dispatcher(vec![only.clone()]);

        let response = dispatcher
            .dispatch(&PipelineContext::new(), &Request::delete("file", "gone.txt"))
            .await
            .unwrap();
        assert!(!response.is_success());
        assert_eq!(only.call_count(), 1);
    }

    #[tokio::test]
    async fn test_controller_error_propagates() {
        let dispatcher = dispatcher(vec![
            RecordingController::failing("bad", "file", "io"),
            RecordingController::found("good", "file"),
        ]);

        let err = dispatcher
            .dispatch(&PipelineContext::new(), &Request::read("file", "a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Controller);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_hanging_controller() {
        let dispatcher = dispatcher(vec![RecordingController::hanging("slow", "file")]);
        let token = CancellationToken::new();
        let ctx = PipelineContext::with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = dispatcher
            .dispatch(&ctx, &Request::read("file", "a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_resolution() {
        let recorder = RecordingController::found("disk", "file");
        let dispatcher = dispatcher(vec![recorder.clone()]);
        let ctx = PipelineContext::new();

        dispatcher.dispatch(&ctx, &Request::read("file", "a")).await.unwrap();
        assert!(dispatcher.invalidate("a"));
        assert!(!dispatcher.invalidate("a"));

        dispatcher.dispatch(&ctx, &Request::read("file", "a")).await.unwrap();
        assert_eq!(dispatcher.cache().stats().hits, 0);
        assert_eq!(recorder.call_count(), 2);
    }
}
