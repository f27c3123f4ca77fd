//! Error recovery stage.
//!
//! Converts selected dispatch failures into ordinary `NotFound` responses so
//! that callers probing for optional resources do not have to match on error
//! kinds. By default only "nobody could take this" failures are recovered:
//! [`ErrorKind::ZeroMatch`] and [`ErrorKind::SchemaMismatch`].
//!
//! Cancellation is never recovered, even if it is listed.
//!
//! ```
//! use synergy_core::ErrorKind;
//! use synergy_middleware::stages::RecoveryMiddleware;
//!
//! let recovery = RecoveryMiddleware::new().recover(ErrorKind::OperationNotSupported);
//! assert!(recovery.recovers(ErrorKind::ZeroMatch));
//! assert!(!recovery.recovers(ErrorKind::Cancelled));
//! ```

use crate::context::PipelineContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use synergy_core::{DispatchResult, ErrorKind, Request, Response};
use tracing::warn;

/// Recovery middleware.
#[derive(Debug, Clone)]
pub struct RecoveryMiddleware {
    kinds: Vec<ErrorKind>,
}

/// Details of an error turned into a `NotFound` response, stored in the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredError {
    /// Kind of the recovered error.
    pub kind: ErrorKind,
    /// Its message.
    pub message: String,
}

impl Default for RecoveryMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryMiddleware {
    /// Recovers zero-match and schema-mismatch failures.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: vec![ErrorKind::ZeroMatch, ErrorKind::SchemaMismatch],
        }
    }

    /// Recovers nothing until kinds are added with [`recover`](Self::recover).
    #[must_use]
    pub fn none() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Adds a recoverable error kind.
    #[must_use]
    pub fn recover(mut self, kind: ErrorKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    /// Returns true if errors of `kind` become `NotFound` responses.
    #[must_use]
    pub fn recovers(&self, kind: ErrorKind) -> bool {
        kind != ErrorKind::Cancelled && self.kinds.contains(&kind)
    }
}

impl Middleware for RecoveryMiddleware {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let resource = request.resource_name().to_string();
            match next.run(ctx, request).await {
                Err(err) if self.recovers(err.kind()) => {
                    warn!(
                        resource = %resource,
                        error_kind = %err.kind(),
                        error = %err,
                        "Dispatch failure recovered as not found"
                    );
                    ctx.set_extension(RecoveredError {
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                    Ok(Response::not_found(resource))
                }
                other => other,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnEndpoint;
    use crate::pipeline::Pipeline;
    use synergy_core::{DispatchError, Method, Schema, StatusCode};
    use tokio_util::sync::CancellationToken;

    fn failing_with(kind: ErrorKind) -> Pipeline {
        Pipeline::builder()
            .add_stage(RecoveryMiddleware::new())
            .build(FnEndpoint::new(move |request: Request| async move {
                let resource = request.resource_name().to_string();
                Err(match kind {
                    ErrorKind::ZeroMatch => {
                        DispatchError::zero_match(resource, Schema::new("file"), Method::Update)
                    }
                    ErrorKind::SchemaMismatch => {
                        DispatchError::schema_mismatch(resource, Schema::new("sql"))
                    }
                    _ => DispatchError::controller("disk", resource, "boom"),
                })
            }))
    }

    #[tokio::test]
    async fn test_zero_match_becomes_not_found() {
        let pipeline = failing_with(ErrorKind::ZeroMatch);
        let mut ctx = PipelineContext::new();
        let response = pipeline
            .process_with(&mut ctx, Request::update("file", "a.txt", "x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(response.resource_name(), "a.txt");
        let recovered = ctx.get_extension::<RecoveredError>().unwrap();
        assert_eq!(recovered.kind, ErrorKind::ZeroMatch);
    }

    #[tokio::test]
    async fn test_schema_mismatch_becomes_not_found() {
        let pipeline = failing_with(ErrorKind::SchemaMismatch);
        let response = pipeline.process(Request::read("sql", "t")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let pipeline = failing_with(ErrorKind::Controller);
        let err = pipeline.process(Request::read("file", "a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Controller);
    }

    #[tokio::test]
    async fn test_cancellation_is_never_recovered() {
        let pipeline = Pipeline::builder()
            .add_stage(RecoveryMiddleware::new().recover(ErrorKind::Cancelled))
            .build(FnEndpoint::new(|_request: Request| async move {
                Ok(Response::ok("unreachable"))
            }));

        let token = CancellationToken::new();
        token.cancel();
        let err = pipeline
            .process_cancellable(Request::read("file", "a"), token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
