//! Telemetry emission stage.
//!
//! Emits a structured "request started" record on entry and a "request
//! completed" or "request faulted" record on exit, records the standard
//! request metrics, and leaves a [`TelemetryRecord`] in the context for
//! callers that want to inspect the outcome.
//!
//! If the invocation is dropped before it finishes (for example because the
//! caller stopped polling it), a guard still logs that the request was
//! abandoned. Logging and metrics are best-effort and never change the
//! result returned to the caller.
//!
//! # Log fields
//!
//! - `request_id`, `method`, `resource`, `schema`
//! - `filter` - label of the controller filter, if any
//! - `items` - the request property bag as a JSON object, keys sorted
//! - `status` or `error_kind`, `duration_ms`

use crate::context::PipelineContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use synergy_core::{DispatchResult, Method, Request, RequestId, Response};
use synergy_telemetry::metrics::{record_request, InFlightGuard};
use tracing::{info, info_span, warn, Instrument};

/// Telemetry middleware that logs and measures every request.
#[derive(Debug, Clone)]
pub struct TelemetryMiddleware {
    service_name: String,
}

/// What the telemetry stage observed about one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// The service name.
    pub service_name: String,
    /// The request ID.
    pub request_id: RequestId,
    /// The request method.
    pub method: Method,
    /// The resource name as it entered this stage.
    pub resource: String,
    /// The request schema.
    pub schema: String,
    /// Label of the controller filter, if any.
    pub filter: Option<String>,
    /// The request property bag, sorted by key.
    pub items: BTreeMap<String, serde_json::Value>,
    /// Response status, or the error kind on failure.
    pub outcome: String,
    /// Time spent in the rest of the chain.
    pub duration: Duration,
}

impl TelemetryMiddleware {
    /// Creates a telemetry stage labelled with `service_name`.
    #[must_use]
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
        }
    }
}

/// Logs an abandoned request if dropped before [`CompletionGuard::complete`].
struct CompletionGuard {
    request_id: RequestId,
    resource: String,
    completed: bool,
}

impl CompletionGuard {
    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.completed {
            warn!(
                request_id = %self.request_id,
                resource = %self.resource,
                "Request abandoned before completion"
            );
        }
    }
}

impl Middleware for TelemetryMiddleware {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let started = Instant::now();
            let request_id = request.id();
            let method = request.method();
            let resource = request.resource_name().to_string();
            let schema = request.schema().to_string();
            let filter = request.controller_filter().map(|f| f.label().to_string());
            let items: BTreeMap<String, serde_json::Value> = request
                .items()
                .keys()
                .filter_map(|key| {
                    let value = request.items().get(key)?;
                    Some((key.to_string(), value.clone()))
                })
                .collect();
            let items_json = serde_json::to_string(&items).unwrap_or_default();

            let span = info_span!(
                "synergy.request",
                service = %self.service_name,
                request_id = %request_id,
                method = %method,
            );

            info!(
                parent: &span,
                resource = %resource,
                schema = %schema,
                filter = filter.as_deref(),
                items = %items_json,
                "Request started"
            );

            let _in_flight = InFlightGuard::new();
            let mut guard = CompletionGuard {
                request_id,
                resource: resource.clone(),
                completed: false,
            };

            let result = next.run(ctx, request).instrument(span.clone()).await;
            guard.complete();

            let duration = started.elapsed();
            let duration_ms = duration.as_secs_f64() * 1000.0;
            let outcome = match &result {
                Ok(response) => {
                    info!(
                        parent: &span,
                        status = %response.status(),
                        duration_ms,
                        "Request completed"
                    );
                    response.status().as_str()
                }
                Err(err) => {
                    warn!(
                        parent: &span,
                        error_kind = %err.kind(),
                        error = %err,
                        duration_ms,
                        "Request faulted"
                    );
                    err.kind().as_str()
                }
            };

            record_request(method.as_str(), outcome, duration);
            ctx.set_extension(TelemetryRecord {
                service_name: self.service_name.clone(),
                request_id,
                method,
                resource,
                schema,
                filter,
                items,
                outcome: outcome.to_string(),
                duration,
            });

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnEndpoint;
    use crate::pipeline::Pipeline;
    use synergy_core::{ControllerFilter, DispatchError, Payload};

    #[tokio::test]
    async fn test_records_success() {
        let pipeline = Pipeline::builder()
            .add_stage(TelemetryMiddleware::new("svc"))
            .build(FnEndpoint::new(|request: Request| async move {
                Ok(Response::success(request.resource_name(), Payload::text("ok")))
            }));

        let request = Request::read("File", "a.txt")
            .with_item("response_type", "json")
            .with_item("as_text", true)
            .with_filter(ControllerFilter::by_name("disk"));

        let mut ctx = PipelineContext::new();
        pipeline.process_with(&mut ctx, request).await.unwrap();

        let record = ctx.get_extension::<TelemetryRecord>().unwrap();
        assert_eq!(record.service_name, "svc");
        assert_eq!(record.method, Method::Read);
        assert_eq!(record.resource, "a.txt");
        assert_eq!(record.schema, "file");
        assert_eq!(record.filter.as_deref(), Some("name=disk"));
        assert_eq!(
            serde_json::to_string(&record.items).unwrap(),
            r#"{"as_text":true,"response_type":"json"}"#
        );
        assert_eq!(record.outcome, "success");
    }

    #[tokio::test]
    async fn test_records_fault_and_preserves_error() {
        let pipeline = Pipeline::builder()
            .add_stage(TelemetryMiddleware::new("svc"))
            .build(FnEndpoint::new(|request: Request| async move {
                Err(DispatchError::zero_match(
                    request.resource_name(),
                    request.schema().clone(),
                    request.method(),
                ))
            }));

        let mut ctx = PipelineContext::new();
        let err = pipeline
            .process_with(&mut ctx, Request::delete("file", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ZeroMatch { .. }));
        let record = ctx.get_extension::<TelemetryRecord>().unwrap();
        assert_eq!(record.outcome, "zero_match");
    }
}
