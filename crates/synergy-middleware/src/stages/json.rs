//! JSON codec stages.
//!
//! [`JsonEncodeMiddleware`] serializes a JSON document on a create or update
//! request to text. [`JsonDecodeMiddleware`] parses the text or byte body of
//! a successful read into a JSON document when the request carries
//! `response_type = "json"` in its items.

use crate::context::PipelineContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use synergy_core::{DispatchError, DispatchResult, Method, Payload, Request, Response};

/// Items key selecting the response representation.
pub const RESPONSE_TYPE_KEY: &str = "response_type";

/// Serializes JSON request payloads to text.
#[derive(Debug, Clone, Default)]
pub struct JsonEncodeMiddleware {
    pretty: bool,
}

impl JsonEncodeMiddleware {
    /// Creates the stage producing compact JSON.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces indented JSON instead.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Middleware for JsonEncodeMiddleware {
    fn name(&self) -> &'static str {
        "json_encode"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            if matches!(request.method(), Method::Create | Method::Update) {
                if let Some(value) = request.data().as_json() {
                    let encoded = if self.pretty {
                        serde_json::to_string_pretty(value)
                    } else {
                        serde_json::to_string(value)
                    }
                    .map_err(|err| {
                        DispatchError::transform(
                            "json_encode",
                            request.resource_name(),
                            err.to_string(),
                        )
                    })?;
                    request.push_data(Payload::Text(encoded));
                }
            }
            next.run(ctx, request).await
        })
    }
}

/// Parses read responses into JSON documents on request.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecodeMiddleware;

impl JsonDecodeMiddleware {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn wants_json(request: &Request) -> bool {
    request.method() == Method::Read
        && request
            .items()
            .get_str(RESPONSE_TYPE_KEY)
            .is_some_and(|kind| kind.eq_ignore_ascii_case("json"))
}

impl Middleware for JsonDecodeMiddleware {
    fn name(&self) -> &'static str {
        "json_decode"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let decode = wants_json(&request);
            let mut response = next.run(ctx, request).await?;
            if !decode || !response.is_success() {
                return Ok(response);
            }

            let parsed = match response.body() {
                Payload::Text(text) => Some(serde_json::from_str(text)),
                Payload::Bytes(bytes) => Some(serde_json::from_slice(bytes)),
                _ => None,
            };

            if let Some(parsed) = parsed {
                let value: serde_json::Value = parsed.map_err(|err| {
                    DispatchError::transform(
                        "json_decode",
                        response.resource_name(),
                        format!("body is not valid JSON: {err}"),
                    )
                })?;
                response.push_body(Payload::Json(value));
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnEndpoint;
    use crate::pipeline::Pipeline;
    use serde_json::json;
    use synergy_core::{ErrorKind, StatusCode};

    fn echo_data() -> Pipeline {
        Pipeline::builder()
            .add_stage(JsonEncodeMiddleware::new())
            .build(FnEndpoint::new(|request: Request| async move {
                Ok(Response::success(
                    request.resource_name(),
                    request.data().clone(),
                ))
            }))
    }

    fn responding(body: Payload, status: StatusCode) -> Pipeline {
        Pipeline::builder()
            .add_stage(JsonDecodeMiddleware::new())
            .build(FnEndpoint::new(move |request: Request| {
                let body = body.clone();
                async move {
                    Ok(match status {
                        StatusCode::Success => Response::success(request.resource_name(), body),
                        StatusCode::NotFound => Response::not_found(request.resource_name()),
                    })
                }
            }))
    }

    #[tokio::test]
    async fn test_encode_on_create() {
        let response = echo_data()
            .process(Request::create("file", "a.json", json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(response.body().as_text(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_encode_leaves_text_alone() {
        let response = echo_data()
            .process(Request::update("file", "a.txt", "plain"))
            .await
            .unwrap();
        assert_eq!(response.body().as_text(), Some("plain"));
    }

    #[tokio::test]
    async fn test_decode_text_and_bytes() {
        let request = || Request::read("file", "a.json").with_item(RESPONSE_TYPE_KEY, "json");

        let text = responding(Payload::text(r#"{"k":"v"}"#), StatusCode::Success);
        let response = text.process(request()).await.unwrap();
        assert_eq!(response.body().as_json(), Some(&json!({"k": "v"})));

        let bytes = responding(Payload::bytes(&b"[1,2]"[..]), StatusCode::Success);
        let response = bytes.process(request()).await.unwrap();
        assert_eq!(response.body().as_json(), Some(&json!([1, 2])));
        assert!(response.body_stack().iter().any(|p| p.as_bytes().is_some()));
    }

    #[tokio::test]
    async fn test_decode_requires_hint_and_success() {
        let pipeline = responding(Payload::text("{}"), StatusCode::Success);
        let response = pipeline.process(Request::read("file", "a")).await.unwrap();
        assert_eq!(response.body().as_text(), Some("{}"));

        let missing = responding(Payload::text("{}"), StatusCode::NotFound);
        let response = missing
            .process(Request::read("file", "a").with_item(RESPONSE_TYPE_KEY, "json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure_is_transform_error() {
        let pipeline = responding(Payload::text("not json"), StatusCode::Success);
        let err = pipeline
            .process(Request::read("file", "a").with_item(RESPONSE_TYPE_KEY, "JSON"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transform);
    }
}
