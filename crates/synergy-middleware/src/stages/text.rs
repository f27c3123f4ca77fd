//! Text and byte-stream coercion stages.
//!
//! [`TextToBytesMiddleware`] turns a text payload on a create or update
//! request into UTF-8 bytes before it reaches the controller.
//! [`BytesToTextMiddleware`] turns the byte body of a successful read back
//! into text when the request asks for it through an item hint.
//!
//! Both only ever push onto the payload stacks.

use crate::context::PipelineContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use bytes::Bytes;
use synergy_core::{DispatchError, DispatchResult, Method, Payload, Request, Response};

/// Default items key for the "read as text" hint.
pub const DEFAULT_TEXT_HINT: &str = "as_text";

/// Pushes UTF-8 bytes for a text payload on create and update requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextToBytesMiddleware;

impl TextToBytesMiddleware {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for TextToBytesMiddleware {
    fn name(&self) -> &'static str {
        "text_to_bytes"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            if matches!(request.method(), Method::Create | Method::Update) {
                if let Some(text) = request.data().as_text() {
                    let bytes = Bytes::copy_from_slice(text.as_bytes());
                    request.push_data(Payload::Bytes(bytes));
                }
            }
            next.run(ctx, request).await
        })
    }
}

/// Pushes a text body for byte responses to reads that carry the text hint.
#[derive(Debug, Clone)]
pub struct BytesToTextMiddleware {
    hint_key: String,
}

impl Default for BytesToTextMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl BytesToTextMiddleware {
    /// Creates the stage with the default hint key.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hint_key(DEFAULT_TEXT_HINT)
    }

    /// Creates the stage listening for `key` in the request items.
    #[must_use]
    pub fn with_hint_key(key: impl Into<String>) -> Self {
        Self {
            hint_key: key.into(),
        }
    }

    /// Returns the hint key.
    #[must_use]
    pub fn hint_key(&self) -> &str {
        &self.hint_key
    }
}

impl Middleware for BytesToTextMiddleware {
    fn name(&self) -> &'static str {
        "bytes_to_text"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let wants_text =
                request.method() == Method::Read && request.items().flag(&self.hint_key);
            let mut response = next.run(ctx, request).await?;

            if wants_text && response.is_success() {
                if let Some(bytes) = response.body().as_bytes() {
                    let text = std::str::from_utf8(bytes)
                        .map_err(|err| {
                            DispatchError::transform(
                                "bytes_to_text",
                                response.resource_name(),
                                format!("body is not valid UTF-8: {err}"),
                            )
                        })?
                        .to_string();
                    response.push_body(Payload::Text(text));
                }
            }

            Ok(response)
        })
    }
}
