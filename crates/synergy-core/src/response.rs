//! Response types.

use crate::payload::Payload;
use crate::stack::ValueStack;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a dispatched request.
///
/// The set is closed: a request either found its resource or it did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// The controller served the request.
    Success,
    /// The controller has no such resource.
    NotFound,
}

impl StatusCode {
    /// Returns the snake_case status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a dispatched request.
///
/// The body is a stack so that outbound stages can layer conversions (for
/// example bytes → text) without discarding what the controller returned.
///
/// # Example
///
/// ```
/// use synergy_core::{Payload, Response, StatusCode};
///
/// let mut response = Response::success("a.txt", Payload::bytes(&b"hi"[..]));
/// response.push_body(Payload::text("hi"));
///
/// assert_eq!(response.status(), StatusCode::Success);
/// assert_eq!(response.body().as_text(), Some("hi"));
/// assert_eq!(response.body_stack().depth(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    body: ValueStack<Payload>,
    resource_name: String,
}

impl Response {
    /// Creates a response with an empty body.
    pub fn new(status: StatusCode, resource_name: impl Into<String>) -> Self {
        Self {
            status,
            body: ValueStack::new(Payload::Empty),
            resource_name: resource_name.into(),
        }
    }

    /// Creates a successful response carrying `body`.
    pub fn success(resource_name: impl Into<String>, body: impl Into<Payload>) -> Self {
        let mut response = Self::new(StatusCode::Success, resource_name);
        response.push_body(body);
        response
    }

    /// Creates a successful response without a body.
    pub fn ok(resource_name: impl Into<String>) -> Self {
        Self::new(StatusCode::Success, resource_name)
    }

    /// Creates a not-found response.
    pub fn not_found(resource_name: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, resource_name)
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns true if the status is [`StatusCode::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::Success
    }

    /// Returns the currently effective body (top of the body stack).
    #[must_use]
    pub fn body(&self) -> &Payload {
        self.body.peek()
    }

    /// Returns the full body stack.
    #[must_use]
    pub fn body_stack(&self) -> &ValueStack<Payload> {
        &self.body
    }

    /// Pushes a transformed body.
    pub fn push_body(&mut self, body: impl Into<Payload>) {
        self.body.push(body.into());
    }

    /// Returns the resource name the response concerns.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }
}
