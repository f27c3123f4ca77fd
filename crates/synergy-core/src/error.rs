//! Error types for Synergy.
//!
//! [`DispatchError`] is the single error type that flows out of a pipeline
//! invocation. Every variant carries the resource name it concerns (when one
//! exists) so that a failure can be diagnosed from the error alone.
//!
//! `NotFound` is deliberately absent: a read that finds nothing is a normal
//! [`Response`](crate::Response), not an error.
//!
//! | Kind | Raised by | Meaning |
//! |------|-----------|---------|
//! | `SchemaMismatch` | dispatcher | no registered controller declares the schema |
//! | `ZeroMatch` | dispatcher | write with no candidate after filtering |
//! | `AmbiguousMatch` | dispatcher | write with more than one candidate |
//! | `OperationNotSupported` | controller | method not implemented |
//! | `InvalidRequestShape` | controller | payload of unexpected type |
//! | `InvalidMethod` | dispatcher | `Method::None` reached dispatch |
//! | `ValidationFailed` | validation stage | validator rejected request/response |
//! | `Cancelled` | chain, dispatcher | ambient cancellation observed |
//! | `Controller` | controller | opaque backend failure |
//! | `Transform` | transformation stage | body/name conversion failed |

use crate::request::Method;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`DispatchError`].
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Machine-readable classification of a [`DispatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No controller declares the request schema.
    SchemaMismatch,
    /// Write request matched no controller.
    ZeroMatch,
    /// Write request matched more than one controller.
    AmbiguousMatch,
    /// Controller does not implement the requested method.
    OperationNotSupported,
    /// Controller received an unexpected payload type.
    InvalidRequestShape,
    /// Request method cannot be dispatched.
    InvalidMethod,
    /// A validator rejected the request or response.
    ValidationFailed,
    /// The request was cancelled.
    Cancelled,
    /// The controller failed while serving the request.
    Controller,
    /// A transformation stage failed.
    Transform,
}

impl ErrorKind {
    /// Returns the snake_case name used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaMismatch => "schema_mismatch",
            Self::ZeroMatch => "zero_match",
            Self::AmbiguousMatch => "ambiguous_match",
            Self::OperationNotSupported => "operation_not_supported",
            Self::InvalidRequestShape => "invalid_request_shape",
            Self::InvalidMethod => "invalid_method",
            Self::ValidationFailed => "validation_failed",
            Self::Cancelled => "cancelled",
            Self::Controller => "controller",
            Self::Transform => "transform",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the pipeline a validator rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSide {
    /// The request, before delegation.
    Request,
    /// The response, after delegation returned.
    Response,
}

impl fmt::Display for ValidationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Standard error type for request dispatch.
///
/// # Example
///
/// ```
/// use synergy_core::{DispatchError, ErrorKind, Method, Schema};
///
/// let err = DispatchError::ambiguous_match(
///     "x.txt",
///     Method::Create,
///     vec!["a".to_string(), "b".to_string()],
/// );
/// assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);
/// assert_eq!(err.resource_name(), Some("x.txt"));
/// assert!(err.to_string().contains("x.txt"));
/// ```
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No registered controller declares the request schema at all.
    #[error("no controller declares schema '{schema}' (resource '{resource}')")]
    SchemaMismatch {
        /// The requested resource name.
        resource: String,
        /// The schema nobody serves.
        schema: Schema,
    },

    /// A write request found no controller after filtering.
    #[error("no controller found for {method} of resource '{resource}' with schema '{schema}'")]
    ZeroMatch {
        /// The requested resource name.
        resource: String,
        /// The requested schema.
        schema: Schema,
        /// The write method.
        method: Method,
    },

    /// A write request matched more than one controller.
    #[error("ambiguous controller resolution for {method} of resource '{resource}': candidates {candidates:?}")]
    AmbiguousMatch {
        /// The requested resource name.
        resource: String,
        /// The write method.
        method: Method,
        /// Names of all matching controllers, in registration order.
        candidates: Vec<String>,
    },

    /// The matched controller does not implement the requested method.
    #[error("controller '{controller}' ({controller_type}) does not support {method}")]
    OperationNotSupported {
        /// Controller name.
        controller: String,
        /// Controller type name.
        controller_type: &'static str,
        /// The attempted method.
        method: Method,
    },

    /// The controller received a payload it cannot interpret.
    #[error("controller '{controller}' cannot use {found} payload for '{resource}' (expected {expected})")]
    InvalidRequestShape {
        /// Controller name.
        controller: String,
        /// The requested resource name.
        resource: String,
        /// Description of the accepted payload shapes.
        expected: String,
        /// The payload kind actually received.
        found: String,
    },

    /// The request method cannot be dispatched.
    #[error("method {method} cannot be dispatched (resource '{resource}')")]
    InvalidMethod {
        /// The requested resource name.
        resource: String,
        /// The offending method.
        method: Method,
    },

    /// A validator rejected the request or the response.
    #[error("{side} validation failed for '{resource}': {source}")]
    ValidationFailed {
        /// The requested resource name.
        resource: String,
        /// Which side failed.
        side: ValidationSide,
        /// The validator's error.
        #[source]
        source: anyhow::Error,
    },

    /// The request was cancelled through its ambient token.
    #[error("request for '{resource}' was cancelled")]
    Cancelled {
        /// The requested resource name.
        resource: String,
    },

    /// The controller failed while serving the request.
    #[error("controller '{controller}' failed on '{resource}': {message}")]
    Controller {
        /// Controller name.
        controller: String,
        /// The requested resource name.
        resource: String,
        /// Human-readable message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A transformation stage could not convert the payload or name.
    #[error("stage '{stage}' failed on '{resource}': {message}")]
    Transform {
        /// Stage name.
        stage: &'static str,
        /// The requested resource name.
        resource: String,
        /// Human-readable message.
        message: String,
    },
}

impl DispatchError {
    /// Creates a schema mismatch error.
    #[must_use]
    pub fn schema_mismatch(resource: impl Into<String>, schema: Schema) -> Self {
        Self::SchemaMismatch {
            resource: resource.into(),
            schema,
        }
    }

    /// Creates a zero-match error.
    #[must_use]
    pub fn zero_match(resource: impl Into<String>, schema: Schema, method: Method) -> Self {
        Self::ZeroMatch {
            resource: resource.into(),
            schema,
            method,
        }
    }

    /// Creates an ambiguous-match error.
    #[must_use]
    pub fn ambiguous_match(
        resource: impl Into<String>,
        method: Method,
        candidates: Vec<String>,
    ) -> Self {
        Self::AmbiguousMatch {
            resource: resource.into(),
            method,
            candidates,
        }
    }

    /// Creates an operation-not-supported error.
    #[must_use]
    pub fn operation_not_supported(
        controller: impl Into<String>,
        controller_type: &'static str,
        method: Method,
    ) -> Self {
        Self::OperationNotSupported {
            controller: controller.into(),
            controller_type,
            method,
        }
    }

    /// Creates an invalid-request-shape error.
    #[must_use]
    pub fn invalid_request_shape(
        controller: impl Into<String>,
        resource: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidRequestShape {
            controller: controller.into(),
            resource: resource.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates an invalid-method error.
    #[must_use]
    pub fn invalid_method(resource: impl Into<String>, method: Method) -> Self {
        Self::InvalidMethod {
            resource: resource.into(),
            method,
        }
    }

    /// Creates a validation error wrapping the validator's cause.
    pub fn validation_failed(
        resource: impl Into<String>,
        side: ValidationSide,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::ValidationFailed {
            resource: resource.into(),
            side,
            source: source.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(resource: impl Into<String>) -> Self {
        Self::Cancelled {
            resource: resource.into(),
        }
    }

    /// Creates a controller failure without an underlying error.
    #[must_use]
    pub fn controller(
        controller: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Controller {
            controller: controller.into(),
            resource: resource.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a controller failure with an underlying error.
    pub fn controller_with_source(
        controller: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Controller {
            controller: controller.into(),
            resource: resource.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a transformation failure.
    #[must_use]
    pub fn transform(
        stage: &'static str,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transform {
            stage,
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::ZeroMatch { .. } => ErrorKind::ZeroMatch,
            Self::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            Self::OperationNotSupported { .. } => ErrorKind::OperationNotSupported,
            Self::InvalidRequestShape { .. } => ErrorKind::InvalidRequestShape,
            Self::InvalidMethod { .. } => ErrorKind::InvalidMethod,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Controller { .. } => ErrorKind::Controller,
            Self::Transform { .. } => ErrorKind::Transform,
        }
    }

    /// Returns the resource name this error concerns, if known.
    #[must_use]
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            Self::SchemaMismatch { resource, .. }
            | Self::ZeroMatch { resource, .. }
            | Self::AmbiguousMatch { resource, .. }
            | Self::InvalidRequestShape { resource, .. }
            | Self::InvalidMethod { resource, .. }
            | Self::ValidationFailed { resource, .. }
            | Self::Cancelled { resource }
            | Self::Controller { resource, .. }
            | Self::Transform { resource, .. } => Some(resource),
            Self::OperationNotSupported { .. } => None,
        }
    }

    /// Returns true if this error reports ambient cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_operation_not_supported_names_controller_type_and_method() {
        let err = DispatchError::operation_not_supported("mem", "my::MemoryController", Method::Update);
        let message = err.to_string();
        assert!(message.contains("mem"));
        assert!(message.contains("my::MemoryController"));
        assert!(message.contains("update"));
        assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
        assert!(err.resource_name().is_none());
    }

    #[test]
    fn test_validation_failed_keeps_source() {
        let err = DispatchError::validation_failed(
            "a.txt",
            ValidationSide::Response,
            anyhow::anyhow!("body missing"),
        );
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert!(err.to_string().starts_with("response validation failed"));
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("body missing"));
    }

    #[test]
    fn test_zero_match_and_schema_mismatch_are_distinct() {
        let zero = DispatchError::zero_match("a", Schema::new("file"), Method::Delete);
        let mismatch = DispatchError::schema_mismatch("a", Schema::new("file"));
        assert_ne!(zero.kind(), mismatch.kind());
        assert_eq!(zero.resource_name(), Some("a"));
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AmbiguousMatch).unwrap();
        assert_eq!(json, "\"ambiguous_match\"");
        assert_eq!(ErrorKind::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_cancelled() {
        let err = DispatchError::cancelled("slow.txt");
        assert!(err.is_cancelled());
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
