//! Request and response validation stage.
//!
//! Runs a pluggable [`Validator`] against the request before delegating and
//! against the response after the delegated call returns. A rejection on
//! either side fails the invocation with
//! [`DispatchError::ValidationFailed`], tagged with the side and wrapping the
//! validator's error as its source. Errors raised further down the chain are
//! passed through untouched; the response validator only sees successful
//! results.
//!
//! # Example
//!
//! ```
//! use synergy_middleware::stages::{RuleValidator, ValidationMiddleware};
//!
//! let validation = ValidationMiddleware::new(
//!     RuleValidator::new()
//!         .require_data_for_writes()
//!         .max_name_length(255),
//! );
//! ```

use crate::context::PipelineContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use anyhow::{anyhow, bail};
use std::fmt;
use std::sync::Arc;
use synergy_core::{DispatchError, DispatchResult, Method, Request, Response, ValidationSide};
use synergy_telemetry::metrics::record_validation_failure;

/// Checks requests and responses. Both sides accept everything by default.
pub trait Validator: Send + Sync + 'static {
    /// Validates a request before it is delegated.
    ///
    /// # Errors
    ///
    /// Returns the reason the request is invalid.
    fn validate_request(&self, _request: &Request) -> anyhow::Result<()> {
        Ok(())
    }

    /// Validates a successful response.
    ///
    /// # Errors
    ///
    /// Returns the reason the response is invalid.
    fn validate_response(&self, _response: &Response) -> anyhow::Result<()> {
        Ok(())
    }
}

type RequestCheck = Box<dyn Fn(&Request) -> anyhow::Result<()> + Send + Sync>;
type ResponseCheck = Box<dyn Fn(&Response) -> anyhow::Result<()> + Send + Sync>;

/// A validator assembled from closures.
///
/// ```
/// use anyhow::ensure;
/// use synergy_middleware::stages::FnValidator;
///
/// let validator = FnValidator::new().on_request(|request| {
///     ensure!(!request.resource_name().contains(".."), "parent segments are not allowed");
///     Ok(())
/// });
/// ```
#[derive(Default)]
pub struct FnValidator {
    request: Option<RequestCheck>,
    response: Option<ResponseCheck>,
}

impl FnValidator {
    /// Creates a validator that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request check.
    #[must_use]
    pub fn on_request<F>(mut self, check: F) -> Self
    where
        F: Fn(&Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.request = Some(Box::new(check));
        self
    }

    /// Sets the response check.
    #[must_use]
    pub fn on_response<F>(mut self, check: F) -> Self
    where
        F: Fn(&Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.response = Some(Box::new(check));
        self
    }
}

impl Validator for FnValidator {
    fn validate_request(&self, request: &Request) -> anyhow::Result<()> {
        self.request.as_ref().map_or(Ok(()), |check| check(request))
    }

    fn validate_response(&self, response: &Response) -> anyhow::Result<()> {
        self.response.as_ref().map_or(Ok(()), |check| check(response))
    }
}

/// A declarative validator built from common rules.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    required_items: Vec<String>,
    require_data_for_writes: bool,
    allowed_payloads: Option<Vec<&'static str>>,
    max_name_length: Option<usize>,
    required_json_fields: Vec<String>,
    require_body_on_success: bool,
}

impl RuleValidator {
    /// Creates a validator with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `key` to be present in the request items.
    #[must_use]
    pub fn require_item(mut self, key: &str) -> Self {
        self.required_items.push(key.to_string());
        self
    }

    /// Requires create and update requests to carry a non-empty payload.
    #[must_use]
    pub fn require_data_for_writes(mut self) -> Self {
        self.require_data_for_writes = true;
        self
    }

    /// Restricts non-empty request payloads to the given kinds
    /// (`"text"`, `"bytes"`, `"json"`, `"deferred"`).
    #[must_use]
    pub fn allowed_payloads(mut self, kinds: &[&'static str]) -> Self {
        self.allowed_payloads = Some(kinds.to_vec());
        self
    }

    /// Limits the effective resource name length.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = Some(max);
        self
    }

    /// Requires JSON request payloads to be objects containing `field`.
    #[must_use]
    pub fn require_json_field(mut self, field: &str) -> Self {
        self.required_json_fields.push(field.to_string());
        self
    }

    /// Requires successful responses to carry a non-empty body.
    #[must_use]
    pub fn require_body_on_success(mut self) -> Self {
        self.require_body_on_success = true;
        self
    }
}

impl Validator for RuleValidator {
    fn validate_request(&self, request: &Request) -> anyhow::Result<()> {
        for key in &self.required_items {
            if request.items().get(key).is_none() {
                bail!("missing required item '{key}'");
            }
        }

        if let Some(max) = self.max_name_length {
            let len = request.resource_name().len();
            if len > max {
                bail!("resource name is {len} bytes, limit is {max}");
            }
        }

        let data = request.data();
        if self.require_data_for_writes
            && matches!(request.method(), Method::Create | Method::Update)
            && data.is_empty()
        {
            bail!("{} requires a payload", request.method());
        }

        if let Some(allowed) = &self.allowed_payloads {
            if !data.is_empty() && !allowed.contains(&data.kind()) {
                bail!("payload kind '{}' is not allowed", data.kind());
            }
        }

        if let Some(value) = data.as_json() {
            if !self.required_json_fields.is_empty() {
                let object = value
                    .as_object()
                    .ok_or_else(|| anyhow!("JSON payload must be an object"))?;
                for field in &self.required_json_fields {
                    if !object.contains_key(field) {
                        bail!("missing required field '{field}'");
                    }
                }
            }
        }

        Ok(())
    }

    fn validate_response(&self, response: &Response) -> anyhow::Result<()> {
        if self.require_body_on_success && response.is_success() && response.body().is_empty() {
            bail!("successful response for '{}' has no body", response.resource_name());
        }
        Ok(())
    }
}

struct AllowAll;

impl Validator for AllowAll {}

struct RejectAll;

impl Validator for RejectAll {
    fn validate_request(&self, _request: &Request) -> anyhow::Result<()> {
        bail!("validation rejected (reject-all mode)")
    }
}

/// Validation middleware.
#[derive(Clone)]
pub struct ValidationMiddleware {
    validator: Arc<dyn Validator>,
    label: &'static str,
}

impl fmt::Debug for ValidationMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationMiddleware")
            .field("validator", &self.label)
            .finish()
    }
}

impl ValidationMiddleware {
    /// Creates a validation stage running `validator`.
    #[must_use]
    pub fn new<V: Validator>(validator: V) -> Self {
        Self {
            validator: Arc::new(validator),
            label: "custom",
        }
    }

    /// Accepts every request and response.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            validator: Arc::new(AllowAll),
            label: "allow_all",
        }
    }

    /// Rejects every request. Useful for testing error handling.
    #[must_use]
    pub fn reject_all() -> Self {
        Self {
            validator: Arc::new(RejectAll),
            label: "reject_all",
        }
    }
}

impl Middleware for ValidationMiddleware {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            if let Err(cause) = self.validator.validate_request(&request) {
                record_validation_failure("request");
                return Err(DispatchError::validation_failed(
                    request.resource_name(),
                    ValidationSide::Request,
                    cause,
                ));
            }

            let resource = request.resource_name().to_string();
            let response = next.run(ctx, request).await?;

            if let Err(cause) = self.validator.validate_response(&response) {
                record_validation_failure("response");
                return Err(DispatchError::validation_failed(
                    resource,
                    ValidationSide::Response,
                    cause,
                ));
            }

            Ok(response)
        })
    }
}
