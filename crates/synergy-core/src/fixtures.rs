//! Test fixtures for Synergy development and testing.
//!
//! [`RecordingController`] is a scripted controller that records every
//! invocation. Clones share the same call log, so a test can keep one clone
//! and hand the other to a registry.
//!
//! [`ObservedController`] wraps a real controller and appends each
//! invocation and its outcome to a shared [`CallLog`], which lets a test
//! check the order in which several controllers were tried.
//!
//! # Example
//!
//! ```
//! use synergy_core::fixtures::RecordingController;
//! use synergy_core::{Controller, Request};
//!
//! # tokio_test::block_on(async {
//! let controller = RecordingController::with_resources("mem", "file", ["a.txt"]);
//! let recorder = controller.clone();
//!
//! assert!(controller.invoke(&Request::read("file", "a.txt")).await.unwrap().is_success());
//! assert!(!controller.invoke(&Request::read("file", "b.txt")).await.unwrap().is_success());
//! assert_eq!(recorder.call_count(), 2);
//! # });
//! ```

use crate::controller::{BoxFuture, Controller};
use crate::error::{DispatchError, DispatchResult};
use crate::payload::Payload;
use crate::request::{Method, Request};
use crate::response::{Response, StatusCode};
use crate::schema::Schema;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// How a [`RecordingController`] answers.
#[derive(Debug, Clone)]
enum Behavior {
    /// Every resource exists.
    Found,
    /// No resource exists.
    NotFound,
    /// Only the listed resources exist.
    Resources(HashSet<String>),
    /// Every call fails with a controller error.
    Fail(String),
    /// Every call waits forever.
    Hang,
}

/// A scripted controller that records its invocations.
#[derive(Debug, Clone)]
pub struct RecordingController {
    name: String,
    schemas: Vec<Schema>,
    tags: Vec<String>,
    behavior: Behavior,
    supported: Option<Vec<Method>>,
    calls: Arc<Mutex<Vec<(Method, String)>>>,
}

impl RecordingController {
    fn with_behavior(name: &str, schema: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            schemas: vec![Schema::new(schema)],
            tags: Vec::new(),
            behavior,
            supported: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A controller for which every resource exists.
    #[must_use]
    pub fn found(name: &str, schema: &str) -> Self {
        Self::with_behavior(name, schema, Behavior::Found)
    }

    /// A controller for which no resource exists.
    #[must_use]
    pub fn not_found(name: &str, schema: &str) -> Self {
        Self::with_behavior(name, schema, Behavior::NotFound)
    }

    /// A controller for which only `resources` exist.
    pub fn with_resources<I, S>(name: &str, schema: &str, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let resources = resources.into_iter().map(Into::into).collect();
        Self::with_behavior(name, schema, Behavior::Resources(resources))
    }

    /// A controller whose every call fails.
    #[must_use]
    pub fn failing(name: &str, schema: &str, message: &str) -> Self {
        Self::with_behavior(name, schema, Behavior::Fail(message.to_string()))
    }

    /// A controller whose every call never completes.
    #[must_use]
    pub fn hanging(name: &str, schema: &str) -> Self {
        Self::with_behavior(name, schema, Behavior::Hang)
    }

    /// Adds another served schema.
    #[must_use]
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schemas.push(Schema::new(schema));
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Restricts the supported methods; others fail with `OperationNotSupported`.
    #[must_use]
    pub fn supporting(mut self, methods: &[Method]) -> Self {
        self.supported = Some(methods.to_vec());
        self
    }

    /// Returns every recorded `(method, resource name)` pair, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().clone()
    }

    /// Returns the number of recorded invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn answer(&self, method: Method, request: &Request) -> BoxFuture<'static, DispatchResult<Response>> {
        let resource = request.resource_name().to_string();
        self.calls.lock().push((method, resource.clone()));

        if let Some(supported) = &self.supported {
            if !supported.contains(&method) {
                let err = DispatchError::operation_not_supported(&self.name, self.type_name(), method);
                return Box::pin(std::future::ready(Err(err)));
            }
        }

        let found = Response::success(resource.clone(), Payload::text(format!("{}:{resource}", self.name)));
        let result = match &self.behavior {
            Behavior::Found => Ok(found),
            Behavior::NotFound => Ok(Response::not_found(resource)),
            Behavior::Resources(names) if names.contains(&resource) => Ok(found),
            Behavior::Resources(_) => Ok(Response::not_found(resource)),
            Behavior::Fail(message) => Err(DispatchError::controller(&self.name, resource, message)),
            Behavior::Hang => return Box::pin(std::future::pending()),
        };
        Box::pin(std::future::ready(result))
    }
}

impl Controller for RecordingController {
    fn name(&self) -> &str {
        &self.name
    }

    fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn create<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        self.answer(Method::Create, request)
    }

    fn read<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        self.answer(Method::Read, request)
    }

    fn update<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        self.answer(Method::Update, request)
    }

    fn delete<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        self.answer(Method::Delete, request)
    }
}

/// One invocation seen by an [`ObservedController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedCall {
    /// Name of the invoked controller.
    pub controller: String,
    /// Method of the request.
    pub method: Method,
    /// Effective resource name of the request.
    pub resource: String,
    /// Response status, or `None` if the controller returned an error.
    pub status: Option<StatusCode>,
}

/// Invocation log shared by several [`ObservedController`]s.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<ObservedCall>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded call, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.lock().clone()
    }

    /// Returns `(controller, status)` pairs, oldest first.
    #[must_use]
    pub fn outcomes(&self) -> Vec<(String, Option<StatusCode>)> {
        self.calls
            .lock()
            .iter()
            .map(|call| (call.controller.clone(), call.status))
            .collect()
    }
}

/// Wraps a controller and records every invocation in a [`CallLog`].
#[derive(Debug)]
pub struct ObservedController<C> {
    inner: C,
    log: CallLog,
}

impl<C: Controller> ObservedController<C> {
    /// Wraps `inner`, recording into `log`.
    pub fn new(inner: C, log: &CallLog) -> Self {
        Self {
            inner,
            log: log.clone(),
        }
    }

    /// Returns the wrapped controller.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Controller> Controller for ObservedController<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn schemas(&self) -> &[Schema] {
        self.inner.schemas()
    }

    fn tags(&self) -> &[String] {
        self.inner.tags()
    }

    fn resource_name_root(&self) -> Option<&str> {
        self.inner.resource_name_root()
    }

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn invoke<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let result = self.inner.invoke(request).await;
            self.log.calls.lock().push(ObservedCall {
                controller: self.inner.name().to_string(),
                method: request.method(),
                resource: request.resource_name().to_string(),
                status: result.as_ref().ok().map(Response::status),
            });
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_found_body_names_controller() {
        let controller = RecordingController::found("disk", "file");
        let response = controller.invoke(&Request::read("file", "a.txt")).await.unwrap();
        assert_eq!(response.body().as_text(), Some("disk:a.txt"));
    }

    #[tokio::test]
    async fn test_supporting_restricts_methods() {
        let controller = RecordingController::found("ro", "file").supporting(&[Method::Read]);
        assert!(controller.invoke(&Request::read("file", "a")).await.is_ok());

        let err = controller.invoke(&Request::delete("file", "a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
        assert_eq!(controller.call_count(), 2);
    }

    #[tokio::test]
    async fn test_observed_controllers_share_one_log() {
        let log = CallLog::new();
        let first = ObservedController::new(RecordingController::not_found("mem", "file"), &log);
        let second = ObservedController::new(RecordingController::failing("disk", "file", "x"), &log);

        first.invoke(&Request::read("file", "a")).await.unwrap();
        second.invoke(&Request::read("file", "a")).await.unwrap_err();

        assert_eq!(
            log.outcomes(),
            vec![
                ("mem".to_string(), Some(StatusCode::NotFound)),
                ("disk".to_string(), None),
            ]
        );
        assert_eq!(first.name(), "mem");
        assert_eq!(first.inner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_controller() {
        let controller = RecordingController::failing("bad", "file", "disk on fire");
        let err = controller.invoke(&Request::read("file", "a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Controller);
        assert!(err.to_string().contains("disk on fire"));
    }
}
