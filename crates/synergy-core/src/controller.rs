//! Controller trait and filters.
//!
//! A [`Controller`] serves CRUD operations for one family of resources (one
//! or more [`Schema`]s). Concrete controllers override the operations they
//! support; every operation they leave alone fails with
//! [`DispatchError::OperationNotSupported`] naming the controller, its type
//! and the attempted method.
//!
//! # Example
//!
//! ```
//! use synergy_core::{BoxFuture, Controller, DispatchResult, Payload, Request, Response, Schema};
//!
//! struct Clock {
//!     schemas: Vec<Schema>,
//! }
//!
//! impl Controller for Clock {
//!     fn name(&self) -> &str {
//!         "clock"
//!     }
//!
//!     fn schemas(&self) -> &[Schema] {
//!         &self.schemas
//!     }
//!
//!     fn read<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
//!         Box::pin(async move { Ok(Response::success(request.resource_name(), Payload::text("noon"))) })
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let clock = Clock { schemas: vec![Schema::new("time")] };
//! let response = clock.invoke(&Request::read("time", "now")).await.unwrap();
//! assert_eq!(response.body().as_text(), Some("noon"));
//!
//! let err = clock.invoke(&Request::delete("time", "now")).await.unwrap_err();
//! assert_eq!(err.kind(), synergy_core::ErrorKind::OperationNotSupported);
//! # });
//! ```

use crate::error::{DispatchError, DispatchResult};
use crate::request::{Method, Request};
use crate::response::Response;
use crate::schema::Schema;
use std::borrow::Cow;
use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A controller shared between the registry, the resolution cache and
/// in-flight requests.
pub type SharedController = Arc<dyn Controller>;

/// The pluggable unit that performs CRUD operations for a resource family.
///
/// Controllers must be safe for concurrent invocation; the dispatcher does
/// not serialize access to a controller.
pub trait Controller: Send + Sync + 'static {
    /// Returns the controller name, used in logs, errors and filters.
    fn name(&self) -> &str;

    /// Returns the schemas this controller serves.
    fn schemas(&self) -> &[Schema];

    /// Returns free-form labels used to disambiguate controllers.
    fn tags(&self) -> &[String] {
        &[]
    }

    /// Returns the base location for path-resolving controllers.
    fn resource_name_root(&self) -> Option<&str> {
        None
    }

    /// Returns the concrete type name of the controller.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns true if `schema` is one of this controller's schemas.
    fn serves(&self, schema: &Schema) -> bool {
        self.schemas().contains(schema)
    }

    /// Creates a resource.
    fn create<'a>(&'a self, _request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        unsupported(self.name(), self.type_name(), Method::Create)
    }

    /// Reads a resource. A missing resource is a `NotFound` response, not an error.
    fn read<'a>(&'a self, _request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        unsupported(self.name(), self.type_name(), Method::Read)
    }

    /// Updates a resource.
    fn update<'a>(&'a self, _request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        unsupported(self.name(), self.type_name(), Method::Update)
    }

    /// Deletes a resource.
    fn delete<'a>(&'a self, _request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        unsupported(self.name(), self.type_name(), Method::Delete)
    }

    /// Routes the request to the operation matching its method.
    fn invoke<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        match request.method() {
            Method::Create => self.create(request),
            Method::Read => self.read(request),
            Method::Update => self.update(request),
            Method::Delete => self.delete(request),
            Method::None => Box::pin(future::ready(Err(DispatchError::invalid_method(
                request.resource_name(),
                Method::None,
            )))),
        }
    }
}

fn unsupported<'a>(
    name: &str,
    type_name: &'static str,
    method: Method,
) -> BoxFuture<'a, DispatchResult<Response>> {
    let err = DispatchError::operation_not_supported(name, type_name, method);
    Box::pin(future::ready(Err(err)))
}

impl dyn Controller {
    /// Returns true if this controller serves the request schema and the
    /// request filter (if any) accepts it.
    pub fn can_handle(&self, request: &Request) -> bool {
        self.serves(request.schema())
            && request
                .controller_filter()
                .map_or(true, |filter| filter.accepts(self))
    }
}

impl fmt::Debug for dyn Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name())
            .field("type", &self.type_name())
            .field("schemas", &self.schemas())
            .finish()
    }
}

/// A labelled predicate that narrows which schema-matching controllers may
/// serve a request.
///
/// The label is what telemetry reports as the filter type.
///
/// # Example
///
/// ```
/// use synergy_core::{ControllerFilter, Request};
///
/// let request = Request::read("file", "a.txt").with_filter(ControllerFilter::by_name("disk"));
/// assert_eq!(request.controller_filter().unwrap().label(), "name=disk");
/// ```
#[derive(Clone)]
pub struct ControllerFilter {
    label: Cow<'static, str>,
    predicate: Arc<dyn Fn(&dyn Controller) -> bool + Send + Sync>,
}

impl ControllerFilter {
    /// Creates a filter from an arbitrary predicate.
    pub fn custom<F>(label: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&dyn Controller) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Accepts only the controller with the given name.
    pub fn by_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::custom(format!("name={name}"), move |c| c.name() == name)
    }

    /// Accepts controllers carrying the given tag.
    pub fn by_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::custom(format!("tag={tag}"), move |c| c.tags().iter().any(|t| *t == tag))
    }

    /// Accepts controllers of concrete type `C`.
    pub fn by_type<C: Controller>() -> Self {
        let type_name = std::any::type_name::<C>();
        Self::custom(format!("type={type_name}"), move |c| c.type_name() == type_name)
    }

    /// Returns the filter label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns true if the predicate accepts `controller`.
    pub fn accepts(&self, controller: &dyn Controller) -> bool {
        (self.predicate)(controller)
    }
}

impl fmt::Debug for ControllerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerFilter").field(&self.label).finish()
    }
}
