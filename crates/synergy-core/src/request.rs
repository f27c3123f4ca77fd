//! Request types.
//!
//! A [`Request`] names a resource, the schema (resource family) it belongs
//! to, the CRUD method to apply, and an optional payload. Middleware stages
//! may rewrite the name or payload by pushing onto the corresponding stack;
//! the dispatcher only ever looks at the top.
//!
//! # Example
//!
//! ```
//! use synergy_core::{Method, Payload, Request};
//!
//! let request = Request::create("file", "notes/today.txt", Payload::text("hello"))
//!     .with_item("file_mode", "append")
//!     .with_controller_caching(false);
//!
//! assert_eq!(request.method(), Method::Create);
//! assert_eq!(request.resource_name(), "notes/today.txt");
//! assert_eq!(request.schema(), "file");
//! assert!(!request.allow_controller_caching());
//! ```

use crate::controller::ControllerFilter;
use crate::payload::Payload;
use crate::schema::Schema;
use crate::stack::ValueStack;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Well-known keys for the request [`Items`] bag.
pub mod items {
    /// Read hint: convert a bytes response body to text.
    pub const AS_TEXT: &str = "as_text";
    /// Read hint: desired response representation (e.g. `"json"`).
    pub const RESPONSE_TYPE: &str = "response_type";
    /// Write hint: file mode requested by the caller.
    pub const FILE_MODE: &str = "file_mode";
}

/// The CRUD method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Create a resource.
    Create,
    /// Read a resource.
    Read,
    /// Update an existing resource.
    Update,
    /// Delete a resource.
    Delete,
    /// No method; rejected at dispatch time.
    #[default]
    None,
}

impl Method {
    /// Returns the lowercase method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }

    /// Returns true for methods with side effects (Create, Update, Delete).
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps request IDs sortable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Open property bag for out-of-band request hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Items(HashMap<String, serde_json::Value>);

impl Items {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Returns a string value for a key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(serde_json::Value::as_str)
    }

    /// Returns true if the key holds `true` or the string `"true"`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(serde_json::Value::Bool(value)) => *value,
            Some(serde_json::Value::String(value)) => value.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// Returns the keys in the bag.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A CRUD request addressed to a named resource.
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    method: Method,
    resource_name: ValueStack<String>,
    schema: Schema,
    data: ValueStack<Payload>,
    items: Items,
    controller_filter: Option<ControllerFilter>,
    allow_controller_caching: bool,
}

impl Request {
    /// Creates a request with an empty payload. Controller caching is allowed.
    pub fn new(method: Method, schema: impl Into<Schema>, resource_name: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            method,
            resource_name: ValueStack::new(resource_name.into()),
            schema: schema.into(),
            data: ValueStack::new(Payload::Empty),
            items: Items::new(),
            controller_filter: None,
            allow_controller_caching: true,
        }
    }

    /// Creates a read request.
    pub fn read(schema: impl Into<Schema>, resource_name: impl Into<String>) -> Self {
        Self::new(Method::Read, schema, resource_name)
    }

    /// Creates a create request carrying `data`.
    pub fn create(
        schema: impl Into<Schema>,
        resource_name: impl Into<String>,
        data: impl Into<Payload>,
    ) -> Self {
        Self::new(Method::Create, schema, resource_name).with_data(data)
    }

    /// Creates an update request carrying `data`.
    pub fn update(
        schema: impl Into<Schema>,
        resource_name: impl Into<String>,
        data: impl Into<Payload>,
    ) -> Self {
        Self::new(Method::Update, schema, resource_name).with_data(data)
    }

    /// Creates a delete request.
    pub fn delete(schema: impl Into<Schema>, resource_name: impl Into<String>) -> Self {
        Self::new(Method::Delete, schema, resource_name)
    }

    /// Pushes a payload onto the data stack.
    pub fn with_data(mut self, data: impl Into<Payload>) -> Self {
        self.data.push(data.into());
        self
    }

    /// Adds an item to the property bag.
    pub fn with_item(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.items.insert(key, value);
        self
    }

    /// Sets the controller filter.
    pub fn with_filter(mut self, filter: ControllerFilter) -> Self {
        self.controller_filter = Some(filter);
        self
    }

    /// Sets whether the dispatcher may use its resolution cache.
    pub fn with_controller_caching(mut self, allow: bool) -> Self {
        self.allow_controller_caching = allow;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the currently effective resource name (top of the name stack).
    #[must_use]
    pub fn resource_name(&self) -> &str {
        self.resource_name.peek()
    }

    /// Returns the full resource name stack.
    #[must_use]
    pub fn resource_names(&self) -> &ValueStack<String> {
        &self.resource_name
    }

    /// Pushes a rewritten resource name.
    pub fn push_resource_name(&mut self, name: impl Into<String>) {
        self.resource_name.push(name.into());
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the currently effective payload (top of the data stack).
    #[must_use]
    pub fn data(&self) -> &Payload {
        self.data.peek()
    }

    /// Returns the full data stack.
    #[must_use]
    pub fn data_stack(&self) -> &ValueStack<Payload> {
        &self.data
    }

    /// Pushes a transformed payload.
    pub fn push_data(&mut self, data: impl Into<Payload>) {
        self.data.push(data.into());
    }

    /// Returns the property bag.
    #[must_use]
    pub fn items(&self) -> &Items {
        &self.items
    }

    /// Returns the property bag mutably.
    pub fn items_mut(&mut self) -> &mut Items {
        &mut self.items
    }

    /// Returns the controller filter, if any.
    #[must_use]
    pub fn controller_filter(&self) -> Option<&ControllerFilter> {
        self.controller_filter.as_ref()
    }

    /// Returns whether the dispatcher may read or write its resolution cache.
    #[must_use]
    pub fn allow_controller_caching(&self) -> bool {
        self.allow_controller_caching
    }

    /// Sets whether the dispatcher may use its resolution cache.
    pub fn set_allow_controller_caching(&mut self, allow: bool) {
        self.allow_controller_caching = allow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_defaults() {
        let request = Request::read("FILE", "a.txt");
        assert_eq!(request.method(), Method::Read);
        assert_eq!(request.schema().as_str(), "file");
        assert!(request.data().is_empty());
        assert_eq!(request.data_stack().depth(), 1);
        assert!(request.allow_controller_caching());
        assert!(request.controller_filter().is_none());
    }

    #[test]
    fn test_push_resource_name_preserves_previous() {
        let mut request = Request::read("file", "${ROOT}/a.txt");
        request.push_resource_name("/srv/a.txt");

        assert_eq!(request.resource_name(), "/srv/a.txt");
        assert_eq!(request.resource_names().depth(), 2);
        assert_eq!(request.resource_names().bottom(), "${ROOT}/a.txt");
    }

    #[test]
    fn test_create_pushes_data_over_empty_sentinel() {
        let request = Request::create("memory", "k", "v");
        assert_eq!(request.data().as_text(), Some("v"));
        assert!(request.data_stack().bottom().is_empty());
    }

    #[test]
    fn test_items_flag() {
        let request = Request::read("file", "a")
            .with_item(items::AS_TEXT, true)
            .with_item("legacy", "TRUE")
            .with_item(items::RESPONSE_TYPE, "json");

        assert!(request.items().flag(items::AS_TEXT));
        assert!(request.items().flag("legacy"));
        assert!(!request.items().flag("missing"));
        assert_eq!(request.items().get_str(items::RESPONSE_TYPE), Some("json"));
    }

    #[test]
    fn test_method_classification() {
        assert!(Method::Create.is_write());
        assert!(Method::Update.is_write());
        assert!(Method::Delete.is_write());
        assert!(!Method::Read.is_write());
        assert!(!Method::None.is_write());
        assert_eq!(Method::default(), Method::None);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Request::read("file", "a");
        let b = Request::read("file", "a");
        assert_ne!(a.id(), b.id());
    }
}
