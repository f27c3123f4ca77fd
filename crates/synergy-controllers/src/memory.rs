//! In-memory controller.

use dashmap::DashMap;
use synergy_core::{
    BoxFuture, Controller, DispatchError, DispatchResult, Payload, Request, Response, Schema,
};
use tracing::debug;

/// A concurrent key/value store exposed as a controller.
///
/// Resource names are used verbatim as keys. Payloads are stored as given,
/// after deferred payloads have been resolved.
///
/// | Method | Key present           | Key absent        |
/// |--------|-----------------------|-------------------|
/// | Create | overwritten, Success  | stored, Success   |
/// | Read   | Success with payload  | NotFound          |
/// | Update | replaced, Success     | NotFound          |
/// | Delete | removed, Success      | NotFound          |
///
/// ```
/// use synergy_controllers::MemoryController;
/// use synergy_core::{Controller, Request};
///
/// # tokio_test::block_on(async {
/// let store = MemoryController::new("mem");
/// store.invoke(&Request::create("memory", "greeting", "hi")).await.unwrap();
///
/// let response = store.invoke(&Request::read("memory", "greeting")).await.unwrap();
/// assert_eq!(response.body().as_text(), Some("hi"));
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryController {
    name: String,
    schemas: Vec<Schema>,
    tags: Vec<String>,
    entries: DashMap<String, Payload>,
}

impl MemoryController {
    /// Creates an empty store serving the `memory` schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: vec![Schema::new("memory")],
            tags: Vec::new(),
            entries: DashMap::new(),
        }
    }

    /// Replaces the served schemas.
    #[must_use]
    pub fn with_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schemas = schemas.into_iter().map(Schema::new).collect();
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Stores `payload` under `key` directly.
    pub fn insert(&self, key: impl Into<String>, payload: impl Into<Payload>) {
        self.entries.insert(key.into(), payload.into());
    }

    /// Returns a copy of the payload stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Payload> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns true if `key` is stored.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    async fn payload(&self, request: &Request) -> DispatchResult<Payload> {
        let payload = request.data().resolve().await?;
        if payload.is_empty() {
            return Err(DispatchError::invalid_request_shape(
                &self.name,
                request.resource_name(),
                "text, bytes or json",
                payload.kind(),
            ));
        }
        Ok(payload)
    }
}

impl Controller for MemoryController {
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
        Box::pin(async move {
            let payload = self.payload(request).await?;
            let key = request.resource_name();
            let replaced = self.entries.insert(key.to_string(), payload).is_some();
            debug!(controller = %self.name, resource = key, replaced, "Entry stored");
            Ok(Response::ok(key))
        })
    }

    fn read<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let key = request.resource_name();
            Ok(match self.get(key) {
                Some(payload) => Response::success(key, payload),
                None => Response::not_found(key),
            })
        })
    }

    fn update<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let payload = self.payload(request).await?;
            let key = request.resource_name();
            Ok(match self.entries.get_mut(key) {
                Some(mut entry) => {
                    *entry = payload;
                    Response::ok(key)
                }
                None => Response::not_found(key),
            })
        })
    }

    fn delete<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            let key = request.resource_name();
            Ok(match self.entries.remove(key) {
                Some(_) => Response::ok(key),
                None => Response::not_found(key),
            })
        })
    }
}
