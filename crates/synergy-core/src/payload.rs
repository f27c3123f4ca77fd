//! Opaque request and response payloads.
//!
//! A [`Payload`] is whatever a caller hands to a controller (or a controller
//! hands back): raw bytes, text, a JSON document, or a deferred producer that
//! yields one of those on demand. Transformation stages convert between the
//! shapes; controllers decide which shapes they accept.

use crate::controller::BoxFuture;
use crate::error::DispatchResult;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// A payload value carried on a request `data` stack or response `body` stack.
#[derive(Clone, Default)]
pub enum Payload {
    /// No payload.
    #[default]
    Empty,
    /// UTF-8 text.
    Text(String),
    /// Raw bytes (the stream form).
    Bytes(Bytes),
    /// A structured JSON document.
    Json(serde_json::Value),
    /// A producer evaluated when the payload is needed.
    Deferred(PayloadProvider),
}

impl Payload {
    /// Creates a text payload.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a bytes payload.
    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Self::Bytes(value.into())
    }

    /// Creates a JSON payload.
    pub fn json(value: serde_json::Value) -> Self {
        Self::Json(value)
    }

    /// Creates a deferred payload from an async producer.
    ///
    /// # Example
    ///
    /// ```
    /// use synergy_core::Payload;
    ///
    /// # tokio_test::block_on(async {
    /// let payload = Payload::deferred(|| Box::pin(async { Ok(Payload::text("later")) }));
    /// let resolved = payload.resolve().await.unwrap();
    /// assert_eq!(resolved.as_text(), Some("later"));
    /// # });
    /// ```
    pub fn deferred<F>(producer: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, DispatchResult<Payload>> + Send + Sync + 'static,
    {
        Self::Deferred(PayloadProvider::new(producer))
    }

    /// Returns a short name for the payload shape, used in errors and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::Deferred(_) => "deferred",
        }
    }

    /// Returns true for [`Payload::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the text, if this is a text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a bytes payload.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the JSON document, if this is a JSON payload.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Evaluates deferred producers until a concrete payload is obtained.
    ///
    /// Concrete payloads are returned as a cheap clone.
    pub async fn resolve(&self) -> DispatchResult<Payload> {
        let mut current = self.clone();
        while let Self::Deferred(provider) = current {
            current = provider.produce().await?;
        }
        Ok(current)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// A shareable async producer of a [`Payload`].
#[derive(Clone)]
pub struct PayloadProvider {
    producer: Arc<dyn Fn() -> BoxFuture<'static, DispatchResult<Payload>> + Send + Sync>,
}

impl PayloadProvider {
    /// Wraps an async producer.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, DispatchResult<Payload>> + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
        }
    }

    /// Runs the producer once.
    pub async fn produce(&self) -> DispatchResult<Payload> {
        (self.producer)().await
    }
}

impl fmt::Debug for PayloadProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadProvider(..)")
    }
}
