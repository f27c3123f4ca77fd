//! Resource schema tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A case-insensitive token naming a resource family (e.g. `file`, `memory`).
///
/// The token is normalized to ASCII lowercase on construction, so equality
/// and hashing ignore case.
///
/// # Example
///
/// ```
/// use synergy_core::Schema;
///
/// assert_eq!(Schema::new("FILE"), Schema::new("file"));
/// assert_eq!(Schema::new("Sql").as_str(), "sql");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Schema(String);

impl Schema {
    /// Creates a schema token.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(token.as_ref().trim().to_ascii_lowercase())
    }

    /// Returns the normalized token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Schema {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Schema {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<Schema> for String {
    fn from(schema: Schema) -> Self {
        schema.0
    }
}

impl PartialEq<str> for Schema {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl PartialEq<&str> for Schema {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(Schema::new("File"), Schema::new("FILE"));
        assert_eq!(Schema::new(" memory "), "Memory");
    }

    #[test]
    fn test_serde_normalizes() {
        let schema: Schema = serde_json::from_str("\"SQL\"").unwrap();
        assert_eq!(schema.as_str(), "sql");
        assert_eq!(serde_json::to_string(&schema).unwrap(), "\"sql\"");
    }
}
