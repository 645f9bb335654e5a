//! Status document model.
//!
//! A status document is the consolidated JSON payload a controller publishes
//! on its state topic. No schema is enforced: the document is kept as a
//! generic JSON tree and consumers extract values by path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A dotted path of object keys inside a status document.
///
/// Paths are written with `.` separators, e.g. `Data.General.VersioneFW`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dotted path. Empty segments are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Build a path from individual keys.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Keys making up this path, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Join the keys with an arbitrary separator.
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }

    /// Check if the path has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.join("."))
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

/// One parsed status document.
///
/// Immutable once parsed; every payload produces a fresh document.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDocument {
    root: Value,
}

impl StatusDocument {
    /// Parse a raw payload.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not valid JSON.
    pub fn parse(payload: &[u8]) -> Result<Self, DocumentError> {
        let root = serde_json::from_slice(payload)
            .map_err(|e| DocumentError::Parse(e.to_string()))?;
        Ok(Self { root })
    }

    /// Wrap an already decoded JSON tree.
    #[must_use]
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// The whole JSON tree.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Walk `path` from the root through nested objects.
    ///
    /// Returns `None` as soon as a key is missing or an intermediate value
    /// is not an object.
    #[must_use]
    pub fn lookup(&self, path: &FieldPath) -> Option<&Value> {
        self.lookup_keys(path.segments())
    }

    /// Walk a fixed sequence of keys from the root.
    #[must_use]
    pub fn lookup_keys<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Value> {
        keys.iter()
            .try_fold(&self.root, |node, key| node.as_object()?.get(key.as_ref()))
    }
}

/// Errors that can occur building a status document.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    /// Payload is not valid JSON
    #[error("malformed status document: {0}")]
    Parse(String),
}
