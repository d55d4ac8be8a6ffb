//! Case-insensitive header storage.
//!
//! Names are matched without regard to ASCII case but keep the spelling used
//! when they were first inserted. Values are always strings: anything that is
//! not already a string is JSON-encoded on the way in.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{KinveyError, KinveyResult};

/// `Accept` header name.
pub const ACCEPT: &str = "Accept";

/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Default value for `Accept` and `Content-Type`.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    value: String,
}

/// Ordered, case-insensitive header bag.
///
/// ```
/// use kinvey_core::HeaderStore;
///
/// let mut headers = HeaderStore::new();
/// headers.set("X-Foo", "a").unwrap();
/// assert_eq!(headers.get("x-foo"), Some("a"));
///
/// headers.set("x-FOO", 42).unwrap();
/// assert_eq!(headers.all()["X-Foo"], "42");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    // keyed by lower-cased name
    entries: IndexMap<String, HeaderEntry>,
}

impl HeaderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `name`, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.value.as_str())
    }

    /// Returns `true` if a header named `name` exists, ignoring case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Sets a header.
    ///
    /// An existing header with the same name (ignoring case) is overwritten
    /// in place and keeps its original spelling and position. Non-string
    /// values are stored as their JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] if `name` is empty, or if
    /// `value` is `null` or an empty string.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> KinveyResult<()> {
        let value = encode_value(name, value.into())?;
        self.insert(name, value);
        Ok(())
    }

    /// Removes a header, ignoring case, and returns its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries
            .shift_remove(&name.to_ascii_lowercase())
            .map(|entry| entry.value)
    }

    /// Removes every header.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of every header keyed by its original spelling.
    #[must_use]
    pub fn all(&self) -> IndexMap<String, String> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|entry| (entry.name.as_str(), entry.value.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets every entry of a JSON object.
    ///
    /// The whole object is validated before any header is written.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] if `headers` is not an object
    /// or any entry fails the rules of [`HeaderStore::set`].
    pub fn extend_from_json(&mut self, headers: &Value) -> KinveyResult<()> {
        let Value::Object(map) = headers else {
            return Err(KinveyError::invalid_argument(
                "Headers must be provided as an object of name/value pairs",
            ));
        };

        let encoded = map
            .iter()
            .map(|(name, value)| Ok((name.as_str(), encode_value(name, value.clone())?)))
            .collect::<KinveyResult<Vec<_>>>()?;

        for (name, value) in encoded {
            self.insert(name, value);
        }
        Ok(())
    }

    /// Converts into an [`http::HeaderMap`] for transport stages.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] if a name or value is not a
    /// legal HTTP header.
    pub fn to_header_map(&self) -> KinveyResult<http::HeaderMap> {
        let mut map = http::HeaderMap::with_capacity(self.len());
        for (name, value) in self.iter() {
            let header_name = http::HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                KinveyError::invalid_argument(format!("Invalid header name `{name}`: {e}"))
            })?;
            let header_value = http::HeaderValue::from_str(value).map_err(|e| {
                KinveyError::invalid_argument(format!("Invalid value for header `{name}`: {e}"))
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    /// Inserts an already validated value.
    pub(crate) fn insert(&mut self, name: &str, value: String) {
        let key = name.to_ascii_lowercase();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
        } else {
            self.entries.insert(
                key,
                HeaderEntry {
                    name: name.to_string(),
                    value,
                },
            );
        }
    }
}

fn encode_value(name: &str, value: Value) -> KinveyResult<String> {
    if name.trim().is_empty() {
        return Err(KinveyError::invalid_argument(
            "A header name must be provided",
        ));
    }

    match value {
        Value::Null => Err(KinveyError::invalid_argument(format!(
            "A value must be provided for header `{name}`"
        ))),
        Value::String(s) if s.is_empty() => Err(KinveyError::invalid_argument(format!(
            "A value must be provided for header `{name}`"
        ))),
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

impl Serialize for HeaderStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a HeaderStore {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
