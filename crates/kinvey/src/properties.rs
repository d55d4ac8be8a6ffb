//! Client-supplied request properties.
//!
//! Properties travel as two headers: the app version on its own, and every
//! other property as one JSON object.

use kinvey_core::{KinveyError, KinveyResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const APP_VERSION_KEY: &str = "appVersion";

/// App version plus arbitrary custom properties.
///
/// ```
/// use kinvey::Properties;
///
/// let properties = Properties::new()
///     .with_app_version("1.2.0")
///     .with("region", "eu");
///
/// assert_eq!(properties.app_version(), Some("1.2.0"));
/// assert_eq!(properties.custom_json().as_deref(), Some(r#"{"region":"eu"}"#));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(
        rename = "appVersion",
        default,
        deserialize_with = "deserialize_app_version",
        skip_serializing_if = "Option::is_none"
    )]
    app_version: Option<String>,
    #[serde(flatten)]
    custom: Map<String, Value>,
}

impl Properties {
    /// No app version and no custom properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads properties from a JSON object.
    ///
    /// `appVersion` becomes the app version (non-string values are
    /// stringified); every other key is a custom property.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] if `value` is not an object.
    pub fn from_json(value: Value) -> KinveyResult<Self> {
        let Value::Object(mut custom) = value else {
            return Err(KinveyError::invalid_argument(
                "Request properties must be a JSON object",
            ));
        };

        let app_version = custom.remove(APP_VERSION_KEY).and_then(app_version_from);
        Ok(Self::new().with_custom(custom).with_optional_app_version(app_version))
    }

    /// Sets the app version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.set_app_version(version);
        self
    }

    /// Adds a custom property.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    fn with_custom(mut self, custom: Map<String, Value>) -> Self {
        self.custom = custom;
        self
    }

    fn with_optional_app_version(mut self, version: Option<String>) -> Self {
        if let Some(version) = version {
            self.set_app_version(version);
        }
        self
    }

    /// The app version.
    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref()
    }

    /// Sets the app version. An empty string clears it.
    pub fn set_app_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        self.app_version = (!version.is_empty()).then_some(version);
    }

    /// Clears the app version.
    pub fn clear_app_version(&mut self) {
        self.app_version = None;
    }

    /// A custom property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }

    /// Sets a custom property. `appVersion` is routed to the app version.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        if key == APP_VERSION_KEY {
            self.app_version = app_version_from(value);
        } else {
            self.custom.insert(key, value);
        }
    }

    /// Removes a custom property.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.custom.shift_remove(key)
    }

    /// Custom properties, without the app version.
    pub const fn custom(&self) -> &Map<String, Value> {
        &self.custom
    }

    /// Custom properties as compact JSON, or `None` when there are none.
    pub fn custom_json(&self) -> Option<String> {
        if self.custom.is_empty() {
            None
        } else {
            Some(Value::Object(self.custom.clone()).to_string())
        }
    }

    /// No app version and no custom properties.
    pub fn is_empty(&self) -> bool {
        self.app_version.is_none() && self.custom.is_empty()
    }
}

/// `null` and `""` mean no app version; other non-strings are stringified.
fn app_version_from(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => (!s.is_empty()).then_some(s),
        other => Some(other.to_string()),
    }
}

fn deserialize_app_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(app_version_from))
}
