//! HTTP methods accepted by the backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::KinveyError;

/// One of the five verbs the backend accepts.
///
/// Parsing is case-insensitive; the canonical form is upper case.
///
/// ```
/// use kinvey_core::Method;
///
/// let method: Method = "patch".parse().unwrap();
/// assert_eq!(method, Method::Patch);
/// assert_eq!(method.to_string(), "PATCH");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = KinveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PATCH" => Ok(Self::Patch),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(KinveyError::invalid_argument(format!(
                "Invalid request method `{s}`. Only GET, POST, PATCH, PUT, and DELETE are allowed."
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Patch => Self::PATCH,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
        }
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_unknown_verbs() {
        for verb in ["OPTIONS", "HEAD", "", "GETS", "fetch"] {
            let err = verb.parse::<Method>().unwrap_err();
            assert!(matches!(err, KinveyError::InvalidArgument { .. }), "{verb}");
        }
    }

    #[test]
    fn test_into_http_method() {
        assert_eq!(http::Method::from(Method::Delete), http::Method::DELETE);
    }

    #[test]
    fn test_serde_round_trip_uses_canonical_form() {
        let method: Method = serde_json::from_str("\"put\"").unwrap();
        assert_eq!(serde_json::to_string(&method).unwrap(), "\"PUT\"");
        assert!(serde_json::from_str::<Method>("\"TRACE\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_any_casing_normalizes(
            idx in 0usize..5,
            mask in proptest::collection::vec(any::<bool>(), 6),
        ) {
            let canonical = ["GET", "POST", "PATCH", "PUT", "DELETE"][idx];
            let mixed: String = canonical
                .chars()
                .zip(mask.iter().cycle())
                .map(|(c, lower)| if *lower { c.to_ascii_lowercase() } else { c })
                .collect();

            let method: Method = mixed.parse().unwrap();
            prop_assert_eq!(method.as_str(), canonical);
        }
    }
}
