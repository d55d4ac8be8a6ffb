//! Failures while loading or validating a [`KinveyConfig`](crate::KinveyConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why a Kinvey configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("kinvey config file {path} does not exist")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The config file exists but could not be read.
    #[error("cannot read kinvey config file {path}")]
    ReadError {
        /// Path of the file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, or an unknown key in a TOML document.
    #[error("invalid TOML in kinvey config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Malformed JSON, or an unknown key in a JSON document.
    #[error("invalid JSON in kinvey config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A setting that parsed but cannot drive requests, such as a zero
    /// timeout or a zero custom-properties cap.
    #[error("`{field}` {reason}")]
    InvalidValue {
        /// Dotted setting path, e.g. `request.default_api_version`.
        field: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },

    /// A `KINVEY__…` override whose value does not parse.
    #[error("environment override {var}: {expected}")]
    EnvParseError {
        /// Variable name.
        var: String,
        /// What the value should have looked like.
        expected: &'static str,
    },

    /// Neither `toml` nor `json`.
    #[error("unsupported kinvey config format: {0}")]
    UnsupportedFormat(String),
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn invalid_value(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidValue { field, reason }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, expected: &'static str) -> Self {
        Self::EnvParseError {
            var: var.into(),
            expected,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// The dotted setting path for [`ConfigError::InvalidValue`].
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidValue { field, .. } => Some(*field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_names_setting() {
        let err = ConfigError::invalid_value(
            "request.max_custom_properties_bytes",
            "must be greater than zero",
        );
        assert_eq!(
            err.to_string(),
            "`request.max_custom_properties_bytes` must be greater than zero"
        );
        assert_eq!(err.field(), Some("request.max_custom_properties_bytes"));
    }

    #[test]
    fn test_env_override_message() {
        let err =
            ConfigError::env_parse_error("KINVEY__REQUEST__DEFAULT_API_VERSION", "expected integer");
        assert_eq!(
            err.to_string(),
            "environment override KINVEY__REQUEST__DEFAULT_API_VERSION: expected integer"
        );
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_missing_file_message() {
        let err = ConfigError::file_not_found("kinvey.toml");
        assert_eq!(err.to_string(), "kinvey config file kinvey.toml does not exist");
    }

    #[test]
    fn test_unknown_request_key_is_toml_error() {
        #[derive(Debug, serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        #[allow(dead_code)]
        struct Request {
            default_timeout_ms: u64,
        }

        let parse_err = toml::from_str::<Request>("default_timeout = 60000").unwrap_err();
        let err: ConfigError = parse_err.into();
        assert!(matches!(err, ConfigError::TomlError(_)));
        assert!(err.to_string().starts_with("invalid TOML in kinvey config"));
    }
}
