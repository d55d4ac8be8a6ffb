//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use std::time::Duration;

use kinvey_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default value of the `X-Kinvey-Api-Version` header.
pub const DEFAULT_API_VERSION: u32 = 3;

/// Default byte cap for the serialized custom request properties.
pub const DEFAULT_MAX_CUSTOM_PROPERTIES_BYTES: usize = 2000;

/// Process-wide request tunables.
///
/// Every request reads its defaults from this section at construction time;
/// nothing is looked up from the environment afterwards.
///
/// # Example
///
/// ```
/// use kinvey_config::RequestConfig;
///
/// let config = RequestConfig::default();
/// assert_eq!(config.default_timeout_ms, 10_000);
/// assert_eq!(config.default_api_version, 3);
/// assert_eq!(config.max_custom_properties_bytes, 2000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// Timeout handed to transport stages, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Value of the `X-Kinvey-Api-Version` header.
    #[serde(default = "default_api_version")]
    pub default_api_version: u32,

    /// Byte size at which the custom properties header is rejected.
    #[serde(default = "default_max_custom_properties_bytes")]
    pub max_custom_properties_bytes: usize,

    /// Whether requests follow redirects unless told otherwise.
    #[serde(default = "default_true")]
    pub follow_redirect: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            default_api_version: default_api_version(),
            max_custom_properties_bytes: default_max_custom_properties_bytes(),
            follow_redirect: true,
        }
    }
}

impl RequestConfig {
    /// The default timeout as a [`Duration`].
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_api_version() -> u32 {
    DEFAULT_API_VERSION
}

fn default_max_custom_properties_bytes() -> usize {
    DEFAULT_MAX_CUSTOM_PROPERTIES_BYTES
}

fn default_true() -> bool {
    true
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs.
    #[default]
    Json,
    /// Human-readable pretty format.
    Pretty,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the subscriber settings used by
    /// [`kinvey_telemetry::init_logging`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            file_line_info: self.include_location,
            ansi: self.ansi_enabled,
            ..LogConfig::default()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
