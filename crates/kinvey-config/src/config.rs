//! Main configuration types.
//!
//! This module provides the top-level [`KinveyConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LoggingConfig, RequestConfig};

/// Complete client configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use kinvey_config::KinveyConfig;
///
/// let config = KinveyConfig::default();
/// assert_eq!(config.request.default_api_version, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct KinveyConfig {
    /// Request defaults.
    #[serde(default)]
    pub request: RequestConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KinveyConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use kinvey_config::{KinveyConfig, RequestConfig};
    ///
    /// let config = KinveyConfig::builder()
    ///     .request(RequestConfig {
    ///         default_api_version: 4,
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.request.default_api_version, 4);
    /// ```
    #[must_use]
    pub fn builder() -> KinveyConfigBuilder {
        KinveyConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The default timeout is zero
    /// - The API version is zero
    /// - The custom properties byte cap is zero
    /// - The log level is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request.default_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "request.default_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.request.default_api_version == 0 {
            return Err(ConfigError::invalid_value(
                "request.default_api_version",
                "must be at least 1",
            ));
        }

        if self.request.max_custom_properties_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "request.max_custom_properties_bytes",
                "must be greater than zero",
            ));
        }

        if self.logging.enabled && self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                "must not be empty when logging is enabled",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty, colourised debug logs with locations.
    ///
    /// # Example
    ///
    /// ```
    /// use kinvey_config::KinveyConfig;
    ///
    /// let config = KinveyConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config
    }
}

/// Builder for [`KinveyConfig`].
#[derive(Debug, Default)]
pub struct KinveyConfigBuilder {
    request: Option<RequestConfig>,
    logging: Option<LoggingConfig>,
}

impl KinveyConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request configuration.
    #[must_use]
    pub fn request(mut self, request: RequestConfig) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> KinveyConfig {
        KinveyConfig {
            request: self.request.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }
}
