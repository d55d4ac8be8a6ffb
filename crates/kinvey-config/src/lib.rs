//! Typed configuration for the Kinvey request pipeline.
//!
//! Configuration is layered: built-in defaults, then an optional TOML or JSON
//! file, then environment variables. Unknown fields are rejected.
//!
//! - [`RequestConfig`] - request defaults (timeout, API version, property cap)
//! - [`LoggingConfig`] - subscriber settings handed to `kinvey-telemetry`
//!
//! # Example
//!
//! ```no_run
//! use kinvey_config::ConfigLoader;
//!
//! # fn main() -> Result<(), kinvey_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("kinvey.toml")?
//!     .with_env_prefix("KINVEY")
//!     .load()?;
//!
//! println!("timeout: {:?}", config.request.default_timeout());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [request]
//! default_timeout_ms = 10000
//! default_api_version = 3
//! max_custom_properties_bytes = 2000
//! follow_redirect = true
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `KINVEY__REQUEST__DEFAULT_TIMEOUT_MS=5000`
//! - `KINVEY__REQUEST__MAX_CUSTOM_PROPERTIES_BYTES=4096`
//! - `KINVEY__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KinveyConfig::default();
        assert_eq!(config.request.default_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_full_toml_document() {
        let toml = r#"
            [request]
            default_timeout_ms = 15000
            default_api_version = 4
            max_custom_properties_bytes = 1024
            follow_redirect = false

            [logging]
            enabled = true
            level = "warn"
            format = "pretty"
            ansi_enabled = true
            include_location = true
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.request.default_timeout_ms, 15000);
        assert_eq!(config.request.default_api_version, 4);
        assert!(!config.request.follow_redirect);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.include_location);
    }
}
