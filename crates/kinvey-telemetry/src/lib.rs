//! Logging setup for the Kinvey request pipeline.
//!
//! Every crate in the workspace emits events through [`tracing`]. This crate
//! owns the subscriber side: it installs a `tracing-subscriber` registry with
//! an [`EnvFilter`](tracing_subscriber::EnvFilter) and either JSON or pretty
//! formatting, and defines the field names used by the request pipeline so
//! that log lines from different stages can be correlated.
//!
//! # Example
//!
//! ```rust,no_run
//! use kinvey_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging already initialised");
//!
//! tracing::info!(request_id = "01J...", "request started");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
