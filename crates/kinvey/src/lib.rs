//! # Kinvey
//!
//! **Request pipeline for the Kinvey backend-as-a-service**
//!
//! - **Kinvey requests**: protocol headers, request properties, query
//!   encoding and auth descriptors on top of a generic HTTP request
//! - **Single-flight execution**: one in-flight execution per request
//!   instance, released on every settlement path
//! - **Rack**: an ordered, mutable chain of stages (cache, serialization,
//!   network) that every execution runs through, with cooperative
//!   cancellation
//! - **Layered configuration** and `tracing`-based logging
//!
//! ## Quick Start
//!
//! ```
//! use kinvey::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let network = FnStage::new("network", |_ctx, _request: &KinveyRequest, _next| {
//!     Box::pin(async { Ok(Some(RawResponse::new(200, json!([{"_id": "1"}])).into())) })
//! });
//!
//! let request = KinveyRequest::builder()
//!     .options(
//!         KinveyRequestOptions::new()
//!             .url("https://baas.kinvey.com/appdata/kid_x/books")
//!             .query(Query::new().limit(10)),
//!     )
//!     .stage(network)
//!     .build()?;
//!
//! let response = request.execute().await?;
//! assert_eq!(response.data(), &json!([{"_id": "1"}]));
//! # Ok::<(), KinveyError>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! KinveyRequest::execute → guard → Rack → stage 1 → … → stage N
//!                                                          ↓
//! Response / KinveyError ← normalize ←─────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/kinvey/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod device;
pub mod headers;
mod kinvey_request;
pub mod properties;
pub mod query;

pub use auth::AuthType;
pub use device::{DeviceInformation, RustDeviceInformation, SdkInfo};
pub use kinvey_request::{
    KinveyRequest, KinveyRequestBuilder, KinveyRequestOptions, KinveyRequestSnapshot,
};
pub use properties::Properties;
pub use query::{Query, QueryEncoder};

// Re-export core types
pub use kinvey_core as core;

// Re-export the rack
pub use kinvey_rack as rack;

// Re-export configuration
pub use kinvey_config as config;

// Re-export logging setup
pub use kinvey_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```
/// use kinvey::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AuthType, DeviceInformation, KinveyRequest, KinveyRequestOptions, Properties, Query,
        QueryEncoder, RustDeviceInformation,
    };

    pub use kinvey_core::{
        HeaderStore, KinveyError, KinveyResult, Method, RawResponse, Request, RequestOptions,
        Response, ResponseError, ResponseErrorKind,
    };

    // Re-export rack types
    pub use kinvey_rack::{
        stages::LoggingStage, BoxFuture, FnStage, Next, Rack, RackContext, RackOutput,
        RackRequest, Stage, StageResult,
    };

    // Re-export configuration
    pub use kinvey_config::{ConfigLoader, KinveyConfig, RequestConfig};
}
