//! Kinvey header names.
//!
//! Names are compared case-insensitively by [`kinvey_core::HeaderStore`];
//! these are the casings written on the wire.

pub use kinvey_core::headers::{ACCEPT, CONTENT_TYPE, JSON_CONTENT_TYPE};

/// Backend API version.
pub const API_VERSION: &str = "X-Kinvey-Api-Version";

/// JSON description of the calling device.
pub const DEVICE_INFORMATION: &str = "X-Kinvey-Device-Information";

/// Content type of the entity as stored by Kinvey.
pub const KINVEY_CONTENT_TYPE: &str = "X-Kinvey-Content-Type";

/// Bypass collection hooks.
pub const SKIP_BUSINESS_LOGIC: &str = "X-Kinvey-Skip-Business-Logic";

/// Response headers to echo inside a wrapped response.
pub const INCLUDE_HEADERS_IN_RESPONSE: &str = "X-Kinvey-Include-Headers-In-Response";

/// Wrap the response body with status and headers.
pub const RESPONSE_WRAPPER: &str = "X-Kinvey-ResponseWrapper";

/// Header echoed back when tracing is requested.
pub const REQUEST_ID: &str = "X-Kinvey-Request-Id";

/// Application version from the request properties.
pub const CLIENT_APP_VERSION: &str = "X-Kinvey-Client-App-Version";

/// Remaining request properties as JSON.
pub const CUSTOM_REQUEST_PROPERTIES: &str = "X-Kinvey-Custom-Request-Properties";
