//! Canned backend responses.

use kinvey_core::RawResponse;
use serde_json::{json, Value};

/// A successful response with `data` as body.
pub fn ok(data: Value) -> RawResponse {
    RawResponse::new(200, data)
}

/// An error response with the backend's error body.
///
/// ```
/// use kinvey_core::{Response, ResponseErrorKind};
///
/// let response = Response::from(kinvey_test::kinvey_error(404, "EntityNotFound", "gone"));
/// let error = response.error().unwrap();
/// assert_eq!(error.kind, ResponseErrorKind::NotFound);
/// assert_eq!(error.message, "gone");
/// ```
pub fn kinvey_error(status_code: u16, name: &str, description: &str) -> RawResponse {
    RawResponse::new(
        status_code,
        json!({
            "error": name,
            "description": description,
            "debug": "",
        }),
    )
}
