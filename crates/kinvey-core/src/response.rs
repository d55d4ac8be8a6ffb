//! Normalized responses.

use serde::Serialize;
use serde_json::Value;

use crate::{HeaderStore, KinveyError, KinveyResult, ResponseError};

/// A normalized response.
///
/// `is_success()` and `error()` always agree: a 2xx response never carries an
/// error and every other status carries exactly one.
///
/// ```
/// use kinvey_core::{HeaderStore, Response};
/// use serde_json::json;
///
/// let ok = Response::new(200, HeaderStore::new(), json!({"ok": true}));
/// assert!(ok.is_success());
/// assert!(ok.error().is_none());
///
/// let missing = Response::new(404, HeaderStore::new(), json!({"error": "EntityNotFound"}));
/// assert_eq!(missing.error().unwrap().name, "EntityNotFound");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    status_code: u16,
    headers: HeaderStore,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

impl Response {
    /// Builds a response, deriving the error of a non-2xx status from the body.
    #[must_use]
    pub fn new(status_code: u16, headers: HeaderStore, data: Value) -> Self {
        let error = if is_success_status(status_code) {
            None
        } else {
            Some(ResponseError::from_body(status_code, &data))
        };

        Self {
            status_code,
            headers,
            data,
            error,
        }
    }

    /// Replaces the derived error. Ignored for successful responses.
    #[must_use]
    pub fn with_error(mut self, error: ResponseError) -> Self {
        if !self.is_success() {
            self.error = Some(error);
        }
        self
    }

    /// `true` for status codes in `200..300`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        is_success_status(self.status_code)
    }

    /// The error of an unsuccessful response.
    #[must_use]
    pub const fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }

    /// Status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Status code as an [`http::StatusCode`], if it is a valid one.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        http::StatusCode::from_u16(self.status_code).ok()
    }

    /// Headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// Body.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Consumes the response and returns its body.
    #[must_use]
    pub fn into_data(self) -> Value {
        self.data
    }

    /// `Ok(self)` on success, otherwise the response's own error.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::Response`] for an unsuccessful response.
    pub fn into_result(self) -> KinveyResult<Self> {
        match self.error {
            Some(error) => Err(KinveyError::Response(error)),
            None => Ok(self),
        }
    }
}

const fn is_success_status(status_code: u16) -> bool {
    status_code >= 200 && status_code < 300
}

/// A transport result that has not been normalized yet.
///
/// Stages that talk to the network can hand this back instead of building a
/// [`Response`]; the caller converts it with [`From`], keeping every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    /// Status code.
    pub status_code: u16,
    /// Headers.
    pub headers: HeaderStore,
    /// Body.
    pub data: Value,
    /// Error attached by the transport, overriding the derived one.
    pub error: Option<ResponseError>,
}

impl RawResponse {
    /// Creates a raw response without headers or error.
    #[must_use]
    pub fn new(status_code: u16, data: Value) -> Self {
        Self {
            status_code,
            data,
            ..Self::default()
        }
    }
}

impl From<RawResponse> for Response {
    fn from(raw: RawResponse) -> Self {
        let response = Self::new(raw.status_code, raw.headers, raw.data);
        match raw.error {
            Some(error) => response.with_error(error),
            None => response,
        }
    }
}
