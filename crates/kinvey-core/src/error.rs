//! Error types for the request pipeline.
//!
//! [`KinveyError`] is the error type returned by every fallible operation in
//! the workspace. Unsuccessful responses surface their own [`ResponseError`]
//! through [`KinveyError::Response`] without further wrapping.
//!
//! # `ResponseErrorKind` mapping
//!
//! | Kind | Typical status | Kinvey error names |
//! |---|---|---|
//! | `BadRequest` | 400 | `ParameterValueOutOfRange`, `JSONParseError`, `MissingQuery`, ... |
//! | `InvalidCredentials` | 401 | `InvalidCredentials` |
//! | `InsufficientCredentials` | 403 | `InsufficientCredentials` |
//! | `NotFound` | 404 | `EntityNotFound`, `CollectionNotFound`, `AppNotFound`, ... |
//! | `Conflict` | 409 | `DuplicateEndUsers`, `StaleRequest` |
//! | `RateLimited` | 429 | |
//! | `BusinessLogic` | 400/500 | `BLRuntimeError`, `BLTimeoutError`, ... |
//! | `Server` | 5xx | `KinveyInternalErrorRetry`, `KinveyInternalErrorStop` |
//! | `Kinvey` | other | fallback |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result type alias using [`KinveyError`].
pub type KinveyResult<T> = Result<T, KinveyError>;

/// Errors raised while building or executing a request.
///
/// # Example
///
/// ```
/// use kinvey_core::{KinveyError, Method};
///
/// let err = "OPTIONS".parse::<Method>().unwrap_err();
/// assert!(matches!(err, KinveyError::InvalidArgument { .. }));
/// ```
#[derive(Error, Debug)]
pub enum KinveyError {
    /// Malformed method, missing header name or value, non-object header map.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable error message.
        message: String,
    },

    /// `execute()` was called while a prior execution is still in flight.
    #[error("Request is already executing")]
    AlreadyExecuting,

    /// Serialized custom properties reached the configured byte cap.
    #[error(
        "Custom request properties are {actual} bytes. \
         It must be less than {allowed} bytes."
    )]
    SizeLimitExceeded {
        /// Serialized size in bytes.
        actual: usize,
        /// Configured cap in bytes.
        allowed: usize,
    },

    /// The rack settled without producing a response.
    #[error("No response was returned by the request rack")]
    NoResponse,

    /// The response was unsuccessful; carries the response's own error.
    #[error(transparent)]
    Response(ResponseError),

    /// Opaque failure raised by a rack stage.
    #[error("Transport error: {message}")]
    Transport {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The execution was cancelled before it produced a response.
    #[error("Request was cancelled{}", stage_suffix(.stage))]
    Cancelled {
        /// The stage that was active when the cancellation arrived.
        stage: Option<String>,
    },
}

impl KinveyError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a transport error without an underlying cause.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping an underlying cause.
    #[must_use]
    pub fn transport_with_source(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(stage: Option<String>) -> Self {
        Self::Cancelled { stage }
    }

    /// Returns `true` for [`KinveyError::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns `true` for [`KinveyError::Response`].
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// The response error, if this failure came from an unsuccessful response.
    #[must_use]
    pub const fn response_error(&self) -> Option<&ResponseError> {
        match self {
            Self::Response(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResponseError> for KinveyError {
    fn from(err: ResponseError) -> Self {
        Self::Response(err)
    }
}

/// Classification of an unsuccessful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseErrorKind {
    /// Malformed request.
    BadRequest,
    /// Missing or invalid credentials.
    InvalidCredentials,
    /// Credentials lack permission.
    InsufficientCredentials,
    /// Entity, collection, app, user or blob not found.
    NotFound,
    /// Conflicting write.
    Conflict,
    /// Too many requests.
    RateLimited,
    /// Business logic (custom endpoint or hook) failure.
    BusinessLogic,
    /// Backend failure.
    Server,
    /// Anything else.
    Kinvey,
}

impl ResponseErrorKind {
    /// Maps a Kinvey error name (the `error` field of an error body).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "InvalidCredentials" => Self::InvalidCredentials,
            "InsufficientCredentials" => Self::InsufficientCredentials,
            "BLRuntimeError" | "BLTimeoutError" | "BLViolationError" | "BLInternalError" => {
                Self::BusinessLogic
            }
            "KinveyInternalErrorRetry" | "KinveyInternalErrorStop" => Self::Server,
            "DuplicateEndUsers" | "StaleRequest" => Self::Conflict,
            "FeatureUnavailable"
            | "ParameterValueOutOfRange"
            | "IncompleteRequestBody"
            | "JSONParseError"
            | "MissingQuery"
            | "MissingRequestHeader"
            | "MissingRequestParameter"
            | "APIVersionNotAvailable"
            | "APIVersionNotImplemented" => Self::BadRequest,
            n if n.ends_with("NotFound") => Self::NotFound,
            _ => return None,
        };
        Some(kind)
    }

    /// Maps an HTTP status code.
    #[must_use]
    pub const fn from_status(status_code: u16) -> Self {
        match status_code {
            400 => Self::BadRequest,
            401 => Self::InvalidCredentials,
            403 => Self::InsufficientCredentials,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Kinvey,
        }
    }

    /// Error name used when the response body does not carry one.
    #[must_use]
    pub const fn default_name(&self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequestError",
            Self::InvalidCredentials => "InvalidCredentialsError",
            Self::InsufficientCredentials => "InsufficientCredentialsError",
            Self::NotFound => "NotFoundError",
            Self::Conflict => "ConflictError",
            Self::RateLimited => "RateLimitError",
            Self::BusinessLogic => "BLError",
            Self::Server => "ServerError",
            Self::Kinvey => "KinveyError",
        }
    }
}

/// The error associated with an unsuccessful [`Response`](crate::Response).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{name}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    /// Classification.
    pub kind: ResponseErrorKind,
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Kinvey error name, e.g. `EntityNotFound`.
    pub name: String,
    /// Human-readable description.
    pub message: String,
    /// Backend debug information, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

impl ResponseError {
    /// Creates an error of the given kind using its default name.
    #[must_use]
    pub fn new(kind: ResponseErrorKind, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code,
            name: kind.default_name().to_string(),
            message: message.into(),
            debug: None,
        }
    }

    /// Shorthand for a 404 `NotFoundError`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ResponseErrorKind::NotFound, 404, message)
    }

    /// Sets the debug information.
    #[must_use]
    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }

    /// Derives an error from a response status and its body.
    ///
    /// Reads the Kinvey error body shape `{"error", "description", "debug"}`
    /// and falls back to the status code when fields are missing.
    #[must_use]
    pub fn from_body(status_code: u16, body: &Value) -> Self {
        let name = body
            .get("error")
            .or_else(|| body.get("name"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        let kind = name
            .and_then(ResponseErrorKind::from_name)
            .unwrap_or_else(|| ResponseErrorKind::from_status(status_code));

        let message = body
            .get("description")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .map_or_else(|| default_message(status_code), str::to_string);

        let debug = body.get("debug").and_then(|d| match d {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });

        Self {
            kind,
            status_code,
            name: name.map_or_else(|| kind.default_name().to_string(), str::to_string),
            message,
            debug,
        }
    }
}

fn stage_suffix(stage: &Option<String>) -> String {
    stage
        .as_deref()
        .map(|s| format!(" in stage `{s}`"))
        .unwrap_or_default()
}

fn default_message(status_code: u16) -> String {
    StatusCode::from_u16(status_code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(
            || "An error occurred.".to_string(),
            |reason| format!("{reason}."),
        )
}
