//! # Kinvey Core
//!
//! Value types shared by every layer of the Kinvey request pipeline.
//!
//! - [`Request`] - generic HTTP request with header/body coupling and a
//!   single-flight execution guard
//! - [`HeaderStore`] - case-insensitive, insertion-ordered header bag
//! - [`Method`] - the five verbs the backend accepts
//! - [`Response`] / [`RawResponse`] - normalized and raw transport results
//! - [`KinveyError`] / [`ResponseError`] - error taxonomy

#![doc(html_root_url = "https://docs.rs/kinvey-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod headers;
mod method;
mod request;
mod response;

pub use error::{KinveyError, KinveyResult, ResponseError, ResponseErrorKind};
pub use headers::HeaderStore;
pub use method::Method;
pub use request::{Request, RequestOptions, RequestSnapshot};
pub use response::{RawResponse, Response};
