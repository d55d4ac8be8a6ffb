//! # Kinvey Test
//!
//! Fixtures for exercising the Kinvey request pipeline without a network:
//! stages with scripted behavior, canned backend responses and fixed device
//! information.
//!
//! ## Example
//!
//! ```
//! use kinvey::{KinveyRequest, KinveyRequestOptions};
//! use kinvey_test::{FixedDeviceInformation, StaticStage};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let network = StaticStage::raw(200, json!([]));
//! let request = KinveyRequest::builder()
//!     .options(KinveyRequestOptions::new().url("https://baas.kinvey.com/appdata/kid_x/books"))
//!     .device_information(FixedDeviceInformation::default())
//!     .stage(network.clone())
//!     .build()
//!     .unwrap();
//!
//! let response = request.execute().await.unwrap();
//! assert_eq!(response.status_code(), 200);
//! assert_eq!(network.calls(), 1);
//! # });
//! ```
//!
//! | Fixture                  | Behavior                                   |
//! |--------------------------|--------------------------------------------|
//! | `StaticStage`            | Same output every time, never forwards     |
//! | `FailingStage`           | Transport error every time                 |
//! | `PendingStage`           | Never settles, counts cancel signals       |
//! | `RecordingStage`         | Logs its name, forwards                    |
//! | `FixedDeviceInformation` | Fixed device payload                       |

#![doc(html_root_url = "https://docs.rs/kinvey-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod device;
mod response;
mod stages;

pub use device::FixedDeviceInformation;
pub use response::{kinvey_error, ok};
pub use stages::{FailingStage, PendingStage, RecordingStage, StageLog, StaticStage};
