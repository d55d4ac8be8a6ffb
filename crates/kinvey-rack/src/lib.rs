//! # Kinvey Rack
//!
//! The rack is the ordered chain of stages every request runs through on its
//! way to a response: cache lookup, serialization, network I/O and so on.
//!
//! ```text
//! execute(request) → stage 1 → stage 2 → … → stage N
//!                                              ↓
//! Ok(Some(output)) / Ok(None) / Err ←──────────┘
//! ```
//!
//! - Stages run in registration order and may forward, short-circuit or fail.
//! - The stage list can be changed between executions (`push_stage`,
//!   `insert_stage`, `remove_stage`).
//! - [`Rack::cancel`] reaches whichever stage is active and settles the
//!   execution with `KinveyError::Cancelled`.
//!
//! ## Example
//!
//! ```
//! use kinvey_core::Request;
//! use kinvey_rack::{stages::LoggingStage, FnStage, Rack};
//!
//! let mut rack: Rack<Request> = Rack::builder()
//!     .stage(LoggingStage::new())
//!     .build();
//!
//! rack.push_stage(FnStage::new("network", |ctx, request: &Request, next| {
//!     Box::pin(async move { next.run(ctx, request).await })
//! }));
//!
//! assert_eq!(rack.stage_names(), vec!["logging", "network"]);
//! ```

#![doc(html_root_url = "https://docs.rs/kinvey-rack/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
mod rack;
pub mod request;
pub mod stage;
pub mod stages;

pub use context::{ExecutionId, RackContext};
pub use rack::{BoxedStage, Rack, RackBuilder};
pub use request::RackRequest;
pub use stage::{BoxFuture, FnStage, Next, RackOutput, Stage, StageResult};
