//! Stages shipped with the rack.
//!
//! Cache, serialization and network stages live with the transport that
//! provides them; this module only carries diagnostics.

pub mod logging;

pub use logging::LoggingStage;
