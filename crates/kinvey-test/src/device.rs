//! Deterministic device information.

use kinvey::DeviceInformation;
use serde_json::{json, Value};

/// Reports the same payload on every call, independent of the build target.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedDeviceInformation(Value);

impl FixedDeviceInformation {
    /// Reports `payload`.
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }
}

impl Default for FixedDeviceInformation {
    fn default() -> Self {
        Self(json!({
            "hv": "test",
            "md": "test-machine",
            "os": "test-os",
            "ov": "1.0",
            "sdk": {"name": "kinvey", "version": "0.0.0"},
            "pv": "1.0",
        }))
    }
}

impl DeviceInformation for FixedDeviceInformation {
    fn to_json(&self) -> Value {
        self.0.clone()
    }
}
