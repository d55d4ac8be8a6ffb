//! Device information sent with every Kinvey request.

use serde::Serialize;
use serde_json::Value;

/// Supplies the `X-Kinvey-Device-Information` payload.
///
/// Implementations are shared across requests, so they must be cheap to
/// call and thread-safe.
pub trait DeviceInformation: Send + Sync {
    /// The payload as a JSON value. Non-string values are serialized when
    /// the header is set.
    fn to_json(&self) -> Value;
}

impl DeviceInformation for Value {
    fn to_json(&self) -> Value {
        self.clone()
    }
}

/// SDK name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkInfo {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
}

/// Device information for a Rust host.
///
/// Hardware and OS come from the compile target; the OS and platform
/// versions are unknown unless the application supplies them.
///
/// ```
/// use kinvey::{DeviceInformation, RustDeviceInformation};
///
/// let info = RustDeviceInformation::default().with_os_version("14.2");
/// let json = info.to_json();
/// assert_eq!(json["ov"], "14.2");
/// assert_eq!(json["sdk"]["name"], "kinvey");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RustDeviceInformation {
    /// Host runtime.
    pub hv: String,
    /// Machine architecture.
    pub md: String,
    /// Operating system.
    pub os: String,
    /// Operating system version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ov: Option<String>,
    /// SDK identity.
    pub sdk: SdkInfo,
    /// Platform version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv: Option<String>,
}

impl Default for RustDeviceInformation {
    fn default() -> Self {
        Self {
            hv: "rust".to_string(),
            md: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            ov: None,
            sdk: SdkInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            pv: None,
        }
    }
}

impl RustDeviceInformation {
    /// Sets the operating system version.
    pub fn with_os_version(mut self, version: impl Into<String>) -> Self {
        self.ov = Some(version.into());
        self
    }

    /// Sets the platform version.
    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.pv = Some(version.into());
        self
    }
}

impl DeviceInformation for RustDeviceInformation {
    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
