//! Device command trait implemented by transport adapters.

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use crate::error::DeviceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Serial identifier of an attached device, as reported by `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceSerial(pub String);

impl DeviceSerial {
    /// Borrow the raw serial string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the serial carries any content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for DeviceSerial {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for DeviceSerial {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Remote device command executor consumed by the install pipeline.
///
/// Every call is a fresh round-trip to the device; implementations do not
/// cache device or package lists, since stale snapshots are a known failure
/// mode of the install flow.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Enumerate the serials of currently attached, authorised devices.
    async fn list_devices(&self) -> DeviceResult<Vec<DeviceSerial>>;

    /// Whether a path exists on the device filesystem.
    async fn path_exists(&self, device: &DeviceSerial, path: &str) -> DeviceResult<bool>;

    /// Create a directory (and parents) on the device filesystem.
    ///
    /// An already-existing directory is success, not failure.
    async fn make_dir(&self, device: &DeviceSerial, path: &str) -> DeviceResult<()>;

    /// Install an APK onto the device, returning the tool's stdout.
    async fn install_apk(&self, device: &DeviceSerial, apk_path: &Path) -> DeviceResult<String>;

    /// Uninstall a package, returning the tool's stdout.
    ///
    /// Output without the success marker fails with
    /// [`crate::DeviceError::Uninstall`].
    async fn uninstall(&self, device: &DeviceSerial, package: &str) -> DeviceResult<String>;

    /// List third-party package names installed on the device.
    async fn list_packages(&self, device: &DeviceSerial) -> DeviceResult<Vec<String>>;

    /// Copy a local file or directory tree onto the device.
    async fn push(
        &self,
        device: &DeviceSerial,
        local: &Path,
        remote: &str,
    ) -> DeviceResult<String>;
}
