//! # Design
//!
//! - Centralize pipeline error context without using `anyhow`.
//! - Keep error messages constant while carrying context fields for
//!   debugging.
//! - `AlreadyRunning` is informational contention, never fatal to the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::OperationKey;
use loadout_device::{DeviceError, DeviceSerial};
use loadout_engine_core::EngineError;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Primary error type for the download-install pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Another operation is already in flight under the same key.
    ///
    /// Recoverable by the caller: notify or ignore, never retry
    /// automatically.
    #[error("operation already running")]
    AlreadyRunning {
        /// Key the contention occurred under.
        key: OperationKey,
    },
    /// A cycle was started without a selected device.
    #[error("no device selected")]
    NoDeviceSelected,
    /// The targeted device is no longer in the freshly queried device list.
    #[error("device unavailable")]
    DeviceUnavailable {
        /// Serial of the device that went missing.
        device: DeviceSerial,
    },
    /// No APK could be located under the download path.
    #[error("apk not found")]
    ApkNotFound {
        /// Path the scan was rooted at.
        path: PathBuf,
    },
    /// A download engine call failed.
    #[error("engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        #[source]
        source: EngineError,
    },
    /// A device command failed.
    #[error("device operation failed")]
    Device {
        /// Operation identifier.
        operation: &'static str,
        /// Source device error.
        #[source]
        source: DeviceError,
    },
    /// A local filesystem operation failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Render the error with its full source chain for user-visible
    /// notifications.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            rendered.push_str(": ");
            rendered.push_str(&err.to_string());
            source = err.source();
        }
        rendered
    }
}
