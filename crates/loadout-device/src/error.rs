//! # Design
//!
//! - Centralize ADB transport error context without using `anyhow`.
//! - Keep error messages constant; store operational context in fields.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The adb binary could not be spawned.
    #[error("failed to spawn device tool")]
    Spawn {
        /// Operation identifier.
        operation: &'static str,
        /// Program path that failed to launch.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The device command exited unsuccessfully.
    #[error("device command failed")]
    CommandFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Process exit code when available.
        code: Option<i32>,
        /// Captured stderr payload.
        stderr: String,
    },
    /// The package installer did not report success.
    #[error("apk install rejected by device")]
    Install {
        /// APK path handed to the installer.
        apk: PathBuf,
        /// Raw installer output.
        output: String,
    },
    /// The package uninstaller did not report success.
    #[error("package uninstall rejected by device")]
    Uninstall {
        /// Package the uninstall targeted.
        package: String,
        /// Raw uninstaller output.
        output: String,
    },
}

/// Convenience alias for device operation results.
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn messages_stay_constant_with_context_in_fields() {
        let spawn = DeviceError::Spawn {
            operation: "list_devices",
            program: PathBuf::from("adb"),
            source: io::Error::other("not found"),
        };
        assert_eq!(spawn.to_string(), "failed to spawn device tool");
        assert!(spawn.source().is_some());

        let uninstall = DeviceError::Uninstall {
            package: "com.example.game".into(),
            output: "Failure [DELETE_FAILED_INTERNAL_ERROR]".into(),
        };
        assert_eq!(
            uninstall.to_string(),
            "package uninstall rejected by device"
        );
        assert!(uninstall.source().is_none());
    }
}
