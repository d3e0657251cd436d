//! ADB subprocess adapter.
//!
//! # Design
//! - One `adb` invocation per command; no long-lived shell session.
//! - Output parsing lives in free functions so it can be tested without a
//!   device attached.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DeviceError, DeviceResult};
use crate::service::{DeviceClient, DeviceSerial};

/// Marker emitted by the package manager on a successful install/uninstall.
const SUCCESS_MARKER: &str = "Success";
/// Marker emitted by the device shell when a path does not exist.
const MISSING_PATH_MARKER: &str = "No such file";

/// Device client backed by the `adb` command-line tool.
pub struct AdbClient {
    adb_path: PathBuf,
}

impl AdbClient {
    /// Construct a client that shells out to the given `adb` binary.
    #[must_use]
    pub fn new(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    /// Run an adb invocation and fail on a non-zero exit.
    async fn run(&self, operation: &'static str, args: &[&str]) -> DeviceResult<String> {
        let output = self.capture(operation, args).await?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                operation,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run an adb invocation, reporting only spawn failures.
    async fn capture(
        &self,
        operation: &'static str,
        args: &[&str],
    ) -> DeviceResult<std::process::Output> {
        debug!(operation, tool = %self.adb_path.display(), "running device command");
        Command::new(&self.adb_path)
            .args(args)
            .output()
            .await
            .map_err(|source| DeviceError::Spawn {
                operation,
                program: self.adb_path.clone(),
                source,
            })
    }
}

#[async_trait]
impl DeviceClient for AdbClient {
    async fn list_devices(&self) -> DeviceResult<Vec<DeviceSerial>> {
        let stdout = self.run("list_devices", &["devices"]).await?;
        Ok(parse_device_list(&stdout))
    }

    async fn path_exists(&self, device: &DeviceSerial, path: &str) -> DeviceResult<bool> {
        let output = self
            .capture(
                "path_exists",
                &["-s", device.as_str(), "shell", "ls", "-d", path],
            )
            .await?;
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if combined.contains(MISSING_PATH_MARKER) {
            return Ok(false);
        }
        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                operation: "path_exists",
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(true)
    }

    async fn make_dir(&self, device: &DeviceSerial, path: &str) -> DeviceResult<()> {
        // mkdir -p tolerates a directory that already exists.
        self.run(
            "make_dir",
            &["-s", device.as_str(), "shell", "mkdir", "-p", path],
        )
        .await
        .map(|_| ())
    }

    async fn install_apk(&self, device: &DeviceSerial, apk_path: &Path) -> DeviceResult<String> {
        let apk = apk_path.to_string_lossy();
        let stdout = self
            .run(
                "install_apk",
                &["-s", device.as_str(), "install", "-r", apk.as_ref()],
            )
            .await?;
        if !stdout.contains(SUCCESS_MARKER) {
            return Err(DeviceError::Install {
                apk: apk_path.to_path_buf(),
                output: stdout,
            });
        }
        Ok(stdout)
    }

    async fn uninstall(&self, device: &DeviceSerial, package: &str) -> DeviceResult<String> {
        let stdout = self
            .run("uninstall", &["-s", device.as_str(), "uninstall", package])
            .await?;
        if !stdout.contains(SUCCESS_MARKER) {
            return Err(DeviceError::Uninstall {
                package: package.to_string(),
                output: stdout,
            });
        }
        Ok(stdout)
    }

    async fn list_packages(&self, device: &DeviceSerial) -> DeviceResult<Vec<String>> {
        let stdout = self
            .run(
                "list_packages",
                &[
                    "-s",
                    device.as_str(),
                    "shell",
                    "pm",
                    "list",
                    "packages",
                    "-3",
                ],
            )
            .await?;
        Ok(parse_package_list(&stdout))
    }

    async fn push(
        &self,
        device: &DeviceSerial,
        local: &Path,
        remote: &str,
    ) -> DeviceResult<String> {
        let local = local.to_string_lossy();
        self.run(
            "push",
            &["-s", device.as_str(), "push", local.as_ref(), remote],
        )
        .await
    }
}

/// Parse the output of `adb devices` into authorised device serials.
///
/// Lines in states other than `device` (offline, unauthorized) are dropped.
#[must_use]
pub fn parse_device_list(output: &str) -> Vec<DeviceSerial> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            (state == "device").then(|| DeviceSerial::from(serial))
        })
        .collect()
}

/// Parse the output of `pm list packages` into bare package names.
#[must_use]
pub fn parse_package_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_list_skips_header_and_unauthorised_entries() {
        let output = "List of devices attached\n\
                      1WMHH815X30000\tdevice\n\
                      2B0YC1ZF8G0500\tunauthorized\n\
                      emulator-5554\toffline\n\n";
        let devices = parse_device_list(output);
        assert_eq!(devices, vec![DeviceSerial::from("1WMHH815X30000")]);
    }

    #[test]
    fn device_list_handles_empty_output() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[test]
    fn package_list_strips_prefix_and_blank_lines() {
        let output = "package:com.example.game\npackage:com.oculus.browser\n\n";
        let packages = parse_package_list(output);
        assert_eq!(
            packages,
            vec!["com.example.game".to_string(), "com.oculus.browser".to_string()]
        );
    }

    #[test]
    fn package_list_ignores_unrelated_lines() {
        let output = "WARNING: linker: shim\npackage:com.example.game\n";
        assert_eq!(parse_package_list(output), vec!["com.example.game"]);
    }
}
