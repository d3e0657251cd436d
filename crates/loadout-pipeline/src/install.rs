//! Device-install sequence for one downloaded package.
//!
//! Steps run in listed order, sequentially; a failed device command aborts
//! the remaining steps. A partial install (APK present, some data missing)
//! is an accepted outcome surfaced as an error; nothing here rolls it back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use humansize::{DECIMAL, format_size};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{PipelineError, PipelineResult};
use loadout_device::{DeviceClient, DeviceError, DeviceSerial};
use loadout_events::{Event, EventBus};
use loadout_telemetry::Metrics;

/// Device-side root for supplementary game data.
pub const OBB_ROOT: &str = "/sdcard/Android/obb";

/// One package ready to be pushed to a device.
///
/// Built by scanning the download path after a completed download; consumed
/// once and not retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// APK to hand to the package installer.
    pub apk_path: PathBuf,
    /// Sibling directories mirrored onto the device, in listed order.
    pub data_dirs: Vec<PathBuf>,
    /// Sibling loose files mirrored onto the device, in listed order.
    pub data_files: Vec<PathBuf>,
    /// Device the install targets.
    pub device: DeviceSerial,
    /// Device-side data directory the siblings are pushed into.
    pub remote_data_dir: String,
    /// Caller's correlation token for progress routing.
    pub index: usize,
}

/// Pushes one [`InstallTarget`] to a device and reports incremental status.
pub struct InstallSession {
    device: Arc<dyn DeviceClient>,
    events: EventBus,
    metrics: Metrics,
}

impl InstallSession {
    /// Construct a session over the given device client and event bus.
    #[must_use]
    pub fn new(device: Arc<dyn DeviceClient>, events: EventBus, metrics: Metrics) -> Self {
        Self {
            device,
            events,
            metrics,
        }
    }

    /// Run the install sequence to completion.
    ///
    /// # Errors
    ///
    /// Fails with [`PipelineError::ApkNotFound`] when the APK is gone at
    /// invocation time, [`PipelineError::DeviceUnavailable`] when the device
    /// is absent from a freshly queried device list, and
    /// [`PipelineError::Device`] when any device command fails. The failure
    /// is routed onto the event bus before it propagates.
    pub async fn run(&self, target: &InstallTarget) -> PipelineResult<()> {
        match self.run_steps(target).await {
            Ok(()) => {
                let _ = self.events.publish(Event::InstallCompleted {
                    index: target.index,
                });
                info!(device = %target.device, apk = %target.apk_path.display(), "install completed");
                Ok(())
            }
            Err(err) => {
                let _ = self.events.publish(Event::InstallFailed {
                    index: target.index,
                    message: err.detail(),
                });
                Err(err)
            }
        }
    }

    async fn run_steps(&self, target: &InstallTarget) -> PipelineResult<()> {
        if !target.apk_path.exists() {
            return Err(PipelineError::ApkNotFound {
                path: target.apk_path.clone(),
            });
        }

        // The device list is queried fresh here; an earlier snapshot must
        // not be trusted.
        if target.device.is_empty() {
            return Err(PipelineError::DeviceUnavailable {
                device: target.device.clone(),
            });
        }
        let devices = self
            .device
            .list_devices()
            .await
            .map_err(|source| self.step_failed("list_devices", source))?;
        self.metrics.inc_device_command("list_devices");
        if !devices.contains(&target.device) {
            return Err(PipelineError::DeviceUnavailable {
                device: target.device.clone(),
            });
        }

        let apk_name = target
            .apk_path
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        let content_root = target
            .apk_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let total_size = directory_size(&content_root);
        let _ = self.events.publish(Event::InstallStarted {
            index: target.index,
            apk_name: apk_name.clone(),
            total_size: format_size(total_size, DECIMAL),
        });
        info!(
            device = %target.device,
            apk = %apk_name,
            total_bytes = total_size,
            "installing package"
        );

        self.device
            .install_apk(&target.device, &target.apk_path)
            .await
            .map_err(|source| self.step_failed("install_apk", source))?;
        self.metrics.inc_device_command("install_apk");
        self.metrics.inc_install_step("install_apk", "completed");

        self.publish_step(target.index, "moving data files");

        let exists = self
            .device
            .path_exists(&target.device, &target.remote_data_dir)
            .await
            .map_err(|source| self.step_failed("path_exists", source))?;
        if !exists {
            self.device
                .make_dir(&target.device, &target.remote_data_dir)
                .await
                .map_err(|source| self.step_failed("make_dir", source))?;
        }
        self.metrics.inc_install_step("ensure_data_dir", "completed");

        // Sequential on purpose: parallel pushes would contend on the USB
        // transport.
        for dir in &target.data_dirs {
            self.push_entry(target, dir).await?;
        }
        for file in &target.data_files {
            self.push_entry(target, file).await?;
        }
        self.metrics.inc_install_step("push_data", "completed");

        self.publish_step(target.index, "installed");
        Ok(())
    }

    async fn push_entry(&self, target: &InstallTarget, local: &Path) -> PipelineResult<()> {
        self.device
            .push(&target.device, local, &target.remote_data_dir)
            .await
            .map_err(|source| {
                self.metrics.inc_install_step("push_data", "failed");
                self.step_failed("push", source)
            })?;
        self.metrics.inc_device_command("push");
        Ok(())
    }

    fn publish_step(&self, index: usize, step: &str) {
        let _ = self.events.publish(Event::InstallStep {
            index,
            step: step.to_string(),
        });
    }

    fn step_failed(&self, operation: &'static str, source: DeviceError) -> PipelineError {
        self.metrics.inc_install_step(operation, "failed");
        warn!(operation, error = %source, "install step failed");
        PipelineError::Device { operation, source }
    }
}

/// Recursively sum file sizes under the download root.
///
/// Unreadable entries contribute nothing rather than failing the install.
fn directory_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
