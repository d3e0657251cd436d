//! Top-level download-then-install sequencing.
//!
//! One cycle per process at a time: the registry key is the operation, not
//! the job, so a second `start_download_and_install` fails with
//! `AlreadyRunning` even for a different magnet. That serialisation is the
//! shipped contract of the tool, made explicit here by the key choice.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::install::InstallSession;
use crate::registry::{OperationKey, TaskRegistry};
use crate::scan;
use crate::torrent::{DownloadOutcome, MagnetJob, TorrentSession};
use loadout_config::ConfigService;
use loadout_device::{DeviceClient, DeviceSerial};
use loadout_engine_core::DownloadEngine;
use loadout_events::{Event, EventBus};
use loadout_telemetry::Metrics;

/// Coordinates one download-install cycle across the engine and the device.
pub struct Orchestrator {
    engine: Arc<dyn DownloadEngine>,
    device: Arc<dyn DeviceClient>,
    settings: ConfigService,
    events: EventBus,
    metrics: Metrics,
    registry: Arc<TaskRegistry>,
    selected: RwLock<Option<DeviceSerial>>,
}

impl Orchestrator {
    /// Construct an orchestrator with shared dependencies.
    #[must_use]
    pub fn new(
        engine: Arc<dyn DownloadEngine>,
        device: Arc<dyn DeviceClient>,
        settings: ConfigService,
        events: EventBus,
        metrics: Metrics,
        registry: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            engine,
            device,
            settings,
            events,
            metrics,
            registry,
            selected: RwLock::new(None),
        }
    }

    /// Record the device subsequent cycles should target.
    pub async fn select_device(&self, device: Option<DeviceSerial>) {
        let mut selected = self.selected.write().await;
        *selected = device;
    }

    /// Currently selected device, if any.
    pub async fn selected_device(&self) -> Option<DeviceSerial> {
        self.selected.read().await.clone()
    }

    /// Query the attached-device list, dropping a selection that vanished.
    ///
    /// # Errors
    ///
    /// Returns an error when the device list cannot be queried.
    pub async fn refresh_devices(&self) -> PipelineResult<Vec<DeviceSerial>> {
        let devices = self
            .device
            .list_devices()
            .await
            .map_err(|source| PipelineError::Device {
                operation: "list_devices",
                source,
            })?;
        self.metrics.inc_device_command("list_devices");

        let mut selected = self.selected.write().await;
        if let Some(current) = selected.as_ref()
            && !devices.contains(current)
        {
            warn!(device = %current, "selected device disappeared from the device list");
            *selected = None;
        }
        Ok(devices)
    }

    /// Start a download-install cycle for the job.
    ///
    /// # Errors
    ///
    /// Rejects immediately with [`PipelineError::NoDeviceSelected`] when no
    /// device is selected and offline mode is off, and with
    /// [`PipelineError::AlreadyRunning`] when a cycle is already in flight;
    /// the latter is informational, never retried automatically.
    pub async fn start_download_and_install(self: &Arc<Self>, job: MagnetJob) -> PipelineResult<()> {
        let settings = self.settings.snapshot();
        let selected = self.selected_device().await;
        if selected.is_none() && !settings.install.offline_mode {
            return Err(PipelineError::NoDeviceSelected);
        }

        let orchestrator = Arc::clone(self);
        self.registry
            .start_if_idle(OperationKey::DownloadInstall, move |_cancel| async move {
                orchestrator.run_cycle(job, selected).await;
            })
    }

    /// Wait for the in-flight cycle, if any, to finish.
    pub async fn wait_idle(&self) {
        self.registry.join(OperationKey::DownloadInstall).await;
    }

    async fn run_cycle(&self, mut job: MagnetJob, selected: Option<DeviceSerial>) {
        self.metrics.set_active_jobs(1);

        // Baseline for the cancellation-rollback path only.
        let package_snapshot = match &selected {
            Some(device) => match self.device.list_packages(device).await {
                Ok(packages) => Some(packages),
                Err(err) => {
                    warn!(error = %err, "package snapshot failed; rollback disabled for this cycle");
                    None
                }
            },
            None => None,
        };

        let session = TorrentSession::new(
            Arc::clone(&self.engine),
            self.events.clone(),
            self.metrics.clone(),
        );
        match session.run(&mut job).await {
            Ok(DownloadOutcome::Completed) => {
                self.after_download(&job, selected.as_ref()).await;
            }
            Ok(DownloadOutcome::Cancelled) => {
                if let (Some(device), Some(before)) = (selected.as_ref(), package_snapshot) {
                    self.rollback(device, before).await;
                }
            }
            Ok(DownloadOutcome::Failed) => {
                // Already surfaced on the event bus by the session.
            }
            Err(err) => {
                error!(error = %err, name = %job.name, "download supervision failed");
            }
        }

        self.metrics.set_active_jobs(0);
    }

    async fn after_download(&self, job: &MagnetJob, selected: Option<&DeviceSerial>) {
        // Settings are re-read at each step, never cached across the cycle.
        if self.settings.snapshot().install.download_only {
            info!(name = %job.name, "download-only requested; skipping install");
            return;
        }
        let Some(device) = selected else {
            info!(name = %job.name, "no device attached; downloaded files kept on disk");
            return;
        };

        let target = match scan::find_install_target(&job.download_path, device, job.index) {
            Ok(target) => target,
            Err(err) => {
                let _ = self.events.publish(Event::InstallFailed {
                    index: job.index,
                    message: err.detail(),
                });
                error!(error = %err, path = %job.download_path.display(), "install target scan failed");
                return;
            }
        };

        let session = InstallSession::new(
            Arc::clone(&self.device),
            self.events.clone(),
            self.metrics.clone(),
        );
        if let Err(err) = session.run(&target).await {
            // No automatic retry; the failure already reached the event bus.
            error!(error = %err, device = %device, "install failed");
            return;
        }

        if self.settings.snapshot().install.delete_after_install {
            if let Err(err) = tokio::fs::remove_dir_all(&job.download_path).await {
                warn!(
                    error = %err,
                    path = %job.download_path.display(),
                    "failed to delete downloaded files after install"
                );
            }
        }

        let _ = self.events.publish(Event::PackagesChanged {
            device: device.to_string(),
        });
    }

    /// Best-effort safety net after a cancelled download: uninstall any
    /// package that appeared since the pre-download snapshot. Per-package
    /// failures log and continue; the sweep never aborts.
    async fn rollback(&self, device: &DeviceSerial, before: Vec<String>) {
        let after = match self.device.list_packages(device).await {
            Ok(packages) => packages,
            Err(err) => {
                warn!(error = %err, "rollback skipped; package list unavailable");
                return;
            }
        };

        let baseline: HashSet<String> = before.into_iter().collect();
        for package in after
            .into_iter()
            .filter(|package| !baseline.contains(package))
        {
            match self.device.uninstall(device, &package).await {
                Ok(_) => {
                    self.metrics.inc_rollback_uninstall();
                    info!(package = %package, "rollback uninstalled interim package");
                }
                Err(err) => {
                    warn!(package = %package, error = %err, "rollback uninstall failed; continuing");
                }
            }
        }

        let _ = self.events.publish(Event::PackagesChanged {
            device: device.to_string(),
        });
    }
}
