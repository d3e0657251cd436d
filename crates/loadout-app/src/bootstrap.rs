//! Service wiring and the application run loop.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use loadout_catalog::CatalogClient;
use loadout_config::ConfigService;
use loadout_device::AdbClient;
use loadout_engine_core::DownloadEngine;
use loadout_engine_deluge::DelugeClient;
use loadout_events::EventBus;
use loadout_pipeline::{ControlMessage, MagnetJob, Orchestrator, TaskRegistry};
use loadout_telemetry::{LoggingConfig, Metrics, init_logging};

/// Environment variable overriding the settings file location.
const CONFIG_PATH_VAR: &str = "LOADOUT_CONFIG";
/// Settings file used when no override is present.
const DEFAULT_CONFIG_PATH: &str = "loadout.json";

/// Fully wired application context.
pub struct AppContext {
    /// Settings facade shared with the pipeline.
    pub settings: ConfigService,
    /// Shared domain event bus.
    pub events: EventBus,
    /// Shared metrics registry.
    pub metrics: Metrics,
    /// Single-flight operation guard.
    pub registry: Arc<TaskRegistry>,
    /// Download-install orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Catalog client, absent when no base URL is configured.
    pub catalog: Option<CatalogClient>,
}

impl AppContext {
    /// Build the full service graph from the settings document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when settings cannot be loaded or a client cannot be
    /// constructed.
    pub fn initialise(path: impl Into<PathBuf>) -> AppResult<Self> {
        let settings =
            ConfigService::load(path).map_err(|err| AppError::config("settings.load", err))?;
        let snapshot = settings.snapshot();

        let events = EventBus::new();
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics.new", err))?;

        let engine = Arc::new(
            DelugeClient::new(&snapshot.engine.endpoint, &snapshot.engine.password)
                .map_err(|err| AppError::engine("engine.build_client", err))?,
        );
        let device = Arc::new(AdbClient::new(&snapshot.adb_path));
        let registry = Arc::new(TaskRegistry::new());
        let orchestrator = Arc::new(Orchestrator::new(
            engine as Arc<dyn DownloadEngine>,
            device,
            settings.clone(),
            events.clone(),
            metrics.clone(),
            Arc::clone(&registry),
        ));

        let catalog = if snapshot.catalog.base_url.trim().is_empty() {
            None
        } else {
            Some(
                CatalogClient::new(&snapshot.catalog.base_url)
                    .map_err(|err| AppError::catalog("catalog.new", err))?,
            )
        };

        Ok(Self {
            settings,
            events,
            metrics,
            registry,
            orchestrator,
            catalog,
        })
    }

    /// Build a magnet job rooted under the configured download directory,
    /// handing the control-channel write end back to the caller.
    #[must_use]
    pub fn magnet_job(
        &self,
        uri: &str,
        name: &str,
        index: usize,
    ) -> (MagnetJob, mpsc::Sender<ControlMessage>) {
        let snapshot = self.settings.snapshot();
        let download_path = snapshot.download_root.join(name);
        let (mut job, control) = MagnetJob::new(uri, name, download_path, index);
        job.poll_interval = snapshot.poll_interval();
        (job, control)
    }

    /// Spawn a task that mirrors bus events into the metrics registry.
    pub fn spawn_event_metrics(&self) -> JoinHandle<()> {
        let mut stream = self.events.subscribe(None);
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            while let Some(envelope) = stream.next().await {
                metrics.inc_event(envelope.event.kind());
            }
        })
    }
}

/// Entry point for the application boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or startup fails.
pub async fn run_app() -> AppResult<()> {
    init_logging(&LoggingConfig::default())
        .map_err(|err| AppError::telemetry("logging.init", err))?;

    let config_path =
        std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!(config_path = %config_path, "loadout starting");

    let context = AppContext::initialise(config_path)?;
    let _metrics_worker = context.spawn_event_metrics();

    match context.orchestrator.refresh_devices().await {
        Ok(devices) => {
            info!(count = devices.len(), "attached devices discovered");
            if context.orchestrator.selected_device().await.is_none()
                && let Some(first) = devices.first()
            {
                context.orchestrator.select_device(Some(first.clone())).await;
                info!(device = %first, "auto-selected first attached device");
            }
        }
        Err(err) => {
            // Not fatal at startup: the device may be attached later.
            warn!(error = %err, "initial device discovery failed");
        }
    }

    info!("loadout ready; waiting for shutdown signal");
    tokio::signal::ctrl_c()
        .await
        .map_err(|source| AppError::Shutdown { source })?;
    info!("shutdown signal received; draining in-flight work");
    context.orchestrator.wait_idle().await;
    info!("loadout stopped");
    Ok(())
}
