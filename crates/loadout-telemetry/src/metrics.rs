//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters/gauges relevant to the pipeline.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    events_emitted_total: IntCounterVec,
    downloads_total: IntCounterVec,
    install_steps_total: IntCounterVec,
    device_commands_total: IntCounterVec,
    rollback_uninstalls_total: IntCounter,
    active_jobs: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of download-install cycles currently in flight.
    pub active_jobs: i64,
    /// Total packages removed by cancellation rollback sweeps.
    pub rollback_uninstalls_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Domain events emitted by type"),
            &["type"],
        )?;
        let downloads_total = IntCounterVec::new(
            Opts::new("downloads_total", "Supervised downloads by outcome"),
            &["outcome"],
        )?;
        let install_steps_total = IntCounterVec::new(
            Opts::new(
                "install_steps_total",
                "Device install steps executed by status",
            ),
            &["step", "status"],
        )?;
        let device_commands_total = IntCounterVec::new(
            Opts::new("device_commands_total", "Device commands issued by kind"),
            &["command"],
        )?;
        let rollback_uninstalls_total = IntCounter::with_opts(Opts::new(
            "rollback_uninstalls_total",
            "Packages uninstalled by cancellation rollback",
        ))?;
        let active_jobs = IntGauge::with_opts(Opts::new(
            "active_jobs",
            "Download-install cycles currently running",
        ))?;

        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(downloads_total.clone()))?;
        registry.register(Box::new(install_steps_total.clone()))?;
        registry.register(Box::new(device_commands_total.clone()))?;
        registry.register(Box::new(rollback_uninstalls_total.clone()))?;
        registry.register(Box::new(active_jobs.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                events_emitted_total,
                downloads_total,
                install_steps_total,
                device_commands_total,
                rollback_uninstalls_total,
                active_jobs,
            }),
        })
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Increment the download counter for a terminal outcome.
    pub fn inc_download_outcome(&self, outcome: &str) {
        self.inner
            .downloads_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the install step counter.
    pub fn inc_install_step(&self, step: &str, status: &str) {
        self.inner
            .install_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Increment the device command counter.
    pub fn inc_device_command(&self, command: &str) {
        self.inner
            .device_commands_total
            .with_label_values(&[command])
            .inc();
    }

    /// Increment the rollback uninstall counter.
    pub fn inc_rollback_uninstall(&self) {
        self.inner.rollback_uninstalls_total.inc();
    }

    /// Set the active job gauge.
    pub fn set_active_jobs(&self, count: i64) {
        self.inner.active_jobs.set(count);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_jobs: self.inner.active_jobs.get(),
            rollback_uninstalls_total: self.inner.rollback_uninstalls_total.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_event("download_progress");
        metrics.inc_download_outcome("completed");
        metrics.inc_install_step("push_data", "completed");
        metrics.inc_device_command("install_apk");
        metrics.inc_rollback_uninstall();
        metrics.set_active_jobs(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_jobs, 1);
        assert_eq!(snapshot.rollback_uninstalls_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("downloads_total"));
        assert!(rendered.contains("install_steps_total"));
        assert!(rendered.contains("rollback_uninstalls_total"));
        Ok(())
    }
}
