//! Typed settings models.
//!
//! # Design
//! - Pure data carriers used by the settings service and the pipeline.
//! - Steps read a fresh snapshot when they need a flag; nothing caches
//!   settings across pipeline stages.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Full application settings document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Root directory downloads are materialised into.
    pub download_root: PathBuf,
    /// Path of the adb binary used for device commands.
    pub adb_path: PathBuf,
    /// Download engine connection profile.
    pub engine: EngineSettings,
    /// Companion catalog connection profile.
    pub catalog: CatalogSettings,
    /// Install-flow behaviour flags.
    pub install: InstallSettings,
}

impl Settings {
    /// Poll interval used by the download supervision loop.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.engine.poll_interval_secs)
    }
}

/// Connection profile for the Deluge daemon's web API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    /// JSON-RPC endpoint of the daemon's web interface.
    pub endpoint: String,
    /// Web interface password.
    pub password: String,
    /// Seconds between download status polls.
    pub poll_interval_secs: u64,
}

/// Connection profile for the companion catalog/auth API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogSettings {
    /// Base URL of the catalog API; empty disables catalog access.
    pub base_url: String,
}

/// Behaviour flags consulted by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallSettings {
    /// Stop after a completed download without installing.
    pub download_only: bool,
    /// Delete the downloaded files once the install succeeds.
    pub delete_after_install: bool,
    /// Allow starting a cycle without a connected device.
    pub offline_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_roundtrip_through_json() -> anyhow::Result<()> {
        let settings = Settings {
            download_root: PathBuf::from("/data/games"),
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings)?;
        let parsed: Settings = serde_json::from_str(&json)?;
        assert_eq!(parsed, settings);
        Ok(())
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() -> anyhow::Result<()> {
        let parsed: Settings = serde_json::from_str(r#"{"install": {"download_only": true}}"#)?;
        assert!(parsed.install.download_only);
        assert!(!parsed.install.delete_after_install);
        assert_eq!(parsed.engine.poll_interval_secs, 1);
        Ok(())
    }

    #[test]
    fn poll_interval_derives_from_engine_settings() {
        let mut settings = Settings::default();
        settings.engine.poll_interval_secs = 3;
        assert_eq!(settings.poll_interval(), Duration::from_secs(3));
    }
}
