//! Default values for fresh settings documents.

use std::path::PathBuf;

use crate::model::{CatalogSettings, EngineSettings, InstallSettings, Settings};


/// Default Deluge web endpoint on a local daemon.
pub const DEFAULT_ENGINE_ENDPOINT: &str = "http://127.0.0.1:8112/json";
/// Default Deluge web password.
pub const DEFAULT_ENGINE_PASSWORD: &str = "deluge";
/// Default seconds between download status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("downloads"),
            adb_path: PathBuf::from("adb"),
            engine: EngineSettings::default(),
            catalog: CatalogSettings::default(),
            install: InstallSettings::default(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENGINE_ENDPOINT.to_string(),
            password: DEFAULT_ENGINE_PASSWORD.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

