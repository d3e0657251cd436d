//! JSON file IO for settings documents.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;

/// Load settings from the given path, falling back to defaults when the file
/// does not exist yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> ConfigResult<Settings> {
    if !path.exists() {
        info!(path = %path.display(), "settings file absent; using defaults");
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist settings to the given path, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the document cannot be serialised or written.
pub fn save(path: &Path, settings: &Settings) -> ConfigResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            operation: "create_parent",
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let serialised =
        serde_json::to_string_pretty(settings).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, serialised).map_err(|source| ConfigError::Io {
        operation: "write",
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_file_yields_defaults() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let settings = load_or_default(&dir.path().join("settings.json"))?;
        assert_eq!(settings, Settings::default());
        Ok(())
    }

    #[test]
    fn save_then_load_roundtrips() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.install.download_only = true;
        settings.engine.poll_interval_secs = 2;
        save(&path, &settings)?;

        let loaded = load_or_default(&path)?;
        assert_eq!(loaded, settings);
        Ok(())
    }

    #[test]
    fn malformed_document_surfaces_a_parse_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json")?;

        let err = load_or_default(&path).expect_err("parse must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        Ok(())
    }
}
