//! Settings service with snapshot access and live change notification.

use std::path::PathBuf;

use tokio::sync::watch;
use tracing::info;

use crate::error::ConfigResult;
use crate::loader;
use crate::model::Settings;
use crate::validate;

/// Shared settings facade.
///
/// Consumers take a [`ConfigService::snapshot`] at the point they need a
/// flag; the orchestrator deliberately re-reads per step instead of caching a
/// snapshot across a whole download-install cycle.
#[derive(Clone)]
pub struct ConfigService {
    path: PathBuf,
    tx: watch::Sender<Settings>,
}

impl ConfigService {
    /// Load (or default) and validate the settings document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read, parsed, or validated.
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let settings = loader::load_or_default(&path)?;
        validate::validate(&settings)?;
        let (tx, _) = watch::channel(settings);
        Ok(Self { path, tx })
    }

    /// Current settings snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Subscribe to settings changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Apply a mutation, validate and persist it, then notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutated document fails validation or cannot be
    /// persisted; the in-memory settings are left untouched in that case.
    pub fn update<F>(&self, mutate: F) -> ConfigResult<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut next = self.snapshot();
        mutate(&mut next);
        validate::validate(&next)?;
        loader::save(&self.path, &next)?;
        info!(path = %self.path.display(), "settings updated");
        self.tx.send_replace(next.clone());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use tempfile::TempDir;

    #[test]
    fn update_persists_and_notifies() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("settings.json");
        let service = ConfigService::load(&path)?;
        let mut watcher = service.subscribe();

        service.update(|settings| settings.install.download_only = true)?;

        assert!(service.snapshot().install.download_only);
        assert!(watcher.has_changed()?);
        assert!(watcher.borrow_and_update().install.download_only);

        let reloaded = ConfigService::load(&path)?;
        assert!(reloaded.snapshot().install.download_only);
        Ok(())
    }

    #[test]
    fn invalid_update_is_rejected_and_state_kept() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let service = ConfigService::load(dir.path().join("settings.json"))?;

        let err = service
            .update(|settings| settings.engine.poll_interval_secs = 0)
            .expect_err("validation must reject");
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(service.snapshot().engine.poll_interval_secs, 1);
        Ok(())
    }
}
