//! Validation helpers applied before settings are accepted.

use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;

/// Validate a settings document.
///
/// # Errors
///
/// Returns the first violated constraint as [`ConfigError::Invalid`].
pub fn validate(settings: &Settings) -> ConfigResult<()> {
    if settings.download_root.as_os_str().is_empty() {
        return Err(ConfigError::Invalid {
            field: "download_root",
            reason: "empty",
            value: None,
        });
    }

    if settings.adb_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid {
            field: "adb_path",
            reason: "empty",
            value: None,
        });
    }

    if settings.engine.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "engine.endpoint",
            reason: "empty",
            value: None,
        });
    }

    if settings.engine.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "engine.poll_interval_secs",
            reason: "zero",
            value: Some(settings.engine.poll_interval_secs.to_string()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_pass_validation() {
        validate(&Settings::default()).expect("defaults are valid");
    }

    #[test]
    fn empty_download_root_is_rejected() {
        let settings = Settings {
            download_root: PathBuf::new(),
            ..Settings::default()
        };
        let err = validate(&settings).expect_err("must reject");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "download_root",
                ..
            }
        ));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut settings = Settings::default();
        settings.engine.poll_interval_secs = 0;
        let err = validate(&settings).expect_err("must reject");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "engine.poll_interval_secs",
                ..
            }
        ));
    }
}
