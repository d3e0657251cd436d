//! # Design
//!
//! - Centralize application-level errors for bootstrap and the run loop.
//! - Keep error messages constant while carrying context fields for
//!   debugging.
//! - This boundary is where component errors become user-visible
//!   notifications; nothing below it talks to the user directly.

use std::error::Error;
use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        #[source]
        source: loadout_config::ConfigError,
    },
    /// Download engine operations failed.
    #[error("engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        #[source]
        source: loadout_engine_core::EngineError,
    },
    /// Catalog client operations failed.
    #[error("catalog operation failed")]
    Catalog {
        /// Operation identifier.
        operation: &'static str,
        /// Source catalog error.
        #[source]
        source: loadout_catalog::CatalogError,
    },
    /// Pipeline operations failed.
    #[error("pipeline operation failed")]
    Pipeline {
        /// Operation identifier.
        operation: &'static str,
        /// Source pipeline error.
        #[source]
        source: loadout_pipeline::PipelineError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Waiting for the shutdown signal failed.
    #[error("shutdown signal wait failed")]
    Shutdown {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: loadout_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn engine(
        operation: &'static str,
        source: loadout_engine_core::EngineError,
    ) -> Self {
        Self::Engine { operation, source }
    }

    pub(crate) const fn catalog(
        operation: &'static str,
        source: loadout_catalog::CatalogError,
    ) -> Self {
        Self::Catalog { operation, source }
    }

    pub(crate) fn telemetry(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Telemetry {
            operation,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_the_expected_variants() {
        let config = AppError::config(
            "load",
            loadout_config::ConfigError::Invalid {
                field: "download_root",
                reason: "empty",
                value: None,
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.to_string(), "configuration operation failed");

        let engine = AppError::engine(
            "build_client",
            loadout_engine_core::EngineError::Unauthenticated {
                operation: "auth_login",
            },
        );
        assert!(matches!(engine, AppError::Engine { .. }));

        let catalog = AppError::catalog(
            "new",
            loadout_catalog::CatalogError::NotConfigured { field: "base_url" },
        );
        assert!(matches!(catalog, AppError::Catalog { .. }));

        let telemetry = AppError::telemetry("metrics", anyhow::anyhow!("registration failed"));
        assert!(telemetry.source().is_some());
    }
}
