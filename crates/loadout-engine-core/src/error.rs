//! Error types for download engine adapters.

use std::error::Error;

use thiserror::Error;

/// Primary error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine RPC transport failed or returned a protocol-level error.
    #[error("engine rpc failed")]
    Rpc {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport or protocol failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The engine session rejected the caller's credentials.
    #[error("engine session not authenticated")]
    Unauthenticated {
        /// Operation that observed the rejection.
        operation: &'static str,
    },
    /// The engine rejected a magnet admission outright.
    #[error("engine rejected magnet")]
    AddRejected {
        /// Failure description reported by the engine.
        reason: String,
    },
    /// The engine reported a duplicate admission but the existing torrent id
    /// could not be recovered from its error message.
    #[error("torrent id could not be recovered")]
    IdNotRecovered {
        /// Raw engine error message the recovery was attempted on.
        message: String,
    },
}

/// Convenience alias for engine operation results.
pub type EngineResult<T> = Result<T, EngineError>;
