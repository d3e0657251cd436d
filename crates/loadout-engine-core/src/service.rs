//! Engine trait implemented by download engine adapters.

use crate::error::EngineResult;
use crate::model::{AddMagnetOptions, AddMagnetOutcome, TorrentId, TorrentStatus};
use async_trait::async_trait;

/// Remote download engine contract consumed by the pipeline.
///
/// Adapters (e.g. the Deluge JSON-RPC client) decide which status fields they
/// fetch per poll; the snapshot they return always carries the full
/// [`TorrentStatus`] shape.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Admit a magnet URI into the engine session.
    ///
    /// A magnet the session already holds is reported as
    /// [`AddMagnetOutcome::AlreadyExists`] rather than an error.
    async fn add_magnet(
        &self,
        uri: &str,
        options: &AddMagnetOptions,
    ) -> EngineResult<AddMagnetOutcome>;

    /// Fetch a fresh status snapshot for the torrent.
    ///
    /// Returns `Ok(None)` when the torrent is no longer present in the
    /// session, a distinct condition from an `Error` state, which arrives as
    /// a snapshot.
    async fn status(&self, id: &TorrentId) -> EngineResult<Option<TorrentStatus>>;

    /// Pause the torrent.
    async fn pause(&self, id: &TorrentId) -> EngineResult<()>;

    /// Resume a paused torrent.
    async fn resume(&self, id: &TorrentId) -> EngineResult<()>;

    /// Remove the torrent from the session, optionally deleting its data.
    async fn remove(&self, id: &TorrentId, remove_data: bool) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    struct UnreachableEngine;

    #[async_trait]
    impl DownloadEngine for UnreachableEngine {
        async fn add_magnet(
            &self,
            _uri: &str,
            _options: &AddMagnetOptions,
        ) -> EngineResult<AddMagnetOutcome> {
            Err(EngineError::Rpc {
                operation: "add_magnet",
                source: "connection refused".into(),
            })
        }

        async fn status(&self, _id: &TorrentId) -> EngineResult<Option<TorrentStatus>> {
            Ok(None)
        }

        async fn pause(&self, _id: &TorrentId) -> EngineResult<()> {
            Ok(())
        }

        async fn resume(&self, _id: &TorrentId) -> EngineResult<()> {
            Ok(())
        }

        async fn remove(&self, _id: &TorrentId, _remove_data: bool) -> EngineResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_objects_are_usable_behind_dyn() -> anyhow::Result<()> {
        let engine: Box<dyn DownloadEngine> = Box::new(UnreachableEngine);
        let err = engine
            .add_magnet("magnet:?xt=urn:btih:demo", &AddMagnetOptions::default())
            .await
            .expect_err("rpc should fail");
        assert!(matches!(err, EngineError::Rpc { operation, .. } if operation == "add_magnet"));

        let vanished = engine.status(&TorrentId::from("missing")).await?;
        assert!(vanished.is_none());
        Ok(())
    }
}
