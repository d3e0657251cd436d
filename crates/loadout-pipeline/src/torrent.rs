//! Supervision of one magnet download from admission to a terminal state.
//!
//! # Design
//! - The timed read on the control channel is simultaneously the poll delay
//!   and the cancellation-responsiveness mechanism; a timeout means "no
//!   control message", never an error.
//! - Whatever way the loop exits, the torrent is removed from the engine
//!   session; on-disk data is deleted only on an explicit cancel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};
use loadout_engine_core::{
    AddMagnetOptions, AddMagnetOutcome, DownloadEngine, EngineError, TorrentId, TorrentStatus,
};
use loadout_events::{Event, EventBus, TorrentState};
use loadout_telemetry::Metrics;

/// Capacity of a job's control channel.
///
/// Messages are drained at most once per poll tick; callers are expected not
/// to flood the channel.
const CONTROL_CHANNEL_CAPACITY: usize = 8;

/// Default wait between status polls.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Control requests a caller can send into a running download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Pause the torrent in the engine.
    Pause,
    /// Resume a paused torrent.
    Resume,
    /// Stop the download and delete its data.
    Cancel,
}

/// Terminal outcome of one supervised download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The download reached a finished state.
    Completed,
    /// The engine reported an error or the torrent vanished mid-download.
    Failed,
    /// The caller cancelled via the control channel.
    Cancelled,
}

impl DownloadOutcome {
    /// Stable string form used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One requested download/install unit.
///
/// The caller owns the job for its display lifetime and keeps the write end
/// of the control channel; the session borrows the job for one cycle and
/// consumes control messages.
#[derive(Debug)]
pub struct MagnetJob {
    /// Magnet link in decoded form.
    pub uri: String,
    /// Human-readable name shown in progress events.
    pub display_name: String,
    /// Internal identifier.
    pub name: String,
    /// Filesystem path the engine materialises files into.
    pub download_path: PathBuf,
    /// Caller's display-list position; opaque correlation token.
    pub index: usize,
    /// Wait between status polls.
    pub poll_interval: Duration,
    /// Read end of the pause/resume/cancel channel.
    pub control: mpsc::Receiver<ControlMessage>,
}

impl MagnetJob {
    /// Construct a job with a fresh control channel, handing the write end
    /// back to the caller.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        download_path: impl Into<PathBuf>,
        index: usize,
    ) -> (Self, mpsc::Sender<ControlMessage>) {
        let (tx, rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let name = name.into();
        let job = Self {
            uri: uri.into(),
            display_name: name.clone(),
            name,
            download_path: download_path.into(),
            index,
            poll_interval: DEFAULT_POLL_INTERVAL,
            control: rx,
        };
        (job, tx)
    }
}

/// Drives a single [`MagnetJob`] from submission to a terminal state,
/// emitting progress events and obeying control requests.
pub struct TorrentSession {
    engine: Arc<dyn DownloadEngine>,
    events: EventBus,
    metrics: Metrics,
}

impl TorrentSession {
    /// Construct a session over the given engine and event bus.
    #[must_use]
    pub fn new(engine: Arc<dyn DownloadEngine>, events: EventBus, metrics: Metrics) -> Self {
        Self {
            engine,
            events,
            metrics,
        }
    }

    /// Run the job to a terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns an error when an engine call fails; the failure has already
    /// been routed onto the event bus by the time it propagates, so the
    /// orchestrator applies job-level policy without notifying again.
    pub async fn run(&self, job: &mut MagnetJob) -> PipelineResult<DownloadOutcome> {
        let options = AddMagnetOptions {
            download_location: Some(job.download_path.to_string_lossy().into_owned()),
            start_paused: false,
        };
        let admission = match self.engine.add_magnet(&job.uri, &options).await {
            Ok(outcome) => outcome,
            Err(source) => return Err(self.engine_failure(job.index, "add_magnet", source)),
        };
        if let AddMagnetOutcome::AlreadyExists(id) = &admission {
            debug!(torrent_id = %id, "magnet already in session; reusing id");
        }
        let torrent_id = admission.id().clone();

        let _ = self.events.publish(Event::DownloadQueued {
            index: job.index,
            name: job.display_name.clone(),
        });
        info!(
            torrent_id = %torrent_id,
            name = %job.name,
            download_path = %job.download_path.display(),
            "download supervision started"
        );

        let run = self.supervise(job, &torrent_id).await;

        // Detach from the session regardless of how the loop exited; data
        // removal only on explicit cancel.
        let remove_data = matches!(run, Ok(DownloadOutcome::Cancelled));
        if let Err(err) = self.engine.remove(&torrent_id, remove_data).await {
            warn!(
                torrent_id = %torrent_id,
                error = %err,
                "failed to remove torrent from session"
            );
        }

        let outcome_label = run.as_ref().map_or("failed", |outcome| outcome.as_str());
        self.metrics.inc_download_outcome(outcome_label);
        info!(torrent_id = %torrent_id, outcome = outcome_label, "download supervision ended");
        run
    }

    async fn supervise(
        &self,
        job: &mut MagnetJob,
        id: &TorrentId,
    ) -> PipelineResult<DownloadOutcome> {
        let mut control_open = true;

        loop {
            let status = match self.engine.status(id).await {
                Ok(status) => status,
                Err(source) => return Err(self.engine_failure(job.index, "status", source)),
            };
            let Some(status) = status else {
                // Distinct from an Error state: the torrent silently left the
                // session.
                let _ = self.events.publish(Event::DownloadFailed {
                    index: job.index,
                    message: "torrent no longer present in engine session".to_string(),
                });
                return Ok(DownloadOutcome::Failed);
            };

            match status.state {
                TorrentState::Seeding | TorrentState::Finished => {
                    self.publish_progress(job.index, &TorrentStatus::finished(status.name));
                    return Ok(DownloadOutcome::Completed);
                }
                TorrentState::Error => {
                    let message = status
                        .message
                        .unwrap_or_else(|| "engine reported an error state".to_string());
                    let _ = self.events.publish(Event::DownloadFailed {
                        index: job.index,
                        message,
                    });
                    return Ok(DownloadOutcome::Failed);
                }
                TorrentState::Downloading | TorrentState::Paused => {
                    self.publish_progress(job.index, &status);
                }
                TorrentState::Queued | TorrentState::Checking | TorrentState::Unknown => {}
                TorrentState::Cancelled => {
                    // Engines never report this; it exists for synthesised
                    // terminal snapshots only.
                }
            }

            // The wait for a control message is the poll delay. One message
            // is drained per tick at most.
            if control_open {
                match timeout(job.poll_interval, job.control.recv()).await {
                    Err(_elapsed) => {}
                    Ok(None) => {
                        control_open = false;
                        tokio::time::sleep(job.poll_interval).await;
                    }
                    Ok(Some(ControlMessage::Pause)) => {
                        if let Err(source) = self.engine.pause(id).await {
                            return Err(self.engine_failure(job.index, "pause", source));
                        }
                        debug!(torrent_id = %id, "pause forwarded to engine");
                    }
                    Ok(Some(ControlMessage::Resume)) => {
                        if let Err(source) = self.engine.resume(id).await {
                            return Err(self.engine_failure(job.index, "resume", source));
                        }
                        debug!(torrent_id = %id, "resume forwarded to engine");
                    }
                    Ok(Some(ControlMessage::Cancel)) => {
                        self.publish_progress(job.index, &TorrentStatus::cancelled(None));
                        info!(torrent_id = %id, "download cancelled by caller");
                        return Ok(DownloadOutcome::Cancelled);
                    }
                }
            } else {
                tokio::time::sleep(job.poll_interval).await;
            }
        }
    }

    fn publish_progress(&self, index: usize, status: &TorrentStatus) {
        let _ = self.events.publish(Event::DownloadProgress {
            index,
            state: status.state,
            progress_percent: status.progress_percent,
            download_bps: status.download_bps,
            eta_seconds: status.eta_seconds,
        });
    }

    /// Route an engine failure onto the event bus, then hand it back for
    /// propagation.
    fn engine_failure(
        &self,
        index: usize,
        operation: &'static str,
        source: EngineError,
    ) -> PipelineError {
        let err = PipelineError::Engine { operation, source };
        let _ = self.events.publish(Event::DownloadFailed {
            index,
            message: err.detail(),
        });
        err
    }
}
