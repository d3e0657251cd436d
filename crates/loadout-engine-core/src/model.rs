//! Core download engine DTOs shared across the workspace.

use loadout_events::TorrentState;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identifier assigned by the download engine once a magnet is admitted.
///
/// For the Deluge daemon this is the lowercase hex info-hash of the torrent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorrentId(pub String);

impl TorrentId {
    /// Borrow the raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TorrentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for TorrentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Optional knobs that accompany a magnet admission request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AddMagnetOptions {
    /// Directory the engine should materialise the payload into.
    pub download_location: Option<String>,
    /// Whether the torrent should be admitted in a paused state.
    #[serde(default)]
    pub start_paused: bool,
}

/// Structured result of a magnet admission attempt.
///
/// The daemon reports a duplicate admission as an error whose message carries
/// the existing id; adapters translate that into `AlreadyExists` so callers
/// branch on a type instead of matching error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddMagnetOutcome {
    /// The magnet was newly admitted under the given id.
    Added(TorrentId),
    /// The magnet was already present in the session under the given id.
    AlreadyExists(TorrentId),
}

impl AddMagnetOutcome {
    /// The id under which the torrent lives in the session, however it got there.
    #[must_use]
    pub const fn id(&self) -> &TorrentId {
        match self {
            Self::Added(id) | Self::AlreadyExists(id) => id,
        }
    }
}

/// Point-in-time status snapshot for a supervised torrent.
///
/// Rebuilt on every poll tick and handed straight to the event bus; never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TorrentStatus {
    /// Current lifecycle state.
    pub state: TorrentState,
    /// Completion percentage in the 0-100 range.
    pub progress_percent: f64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Estimated seconds until completion as reported by the engine.
    pub eta_seconds: u64,
    /// Display name, once the engine has resolved metadata.
    pub name: Option<String>,
    /// Engine-reported status message, populated on error states.
    pub message: Option<String>,
}

impl TorrentStatus {
    /// Terminal snapshot for a finished download.
    ///
    /// `Seeding` and `Finished` are both normalised to `Finished` with full
    /// progress before being surfaced.
    #[must_use]
    pub fn finished(name: Option<String>) -> Self {
        Self {
            state: TorrentState::Finished,
            progress_percent: 100.0,
            download_bps: 0,
            eta_seconds: 0,
            name,
            message: None,
        }
    }

    /// Synthesised terminal snapshot for a cancelled download: zeroed rate,
    /// eta, and progress.
    #[must_use]
    pub fn cancelled(name: Option<String>) -> Self {
        Self {
            state: TorrentState::Cancelled,
            progress_percent: 0.0,
            download_bps: 0,
            eta_seconds: 0,
            name,
            message: None,
        }
    }
}
