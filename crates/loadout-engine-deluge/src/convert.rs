//! Conversions between daemon payloads and engine-core DTOs.

use loadout_events::TorrentState;
use once_cell::sync::Lazy;
use regex::Regex;

/// Fragment of the daemon's duplicate-admission error message.
pub(crate) const ALREADY_IN_SESSION_MARKER: &str = "already in session";

/// The daemon reports a duplicate admission as
/// `"Torrent already in session (<id>)."`; the parenthesised token is the
/// only carrier of the existing id. The error text is daemon-version
/// dependent, which is why this stays confined to the adapter.
static SESSION_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([0-9A-Za-z]+)\)").expect("session id pattern is valid"));

/// Recover the torrent id embedded in a duplicate-admission error message.
#[must_use]
pub fn recover_session_id(message: &str) -> Option<String> {
    SESSION_ID_PATTERN
        .captures(message)
        .map(|captures| captures[1].to_string())
}

/// Map a daemon state string onto the shared torrent state enum.
///
/// Unrecognised states map to `Unknown` rather than failing the poll loop.
#[must_use]
pub fn state_from_daemon(state: &str) -> TorrentState {
    match state {
        "Queued" => TorrentState::Queued,
        "Checking" | "Allocating" => TorrentState::Checking,
        "Downloading" => TorrentState::Downloading,
        "Seeding" => TorrentState::Seeding,
        "Paused" => TorrentState::Paused,
        "Error" => TorrentState::Error,
        "Finished" => TorrentState::Finished,
        _ => TorrentState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_the_parenthesised_session_id() {
        let message = "Torrent already in session (XYZ789).";
        assert_eq!(recover_session_id(message), Some("XYZ789".to_string()));
    }

    #[test]
    fn recovers_lowercase_hex_info_hashes() {
        let message = "Torrent already in session (deadbeefcafe0123).";
        assert_eq!(
            recover_session_id(message),
            Some("deadbeefcafe0123".to_string())
        );
    }

    #[test]
    fn recovery_fails_without_a_parenthesised_token() {
        assert_eq!(recover_session_id("Torrent already in session."), None);
        assert_eq!(recover_session_id("()"), None);
        assert_eq!(recover_session_id(""), None);
    }

    #[test]
    fn known_daemon_states_map_onto_the_shared_enum() {
        assert_eq!(state_from_daemon("Queued"), TorrentState::Queued);
        assert_eq!(state_from_daemon("Checking"), TorrentState::Checking);
        assert_eq!(state_from_daemon("Allocating"), TorrentState::Checking);
        assert_eq!(state_from_daemon("Downloading"), TorrentState::Downloading);
        assert_eq!(state_from_daemon("Seeding"), TorrentState::Seeding);
        assert_eq!(state_from_daemon("Paused"), TorrentState::Paused);
        assert_eq!(state_from_daemon("Error"), TorrentState::Error);
        assert_eq!(state_from_daemon("Finished"), TorrentState::Finished);
    }

    #[test]
    fn unknown_daemon_states_do_not_fail_the_poll_loop() {
        assert_eq!(state_from_daemon("Moving"), TorrentState::Unknown);
        assert_eq!(state_from_daemon(""), TorrentState::Unknown);
    }
}
