//! Catalog API payload models.

use serde::{Deserialize, Serialize};

/// One downloadable game as listed by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntry {
    /// Internal identifier used for download bookkeeping.
    pub name: String,
    /// Human-readable title shown in lists.
    pub display_name: String,
    /// Magnet link handed to the download engine.
    pub magnet_uri: String,
    /// Payload size in bytes when the catalog knows it.
    #[serde(default)]
    pub size_bytes: Option<u64>,
    /// Version label when the catalog knows it.
    #[serde(default)]
    pub version: Option<String>,
}

/// Credentials posted to the auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Token returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthToken {
    /// Bearer token value.
    pub token: String,
    /// Seconds until the token expires, when reported.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_entry_tolerates_missing_optional_fields() -> anyhow::Result<()> {
        let entry: GameEntry = serde_json::from_str(
            r#"{"name": "beatgame", "display_name": "Beat Game", "magnet_uri": "magnet:?xt=urn:btih:deadbeef"}"#,
        )?;
        assert_eq!(entry.name, "beatgame");
        assert!(entry.size_bytes.is_none());
        assert!(entry.version.is_none());
        Ok(())
    }
}
