//! JSON-RPC client for the Deluge web API.
//!
//! # Design
//! - One authenticated HTTP session per client; the session cookie is held by
//!   the reqwest cookie store and refreshed lazily on first use.
//! - Daemon errors keep their message and code; the duplicate-admission
//!   message is the only one the client interprets.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use loadout_engine_core::{
    AddMagnetOptions, AddMagnetOutcome, DownloadEngine, EngineError, EngineResult, TorrentId,
    TorrentStatus,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use crate::convert::{ALREADY_IN_SESSION_MARKER, recover_session_id, state_from_daemon};

/// Status fields requested from the daemon on every poll tick.
const STATUS_FIELDS: &[&str] = &[
    "state",
    "progress",
    "download_payload_rate",
    "eta",
    "name",
    "message",
];

/// Download engine client speaking the Deluge web JSON-RPC protocol.
pub struct DelugeClient {
    http: reqwest::Client,
    endpoint: String,
    password: String,
    request_id: AtomicU64,
    authenticated: Mutex<bool>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcFailure>,
}

#[derive(Debug, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
struct RpcFailure {
    message: String,
    #[serde(default)]
    code: i64,
}

enum CallError {
    Transport(reqwest::Error),
    Daemon(RpcFailure),
}

impl CallError {
    fn into_engine(self, operation: &'static str) -> EngineError {
        match self {
            Self::Transport(source) => EngineError::Rpc {
                operation,
                source: Box::new(source),
            },
            Self::Daemon(failure) => EngineError::Rpc {
                operation,
                source: Box::new(failure),
            },
        }
    }
}

impl DelugeClient {
    /// Construct a client for the given web endpoint (e.g.
    /// `http://127.0.0.1:8112/json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, password: impl Into<String>) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|source| EngineError::Rpc {
                operation: "build_client",
                source: Box::new(source),
            })?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            password: password.into(),
            request_id: AtomicU64::new(1),
            authenticated: Mutex::new(false),
        })
    }

    async fn call_raw(&self, method: &str, params: Value) -> Result<Value, CallError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({ "method": method, "params": params, "id": id });
        debug!(method, request_id = id, "issuing daemon rpc");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(CallError::Transport)?;
        let body: RpcResponse = response.json().await.map_err(CallError::Transport)?;

        if let Some(failure) = body.error {
            return Err(CallError::Daemon(failure));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }

    /// Log into the web session once; later calls reuse the session cookie.
    async fn ensure_session(&self) -> EngineResult<()> {
        let mut guard = self.authenticated.lock().await;
        if *guard {
            return Ok(());
        }
        let result = self
            .call_raw("auth.login", json!([self.password]))
            .await
            .map_err(|err| err.into_engine("auth_login"))?;
        if result.as_bool() != Some(true) {
            return Err(EngineError::Unauthenticated {
                operation: "auth_login",
            });
        }
        *guard = true;
        Ok(())
    }

    async fn call(
        &self,
        operation: &'static str,
        method: &str,
        params: Value,
    ) -> EngineResult<Value> {
        self.ensure_session().await?;
        self.call_raw(method, params)
            .await
            .map_err(|err| err.into_engine(operation))
    }
}

#[async_trait]
impl DownloadEngine for DelugeClient {
    async fn add_magnet(
        &self,
        uri: &str,
        options: &AddMagnetOptions,
    ) -> EngineResult<AddMagnetOutcome> {
        self.ensure_session().await?;

        let mut admission = serde_json::Map::new();
        if let Some(location) = &options.download_location {
            admission.insert("download_location".into(), json!(location));
        }
        admission.insert("add_paused".into(), json!(options.start_paused));

        match self
            .call_raw("core.add_torrent_magnet", json!([uri, admission]))
            .await
        {
            Ok(result) => result
                .as_str()
                .map(|id| AddMagnetOutcome::Added(TorrentId::from(id)))
                .ok_or_else(|| EngineError::AddRejected {
                    reason: "daemon returned no torrent id".to_string(),
                }),
            Err(CallError::Daemon(failure))
                if failure
                    .message
                    .to_lowercase()
                    .contains(ALREADY_IN_SESSION_MARKER) =>
            {
                recover_session_id(&failure.message)
                    .map(|id| AddMagnetOutcome::AlreadyExists(TorrentId(id)))
                    .ok_or(EngineError::IdNotRecovered {
                        message: failure.message,
                    })
            }
            Err(CallError::Daemon(failure)) => Err(EngineError::AddRejected {
                reason: failure.message,
            }),
            Err(transport) => Err(transport.into_engine("add_magnet")),
        }
    }

    async fn status(&self, id: &TorrentId) -> EngineResult<Option<TorrentStatus>> {
        let result = self
            .call(
                "status",
                "core.get_torrent_status",
                json!([id.as_str(), STATUS_FIELDS]),
            )
            .await?;

        let Some(fields) = result.as_object() else {
            return Ok(None);
        };
        if fields.is_empty() {
            // The daemon answers with an empty dict once the torrent has left
            // the session.
            return Ok(None);
        }

        Ok(Some(TorrentStatus {
            state: state_from_daemon(fields.get("state").and_then(Value::as_str).unwrap_or("")),
            progress_percent: fields
                .get("progress")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            download_bps: field_as_u64(fields.get("download_payload_rate")),
            eta_seconds: field_as_u64(fields.get("eta")),
            name: fields
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            message: fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        }))
    }

    async fn pause(&self, id: &TorrentId) -> EngineResult<()> {
        self.call("pause", "core.pause_torrent", json!([[id.as_str()]]))
            .await
            .map(|_| ())
    }

    async fn resume(&self, id: &TorrentId) -> EngineResult<()> {
        self.call("resume", "core.resume_torrent", json!([[id.as_str()]]))
            .await
            .map(|_| ())
    }

    async fn remove(&self, id: &TorrentId, remove_data: bool) -> EngineResult<()> {
        self.call(
            "remove",
            "core.remove_torrent",
            json!([id.as_str(), remove_data]),
        )
        .await
        .map(|_| ())
    }
}

/// The daemon reports rates and etas as floats; clamp to the unsigned range.
fn field_as_u64(value: Option<&Value>) -> u64 {
    let raw = value.and_then(Value::as_f64).unwrap_or(0.0);
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "daemon rates and etas are non-negative and fit in u64"
    )]
    {
        if raw.is_finite() && raw > 0.0 {
            raw as u64
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use loadout_events::TorrentState;

    fn login_mock(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "auth.login"}"#);
            then.status(200)
                .json_body(json!({ "result": true, "error": null, "id": 1 }));
        })
    }

    fn client_for(server: &MockServer) -> DelugeClient {
        DelugeClient::new(server.url("/json"), "deluge").expect("client builds")
    }

    #[tokio::test]
    async fn add_magnet_returns_the_new_session_id() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let login = login_mock(&server);
        let add = server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "core.add_torrent_magnet"}"#);
            then.status(200)
                .json_body(json!({ "result": "deadbeef00", "error": null, "id": 2 }));
        });

        let client = client_for(&server);
        let outcome = client
            .add_magnet(
                "magnet:?xt=urn:btih:deadbeef",
                &AddMagnetOptions {
                    download_location: Some("/tmp/game".into()),
                    start_paused: false,
                },
            )
            .await?;

        assert_eq!(
            outcome,
            AddMagnetOutcome::Added(TorrentId::from("deadbeef00"))
        );
        login.assert();
        add.assert();
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_admission_recovers_the_existing_id() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _login = login_mock(&server);
        let _add = server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "core.add_torrent_magnet"}"#);
            then.status(200).json_body(json!({
                "result": null,
                "error": { "message": "Torrent already in session (XYZ789).", "code": 4 },
                "id": 2
            }));
        });

        let client = client_for(&server);
        let outcome = client
            .add_magnet("magnet:?xt=urn:btih:deadbeef", &AddMagnetOptions::default())
            .await?;

        assert_eq!(
            outcome,
            AddMagnetOutcome::AlreadyExists(TorrentId::from("XYZ789"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_admission_without_token_is_unrecoverable() {
        let server = MockServer::start_async().await;
        let _login = login_mock(&server);
        let _add = server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "core.add_torrent_magnet"}"#);
            then.status(200).json_body(json!({
                "result": null,
                "error": { "message": "Torrent already in session.", "code": 4 },
                "id": 2
            }));
        });

        let client = client_for(&server);
        let err = client
            .add_magnet("magnet:?xt=urn:btih:deadbeef", &AddMagnetOptions::default())
            .await
            .expect_err("recovery must fail without a token");
        assert!(matches!(err, EngineError::IdNotRecovered { .. }));
    }

    #[tokio::test]
    async fn status_maps_daemon_fields_onto_the_snapshot() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _login = login_mock(&server);
        let _status = server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "core.get_torrent_status"}"#);
            then.status(200).json_body(json!({
                "result": {
                    "state": "Downloading",
                    "progress": 42.5,
                    "download_payload_rate": 1048576.0,
                    "eta": 120.0,
                    "name": "Example Game"
                },
                "error": null,
                "id": 2
            }));
        });

        let client = client_for(&server);
        let status = client
            .status(&TorrentId::from("deadbeef00"))
            .await?
            .expect("status present");

        assert_eq!(status.state, TorrentState::Downloading);
        assert!((status.progress_percent - 42.5).abs() < f64::EPSILON);
        assert_eq!(status.download_bps, 1_048_576);
        assert_eq!(status.eta_seconds, 120);
        assert_eq!(status.name.as_deref(), Some("Example Game"));
        Ok(())
    }

    #[tokio::test]
    async fn vanished_torrent_reports_no_status() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _login = login_mock(&server);
        let _status = server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "core.get_torrent_status"}"#);
            then.status(200)
                .json_body(json!({ "result": {}, "error": null, "id": 2 }));
        });

        let client = client_for(&server);
        let status = client.status(&TorrentId::from("gone")).await?;
        assert!(status.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn remove_forwards_the_remove_data_flag() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _login = login_mock(&server);
        let remove = server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "core.remove_torrent", "params": ["deadbeef00", true]}"#);
            then.status(200)
                .json_body(json!({ "result": true, "error": null, "id": 2 }));
        });

        let client = client_for(&server);
        client.remove(&TorrentId::from("deadbeef00"), true).await?;
        remove.assert();
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_surfaces_unauthenticated() {
        let server = MockServer::start_async().await;
        let _login = server.mock(|when, then| {
            when.method(POST)
                .path("/json")
                .json_body_includes(r#"{"method": "auth.login"}"#);
            then.status(200)
                .json_body(json!({ "result": false, "error": null, "id": 1 }));
        });

        let client = client_for(&server);
        let err = client
            .status(&TorrentId::from("deadbeef00"))
            .await
            .expect_err("login should be rejected");
        assert!(matches!(err, EngineError::Unauthenticated { .. }));
    }

    #[test]
    fn rate_fields_clamp_to_the_unsigned_range() {
        assert_eq!(field_as_u64(Some(&json!(-1.0))), 0);
        assert_eq!(field_as_u64(Some(&json!(1500.7))), 1500);
        assert_eq!(field_as_u64(None), 0);
    }
}
