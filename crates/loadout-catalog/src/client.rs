//! Catalog HTTP client and the worker-thread login bridge.

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::model::{AuthToken, Credentials, GameEntry};

/// Async client for catalog reads.
#[derive(Debug)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Construct a client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is empty or the HTTP client cannot
    /// be built.
    pub fn new(base_url: impl Into<String>) -> CatalogResult<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(CatalogError::NotConfigured { field: "base_url" });
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|source| CatalogError::Http {
                operation: "build_client",
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { http, base_url })
    }

    /// Fetch the downloadable game list.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_games(&self) -> CatalogResult<Vec<GameEntry>> {
        let url = format!("{}/games", self.base_url.trim_end_matches('/'));
        debug!(url = %url, "fetching game catalog");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| CatalogError::Http {
                operation: "fetch_games",
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                operation: "fetch_games",
                url,
                status: status.as_u16(),
            });
        }
        response.json().await.map_err(|source| CatalogError::Http {
            operation: "fetch_games",
            url,
            source,
        })
    }
}

/// Run the credential login on a dedicated worker thread.
///
/// The login call blocks, so it must not run on the async runtime; its
/// result re-enters the loop through the returned oneshot receiver. Dropping
/// the receiver abandons the login without cancelling the in-flight request.
#[must_use]
pub fn spawn_login(
    base_url: String,
    credentials: Credentials,
) -> oneshot::Receiver<CatalogResult<AuthToken>> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let result = blocking_login(&base_url, &credentials);
        if tx.send(result).is_err() {
            warn!("login result dropped; receiver went away");
        }
    });
    rx
}

fn blocking_login(base_url: &str, credentials: &Credentials) -> CatalogResult<AuthToken> {
    if base_url.trim().is_empty() {
        return Err(CatalogError::NotConfigured { field: "base_url" });
    }
    let url = format!("{}/auth/login", base_url.trim_end_matches('/'));

    let client = reqwest::blocking::Client::builder()
        .build()
        .map_err(|source| CatalogError::Http {
            operation: "build_client",
            url: url.clone(),
            source,
        })?;
    let response = client
        .post(&url)
        .json(credentials)
        .send()
        .map_err(|source| CatalogError::Http {
            operation: "login",
            url: url.clone(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Status {
            operation: "login",
            url,
            status: status.as_u16(),
        });
    }
    response.json().map_err(|source| CatalogError::Http {
        operation: "login",
        url,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_games_parses_the_catalog_payload() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let games = server.mock(|when, then| {
            when.method(GET).path("/games");
            then.status(200).json_body(json!([
                {
                    "name": "beatgame",
                    "display_name": "Beat Game",
                    "magnet_uri": "magnet:?xt=urn:btih:deadbeef",
                    "size_bytes": 1024
                }
            ]));
        });

        let client = CatalogClient::new(server.base_url())?;
        let entries = client.fetch_games().await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "beatgame");
        assert_eq!(entries[0].size_bytes, Some(1024));
        games.assert();
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_surfaced() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _games = server.mock(|when, then| {
            when.method(GET).path("/games");
            then.status(503);
        });

        let client = CatalogClient::new(server.base_url())?;
        let err = client.fetch_games().await.expect_err("server is down");
        assert!(matches!(err, CatalogError::Status { status: 503, .. }));
        Ok(())
    }

    #[test]
    fn empty_base_url_is_rejected_up_front() {
        let err = CatalogClient::new("  ").expect_err("unconfigured catalog");
        assert!(matches!(err, CatalogError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn login_runs_on_a_worker_thread_and_bridges_back() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body_includes(r#"{"username": "sam"}"#);
            then.status(200)
                .json_body(json!({ "token": "tok-123", "expires_in": 3600 }));
        });

        let rx = spawn_login(
            server.base_url(),
            Credentials {
                username: "sam".to_string(),
                password: "hunter2".to_string(),
            },
        );
        let token = rx.await.expect("worker thread delivered")?;
        assert_eq!(token.token, "tok-123");
        assert_eq!(token.expires_in, Some(3600));
        login.assert();
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_surfaces_the_status() {
        let server = MockServer::start_async().await;
        let _login = server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401);
        });

        let rx = spawn_login(
            server.base_url(),
            Credentials {
                username: "sam".to_string(),
                password: "wrong".to_string(),
            },
        );
        let result = rx.await.expect("worker thread delivered");
        assert!(matches!(
            result,
            Err(CatalogError::Status { status: 401, .. })
        ));
    }
}
