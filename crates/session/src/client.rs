//! Asynchronous session verification against the external identity service.

use crate::error::{Result, SessionError};
use crate::fingerprint::login_fingerprint;
use crate::profile::Profile;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Mutex;
use tracing::debug;

/// Well-known has-joined endpoint of the public session service.
pub const DEFAULT_SESSION_URL: &str =
    "https://sessionserver.mojang.com/session/minecraft/hasJoined";

/// Contract for verifying an online-mode join.
///
/// Implementations resolve to the player's profile on success; any transport
/// error, non-success status or empty response is an authorization failure
/// for the caller.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify_join(
        &self,
        username: &str,
        server_id: &str,
        shared_secret: &[u8],
        public_key_der: &[u8],
    ) -> Result<Profile>;
}

/// HTTP implementation of [`SessionVerifier`].
///
/// The underlying client is built lazily and dropped by [`shutdown`]; the
/// next lookup builds a fresh one instead of holding on to a client whose
/// worker pool may be gone.
///
/// [`shutdown`]: HttpSessionVerifier::shutdown
pub struct HttpSessionVerifier {
    base_url: String,
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpSessionVerifier {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_SESSION_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Mutex::new(None),
        }
    }

    /// Drop the cached client. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.client.lock().expect("client lock poisoned").take();
    }

    fn client(&self) -> reqwest::Client {
        self.client
            .lock()
            .expect("client lock poisoned")
            .get_or_insert_with(reqwest::Client::new)
            .clone()
    }
}

impl Default for HttpSessionVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionVerifier for HttpSessionVerifier {
    async fn verify_join(
        &self,
        username: &str,
        server_id: &str,
        shared_secret: &[u8],
        public_key_der: &[u8],
    ) -> Result<Profile> {
        let fingerprint = login_fingerprint(server_id, shared_secret, public_key_der);
        debug!("Verifying join of {} with fingerprint {}", username, fingerprint);

        let response = self
            .client()
            .get(&self.base_url)
            .query(&[("username", username), ("serverId", &fingerprint)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(SessionError::NoContent);
        }
        if !status.is_success() {
            return Err(SessionError::UnexpectedStatus(status.as_u16()));
        }
        let body = response.text().await?;
        if body.is_empty() {
            return Err(SessionError::EmptyBody);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
