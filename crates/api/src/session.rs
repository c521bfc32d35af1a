//! Authenticated session shared by every request of the process.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// OAuth2 token pair, as returned by the MyAnimeList token endpoint and as
/// stored in the account's token file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default = "Token::default_type")]
    pub token_type: String,
}
impl Token {
    fn default_type() -> String {
        "Bearer".to_string()
    }

    /// Read a token from a JSON token file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await.or_raise(|| ErrorKind::Auth)?;
        serde_json::from_str(&contents).or_raise(|| ErrorKind::Auth)
    }

    /// Write the token to a JSON token file, replacing the previous contents.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).or_raise(|| ErrorKind::Auth)?;
        tokio::fs::write(path.as_ref(), contents).await.or_raise(|| ErrorKind::Auth)
    }
}

/// Derives a new access token from the current one.
///
/// This is the seam to the authentication protocol: the session only knows
/// *when* to refresh, implementations know *how*.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, current: &Token) -> Result<Token>;
}

/// Refreshes tokens against the MyAnimeList OAuth2 token endpoint, and
/// persists every refreshed token back to the token file (if configured) so
/// the next process starts with a valid token.
pub struct OAuthRefresher {
    client: reqwest::Client,
    endpoint: Url,
    client_id: String,
    token_file: Option<PathBuf>,
}
impl OAuthRefresher {
    pub fn new(client: reqwest::Client, endpoint: Url, client_id: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            client_id: client_id.into(),
            token_file: None,
        }
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, current: &Token) -> Result<Token> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", current.refresh_token.as_str()),
        ];
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await
            .or_raise(|| ErrorKind::Network)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.or_raise(|| ErrorKind::Network)?;
            exn::bail!(ErrorKind::Status { status: status.as_u16(), body });
        }
        let token: Token = response.json().await.or_raise(|| ErrorKind::Auth)?;
        if let Some(path) = &self.token_file {
            token.save(path).await?;
        }
        Ok(token)
    }
}

struct SessionState {
    token: RwLock<Token>,
    // Serializes refreshes: a second refresh racing the first could revoke
    // the token the first one just handed out.
    refreshing: Mutex<()>,
    refresher: Arc<dyn TokenRefresher>,
}

/// The process-wide authenticated session.
///
/// Create it once at startup and clone it wherever it is needed: clones share
/// the same token, so a refresh through any clone is observed by all of them.
#[derive(Clone)]
pub struct AuthSession {
    state: Arc<SessionState>,
    client_id: Option<String>,
}
impl AuthSession {
    pub fn new(token: Token, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            state: Arc::new(SessionState {
                token: RwLock::new(token),
                refreshing: Mutex::new(()),
                refresher,
            }),
            client_id: None,
        }
    }

    /// Load the session's token from a token file.
    ///
    /// Failing to read the token is fatal for the process: nothing can be
    /// requested without it.
    pub async fn from_token_file(path: impl AsRef<Path>, refresher: Arc<dyn TokenRefresher>) -> Result<Self> {
        let path = path.as_ref();
        let token = Token::load(path).await?;
        tracing::debug!(path = %path.display(), "Loaded access token");
        Ok(Self::new(token, refresher))
    }

    /// Also identify the application with a client ID header on every request.
    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub async fn access_token(&self) -> String {
        self.state.token.read().await.access_token.clone()
    }

    /// Replace the access token in place.
    ///
    /// If another refresh completed while this one was waiting for its turn,
    /// the token is already fresh and the refresher is not called again.
    pub async fn refresh(&self) -> Result<()> {
        let stale = self.access_token().await;
        let _guard = self.state.refreshing.lock().await;
        let current = self.state.token.read().await.clone();
        if current.access_token != stale {
            tracing::debug!("Token already refreshed by another request");
            return Ok(());
        }
        let token = self.state.refresher.refresh(&current).await?;
        *self.state.token.write().await = token;
        tracing::info!("Access token refreshed");
        Ok(())
    }
}
