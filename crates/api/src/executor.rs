//! Single logical API call with status-driven recovery.

use crate::error::{Error, ErrorKind, Result};
use crate::policy::RetryPolicy;
use crate::session::AuthSession;
use exn::ResultExt;
use serde_json::{Map, Value};
use tracing::instrument;
use url::Url;

const FIELDS_PARAM: &str = "fields";
/// Requesting this field for an entry that has no alternative titles makes the
/// API answer with a 400.
const ALT_TITLES_FIELD: &str = "alternative_titles";
const CLIENT_ID_HEADER: &str = "X-MAL-CLIENT-ID";

/// Performs API calls on behalf of an [`AuthSession`], governed by a
/// [`RetryPolicy`].
///
/// Requests are sent one at a time and each one is preceded by the policy's
/// courtesy delay; the executor never fans out.
#[derive(Clone)]
pub struct RequestExecutor {
    client: reqwest::Client,
    session: AuthSession,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(client: reqwest::Client, session: AuthSession, policy: RetryPolicy) -> Self {
        Self { client, session, policy }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// GET `url` and decode the JSON object it returns.
    ///
    /// # Errors
    /// - [`ErrorKind::Status`] with the last status and body once recovery is
    ///   exhausted, or immediately for a 404.
    /// - [`ErrorKind::Network`] if the request still could not be completed
    ///   after the outer retries.
    /// - [`ErrorKind::Decode`] if a successful response isn't a JSON object.
    /// - [`ErrorKind::Auth`] if the token refresh after a 401 failed.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn execute(&self, url: &Url) -> Result<Map<String, Value>> {
        self.policy
            .backoff
            .retry(|attempt| self.attempt(url.clone(), attempt), |err: &Error| err.is_retryable())
            .await
    }

    /// One outer attempt. Loops for as long as the inner (status-driven)
    /// recovery allows, each counter bounded independently.
    async fn attempt(&self, mut url: Url, attempt: u32) -> Result<Map<String, Value>> {
        let mut alt_title_retries: u32 = 0;
        let mut generic_retries: u32 = 0;
        loop {
            tokio::time::sleep(self.policy.courtesy_delay).await;
            tracing::debug!(attempt, url = %url, "Requesting");
            let response = self.send(&url).await?;
            let status = response.status().as_u16();
            if status < 400 {
                let body = response.bytes().await.or_raise(|| ErrorKind::Network)?;
                return serde_json::from_slice(&body).or_raise(|| ErrorKind::Decode);
            }
            let body = response.text().await.or_raise(|| ErrorKind::Network)?;
            match status {
                400 if requests_alt_titles(&url) && alt_title_retries < self.policy.max_alt_title_retries => {
                    alt_title_retries += 1;
                    tracing::warn!(status, "Removing alternative titles from the query and re-requesting");
                    url = without_alt_titles(&url);
                },
                400 if requests_alt_titles(&url) => exn::bail!(ErrorKind::Status { status, body }),
                401 => {
                    tracing::warn!(status, "Token expired, refreshing");
                    self.session.refresh().await.or_raise(|| ErrorKind::Auth)?;
                    exn::bail!(ErrorKind::Status { status, body });
                },
                429 => {
                    tracing::warn!(status, cooldown = ?self.policy.cooldown, "API rate limit exceeded, waiting");
                    tokio::time::sleep(self.policy.cooldown).await;
                    exn::bail!(ErrorKind::Status { status, body });
                },
                404 => exn::bail!(ErrorKind::Status { status, body }),
                _ if generic_retries < self.policy.max_generic_retries => {
                    generic_retries += 1;
                    tracing::warn!(status, body = %body, retry = generic_retries, cooldown = ?self.policy.cooldown, "Unexpected API error, waiting before retrying");
                    tokio::time::sleep(self.policy.cooldown).await;
                },
                _ => exn::bail!(ErrorKind::Status { status, body }),
            }
        }
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response> {
        let mut request = self.client.get(url.clone()).bearer_auth(self.session.access_token().await);
        if let Some(client_id) = self.session.client_id() {
            request = request.header(CLIENT_ID_HEADER, client_id);
        }
        request.send().await.or_raise(|| ErrorKind::Network)
    }
}

fn requests_alt_titles(url: &Url) -> bool {
    url.query_pairs()
        .any(|(key, value)| key == FIELDS_PARAM && value.split(',').any(|field| field == ALT_TITLES_FIELD))
}

/// Copy of `url` with `alternative_titles` removed from the `fields` list.
/// Every other query segment is kept byte-for-byte.
fn without_alt_titles(url: &Url) -> Url {
    let mut url = url.clone();
    let Some(query) = url.query() else {
        return url;
    };
    let query = query
        .split('&')
        .map(|segment| match segment.split_once('=') {
            Some((FIELDS_PARAM, fields)) => {
                let fields = fields.split(',').filter(|field| *field != ALT_TITLES_FIELD).collect::<Vec<_>>();
                format!("{FIELDS_PARAM}={}", fields.join(","))
            },
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    url.set_query(Some(&query));
    url
}
