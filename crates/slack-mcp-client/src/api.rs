//! Slack Web API transport.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use slack_mcp_core::{Credential, LookupError, UserLookup};

/// Default Slack Web API base URL.
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Slack API error.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} returned HTTP {status}")]
    Status { method: String, status: u16 },
    #[error("{method} failed: {error}")]
    Api { method: String, error: String },
    #[error("Invalid credential header: {0}")]
    InvalidCredential(String),
}

impl SlackError {
    /// The Slack error code (`user_not_found`, `channel_not_found`, ...) if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Credential-bound Slack Web API caller.
///
/// Every call decodes the `{ok, error}` envelope so callers only see the
/// payload of successful responses.
pub struct SlackApi {
    http: reqwest::Client,
    base_url: String,
    auth: HeaderValue,
}

impl SlackApi {
    /// Create an API handle sharing `http`'s connection pool.
    ///
    /// # Errors
    /// Returns error if the credential is not a valid header value.
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        credential: &Credential,
    ) -> Result<Self, SlackError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|e| SlackError::InvalidCredential(e.to_string()))?;
        auth.set_sensitive(true);

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Call a read method with query parameters.
    ///
    /// # Errors
    /// Returns error on transport failure or an `ok: false` response.
    pub async fn get<Q>(&self, method: &str, query: &Q) -> Result<Value, SlackError>
    where
        Q: Serialize + ?Sized,
    {
        let request = self.http.get(self.url(method)).query(query);
        self.send(method, request).await
    }

    /// Call a write method with a JSON body.
    ///
    /// # Errors
    /// Returns error on transport failure or an `ok: false` response.
    pub async fn post<B>(&self, method: &str, body: &B) -> Result<Value, SlackError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.http.post(self.url(method)).json(body);
        self.send(method, request).await
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn send(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, SlackError> {
        let start = Instant::now();
        let resp = request
            .header(AUTHORIZATION, self.auth.clone())
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!(
            method,
            status = status.as_u16(),
            duration_ms = duration_ms(start.elapsed()),
            "slack api call"
        );

        if !status.is_success() {
            return Err(SlackError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = resp.json().await?;
        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            Err(SlackError::Api {
                method: method.to_string(),
                error,
            })
        }
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl UserLookup for SlackApi {
    async fn lookup_user(&self, user_id: &str) -> Result<Value, LookupError> {
        match self.get("users.info", &[("user", user_id)]).await {
            Ok(mut body) => Ok(body
                .get_mut("user")
                .map(Value::take)
                .unwrap_or(Value::Null)),
            Err(e) if e.code() == Some("user_not_found") => {
                Err(LookupError::NotFound(user_id.to_string()))
            }
            Err(e) => Err(LookupError::Upstream(e.to_string())),
        }
    }
}
