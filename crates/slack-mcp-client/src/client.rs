//! Per-session Slack client.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Value, json};
use slack_mcp_core::{
    ClientFactory, Credential, FactoryError, IdentityCache, ToolDefinition, ToolError,
    ToolHandler,
};

use crate::{
    api::{DEFAULT_BASE_URL, SlackApi, SlackError},
    project,
    tools::{self, SlackTool},
};

/// Slack client bound to one session's credential.
///
/// Owns the session's identity cache, so user resolution is shared across
/// every tool call in the session and never across sessions.
pub struct SlackClient {
    api: Arc<SlackApi>,
    identities: IdentityCache<SlackApi>,
}

impl SlackClient {
    /// Wrap an API handle with a fresh identity cache.
    #[must_use]
    pub fn new(api: SlackApi) -> Self {
        let api = Arc::new(api);
        Self {
            identities: IdentityCache::new(Arc::clone(&api)),
            api,
        }
    }

    /// Identity cache for this session.
    #[must_use]
    pub const fn identities(&self) -> &IdentityCache<SlackApi> {
        &self.identities
    }

    /// Execute a validated tool invocation.
    ///
    /// # Errors
    /// Returns error if the Slack API call fails.
    pub async fn execute(&self, tool: SlackTool) -> Result<Value, SlackError> {
        match tool {
            SlackTool::SlackListChannels { limit, cursor } => {
                let mut query = vec![
                    ("types", "public_channel".to_string()),
                    ("exclude_archived", "true".to_string()),
                    ("limit", tools::list_limit(limit).to_string()),
                ];
                query.extend(cursor.map(|c| ("cursor", c)));
                let body = self.api.get("conversations.list", &query).await?;
                Ok(json!({
                    "channels": project::list(&body, "channels", project::channel),
                    "next_cursor": project::next_cursor(&body),
                }))
            }
            SlackTool::SlackPostMessage { channel_id, text } => {
                let body = self
                    .api
                    .post("chat.postMessage", &json!({ "channel": channel_id, "text": text }))
                    .await?;
                Ok(posted(&body))
            }
            SlackTool::SlackReplyToThread {
                channel_id,
                thread_ts,
                text,
            } => {
                let body = self
                    .api
                    .post(
                        "chat.postMessage",
                        &json!({ "channel": channel_id, "thread_ts": thread_ts, "text": text }),
                    )
                    .await?;
                Ok(posted(&body))
            }
            SlackTool::SlackAddReaction {
                channel_id,
                timestamp,
                reaction,
            } => {
                let name = reaction.trim_matches(':').to_string();
                self.api
                    .post(
                        "reactions.add",
                        &json!({ "channel": channel_id, "timestamp": timestamp, "name": name }),
                    )
                    .await?;
                Ok(json!({ "ok": true, "reaction": name }))
            }
            SlackTool::SlackGetChannelHistory { channel_id, limit } => {
                let query = [
                    ("channel", channel_id),
                    ("limit", tools::history_limit(limit).to_string()),
                ];
                let body = self.api.get("conversations.history", &query).await?;
                let messages = self
                    .identities
                    .enrich(project::list(&body, "messages", project::message))
                    .await;
                Ok(json!({
                    "messages": messages,
                    "has_more": body.get("has_more").and_then(Value::as_bool).unwrap_or(false),
                }))
            }
            SlackTool::SlackGetThreadReplies {
                channel_id,
                thread_ts,
            } => {
                let query = [("channel", channel_id), ("ts", thread_ts)];
                let body = self.api.get("conversations.replies", &query).await?;
                let messages = self
                    .identities
                    .enrich(project::list(&body, "messages", project::message))
                    .await;
                Ok(json!({ "messages": messages }))
            }
            SlackTool::SlackGetUsers { limit, cursor } => {
                let mut query = vec![("limit", tools::list_limit(limit).to_string())];
                query.extend(cursor.map(|c| ("cursor", c)));
                let body = self.api.get("users.list", &query).await?;
                Ok(json!({
                    "members": project::list(&body, "members", project::user),
                    "next_cursor": project::next_cursor(&body),
                }))
            }
            SlackTool::SlackGetUserProfile { user_id } => {
                let body = self.api.get("users.info", &[("user", user_id)]).await?;
                Ok(body.get("user").map(project::user).unwrap_or(Value::Null))
            }
            SlackTool::SlackSearchMessages { query, count } => {
                let params = [
                    ("query", query),
                    ("count", tools::search_count(count).to_string()),
                ];
                let body = self.api.get("search.messages", &params).await?;
                let matches: Vec<Value> = body
                    .pointer("/messages/matches")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(project::search_match).collect())
                    .unwrap_or_default();
                let total = body
                    .pointer("/messages/total")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                Ok(json!({
                    "total": total,
                    "matches": self.identities.enrich(matches).await,
                }))
            }
            SlackTool::SlackListBookmarks { channel_id } => {
                let body = self
                    .api
                    .get("bookmarks.list", &[("channel_id", channel_id)])
                    .await?;
                Ok(json!({ "bookmarks": project::list(&body, "bookmarks", project::bookmark) }))
            }
            SlackTool::SlackAddBookmark {
                channel_id,
                title,
                link,
            } => {
                let body = self
                    .api
                    .post(
                        "bookmarks.add",
                        &json!({
                            "channel_id": channel_id,
                            "title": title,
                            "type": "link",
                            "link": link,
                        }),
                    )
                    .await?;
                Ok(body.get("bookmark").map(project::bookmark).unwrap_or(Value::Null))
            }
            SlackTool::SlackAddReminder { text, time } => {
                let body = self
                    .api
                    .post("reminders.add", &json!({ "text": text, "time": time }))
                    .await?;
                Ok(body.get("reminder").map(project::reminder).unwrap_or(Value::Null))
            }
            SlackTool::SlackListReminders {} => {
                let no_params: [(&str, &str); 0] = [];
                let body = self.api.get("reminders.list", &no_params).await?;
                Ok(json!({ "reminders": project::list(&body, "reminders", project::reminder) }))
            }
            SlackTool::SlackDeleteReminder { reminder_id } => {
                self.api
                    .post("reminders.delete", &json!({ "reminder": reminder_id }))
                    .await?;
                Ok(json!({ "ok": true, "reminder_id": reminder_id }))
            }
        }
    }
}

fn posted(body: &Value) -> Value {
    json!({
        "channel": body.get("channel"),
        "ts": body.get("ts"),
        "message": body.get("message").map(project::message),
    })
}

#[async_trait]
impl ToolHandler for SlackClient {
    fn tools(&self) -> Vec<ToolDefinition> {
        tools::definitions()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = SlackTool::parse(name, arguments)?;
        tracing::debug!(tool = tool.name(), "calling slack tool");
        self.execute(tool).await.map_err(|e| {
            tracing::warn!(tool = name, error = %e, "slack tool failed");
            ToolError::Upstream(e.to_string())
        })
    }
}

/// Builds a [`SlackClient`] per session over a shared connection pool.
#[derive(Clone)]
pub struct SlackClientFactory {
    http: reqwest::Client,
    base_url: String,
}

impl SlackClientFactory {
    /// Create a factory targeting `base_url` with a per-request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SlackError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slack-mcp-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Factory for the public Slack API.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn slack(timeout: Duration) -> Result<Self, SlackError> {
        Self::new(DEFAULT_BASE_URL, timeout)
    }
}

impl ClientFactory for SlackClientFactory {
    type Client = SlackClient;

    fn connect(&self, credential: Credential) -> Result<SlackClient, FactoryError> {
        let api = SlackApi::new(self.http.clone(), self.base_url.clone(), &credential)
            .map_err(|e| FactoryError::Build(e.to_string()))?;
        Ok(SlackClient::new(api))
    }
}
