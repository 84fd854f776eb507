//! Core traits for upstream lookups, tool dispatch and client construction.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Session identifier.
pub type SessionId = Uuid;

/// Upstream bearer credential bound to a single session.
///
/// The token never appears in `Debug` output so it can be carried through
/// structured logging without leaking.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token. Returns `None` for empty or whitespace-only input.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw token, for building upstream request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Identity lookup error.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Fetches a raw user record from the upstream platform.
///
/// Injected into [`IdentityCache`](crate::IdentityCache) so tests can
/// substitute a fake without network access.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Look up a single user by identifier, returning the upstream object.
    async fn lookup_user(&self, user_id: &str) -> Result<Value, LookupError>;
}

/// Tool description advertised through `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Tool invocation error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Dispatches remote operations on behalf of one session.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The catalog of operations this handler accepts.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Invoke a tool by name with JSON arguments.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError>;
}

/// Client construction error.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Client construction failed: {0}")]
    Build(String),
}

/// Builds one upstream client per session.
pub trait ClientFactory: Send + Sync + 'static {
    /// Client type produced for each session.
    type Client: ToolHandler + 'static;

    /// Construct a client bound to `credential`.
    ///
    /// # Errors
    /// Returns error if the client cannot be constructed.
    fn connect(&self, credential: Credential) -> Result<Self::Client, FactoryError>;
}
