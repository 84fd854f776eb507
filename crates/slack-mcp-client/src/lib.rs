//! Slack Web API client and tool catalog for the MCP gateway.
//!
//! Provides:
//! - `SlackApi` - Credential-bound Web API caller (and the `users.info` lookup)
//! - `SlackClient` - Per-session client owning the identity cache
//! - Tool catalog definitions and field projection

pub mod api;
pub mod client;
pub mod project;
pub mod tools;

pub use api::{DEFAULT_BASE_URL, SlackApi, SlackError};
pub use client::{SlackClient, SlackClientFactory};
pub use tools::SlackTool;
