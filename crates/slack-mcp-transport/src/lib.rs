//! MCP streamable HTTP transport for the Slack gateway.
//!
//! Provides:
//! - Wire protocol (JSON-RPC 2.0)
//! - Session admission (reuse / initiate / reject)
//! - MCP method dispatch onto a session's client
//! - Axum router for `POST`/`GET`/`DELETE`

pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod protocol;

pub use http::{MCP_PATH, McpState, create_mcp_router};
pub use lifecycle::{Admission, CREDENTIAL_HEADER, Rejection, SESSION_HEADER, admit};
pub use protocol::{ClientMessage, Payload, ServerMessage};
