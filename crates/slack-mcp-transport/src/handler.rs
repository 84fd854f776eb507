//! MCP method dispatch for messages routed to a live session.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{Value, json};
use slack_mcp_core::{ToolError, ToolHandler};
use slack_mcp_session::Session;

use crate::protocol::{ClientMessage, Notification, ServerMessage, codes};

/// Name reported in `serverInfo` and by the health endpoint.
pub const SERVER_NAME: &str = "slack-mcp-gateway";

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Result payload for `initialize`.
///
/// Echoes the client's requested protocol version when supported, otherwise
/// offers the newest one.
#[must_use]
pub fn initialize_result(params: Option<&Value>) -> Value {
    let requested = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str);
    let version = requested
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);

    json!({
        "protocolVersion": version,
        "capabilities": {
            "tools": { "listChanged": false },
            "logging": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Handle one message for `session`.
///
/// Returns `None` for notifications and client responses, which get no reply.
pub async fn handle_message<C>(session: &Session<C>, message: ClientMessage) -> Option<ServerMessage>
where
    C: ToolHandler,
{
    let Some(method) = message.method.as_deref() else {
        tracing::debug!(session_id = %session.id(), "ignoring client response");
        return None;
    };

    let Some(id) = message.id.clone() else {
        tracing::debug!(session_id = %session.id(), method, "client notification");
        return None;
    };

    let response = match method {
        "initialize" => ServerMessage::error(
            id,
            codes::INVALID_REQUEST,
            "Invalid Request: Server already initialized",
        ),
        "ping" | "logging/setLevel" => ServerMessage::result(id, json!({})),
        "tools/list" => ServerMessage::result(id, json!({ "tools": session.client().tools() })),
        "tools/call" => call_tool(session, id, message.params).await,
        other => ServerMessage::error(
            id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    };
    Some(response)
}

async fn call_tool<C>(session: &Session<C>, id: Value, params: Option<Value>) -> ServerMessage
where
    C: ToolHandler,
{
    let mut params = params.unwrap_or(Value::Null);
    let Some(name) = params.get("name").and_then(Value::as_str).map(str::to_string) else {
        return ServerMessage::error(id, codes::INVALID_PARAMS, "Invalid params: missing tool name");
    };
    let arguments = params
        .get_mut("arguments")
        .map(Value::take)
        .unwrap_or(Value::Null);

    let outcome = AssertUnwindSafe(session.client().call_tool(&name, arguments))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => ServerMessage::result(id, tool_result(&value, false)),
        Ok(Err(e @ (ToolError::UnknownTool(_) | ToolError::InvalidArguments(_)))) => {
            ServerMessage::error(id, codes::INVALID_PARAMS, e.to_string())
        }
        Ok(Err(ToolError::Upstream(message))) => {
            session.transport().notify(log_notification(&name, &message));
            ServerMessage::result(id, tool_result(&Value::String(message), true))
        }
        Ok(Err(e @ ToolError::Internal(_))) => {
            tracing::error!(session_id = %session.id(), tool = %name, error = %e, "tool failed");
            ServerMessage::error(id, codes::INTERNAL_ERROR, "Internal error")
        }
        Err(_) => {
            tracing::error!(session_id = %session.id(), tool = %name, "tool panicked");
            ServerMessage::error(id, codes::INTERNAL_ERROR, "Internal error")
        }
    }
}

fn tool_result(value: &Value, is_error: bool) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}

fn log_notification(tool: &str, message: &str) -> Value {
    let notification = Notification::new(
        "notifications/message",
        Some(json!({
            "level": "error",
            "logger": tool,
            "data": message
        })),
    );
    serde_json::to_value(notification).unwrap_or(Value::Null)
}
