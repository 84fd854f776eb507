//! JSON-RPC 2.0 wire types for the MCP transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and transport-specific JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Session admission failures (missing credential, bad session id).
    pub const SESSION_ERROR: i64 = -32000;
}

/// Message from client to server.
///
/// A message with an `id` is a request; without one it is a notification.
/// Responses sent by the client (to server-initiated requests) carry
/// `result` or `error` instead of `method`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ClientMessage {
    /// Whether this message expects a response.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }

    /// Whether this is the session-opening `initialize` request.
    #[must_use]
    pub fn is_initialize(&self) -> bool {
        self.is_request() && self.method.as_deref() == Some("initialize")
    }
}

/// Message from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl ServerMessage {
    /// Successful response.
    #[must_use]
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response. Use `Value::Null` as `id` when the request id is unknown.
    #[must_use]
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A server-to-client notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A POST body: one message or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(ClientMessage),
    Batch(Vec<ClientMessage>),
}

impl Payload {
    /// Parse a request body.
    ///
    /// # Errors
    /// Returns error if the body is not a JSON-RPC message or batch.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        if value.is_array() {
            Ok(Self::Batch(serde_json::from_value(value)?))
        } else {
            Ok(Self::Single(serde_json::from_value(value)?))
        }
    }

    /// Whether the payload is specifically an initialization request.
    ///
    /// Only a single `initialize` request qualifies; batches never open
    /// sessions.
    #[must_use]
    pub fn is_initialize(&self) -> bool {
        matches!(self, Self::Single(message) if message.is_initialize())
    }

    /// Messages in arrival order.
    #[must_use]
    pub fn into_messages(self) -> Vec<ClientMessage> {
        match self {
            Self::Single(message) => vec![message],
            Self::Batch(messages) => messages,
        }
    }
}
