//! Streamable HTTP transport: `POST`/`GET`/`DELETE` on a single MCP path.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::post,
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use slack_mcp_core::{ClientFactory, SessionId};
use slack_mcp_session::{Session, SessionRegistry};

use crate::{
    handler::{handle_message, initialize_result},
    lifecycle::{Admission, CREDENTIAL_HEADER, Rejection, SESSION_HEADER, admit, resolve},
    protocol::{Payload, ServerMessage, codes},
};

/// Path the MCP endpoint is mounted on.
pub const MCP_PATH: &str = "/mcp";

/// Transport handler state.
pub struct McpState<F>
where
    F: ClientFactory,
{
    /// Session registry shared with the composition root.
    pub registry: Arc<SessionRegistry<F>>,
}

impl<F> Clone for McpState<F>
where
    F: ClientFactory,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Create the MCP router.
///
/// # Example
/// ```ignore
/// let registry = SessionRegistry::new(factory);
/// let app = Router::new().merge(create_mcp_router(registry));
/// ```
#[must_use]
pub fn create_mcp_router<F>(registry: Arc<SessionRegistry<F>>) -> Router
where
    F: ClientFactory,
{
    Router::new()
        .route(
            MCP_PATH,
            post(handle_post::<F>)
                .get(handle_get::<F>)
                .delete(handle_delete::<F>),
        )
        .with_state(McpState { registry })
}

fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    session_id: Option<SessionId>,
) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Some(id) = session_id {
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    response
}

fn rejection_response(rejection: Rejection) -> Response {
    json_response(rejection.status(), &rejection.envelope(), None)
}

async fn handle_post<F>(
    State(state): State<McpState<F>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    F: ClientFactory,
{
    let payload = match Payload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Invalid JSON-RPC body: {e}");
            let envelope =
                ServerMessage::error(Value::Null, codes::PARSE_ERROR, format!("Parse error: {e}"));
            return json_response(StatusCode::BAD_REQUEST, &envelope, None);
        }
    };

    let admission = admit(
        &state.registry,
        headers.get(SESSION_HEADER),
        headers.get(CREDENTIAL_HEADER),
        &payload,
    )
    .await;

    match admission {
        Admission::Reuse(session) => dispatch(&session, payload).await,
        Admission::Initiate(credential) => {
            let session = match state.registry.create_session(credential).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!("Failed to create session: {e}");
                    let envelope = ServerMessage::error(
                        Value::Null,
                        codes::INTERNAL_ERROR,
                        "Internal error: failed to create session",
                    );
                    return json_response(StatusCode::INTERNAL_SERVER_ERROR, &envelope, None);
                }
            };

            let Some(message) = payload.into_messages().into_iter().next() else {
                return rejection_response(Rejection::InvalidSession);
            };
            let response = ServerMessage::result(
                message.id.unwrap_or(Value::Null),
                initialize_result(message.params.as_ref()),
            );
            json_response(StatusCode::OK, &response, Some(session.id()))
        }
        Admission::Reject(rejection) => {
            tracing::warn!(?rejection, "rejected request");
            rejection_response(rejection)
        }
    }
}

async fn dispatch<C>(session: &Session<C>, payload: Payload) -> Response
where
    C: slack_mcp_core::ToolHandler,
{
    match payload {
        Payload::Single(message) => match handle_message(session, message).await {
            Some(response) => json_response(StatusCode::OK, &response, None),
            None => StatusCode::ACCEPTED.into_response(),
        },
        Payload::Batch(messages) if messages.is_empty() => {
            let envelope = ServerMessage::error(
                Value::Null,
                codes::INVALID_REQUEST,
                "Invalid Request: empty batch",
            );
            json_response(StatusCode::BAD_REQUEST, &envelope, None)
        }
        Payload::Batch(messages) => {
            let mut responses = Vec::with_capacity(messages.len());
            for message in messages {
                responses.extend(handle_message(session, message).await);
            }
            if responses.is_empty() {
                StatusCode::ACCEPTED.into_response()
            } else {
                json_response(StatusCode::OK, &responses, None)
            }
        }
    }
}

async fn handle_get<F>(State(state): State<McpState<F>>, headers: HeaderMap) -> Response
where
    F: ClientFactory,
{
    let session = match resolve(&state.registry, headers.get(SESSION_HEADER)).await {
        Ok(session) => session,
        Err(rejection) => return rejection_response(rejection),
    };

    tracing::debug!(session_id = %session.id(), "notification stream opened");
    let stream = session
        .transport()
        .notification_stream()
        .map(|message| Ok::<_, Infallible>(Event::default().event("message").data(message.to_string())));

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn handle_delete<F>(State(state): State<McpState<F>>, headers: HeaderMap) -> Response
where
    F: ClientFactory,
{
    match resolve(&state.registry, headers.get(SESSION_HEADER)).await {
        Ok(session) => {
            session.transport().close();
            tracing::info!(session_id = %session.id(), "session terminated by client");
            StatusCode::OK.into_response()
        }
        Err(rejection) => rejection_response(rejection),
    }
}
