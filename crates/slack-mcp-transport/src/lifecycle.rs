//! Admission control: decide whether a request reuses, opens or is refused a session.

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode};
use slack_mcp_core::{ClientFactory, Credential};
use slack_mcp_session::{Session, SessionRegistry};
use uuid::Uuid;

use crate::protocol::{Payload, ServerMessage, codes};

/// Header carrying the session identifier.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Header carrying the upstream bearer credential on `initialize`.
pub const CREDENTIAL_HEADER: &str = "x-slack-bot-token";

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Initialization attempted without a credential.
    MissingCredential,
    /// Missing, malformed, unknown or closed session identifier.
    InvalidSession,
}

impl Rejection {
    /// HTTP status for this rejection.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::MissingCredential => StatusCode::UNAUTHORIZED,
            Self::InvalidSession => StatusCode::BAD_REQUEST,
        }
    }

    /// Human-readable message carried in the JSON-RPC envelope.
    #[must_use]
    pub fn message(self) -> String {
        match self {
            Self::MissingCredential => {
                format!("Unauthorized: Missing {CREDENTIAL_HEADER} header")
            }
            Self::InvalidSession => "Bad Request: No valid session ID provided".to_string(),
        }
    }

    /// JSON-RPC error envelope (`id: null`, code `-32000`).
    #[must_use]
    pub fn envelope(self) -> ServerMessage {
        ServerMessage::error(serde_json::Value::Null, codes::SESSION_ERROR, self.message())
    }
}

/// Outcome of admission for an inbound request.
pub enum Admission<C> {
    /// Forward to an existing live session.
    Reuse(Arc<Session<C>>),
    /// Open a new session bound to this credential.
    Initiate(Credential),
    /// Refuse without touching any state.
    Reject(Rejection),
}

impl<C> std::fmt::Debug for Admission<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reuse(session) => f.debug_tuple("Reuse").field(&session.id()).finish(),
            Self::Initiate(credential) => f.debug_tuple("Initiate").field(credential).finish(),
            Self::Reject(rejection) => f.debug_tuple("Reject").field(rejection).finish(),
        }
    }
}

/// Resolve a session header to a live session.
///
/// A header that is present but not a readable UUID is rejected like an
/// unknown one.
pub async fn resolve<F>(
    registry: &SessionRegistry<F>,
    session_header: Option<&HeaderValue>,
) -> Result<Arc<Session<F::Client>>, Rejection>
where
    F: ClientFactory,
{
    let id = session_header
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or(Rejection::InvalidSession)?;
    registry.lookup(id).await.ok_or(Rejection::InvalidSession)
}

/// Decide the admission outcome for a `POST`.
///
/// - a session header that maps to a live session is reused, and any other
///   session header (unknown, closed or unreadable) is rejected;
/// - no session header, an `initialize` payload and a credential initiate;
/// - everything else is rejected.
///
/// This is a pure decision: it never creates or removes sessions.
pub async fn admit<F>(
    registry: &SessionRegistry<F>,
    session_header: Option<&HeaderValue>,
    credential_header: Option<&HeaderValue>,
    payload: &Payload,
) -> Admission<F::Client>
where
    F: ClientFactory,
{
    if session_header.is_some() {
        return match resolve(registry, session_header).await {
            Ok(session) => Admission::Reuse(session),
            Err(rejection) => Admission::Reject(rejection),
        };
    }

    if !payload.is_initialize() {
        return Admission::Reject(Rejection::InvalidSession);
    }

    let credential = credential_header
        .and_then(|value| value.to_str().ok())
        .and_then(Credential::new);
    match credential {
        Some(credential) => Admission::Initiate(credential),
        None => Admission::Reject(Rejection::MissingCredential),
    }
}
