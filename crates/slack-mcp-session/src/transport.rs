//! Per-session transport handle and lifecycle events.

use futures::{StreamExt, stream::BoxStream};
use serde_json::Value;
use slack_mcp_core::SessionId;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::BroadcastStream;

/// Capacity of the server-to-client notification channel.
const NOTIFICATION_CAPACITY: usize = 256;

/// Lifecycle event emitted by a session transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The transport closed; the session must be dropped.
    Closed(SessionId),
}

/// Observable session state.
///
/// `Uninitialized` only exists inside `SessionRegistry::create_session` and is
/// never visible through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

/// Duplex channel handle for one session.
///
/// Carries server-to-client notifications and the close signal. Closing is
/// one-shot: only the first call emits [`LifecycleEvent::Closed`].
pub struct SessionTransport {
    session_id: SessionId,
    notifications: broadcast::Sender<Value>,
    closed: watch::Sender<bool>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
}

impl SessionTransport {
    pub(crate) fn new(session_id: SessionId, events: mpsc::UnboundedSender<LifecycleEvent>) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (closed, _) = watch::channel(false);
        Self {
            session_id,
            notifications,
            closed,
            events,
        }
    }

    /// Session this transport belongs to.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if *self.closed.borrow() {
            SessionState::Closed
        } else {
            SessionState::Active
        }
    }

    /// Whether the transport has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Push a notification to every open listener. Dropped if nobody listens.
    pub fn notify(&self, message: Value) {
        if self.is_closed() {
            return;
        }
        let _ = self.notifications.send(message);
    }

    /// Receiver for live notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.notifications.subscribe()
    }

    /// Stream of notifications that ends when the transport closes.
    ///
    /// Lagged receivers skip the messages they missed.
    #[must_use]
    pub fn notification_stream(&self) -> BoxStream<'static, Value> {
        let mut closed = self.closed.subscribe();
        let until_closed = async move {
            let _ = closed.wait_for(|closed| *closed).await;
        };

        BroadcastStream::new(self.subscribe())
            .filter_map(|res| async move { res.ok() })
            .take_until(until_closed)
            .boxed()
    }

    /// Close the transport.
    ///
    /// Returns `true` if this call performed the transition; repeated calls
    /// are no-ops and return `false`.
    pub fn close(&self) -> bool {
        if self.closed.send_replace(true) {
            return false;
        }
        tracing::debug!(session_id = %self.session_id, "session transport closed");
        if self
            .events
            .send(LifecycleEvent::Closed(self.session_id))
            .is_err()
        {
            tracing::debug!(session_id = %self.session_id, "lifecycle listener already gone");
        }
        true
    }
}
