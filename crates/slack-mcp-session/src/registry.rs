//! Session registry for binding sessions to upstream clients.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use slack_mcp_core::{ClientFactory, Credential, FactoryError, SessionId};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::transport::{LifecycleEvent, SessionTransport};

/// Session registry error.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Client error: {0}")]
    Client(#[from] FactoryError),
}

/// A live session: identifier, transport and exclusively owned client.
pub struct Session<C> {
    id: SessionId,
    transport: SessionTransport,
    client: Arc<C>,
}

impl<C> Session<C> {
    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Transport handle for notifications and closure.
    #[must_use]
    pub const fn transport(&self) -> &SessionTransport {
        &self.transport
    }

    /// Upstream client bound to this session's credential.
    #[must_use]
    pub const fn client(&self) -> &Arc<C> {
        &self.client
    }
}

/// Process-wide table of live sessions.
///
/// Owned by the composition root and shared by handle. Sessions are inserted
/// fully constructed, so a lookup never observes a partial session. Removal
/// is driven by [`LifecycleEvent`]s from each session's transport.
pub struct SessionRegistry<F>
where
    F: ClientFactory,
{
    factory: F,
    sessions: RwLock<HashMap<SessionId, Arc<Session<F::Client>>>>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
}

impl<F> SessionRegistry<F>
where
    F: ClientFactory,
{
    /// Create a registry and start its lifecycle listener.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(factory: F) -> Arc<Self> {
        let (events, rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            factory,
            sessions: RwLock::new(HashMap::new()),
            events,
        });

        tokio::spawn(Self::listen(Arc::downgrade(&registry), rx));
        registry
    }

    async fn listen(registry: Weak<Self>, mut rx: mpsc::UnboundedReceiver<LifecycleEvent>) {
        while let Some(event) = rx.recv().await {
            let Some(registry) = registry.upgrade() else {
                break;
            };
            registry.handle_event(event).await;
        }
        tracing::debug!("session lifecycle listener stopped");
    }

    /// Apply a lifecycle event.
    pub async fn handle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Closed(id) => self.remove(id).await,
        }
    }

    /// Create a session bound to `credential`.
    ///
    /// # Errors
    /// Returns error if the upstream client cannot be constructed. Nothing is
    /// inserted in that case.
    pub async fn create_session(
        &self,
        credential: Credential,
    ) -> Result<Arc<Session<F::Client>>, RegistryError> {
        let client = Arc::new(self.factory.connect(credential)?);

        let mut sessions = self.sessions.write().await;
        let mut id = Uuid::new_v4();
        while sessions.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let session = Arc::new(Session {
            id,
            transport: SessionTransport::new(id, self.events.clone()),
            client,
        });
        sessions.insert(id, Arc::clone(&session));
        drop(sessions);

        tracing::info!(session_id = %id, "session created");
        Ok(session)
    }

    /// Find a live session.
    pub async fn lookup(&self, id: SessionId) -> Option<Arc<Session<F::Client>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|s| !s.transport.is_closed())
            .map(Arc::clone)
    }

    /// Drop a session. No-op if it is already gone.
    pub async fn remove(&self, id: SessionId) {
        let removed = self.sessions.write().await.remove(&id);
        if let Some(session) = removed {
            session.transport.close();
            tracing::info!(session_id = %id, "session removed");
        }
    }

    /// Close every live session's transport.
    pub async fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        for session in &sessions {
            session.transport.close();
        }
        tracing::info!(count = sessions.len(), "closed all sessions");
    }

    /// Number of sessions in the table.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
