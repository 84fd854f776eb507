//! Session registry and lifecycle for the Slack MCP gateway.
//!
//! Provides:
//! - `SessionRegistry` - Create, look up and remove sessions
//! - `SessionTransport` - Per-session notification channel and close signal

pub mod registry;
pub mod transport;

pub use registry::{RegistryError, Session, SessionRegistry};
pub use transport::{LifecycleEvent, SessionState, SessionTransport};
