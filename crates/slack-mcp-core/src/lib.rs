//! Core abstractions for per-session Slack gateway state.
//!
//! This crate provides the fundamental building blocks:
//! - `IdentityCache` - Session-scoped user resolution with request coalescing
//! - Record enrichment over the identity cache
//! - `Credential` and `SessionId` - Session binding types
//! - Lookup, tool and client factory traits

pub mod enrich;
pub mod identity;
pub mod traits;

pub use enrich::collect_user_ids;
pub use identity::{IdentityCache, UserSummary};
pub use traits::{
    ClientFactory, Credential, FactoryError, LookupError, SessionId, ToolDefinition, ToolError,
    ToolHandler, UserLookup,
};
