//! Session-scoped identity cache.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};

use crate::traits::UserLookup;

/// Stripped user record substituted for raw user identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl UserSummary {
    /// Fallback summary for an identifier that could not be resolved.
    #[must_use]
    pub fn unresolved(user_id: &str) -> Self {
        Self {
            id: user_id.to_string(),
            name: None,
            display_name: None,
        }
    }

    /// Strip an upstream user object down to `{id, name, display_name}`.
    ///
    /// `id` is always the identifier that was looked up. `display_name` is read from the nested profile, falling back to a
    /// top-level field for upstreams that flatten it.
    #[must_use]
    pub fn from_user(user_id: &str, user: &Value) -> Self {
        let text = |v: Option<&Value>| {
            v.and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            id: user_id.to_string(),
            name: text(user.get("name")),
            display_name: text(user.pointer("/profile/display_name"))
                .or_else(|| text(user.get("display_name"))),
        }
    }
}

/// Resolve-or-fetch-and-cache map from user identifier to [`UserSummary`].
///
/// Entries are append-only: once an identifier resolves (or falls back) the
/// value is reused for the lifetime of the cache. Concurrent resolves of the
/// same uncached identifier share a single upstream lookup.
pub struct IdentityCache<L: ?Sized> {
    lookup: Arc<L>,
    entries: Mutex<HashMap<String, Arc<OnceCell<UserSummary>>>>,
}

impl<L> IdentityCache<L>
where
    L: UserLookup + ?Sized,
{
    /// Create an empty cache backed by `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<L>) -> Self {
        Self {
            lookup,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a user identifier, fetching it upstream at most once.
    ///
    /// Never fails: lookup errors are logged and cached as `{id}`.
    pub async fn resolve(&self, user_id: &str) -> UserSummary {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(user_id.to_string()).or_default())
        };

        cell.get_or_init(|| async {
            match self.lookup.lookup_user(user_id).await {
                Ok(user) => UserSummary::from_user(user_id, &user),
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "user lookup failed, caching fallback");
                    UserSummary::unresolved(user_id)
                }
            }
        })
        .await
        .clone()
    }

    /// Cached summary for `user_id`, without fetching.
    pub async fn get(&self, user_id: &str) -> Option<UserSummary> {
        self.entries
            .lock()
            .await
            .get(user_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of resolved entries.
    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    /// Whether no identifier has been resolved yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
