//! Record enrichment: replace raw user identifiers with resolved summaries.
//!
//! A batch is processed in three steps:
//! 1. collect the distinct identifiers referenced by `user` fields and by
//!    every reaction's `users` list,
//! 2. resolve them all concurrently through the [`IdentityCache`],
//! 3. rewrite each record, preserving record and reaction order.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use serde_json::Value;

use crate::{
    identity::{IdentityCache, UserSummary},
    traits::UserLookup,
};

impl<L> IdentityCache<L>
where
    L: UserLookup + ?Sized,
{
    /// Enrich a batch of records.
    ///
    /// Each distinct identifier triggers at most one upstream lookup for the
    /// whole batch. Lookup failures degrade to `{id}` for the affected
    /// identifier only; this never fails.
    pub async fn enrich(&self, records: Vec<Value>) -> Vec<Value> {
        let ids = collect_user_ids(&records);
        if ids.is_empty() {
            return records;
        }

        // join_all yields results in input order regardless of completion order.
        let summaries = join_all(ids.iter().map(|id| self.resolve(id))).await;
        let resolved: HashMap<&str, Value> = ids
            .iter()
            .map(String::as_str)
            .zip(summaries.iter().map(summary_value))
            .collect();

        tracing::debug!(
            records = records.len(),
            users = resolved.len(),
            "enriched record batch"
        );

        records
            .into_iter()
            .map(|record| rewrite_record(record, &resolved))
            .collect()
    }
}

/// Distinct user identifiers referenced anywhere in `records`, in first-seen order.
#[must_use]
pub fn collect_user_ids(records: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut push = |id: &str| {
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    };

    for record in records {
        if let Some(user) = record.get("user").and_then(Value::as_str) {
            push(user);
        }
        for reaction in reactions(record) {
            for user in reaction_users(reaction) {
                push(user);
            }
        }
    }

    ids
}

fn reactions(record: &Value) -> impl Iterator<Item = &Value> {
    record
        .get("reactions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn reaction_users(reaction: &Value) -> impl Iterator<Item = &str> {
    reaction
        .get("users")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn summary_value(summary: &UserSummary) -> Value {
    serde_json::to_value(summary).unwrap_or_else(|_| Value::String(summary.id.clone()))
}

fn rewrite_record(mut record: Value, resolved: &HashMap<&str, Value>) -> Value {
    let Some(fields) = record.as_object_mut() else {
        return record;
    };

    if let Some(user) = fields.get_mut("user") {
        replace_id(user, resolved);
    }

    if let Some(Value::Array(reactions)) = fields.get_mut("reactions") {
        for reaction in reactions {
            if let Some(Value::Array(users)) = reaction.get_mut("users") {
                for user in users {
                    replace_id(user, resolved);
                }
            }
        }
    }

    record
}

fn replace_id(slot: &mut Value, resolved: &HashMap<&str, Value>) {
    let replacement = slot.as_str().and_then(|id| resolved.get(id)).cloned();
    if let Some(value) = replacement {
        *slot = value;
    }
}
