//! Field projection for Slack API payloads.
//!
//! Upstream objects carry dozens of fields that are noise to a tool caller
//! (blocks, attachments, icons, internal flags). Each function here keeps a
//! fixed allow-list and drops everything else, including absent or null fields.

use serde_json::{Map, Value};

const MESSAGE_FIELDS: &[&str] = &["ts", "user", "text", "thread_ts", "reply_count", "subtype"];
const REACTION_FIELDS: &[&str] = &["name", "count", "users"];
const FILE_FIELDS: &[&str] = &["name", "title", "mimetype", "permalink"];
const CHANNEL_FIELDS: &[&str] = &["id", "name", "is_private", "is_archived", "num_members"];
const USER_FIELDS: &[&str] = &["id", "name", "real_name", "tz", "is_bot", "deleted"];
const BOOKMARK_FIELDS: &[&str] = &["id", "channel_id", "title", "link", "type", "emoji"];
const REMINDER_FIELDS: &[&str] = &["id", "text", "time", "complete_ts", "recurring", "user"];

fn pick(source: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|&field| {
            source
                .get(field)
                .filter(|v| !v.is_null())
                .map(|v| (field.to_string(), v.clone()))
        })
        .collect()
}

fn project_list(source: Option<&Value>, project: fn(&Value) -> Value) -> Vec<Value> {
    source
        .and_then(Value::as_array)
        .map(|items| items.iter().map(project).collect())
        .unwrap_or_default()
}

/// Strip a message, keeping reactions and file summaries.
#[must_use]
pub fn message(source: &Value) -> Value {
    let mut out = pick(source, MESSAGE_FIELDS);

    let reactions = project_list(source.get("reactions"), |r| Value::Object(pick(r, REACTION_FIELDS)));
    if !reactions.is_empty() {
        out.insert("reactions".into(), Value::Array(reactions));
    }

    let files = project_list(source.get("files"), |f| Value::Object(pick(f, FILE_FIELDS)));
    if !files.is_empty() {
        out.insert("files".into(), Value::Array(files));
    }

    Value::Object(out)
}

/// Strip a search match, keeping the channel it was found in.
#[must_use]
pub fn search_match(source: &Value) -> Value {
    let mut out = match message(source) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(channel) = source.get("channel") {
        out.insert("channel".into(), Value::Object(pick(channel, &["id", "name"])));
    }
    if let Some(permalink) = source.get("permalink").filter(|v| !v.is_null()) {
        out.insert("permalink".into(), permalink.clone());
    }
    Value::Object(out)
}

/// Strip a channel; topic and purpose collapse to their text value.
#[must_use]
pub fn channel(source: &Value) -> Value {
    let mut out = pick(source, CHANNEL_FIELDS);
    for key in ["topic", "purpose"] {
        let text = source
            .get(key)
            .and_then(|v| v.get("value"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        if let Some(text) = text {
            out.insert(key.into(), Value::String(text.to_string()));
        }
    }
    Value::Object(out)
}

/// Strip a user, flattening the profile fields callers care about.
#[must_use]
pub fn user(source: &Value) -> Value {
    let mut out = pick(source, USER_FIELDS);
    if let Some(profile) = source.get("profile") {
        for key in ["display_name", "title"] {
            let value = profile
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty());
            if let Some(value) = value {
                out.insert(key.into(), Value::String(value.to_string()));
            }
        }
    }
    Value::Object(out)
}

#[must_use]
pub fn bookmark(source: &Value) -> Value {
    Value::Object(pick(source, BOOKMARK_FIELDS))
}

#[must_use]
pub fn reminder(source: &Value) -> Value {
    Value::Object(pick(source, REMINDER_FIELDS))
}

/// Project every element of `body[key]`.
#[must_use]
pub fn list(body: &Value, key: &str, project: fn(&Value) -> Value) -> Vec<Value> {
    project_list(body.get(key), project)
}

/// Cursor for the next page, if Slack reported one.
#[must_use]
pub fn next_cursor(body: &Value) -> Option<String> {
    body.pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
