//! Tool catalog: definitions and typed arguments.

use serde::Deserialize;
use serde_json::{Value, json};
use slack_mcp_core::{ToolDefinition, ToolError};

const MAX_PAGE: u32 = 200;
const MAX_SEARCH: u32 = 100;

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum SlackTool {
    SlackListChannels {
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        cursor: Option<String>,
    },
    SlackPostMessage {
        channel_id: String,
        text: String,
    },
    SlackReplyToThread {
        channel_id: String,
        thread_ts: String,
        text: String,
    },
    SlackAddReaction {
        channel_id: String,
        timestamp: String,
        reaction: String,
    },
    SlackGetChannelHistory {
        channel_id: String,
        #[serde(default)]
        limit: Option<u32>,
    },
    SlackGetThreadReplies {
        channel_id: String,
        thread_ts: String,
    },
    SlackGetUsers {
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        cursor: Option<String>,
    },
    SlackGetUserProfile {
        user_id: String,
    },
    SlackSearchMessages {
        query: String,
        #[serde(default)]
        count: Option<u32>,
    },
    SlackListBookmarks {
        channel_id: String,
    },
    SlackAddBookmark {
        channel_id: String,
        title: String,
        link: String,
    },
    SlackAddReminder {
        text: String,
        time: String,
    },
    SlackListReminders {},
    SlackDeleteReminder {
        reminder_id: String,
    },
}

impl SlackTool {
    /// Validate a `tools/call` request into a typed invocation.
    ///
    /// # Errors
    /// Returns `UnknownTool` for names outside the catalog and
    /// `InvalidArguments` when the arguments do not match the schema.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, ToolError> {
        if !TOOL_NAMES.contains(&name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments(
                "arguments must be an object".to_string(),
            ));
        }

        let tool: Self = serde_json::from_value(json!({ "name": name, "arguments": arguments }))
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        tool.validate()?;
        Ok(tool)
    }

    fn validate(&self) -> Result<(), ToolError> {
        match self {
            Self::SlackPostMessage { channel_id, text } => {
                require(&[("channel_id", channel_id), ("text", text)])
            }
            Self::SlackReplyToThread {
                channel_id,
                thread_ts,
                text,
            } => require(&[
                ("channel_id", channel_id),
                ("thread_ts", thread_ts),
                ("text", text),
            ]),
            Self::SlackAddReaction {
                channel_id,
                timestamp,
                reaction,
            } => require(&[
                ("channel_id", channel_id),
                ("timestamp", timestamp),
                ("reaction", reaction),
            ]),
            Self::SlackGetChannelHistory { channel_id, .. }
            | Self::SlackListBookmarks { channel_id } => require(&[("channel_id", channel_id)]),
            Self::SlackGetThreadReplies {
                channel_id,
                thread_ts,
            } => require(&[("channel_id", channel_id), ("thread_ts", thread_ts)]),
            Self::SlackGetUserProfile { user_id } => require(&[("user_id", user_id)]),
            Self::SlackSearchMessages { query, .. } => require(&[("query", query)]),
            Self::SlackAddBookmark {
                channel_id,
                title,
                link,
            } => require(&[("channel_id", channel_id), ("title", title), ("link", link)]),
            Self::SlackAddReminder { text, time } => require(&[("text", text), ("time", time)]),
            Self::SlackDeleteReminder { reminder_id } => require(&[("reminder_id", reminder_id)]),
            Self::SlackListChannels { .. } | Self::SlackGetUsers { .. } | Self::SlackListReminders {} => {
                Ok(())
            }
        }
    }

    /// Tool name as advertised in the catalog.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SlackListChannels { .. } => "slack_list_channels",
            Self::SlackPostMessage { .. } => "slack_post_message",
            Self::SlackReplyToThread { .. } => "slack_reply_to_thread",
            Self::SlackAddReaction { .. } => "slack_add_reaction",
            Self::SlackGetChannelHistory { .. } => "slack_get_channel_history",
            Self::SlackGetThreadReplies { .. } => "slack_get_thread_replies",
            Self::SlackGetUsers { .. } => "slack_get_users",
            Self::SlackGetUserProfile { .. } => "slack_get_user_profile",
            Self::SlackSearchMessages { .. } => "slack_search_messages",
            Self::SlackListBookmarks { .. } => "slack_list_bookmarks",
            Self::SlackAddBookmark { .. } => "slack_add_bookmark",
            Self::SlackAddReminder { .. } => "slack_add_reminder",
            Self::SlackListReminders {} => "slack_list_reminders",
            Self::SlackDeleteReminder { .. } => "slack_delete_reminder",
        }
    }
}

fn require(fields: &[(&str, &String)]) -> Result<(), ToolError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(ToolError::InvalidArguments(format!(
            "{field} must not be empty"
        ))),
        None => Ok(()),
    }
}

/// Clamp an optional page size to `1..=max`, using `default` when absent.
#[must_use]
pub fn page_size(requested: Option<u32>, default: u32, max: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, max)
}

/// Page size for channel and user listings.
#[must_use]
pub fn list_limit(requested: Option<u32>) -> u32 {
    page_size(requested, 100, MAX_PAGE)
}

/// Page size for history requests.
#[must_use]
pub fn history_limit(requested: Option<u32>) -> u32 {
    page_size(requested, 10, MAX_PAGE)
}

/// Page size for message search.
#[must_use]
pub fn search_count(requested: Option<u32>) -> u32 {
    page_size(requested, 20, MAX_SEARCH)
}

const TOOL_NAMES: &[&str] = &[
    "slack_list_channels",
    "slack_post_message",
    "slack_reply_to_thread",
    "slack_add_reaction",
    "slack_get_channel_history",
    "slack_get_thread_replies",
    "slack_get_users",
    "slack_get_user_profile",
    "slack_search_messages",
    "slack_list_bookmarks",
    "slack_add_bookmark",
    "slack_add_reminder",
    "slack_list_reminders",
    "slack_delete_reminder",
];

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn int_prop(description: &str, default: u32, max: u32) -> Value {
    json!({
        "type": "integer",
        "description": description,
        "default": default,
        "minimum": 1,
        "maximum": max
    })
}

fn schema(properties: &Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Definitions for every tool in the catalog, in `TOOL_NAMES` order.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    let channel_id = string_prop("The ID of the channel");
    let cursor = string_prop("Pagination cursor for the next page of results");

    vec![
        tool(
            "slack_list_channels",
            "List public channels in the workspace with pagination",
            schema(
                &json!({
                    "limit": int_prop("Maximum number of channels to return", 100, MAX_PAGE),
                    "cursor": cursor,
                }),
                &[],
            ),
        ),
        tool(
            "slack_post_message",
            "Post a new message to a Slack channel",
            schema(
                &json!({
                    "channel_id": channel_id,
                    "text": string_prop("The message text to post"),
                }),
                &["channel_id", "text"],
            ),
        ),
        tool(
            "slack_reply_to_thread",
            "Reply to a specific message thread in Slack",
            schema(
                &json!({
                    "channel_id": channel_id,
                    "thread_ts": string_prop("Timestamp of the parent message, e.g. '1234567890.123456'"),
                    "text": string_prop("The reply text"),
                }),
                &["channel_id", "thread_ts", "text"],
            ),
        ),
        tool(
            "slack_add_reaction",
            "Add a reaction emoji to a message",
            schema(
                &json!({
                    "channel_id": channel_id,
                    "timestamp": string_prop("Timestamp of the message to react to"),
                    "reaction": string_prop("Emoji name without colons"),
                }),
                &["channel_id", "timestamp", "reaction"],
            ),
        ),
        tool(
            "slack_get_channel_history",
            "Get recent messages from a channel, with user details resolved",
            schema(
                &json!({
                    "channel_id": channel_id,
                    "limit": int_prop("Number of messages to retrieve", 10, MAX_PAGE),
                }),
                &["channel_id"],
            ),
        ),
        tool(
            "slack_get_thread_replies",
            "Get all replies in a message thread, with user details resolved",
            schema(
                &json!({
                    "channel_id": channel_id,
                    "thread_ts": string_prop("Timestamp of the parent message"),
                }),
                &["channel_id", "thread_ts"],
            ),
        ),
        tool(
            "slack_get_users",
            "List users in the workspace with basic profile information",
            schema(
                &json!({
                    "limit": int_prop("Maximum number of users to return", 100, MAX_PAGE),
                    "cursor": cursor,
                }),
                &[],
            ),
        ),
        tool(
            "slack_get_user_profile",
            "Get detailed profile information for a specific user",
            schema(
                &json!({ "user_id": string_prop("The ID of the user") }),
                &["user_id"],
            ),
        ),
        tool(
            "slack_search_messages",
            "Search messages across the workspace using Slack search syntax",
            schema(
                &json!({
                    "query": string_prop("Search query, e.g. 'deploy in:#ops from:@ada'"),
                    "count": int_prop("Number of matches to return", 20, MAX_SEARCH),
                }),
                &["query"],
            ),
        ),
        tool(
            "slack_list_bookmarks",
            "List bookmarks saved in a channel",
            schema(&json!({ "channel_id": channel_id }), &["channel_id"]),
        ),
        tool(
            "slack_add_bookmark",
            "Add a link bookmark to a channel",
            schema(
                &json!({
                    "channel_id": channel_id,
                    "title": string_prop("Bookmark title"),
                    "link": string_prop("URL to bookmark"),
                }),
                &["channel_id", "title", "link"],
            ),
        ),
        tool(
            "slack_add_reminder",
            "Create a reminder for the authenticated user",
            schema(
                &json!({
                    "text": string_prop("What to be reminded about"),
                    "time": string_prop("Unix timestamp, seconds from now, or natural language such as 'in 15 minutes'"),
                }),
                &["text", "time"],
            ),
        ),
        tool(
            "slack_list_reminders",
            "List reminders for the authenticated user",
            schema(&json!({}), &[]),
        ),
        tool(
            "slack_delete_reminder",
            "Delete a reminder",
            schema(
                &json!({ "reminder_id": string_prop("The ID of the reminder") }),
                &["reminder_id"],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_cover_catalog() {
        let names: Vec<_> = definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, TOOL_NAMES);
    }

    #[test]
    fn test_parse_post_message() {
        let tool = SlackTool::parse(
            "slack_post_message",
            json!({"channel_id": "C1", "text": "hi"}),
        )
        .unwrap();
        assert_eq!(
            tool,
            SlackTool::SlackPostMessage {
                channel_id: "C1".to_string(),
                text: "hi".to_string()
            }
        );
        assert_eq!(tool.name(), "slack_post_message");
    }

    #[test]
    fn test_parse_optional_arguments() {
        let tool = SlackTool::parse("slack_list_channels", Value::Null).unwrap();
        assert_eq!(
            tool,
            SlackTool::SlackListChannels {
                limit: None,
                cursor: None
            }
        );
        assert_eq!(
            SlackTool::parse("slack_list_reminders", json!({})).unwrap(),
            SlackTool::SlackListReminders {}
        );
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = SlackTool::parse("slack_delete_workspace", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "slack_delete_workspace"));
    }

    #[test]
    fn test_parse_missing_field() {
        let err = SlackTool::parse("slack_post_message", json!({"channel_id": "C1"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(msg) if msg.contains("text")));
    }

    #[test]
    fn test_parse_empty_field() {
        let err = SlackTool::parse("slack_get_user_profile", json!({"user_id": " "})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(msg) if msg.contains("user_id")));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = SlackTool::parse("slack_list_reminders", json!([1, 2])).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_page_sizes_are_clamped() {
        assert_eq!(list_limit(None), 100);
        assert_eq!(list_limit(Some(0)), 1);
        assert_eq!(list_limit(Some(5000)), MAX_PAGE);
        assert_eq!(history_limit(None), 10);
        assert_eq!(search_count(Some(500)), MAX_SEARCH);
    }
}
