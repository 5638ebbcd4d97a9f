//! Conversation message and tool-call types (§3 Data Model).
//!
//! `Message` is a tagged variant rather than a single struct with
//! role-conditional optional fields: `tool_calls` only ever makes sense on an
//! assistant message, `tool_call_id`/`name` only on a tool message, and a
//! plain struct would let callers construct nonsensical combinations.

use serde::{Deserialize, Serialize};

/// A single tool call emitted by the assistant.
///
/// `arguments` is kept as a JSON-encoded string rather than a parsed `Value`:
/// the wire form is what gets persisted and replayed, and deferring parsing
/// to the tool boundary means a malformed-but-unused argument never fails a
/// message round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), arguments: arguments.into() }
    }

    /// Parse `arguments` as JSON. Tools validate against their own schema;
    /// this is a convenience for callers that just want a `Value`.
    pub fn arguments_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.arguments)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant { content: content.into(), reasoning_content: None, tool_calls: Vec::new() }
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        reasoning_content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Message::Assistant { content: content.into(), reasoning_content, tool_calls }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool { tool_call_id: tool_call_id.into(), name: name.into(), content: content.into() }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// True for `isCompactSummary` user messages produced by the compaction
    /// service; detected by the begin/end markers the summary is wrapped in
    /// rather than a side-channel flag, since `Message` itself carries no
    /// such field (the marker lives in the persisted `SessionEntry` instead).
    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }
}
