//! `SessionEntry` (§3) — the persisted JSONL record shape.

use agentcore_kernel::{Message, ToolCall};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    User,
    Assistant,
    ToolUse,
    ToolResult,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsePayload {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPayload {
    pub tool_call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub uuid: uuid::Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<uuid::Uuid>,
    pub session_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    pub version: String,
    pub message: EntryMessage,
    /// One payload per tool call on this entry's assistant turn. A single
    /// optional field here would drop every call past the first on a
    /// parallel-dispatch turn (§4.1 "Tool-call parallelism").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool: Vec<ToolUsePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResultPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_compact_summary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_metadata: Option<serde_json::Value>,
}

impl SessionEntry {
    pub fn is_compact_boundary(&self) -> bool {
        self.entry_type == EntryType::System && self.subtype.as_deref() == Some("compact_boundary")
    }

    pub fn is_compact_summary(&self) -> bool {
        self.is_compact_summary.unwrap_or(false)
    }

    /// All tool calls carried by this entry, in the order they were
    /// dispatched (§8 ordering invariant).
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.tool.iter().map(|t| ToolCall::new(t.id.clone(), t.name.clone(), t.arguments.clone())).collect()
    }

    /// Reconstruct the conversational `Message` this entry represents.
    /// `compact_boundary` entries carry no message of their own and are
    /// skipped by the caller rather than reconstructed here.
    pub fn to_message(&self) -> Message {
        match self.entry_type {
            EntryType::System => Message::system(self.message.content.clone()),
            EntryType::User => Message::user(self.message.content.clone()),
            EntryType::Assistant => {
                let tool_calls = self.tool_calls();
                Message::assistant_with_tool_calls(self.message.content.clone(), None, tool_calls)
            }
            EntryType::ToolUse => Message::assistant_with_tool_calls(String::new(), None, self.tool_calls()),
            EntryType::ToolResult => {
                let payload = self.tool_result.as_ref();
                Message::tool_result(
                    payload.map(|p| p.tool_call_id.clone()).unwrap_or_default(),
                    self.message.role.clone(),
                    self.message.content.clone(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_entry(entry_type: EntryType) -> SessionEntry {
        SessionEntry {
            uuid: uuid::Uuid::now_v7(),
            parent_uuid: None,
            session_id: "sess-1".to_string(),
            timestamp: chrono::Utc::now(),
            entry_type,
            subtype: None,
            cwd: "/tmp".to_string(),
            git_branch: None,
            version: "0.1.0".to_string(),
            message: EntryMessage { role: "user".to_string(), content: "hello".to_string(), model: None, usage: None },
            tool: Vec::new(),
            tool_result: None,
            is_compact_summary: None,
            compact_metadata: None,
        }
    }

    #[test]
    fn serde_round_trip_uses_camel_case() {
        let entry = base_entry(EntryType::User);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sessionId"], "sess-1");
        assert!(json.get("parentUuid").is_none());
        let back: SessionEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.session_id, "sess-1");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut value = serde_json::to_value(base_entry(EntryType::User)).unwrap();
        value["somethingNew"] = serde_json::json!("ignored");
        let parsed: serde_json::Result<SessionEntry> = serde_json::from_value(value);
        assert!(parsed.is_ok());
    }

    #[test]
    fn compact_boundary_detection() {
        let mut entry = base_entry(EntryType::System);
        entry.subtype = Some("compact_boundary".to_string());
        assert!(entry.is_compact_boundary());

        let plain = base_entry(EntryType::System);
        assert!(!plain.is_compact_boundary());
    }

    #[test]
    fn to_message_user() {
        let entry = base_entry(EntryType::User);
        let msg = entry.to_message();
        assert!(msg.is_user());
        assert_eq!(msg.content(), "hello");
    }

    #[test]
    fn assistant_entry_reconstructs_every_tool_call() {
        let mut entry = base_entry(EntryType::Assistant);
        entry.tool = vec![
            ToolUsePayload { id: "a".to_string(), name: "Read".to_string(), arguments: "{}".to_string() },
            ToolUsePayload { id: "b".to_string(), name: "Read".to_string(), arguments: "{}".to_string() },
            ToolUsePayload { id: "c".to_string(), name: "Read".to_string(), arguments: "{}".to_string() },
        ];
        let msg = entry.to_message();
        let Message::Assistant { tool_calls, .. } = msg else { panic!("expected assistant message") };
        assert_eq!(tool_calls.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
