//! Tool interface (§6 "Tool interface") and the execution-time types that
//! flow through the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cancellation::CancellationHandle;
use crate::error::Result;
use crate::permission::PermissionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ToolKind {
    ReadOnly,
    Edit,
    Write,
    Execute,
}

/// Short/long/examples/usage-notes description surfaced to the model and to
/// a confirmation UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolDescription {
    pub short: String,
    pub long: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub usage_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub kind: ToolKind,
    pub description: ToolDescription,
    pub input_schema: Value,
}

/// Per-invocation state threaded through the pipeline and into `execute`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: uuid::Uuid,
    pub session_id: String,
    pub permission_mode: PermissionMode,
    pub signal: CancellationHandle,
}

impl ExecutionContext {
    pub fn new(session_id: impl Into<String>, permission_mode: PermissionMode, signal: CancellationHandle) -> Self {
        Self { execution_id: uuid::Uuid::now_v7(), session_id: session_id.into(), permission_mode, signal }
    }
}

/// Pipeline input (§3 `ToolInvocation`).
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub params: Value,
    pub context: ExecutionContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ToolResultError {
    pub fn aborted() -> Self {
        Self { kind: "aborted".to_string(), message: "cancelled".to_string() }
    }

    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into() }
    }
}

/// §3 `ToolResult`. `llm_content` feeds back into the conversation;
/// `display_content` is what a UI would render. Both start out equal and
/// diverge as hooks and formatting rewrite them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub llm_content: String,
    pub display_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolResultError>,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        let content = content.into();
        Self { success: true, llm_content: content.clone(), display_content: content, metadata: None, error: None }
    }

    pub fn failed(error: ToolResultError) -> Self {
        Self {
            success: false,
            llm_content: error.message.clone(),
            display_content: error.message.clone(),
            metadata: None,
            error: Some(error),
        }
    }

    pub fn aborted() -> Self {
        Self::failed(ToolResultError::aborted())
    }
}

/// Every tool implements this. `extract_signature_content` defaults to
/// `None`, which tells the permission engine to fall back to the per-tool
/// default extractor in [`crate::permission`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn descriptor(&self) -> ToolDescriptor;

    fn kind(&self) -> ToolKind {
        self.descriptor().kind
    }

    fn extract_signature_content(&self, _params: &Value) -> Option<String> {
        None
    }

    /// Declares whether this invocation must serialize with other
    /// in-flight calls to the same tool (§4.1 "A tool-call dependency is
    /// declared by the tool"). Defaults to the kind-based policy: read-only
    /// tools run in parallel, everything else is serial.
    fn requires_serial_execution(&self) -> bool {
        self.kind() != ToolKind::ReadOnly
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<ToolResult>;
}
