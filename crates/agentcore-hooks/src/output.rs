//! Hook stdout payload shapes (§9 "Hook outputs ... map to a tagged variant
//! `HookOutput` switched on event kind").

use serde::{Deserialize, Serialize};
use serde_json::Value;

use agentcore_kernel::PermissionResult;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreToolUseOutput {
    #[serde(default)]
    pub updated_input: Option<Value>,
    #[serde(default)]
    pub permission_decision: Option<PermissionDecisionHint>,
    #[serde(default)]
    pub deny_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecisionHint {
    Allow,
    Ask,
    Deny,
}

impl PermissionDecisionHint {
    pub fn as_result(self) -> PermissionResult {
        match self {
            PermissionDecisionHint::Allow => PermissionResult::Allow,
            PermissionDecisionHint::Ask => PermissionResult::Ask,
            PermissionDecisionHint::Deny => PermissionResult::Deny,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostToolUseOutput {
    #[serde(default)]
    pub additional_context: Option<String>,
    #[serde(default)]
    pub updated_output: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionOutput {
    #[serde(default)]
    pub decision: Option<PermissionDecisionHint>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Catch-all shape for the remaining six events (`UserPromptSubmit`,
/// `SessionStart`, `SessionEnd`, `Stop`, `SubagentStop`, `Notification`,
/// `Compaction`): they can inject context or block, nothing more specific.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenericOutput {
    #[serde(default)]
    pub additional_context: Option<String>,
    #[serde(default)]
    pub block: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub enum HookOutput {
    PreToolUse(PreToolUseOutput),
    PostToolUse(PostToolUseOutput),
    Permission(PermissionOutput),
    Generic(GenericOutput),
}

/// The wrapper the dispatcher expects on stdout: `{hookEventName?,
/// hookSpecificOutput?}` (§6). Non-JSON stdout is kept as raw text and
/// ignored for control purposes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawHookOutput {
    #[serde(default, rename = "hookEventName")]
    pub hook_event_name: Option<String>,
    #[serde(default, rename = "hookSpecificOutput")]
    pub hook_specific_output: Option<Value>,
}
