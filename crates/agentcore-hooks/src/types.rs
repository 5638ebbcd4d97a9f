//! Hook configuration shapes (§3 `HookConfig`, §4.4).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
    PostToolUseFailure,
    PermissionRequest,
    UserPromptSubmit,
    SessionStart,
    SessionEnd,
    Stop,
    SubagentStop,
    Notification,
    Compaction,
}

impl HookEvent {
    pub fn as_wire_name(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::PostToolUseFailure => "PostToolUseFailure",
            HookEvent::PermissionRequest => "PermissionRequest",
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::SessionStart => "SessionStart",
            HookEvent::SessionEnd => "SessionEnd",
            HookEvent::Stop => "Stop",
            HookEvent::SubagentStop => "SubagentStop",
            HookEvent::Notification => "Notification",
            HookEvent::Compaction => "Compaction",
        }
    }
}

/// Controls how a nonzero exit or timeout affects the gated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Ignore,
    Deny,
    Ask,
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Ignore
    }
}

fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub failure_behavior: Behavior,
    #[serde(default)]
    pub timeout_behavior: Behavior,
}

/// Matching input for an event dispatch (§4.4 "Matching").
#[derive(Debug, Clone, Default)]
pub struct MatchInput {
    pub tool_name: Option<String>,
    pub file_path: Option<String>,
    pub command: Option<String>,
}

/// `{tools?, paths?, commands?}`. Every specified key must match; absent
/// keys match unconditionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Matcher {
    #[serde(default)]
    pub tools: Option<String>,
    #[serde(default)]
    pub paths: Option<String>,
    #[serde(default)]
    pub commands: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherGroup {
    pub matcher: Matcher,
    pub hooks: Vec<HookEntry>,
}

/// Event-keyed mapping of ordered matcher lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub pre_tool_use: Vec<MatcherGroup>,
    #[serde(default)]
    pub post_tool_use: Vec<MatcherGroup>,
    #[serde(default)]
    pub post_tool_use_failure: Vec<MatcherGroup>,
    #[serde(default)]
    pub permission_request: Vec<MatcherGroup>,
    #[serde(default)]
    pub user_prompt_submit: Vec<MatcherGroup>,
    #[serde(default)]
    pub session_start: Vec<MatcherGroup>,
    #[serde(default)]
    pub session_end: Vec<MatcherGroup>,
    #[serde(default)]
    pub stop: Vec<MatcherGroup>,
    #[serde(default)]
    pub subagent_stop: Vec<MatcherGroup>,
    #[serde(default)]
    pub notification: Vec<MatcherGroup>,
    #[serde(default)]
    pub compaction: Vec<MatcherGroup>,
}

impl HookConfig {
    pub fn groups_for(&self, event: HookEvent) -> &[MatcherGroup] {
        match event {
            HookEvent::PreToolUse => &self.pre_tool_use,
            HookEvent::PostToolUse => &self.post_tool_use,
            HookEvent::PostToolUseFailure => &self.post_tool_use_failure,
            HookEvent::PermissionRequest => &self.permission_request,
            HookEvent::UserPromptSubmit => &self.user_prompt_submit,
            HookEvent::SessionStart => &self.session_start,
            HookEvent::SessionEnd => &self.session_end,
            HookEvent::Stop => &self.stop,
            HookEvent::SubagentStop => &self.subagent_stop,
            HookEvent::Notification => &self.notification,
            HookEvent::Compaction => &self.compaction,
        }
    }
}

pub fn matcher_matches(matcher: &Matcher, input: &MatchInput) -> bool {
    if let Some(tools_pattern) = &matcher.tools {
        match &input.tool_name {
            Some(name) if regex_or_alternatives(tools_pattern, name) => {}
            _ => return false,
        }
    }
    if let Some(paths_pattern) = &matcher.paths {
        match &input.file_path {
            Some(path) => {
                if !agentcore_kernel::glob_match(paths_pattern, path) && !agentcore_kernel::glob_match(paths_pattern, strip_dir(path)) {
                    return false;
                }
            }
            None => return false,
        }
    }
    if let Some(commands_pattern) = &matcher.commands {
        match &input.command {
            Some(command) => match regex::Regex::new(commands_pattern) {
                Ok(re) => {
                    if !re.is_match(command) {
                        return false;
                    }
                }
                Err(_) => return false,
            },
            None => return false,
        }
    }
    true
}

fn strip_dir(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `tools` matcher: a regex, or `|`-separated literal alternatives treated
/// as exact tool names (the common case, e.g. `"Read|Grep"`).
fn regex_or_alternatives(pattern: &str, tool_name: &str) -> bool {
    if pattern.split('|').all(|alt| alt.chars().all(|c| c.is_alphanumeric() || c == '_')) {
        return pattern.split('|').any(|alt| alt == tool_name);
    }
    match regex::Regex::new(pattern) {
        Ok(re) => re.is_match(tool_name),
        Err(_) => false,
    }
}
