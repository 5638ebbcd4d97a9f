//! Subprocess execution and output folding (§4.4, §6 "Hook interface").

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::Duration;

use crate::output::{HookOutput, PermissionDecisionHint, PostToolUseOutput, PreToolUseOutput, RawHookOutput};
use crate::types::{matcher_matches, Behavior, HookConfig, HookEntry, HookEvent, MatchInput};

const MAX_STDOUT_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct HookInvocationResult {
    pub command: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub raw_stdout: String,
    pub parsed: Option<HookOutput>,
    pub failure_behavior: Behavior,
    pub timeout_behavior: Behavior,
}

impl HookInvocationResult {
    /// §4.4 step 5: exit `2` is always a blocking error regardless of
    /// configuration. A timeout consults `timeout_behavior`; any other
    /// nonzero exit (or a process that never produced one, e.g. a spawn
    /// failure) consults `failure_behavior`. Exit `0` always allows.
    pub fn permission_effect(&self) -> agentcore_kernel::PermissionResult {
        if self.exit_code == Some(2) {
            return agentcore_kernel::PermissionResult::Deny;
        }
        if self.timed_out {
            return behavior_to_result(self.timeout_behavior);
        }
        match self.exit_code {
            Some(0) => agentcore_kernel::PermissionResult::Allow,
            _ => behavior_to_result(self.failure_behavior),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.permission_effect() == agentcore_kernel::PermissionResult::Deny
    }
}

fn behavior_to_result(behavior: Behavior) -> agentcore_kernel::PermissionResult {
    match behavior {
        Behavior::Ignore => agentcore_kernel::PermissionResult::Allow,
        Behavior::Deny => agentcore_kernel::PermissionResult::Deny,
        Behavior::Ask => agentcore_kernel::PermissionResult::Ask,
    }
}

pub struct HookDispatcher {
    config: HookConfig,
    project_dir: PathBuf,
    /// Global cap on hooks running concurrently across events fired from
    /// parallel tool calls (§4.4 "Concurrency"). Hooks *within* one event
    /// still run sequentially -- this only bounds cross-event concurrency.
    concurrency: Arc<Semaphore>,
}

impl HookDispatcher {
    pub fn new(config: HookConfig, project_dir: PathBuf, max_concurrent_hooks: usize) -> Self {
        Self { config, project_dir, concurrency: Arc::new(Semaphore::new(max_concurrent_hooks.max(1))) }
    }

    /// Runs every matched hook for `event` sequentially, in configuration
    /// order. `payload` carries the event-specific fields merged into the
    /// stdin JSON (alongside the always-present envelope fields).
    pub async fn dispatch(&self, event: HookEvent, input: &MatchInput, payload: Value, session_id: &str) -> Vec<HookInvocationResult> {
        let mut results = Vec::new();
        for group in self.config.groups_for(event) {
            if !matcher_matches(&group.matcher, input) {
                continue;
            }
            for entry in &group.hooks {
                let result = self.run_hook(event, entry, payload.clone(), session_id).await;
                let abort = result.is_blocking();
                results.push(result);
                if abort {
                    // A blocking hook aborts the gated action; later hooks
                    // in this same dispatch still run so notification-style
                    // hooks aren't silently skipped, matching "later hooks
                    // can override" from §4.4, but the fold step below will
                    // see the DENY and it wins regardless of what follows.
                    continue;
                }
            }
        }
        results
    }

    async fn run_hook(&self, event: HookEvent, entry: &HookEntry, payload: Value, session_id: &str) -> HookInvocationResult {
        let _permit = self.concurrency.acquire().await.expect("semaphore never closed");

        let execution_id = uuid::Uuid::now_v7().to_string();
        let mut stdin_payload = serde_json::json!({
            "hook_event_name": event.as_wire_name(),
            "hook_execution_id": execution_id,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "session_id": session_id,
            "project_dir": self.project_dir.display().to_string(),
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut stdin_payload, payload) {
            base.extend(extra);
        }

        tracing::debug!(command = %entry.command, event = event.as_wire_name(), "dispatching hook");

        let spawned = Command::new("sh")
            .arg("-c")
            .arg(&entry.command)
            .current_dir(&self.project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(command = %entry.command, error = %err, "hook failed to spawn");
                return HookInvocationResult {
                    command: entry.command.clone(),
                    exit_code: None,
                    timed_out: false,
                    raw_stdout: String::new(),
                    parsed: None,
                    failure_behavior: entry.failure_behavior,
                    timeout_behavior: entry.timeout_behavior,
                };
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let bytes = serde_json::to_vec(&stdin_payload).unwrap_or_default();
            let _ = stdin.write_all(&bytes).await;
            drop(stdin);
        }

        let timeout = Duration::from_secs(entry.timeout);
        let wait = tokio::time::timeout(timeout, child.wait_with_output()).await;

        match wait {
            Ok(Ok(output)) => {
                let stdout = truncate(String::from_utf8_lossy(&output.stdout).to_string());
                let exit_code = output.status.code();
                let parsed = parse_hook_output(event, &stdout);
                tracing::debug!(command = %entry.command, exit_code, "hook completed");
                HookInvocationResult {
                    command: entry.command.clone(),
                    exit_code,
                    timed_out: false,
                    raw_stdout: stdout,
                    parsed,
                    failure_behavior: entry.failure_behavior,
                    timeout_behavior: entry.timeout_behavior,
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(command = %entry.command, error = %err, "hook process error");
                HookInvocationResult {
                    command: entry.command.clone(),
                    exit_code: None,
                    timed_out: false,
                    raw_stdout: String::new(),
                    parsed: None,
                    failure_behavior: entry.failure_behavior,
                    timeout_behavior: entry.timeout_behavior,
                }
            }
            Err(_) => {
                tracing::warn!(command = %entry.command, timeout_secs = entry.timeout, "hook timed out");
                HookInvocationResult {
                    command: entry.command.clone(),
                    exit_code: Some(124),
                    timed_out: true,
                    raw_stdout: String::new(),
                    parsed: None,
                    failure_behavior: entry.failure_behavior,
                    timeout_behavior: entry.timeout_behavior,
                }
            }
        }
    }
}

fn truncate(s: String) -> String {
    if s.len() <= MAX_STDOUT_BYTES {
        s
    } else {
        s.chars().take(MAX_STDOUT_BYTES).collect()
    }
}

fn parse_hook_output(event: HookEvent, stdout: &str) -> Option<HookOutput> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }
    let raw: RawHookOutput = serde_json::from_str(trimmed).ok()?;
    let specific = raw.hook_specific_output?;
    match event {
        HookEvent::PreToolUse => serde_json::from_value(specific).ok().map(HookOutput::PreToolUse),
        HookEvent::PostToolUse | HookEvent::PostToolUseFailure => {
            serde_json::from_value(specific).ok().map(HookOutput::PostToolUse)
        }
        HookEvent::PermissionRequest => serde_json::from_value(specific).ok().map(HookOutput::Permission),
        _ => serde_json::from_value(specific).ok().map(HookOutput::Generic),
    }
}

/// §4.4 "Output merging": fold `PreToolUseOutput`s left-to-right. Later
/// hooks see (and may overwrite) earlier `updatedInput`; `permissionDecision`
/// only ever tightens (allow -> ask -> deny), resolving the open question
/// in §9 in favor of strictest-wins.
pub fn fold_pre_tool_use(results: &[HookInvocationResult]) -> PreToolUseOutput {
    let mut merged = PreToolUseOutput::default();
    let mut tightened: Option<agentcore_kernel::PermissionResult> = None;

    for result in results {
        if let Some(HookOutput::PreToolUse(output)) = &result.parsed {
            if output.updated_input.is_some() {
                merged.updated_input = output.updated_input.clone();
            }
            if let Some(hint) = output.permission_decision {
                let proposed = hint.as_result();
                tightened = Some(match tightened {
                    None => proposed,
                    Some(current) => agentcore_kernel::PermissionEngine::tighten(current, proposed),
                });
            }
            if output.deny_reason.is_some() {
                merged.deny_reason = output.deny_reason.clone();
            }
        }
        let effect = result.permission_effect();
        if effect != agentcore_kernel::PermissionResult::Allow {
            tightened = Some(match tightened {
                None => effect,
                Some(current) => agentcore_kernel::PermissionEngine::tighten(current, effect),
            });
        }
    }

    merged.permission_decision = tightened.map(|r| match r {
        agentcore_kernel::PermissionResult::Allow => PermissionDecisionHint::Allow,
        agentcore_kernel::PermissionResult::Ask => PermissionDecisionHint::Ask,
        agentcore_kernel::PermissionResult::Deny => PermissionDecisionHint::Deny,
    });
    merged
}

/// §4.4: `PostToolUseOutput.additionalContext` is concatenated with
/// newlines; `updatedOutput`, if present, wins (last one set).
pub fn fold_post_tool_use(results: &[HookInvocationResult]) -> PostToolUseOutput {
    let mut contexts = Vec::new();
    let mut updated_output = None;
    for result in results {
        if let Some(HookOutput::PostToolUse(output)) = &result.parsed {
            if let Some(ctx) = &output.additional_context {
                contexts.push(ctx.clone());
            }
            if output.updated_output.is_some() {
                updated_output = output.updated_output.clone();
            }
        }
    }
    PostToolUseOutput {
        additional_context: if contexts.is_empty() { None } else { Some(contexts.join("\n")) },
        updated_output,
    }
}
