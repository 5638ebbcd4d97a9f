//! Tool Execution Pipeline (§4.2): seven fixed stages, no branching.

use std::path::PathBuf;
use std::sync::Arc;

use agentcore_hooks::{fold_post_tool_use, fold_pre_tool_use, HookDispatcher, HookEvent, MatchInput};
use agentcore_kernel::{ExecutionContext, PermissionEngine, PermissionInvocation, PermissionMode, PermissionResult, ToolRegistry, ToolResult, ToolResultError};
use async_trait::async_trait;
use serde_json::Value;

/// Invoked when a tool call lands in ASK state after permission + preHook
/// evaluation (§4.2 "confirmation" stage).
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    async fn confirm(&self, tool_name: &str, signature: &str, params: &Value) -> bool;
}

/// Always approves. Stands in for a real UI confirmation prompt, which is
/// out of scope here.
pub struct AutoApprove;

#[async_trait]
impl ConfirmationHandler for AutoApprove {
    async fn confirm(&self, _tool_name: &str, _signature: &str, _params: &Value) -> bool {
        true
    }
}

/// Always declines. Useful for tests exercising the "user declines" abort.
pub struct AutoDecline;

#[async_trait]
impl ConfirmationHandler for AutoDecline {
    async fn confirm(&self, _tool_name: &str, _signature: &str, _params: &Value) -> bool {
        false
    }
}

pub struct ExecutionPipeline {
    registry: Arc<ToolRegistry>,
    permission_engine: Arc<PermissionEngine>,
    hooks: Arc<HookDispatcher>,
    project_dir: PathBuf,
    confirmation: Arc<dyn ConfirmationHandler>,
}

impl ExecutionPipeline {
    pub fn new(
        registry: Arc<ToolRegistry>,
        permission_engine: Arc<PermissionEngine>,
        hooks: Arc<HookDispatcher>,
        project_dir: PathBuf,
        confirmation: Arc<dyn ConfirmationHandler>,
    ) -> Self {
        Self { registry, permission_engine, hooks, project_dir, confirmation }
    }

    pub async fn execute(&self, tool_name: &str, params: Value, ctx: &ExecutionContext) -> ToolResult {
        // --- discovery ---
        let tool = match self.registry.get(tool_name) {
            Some(tool) => tool,
            None => {
                tracing::warn!(tool_name, "pipeline discovery: unknown tool");
                return self.format(tool_name, ctx, ToolResult::failed(ToolResultError::new("unknown_tool", format!("unknown tool: {tool_name}"))));
            }
        };
        let descriptor = tool.descriptor();

        // --- permission ---
        let signature_content = self.registry.signature_content(tool_name, &params);
        let permission_invocation =
            PermissionInvocation { tool_name, kind: descriptor.kind, signature_content: signature_content.as_deref() };
        let mut decision = self.permission_engine.evaluate(&permission_invocation, ctx.permission_mode);
        tracing::debug!(tool_name, result = ?decision.result, "permission decision");

        if decision.result == PermissionResult::Deny {
            return self.format(tool_name, ctx, denied_result(&decision.reason));
        }

        // --- preHook ---
        let mut params = params;
        let match_input = build_match_input(tool_name, &params);
        let hook_results = self
            .hooks
            .dispatch(HookEvent::PreToolUse, &match_input, serde_json::json!({"tool_name": tool_name, "tool_input": params.clone()}), &ctx.session_id)
            .await;
        let folded = fold_pre_tool_use(&hook_results);

        if let Some(updated) = folded.updated_input {
            params = updated;
        }
        if let Some(hint) = folded.permission_decision {
            // Hooks may tighten but never loosen what permission already
            // decided (S5): an inherited ALLOW stands even if a hook
            // returns `allow` explicitly; only a tightening to ASK/DENY
            // actually changes anything. `folded.permission_decision` already
            // folds in each hook's exit-code effect (blocking exit, or a
            // nonzero/timeout exit resolved through its configured
            // failure_behavior/timeout_behavior), so no separate check is
            // needed here.
            decision.result = PermissionEngine::tighten(decision.result, hint.as_result());
        }

        if decision.result == PermissionResult::Deny {
            let reason = folded.deny_reason.unwrap_or_else(|| "denied by PreToolUse hook".to_string());
            return self.format(tool_name, ctx, denied_result(&reason));
        }

        // --- confirmation ---
        if decision.result == PermissionResult::Ask {
            let signature = agentcore_kernel::format_signature(tool_name, signature_content.as_deref());
            if !self.confirmation.confirm(tool_name, &signature, &params).await {
                return self.format(tool_name, ctx, denied_result("user declined confirmation"));
            }
        }

        // --- execution ---
        if ctx.signal.is_cancelled() {
            return self.format(tool_name, ctx, ToolResult::aborted());
        }
        let execution_result = tool.execute(params, ctx).await;
        let mut result = match execution_result {
            Ok(result) => result,
            Err(err) => ToolResult::failed(ToolResultError::new("tool_error", err.to_string())),
        };

        // --- postHook ---
        let event = if result.success { HookEvent::PostToolUse } else { HookEvent::PostToolUseFailure };
        let post_hook_results = self
            .hooks
            .dispatch(event, &match_input, serde_json::json!({"tool_name": tool_name, "tool_output": result.llm_content.clone()}), &ctx.session_id)
            .await;
        let folded_post = fold_post_tool_use(&post_hook_results);
        if let Some(updated_output) = folded_post.updated_output {
            result.llm_content = updated_output;
        }
        if let Some(context) = folded_post.additional_context {
            result.llm_content = format!("{}\n\n[Hook Context]\n{}", result.llm_content, context);
        }

        // --- formatting ---
        self.format(tool_name, ctx, result)
    }

    fn format(&self, tool_name: &str, ctx: &ExecutionContext, mut result: ToolResult) -> ToolResult {
        if result.display_content.is_empty() {
            result.display_content = result.llm_content.clone();
        }
        let mut metadata = result.metadata.take().unwrap_or_else(|| serde_json::json!({}));
        if let Value::Object(map) = &mut metadata {
            map.insert("executionId".to_string(), serde_json::json!(ctx.execution_id.to_string()));
            map.insert("toolName".to_string(), serde_json::json!(tool_name));
            map.insert("timestamp".to_string(), serde_json::json!(chrono::Utc::now().to_rfc3339()));
            map.insert("permissionMode".to_string(), serde_json::json!(format!("{:?}", ctx.permission_mode)));
        }
        result.metadata = Some(metadata);
        result
    }

    pub fn project_dir(&self) -> &std::path::Path {
        &self.project_dir
    }
}

fn denied_result(reason: &str) -> ToolResult {
    ToolResult::failed(ToolResultError::new("permission_denied", reason.to_string()))
}

fn build_match_input(tool_name: &str, params: &Value) -> MatchInput {
    MatchInput {
        tool_name: Some(tool_name.to_string()),
        file_path: params.get("file_path").and_then(Value::as_str).map(str::to_string),
        command: params.get("command").and_then(Value::as_str).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_hooks::{Behavior, HookConfig, HookEntry, MatcherGroup};
    use agentcore_kernel::{CancellationHandle, RuleSet, Tool, ToolDescription, ToolDescriptor, ToolKind};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "Bash"
        }
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor { name: "Bash".to_string(), kind: ToolKind::Execute, description: ToolDescription::default(), input_schema: serde_json::json!({}) }
        }
        async fn execute(&self, params: Value, _ctx: &ExecutionContext) -> agentcore_kernel::Result<ToolResult> {
            Ok(ToolResult::ok(params.get("command").and_then(Value::as_str).unwrap_or_default().to_string()))
        }
    }

    fn ctx(mode: PermissionMode) -> ExecutionContext {
        ExecutionContext::new("sess-1", mode, CancellationHandle::new())
    }

    fn pipeline_with(hooks: HookDispatcher, confirmation: Arc<dyn ConfirmationHandler>) -> ExecutionPipeline {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool)).unwrap();
        ExecutionPipeline::new(registry, Arc::new(PermissionEngine::with_defaults()), Arc::new(hooks), PathBuf::from("/tmp"), confirmation)
    }

    #[tokio::test]
    async fn unknown_tool_aborts_at_discovery() {
        let pipeline = pipeline_with(HookDispatcher::new(HookConfig::default(), PathBuf::from("/tmp"), 4), Arc::new(AutoApprove));
        let c = ctx(PermissionMode::Default);
        let result = pipeline.execute("Ghost", serde_json::json!({}), &c).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, "unknown_tool");
    }

    // S1-flavored: deny rule aborts before execution.
    #[tokio::test]
    async fn deny_rule_aborts_before_execution() {
        let rules = RuleSet { allow: vec![], deny: vec!["Bash(rm -rf:*)".to_string()], ask: vec![] };
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool)).unwrap();
        let pipeline = ExecutionPipeline::new(
            registry,
            Arc::new(PermissionEngine::new(rules).unwrap()),
            Arc::new(HookDispatcher::new(HookConfig::default(), PathBuf::from("/tmp"), 4)),
            PathBuf::from("/tmp"),
            Arc::new(AutoApprove),
        );
        let c = ctx(PermissionMode::Default);
        let result = pipeline.execute("Bash", serde_json::json!({"command": "rm -rf /"}), &c).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, "permission_denied");
    }

    // S5 — hook rewrites input; inherited allow still stands.
    #[tokio::test]
    async fn s5_hook_rewrites_input_permission_not_reevaluated() {
        let hook_config = HookConfig {
            pre_tool_use: vec![MatcherGroup {
                matcher: Default::default(),
                hooks: vec![HookEntry {
                    kind: "command".to_string(),
                    command: r#"echo '{"hookSpecificOutput":{"updatedInput":{"command":"ls -la"}}}'"#.to_string(),
                    timeout: 5,
                    failure_behavior: Behavior::Ignore,
                    timeout_behavior: Behavior::Ignore,
                }],
            }],
            ..Default::default()
        };
        let rules = RuleSet { allow: vec!["Bash(**/*)".to_string()], deny: vec![], ask: vec![] };
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool)).unwrap();
        let pipeline = ExecutionPipeline::new(
            registry,
            Arc::new(PermissionEngine::new(rules).unwrap()),
            Arc::new(HookDispatcher::new(hook_config, PathBuf::from("/tmp"), 4)),
            PathBuf::from("/tmp"),
            Arc::new(AutoApprove),
        );
        let c = ctx(PermissionMode::Default);
        let result = pipeline.execute("Bash", serde_json::json!({"command": "ls"}), &c).await;
        assert!(result.success);
        assert_eq!(result.llm_content, "ls -la");
    }

    #[tokio::test]
    async fn confirmation_decline_aborts() {
        let rules = RuleSet::default(); // no match -> ASK
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool)).unwrap();
        let pipeline = ExecutionPipeline::new(
            registry,
            Arc::new(PermissionEngine::new(rules).unwrap()),
            Arc::new(HookDispatcher::new(HookConfig::default(), PathBuf::from("/tmp"), 4)),
            PathBuf::from("/tmp"),
            Arc::new(AutoDecline),
        );
        let c = ctx(PermissionMode::Default);
        let result = pipeline.execute("Bash", serde_json::json!({"command": "ls"}), &c).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, "permission_denied");
    }

    #[tokio::test]
    async fn metadata_attached_in_formatting_stage() {
        let pipeline = pipeline_with(HookDispatcher::new(HookConfig::default(), PathBuf::from("/tmp"), 4), Arc::new(AutoApprove));
        let c = ctx(PermissionMode::Yolo);
        let result = pipeline.execute("Bash", serde_json::json!({"command": "ls"}), &c).await;
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["toolName"], "Bash");
        assert!(metadata.get("executionId").is_some());
    }

    #[tokio::test]
    async fn plan_mode_denies_non_read_only_before_execution() {
        let pipeline = pipeline_with(HookDispatcher::new(HookConfig::default(), PathBuf::from("/tmp"), 4), Arc::new(AutoApprove));
        let c = ctx(PermissionMode::Plan);
        let result = pipeline.execute("Bash", serde_json::json!({"command": "ls"}), &c).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, "permission_denied");
    }
}
