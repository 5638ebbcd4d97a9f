//! Agent Turn Loop (§4.1): the main driver.

use std::sync::Arc;

use agentcore_kernel::{CancellationHandle, ExecutionContext, Message, PermissionMode, ToolCall, ToolRegistry};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatRequest, ChatService, StreamCallbacks};
use crate::context::ContextManager;
use crate::error::AgentError;
use crate::pipeline::ExecutionPipeline;
use crate::router::ModelRouter;

/// `-1` means unlimited, matching §6 "Limits: maxTurns (-1 = unlimited)".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_turns: i64,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Per-turn model selection by estimated complexity; `None` preserves
    /// the plain fixed-`model` behavior.
    #[serde(skip)]
    pub model_router: Option<ModelRouter>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_turns: 50, model: None, temperature: None, max_tokens: None, model_router: None }
    }
}

#[derive(Debug, Clone)]
pub enum LoopOutcome {
    Success { final_message: String },
    Aborted,
    MaxTurnsExceeded { turn: u64, max_turns: i64 },
    LlmError(String),
}

pub struct LoopResult {
    pub outcome: LoopOutcome,
}

impl LoopResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, LoopOutcome::Success { .. })
    }
}

/// Fired when the turn limit is hit. Returning `true` resets the turn
/// counter and continues; `false` (the default when unset) exits with
/// `MaxTurnsExceeded`.
pub type TurnLimitCallback = Arc<dyn Fn(u64) -> bool + Send + Sync>;
pub type TurnStartCallback = Arc<dyn Fn(u64, i64) + Send + Sync>;

#[derive(Clone, Default)]
pub struct TurnCallbacks {
    pub on_turn_start: Option<TurnStartCallback>,
    pub on_turn_limit_reached: Option<TurnLimitCallback>,
}

pub struct AgentTurnLoop {
    chat: Arc<dyn ChatService>,
    pipeline: Arc<ExecutionPipeline>,
    registry: Arc<ToolRegistry>,
    context: Arc<ContextManager>,
    config: AgentConfig,
    permission_mode: PermissionMode,
}

impl AgentTurnLoop {
    pub fn new(
        chat: Arc<dyn ChatService>,
        pipeline: Arc<ExecutionPipeline>,
        registry: Arc<ToolRegistry>,
        context: Arc<ContextManager>,
        config: AgentConfig,
        permission_mode: PermissionMode,
    ) -> Self {
        Self { chat, pipeline, registry, context, config, permission_mode }
    }

    pub async fn run(&self, session_id: &str, signal: CancellationHandle, stream_callbacks: Option<StreamCallbacks>, turn_callbacks: Option<TurnCallbacks>) -> LoopResult {
        let mut turn: u64 = 0;

        loop {
            turn += 1;

            if self.config.max_turns >= 0 && turn > self.config.max_turns as u64 {
                let should_continue = turn_callbacks
                    .as_ref()
                    .and_then(|cb| cb.on_turn_limit_reached.as_ref())
                    .map(|cb| cb(turn))
                    .unwrap_or(false);
                if should_continue {
                    turn = 0;
                    continue;
                }
                return LoopResult { outcome: LoopOutcome::MaxTurnsExceeded { turn, max_turns: self.config.max_turns } };
            }

            if let Some(cb) = turn_callbacks.as_ref().and_then(|cb| cb.on_turn_start.as_ref()) {
                cb(turn, self.config.max_turns);
            }

            let messages = self.context.messages().await;
            let tools = self.registry.list_descriptors();
            let model = self.select_model(&messages);
            let request = ChatRequest { messages, tools, model, temperature: self.config.temperature, max_tokens: self.config.max_tokens };

            let response = match self.chat.chat(request, &signal, stream_callbacks.as_ref()).await {
                Ok(response) => response,
                Err(AgentError::Aborted) => return LoopResult { outcome: LoopOutcome::Aborted },
                Err(err) => return LoopResult { outcome: LoopOutcome::LlmError(err.to_string()) },
            };

            if signal.is_cancelled() {
                // Partial content was produced but must not be persisted as
                // the turn's final assistant message (§4.1 "Cancellation").
                return LoopResult { outcome: LoopOutcome::Aborted };
            }

            let assistant_message =
                Message::assistant_with_tool_calls(response.content.clone(), response.reasoning_content.clone(), response.tool_calls.clone());
            self.context.append(assistant_message).await;

            if !response.has_tool_calls() {
                return LoopResult { outcome: LoopOutcome::Success { final_message: response.content } };
            }

            let tool_results = self.dispatch_tool_calls(&response.tool_calls, session_id, &signal).await;
            for (call, result) in response.tool_calls.iter().zip(tool_results.into_iter()) {
                self.context.append(Message::tool_result(call.id.clone(), call.name.clone(), result.llm_content)).await;
            }

            if self.context.needs_compaction() {
                self.context.compact().await;
            }
        }
    }

    /// Picks a model for this turn's request: the router's tier match
    /// against the latest user message if a router is configured, else
    /// the fixed `config.model`.
    fn select_model(&self, messages: &[Message]) -> Option<String> {
        if let Some(router) = &self.config.model_router {
            if let Some(latest_user) = messages.iter().rev().find(|m| m.is_user()) {
                if let Ok(selected) = router.route(latest_user.content()) {
                    return Some(selected.model.clone());
                }
            }
        }
        self.config.model.clone()
    }

    /// §4.1 "Tool-call parallelism" / §5 / §9 "Parallel tool dispatch":
    /// spawn the read-only calls concurrently, run mutating calls serially,
    /// then re-order every result by original index before returning.
    async fn dispatch_tool_calls(&self, calls: &[ToolCall], session_id: &str, signal: &CancellationHandle) -> Vec<agentcore_kernel::ToolResult> {
        let mut handles: Vec<Option<tokio::task::JoinHandle<agentcore_kernel::ToolResult>>> = (0..calls.len()).map(|_| None).collect();

        for (idx, call) in calls.iter().enumerate() {
            let requires_serial = self.registry.get(&call.name).map(|t| t.requires_serial_execution()).unwrap_or(true);
            if requires_serial {
                continue;
            }
            let pipeline = self.pipeline.clone();
            let name = call.name.clone();
            let params = parse_arguments(call);
            let ctx = ExecutionContext::new(session_id, self.permission_mode, signal.child());
            handles[idx] = Some(tokio::spawn(async move { pipeline.execute(&name, params, &ctx).await }));
        }

        let mut results: Vec<Option<agentcore_kernel::ToolResult>> = (0..calls.len()).map(|_| None).collect();
        for (idx, call) in calls.iter().enumerate() {
            if let Some(handle) = handles[idx].take() {
                results[idx] = Some(handle.await.unwrap_or_else(|_| agentcore_kernel::ToolResult::aborted()));
            } else {
                let params = parse_arguments(call);
                let ctx = ExecutionContext::new(session_id, self.permission_mode, signal.child());
                let result = self.pipeline.execute(&call.name, params, &ctx).await;
                results[idx] = Some(result);
            }
        }

        results.into_iter().map(|r| r.expect("every index filled")).collect()
    }
}

fn parse_arguments(call: &ToolCall) -> serde_json::Value {
    call.arguments_value().unwrap_or_else(|_| serde_json::json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatResponse, ScriptedChatService, ScriptedResponse};
    use crate::compaction::{CompactionConfig, CompactionService};
    use crate::pipeline::{AutoApprove, ExecutionPipeline};
    use crate::tokens::HeuristicTokenCounter;
    use agentcore_hooks::{HookConfig, HookDispatcher};
    use agentcore_kernel::{PermissionEngine, Tool, ToolDescription, ToolDescriptor, ToolKind};
    use agentcore_store::SessionStore;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct ReadTool;

    #[async_trait]
    impl Tool for ReadTool {
        fn name(&self) -> &str {
            "Read"
        }
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor { name: "Read".to_string(), kind: ToolKind::ReadOnly, description: ToolDescription::default(), input_schema: serde_json::json!({}) }
        }
        async fn execute(&self, params: Value, _ctx: &ExecutionContext) -> agentcore_kernel::Result<agentcore_kernel::ToolResult> {
            Ok(agentcore_kernel::ToolResult::ok(params.get("path").and_then(Value::as_str).unwrap_or_default().to_string()))
        }
    }

    use serde_json::Value;

    fn make_loop(dir: &std::path::Path, responses: Vec<ScriptedResponse>, max_turns: i64) -> AgentTurnLoop {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(ReadTool)).unwrap();
        let store = Arc::new(SessionStore::new(dir));
        let chat: Arc<dyn ChatService> = Arc::new(ScriptedChatService::new(responses));
        let compaction = CompactionService::new(chat.clone());
        let context = Arc::new(ContextManager::new(
            Arc::new(HeuristicTokenCounter),
            compaction,
            CompactionConfig::default(),
            store,
            "sess-1",
            "/project",
            "/project",
        ));
        let pipeline = Arc::new(ExecutionPipeline::new(
            registry.clone(),
            Arc::new(PermissionEngine::with_defaults()),
            Arc::new(HookDispatcher::new(HookConfig::default(), PathBuf::from("/tmp"), 8)),
            PathBuf::from("/tmp"),
            Arc::new(AutoApprove),
        ));
        AgentTurnLoop::new(chat, pipeline, registry, context, AgentConfig { max_turns, ..AgentConfig::default() }, PermissionMode::Yolo)
    }

    #[tokio::test]
    async fn terminates_cleanly_with_no_tool_calls() {
        let dir = tempfile::tempdir().unwrap();
        let turn_loop = make_loop(
            dir.path(),
            vec![ScriptedResponse::Immediate(ChatResponse { content: "done".to_string(), ..Default::default() })],
            10,
        );
        let result = turn_loop.run("sess-1", CancellationHandle::new(), None, None).await;
        assert!(matches!(result.outcome, LoopOutcome::Success { final_message } if final_message == "done"));
    }

    #[tokio::test]
    async fn zero_turn_limit_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let turn_loop = make_loop(dir.path(), vec![], 0);
        let result = turn_loop.run("sess-1", CancellationHandle::new(), None, None).await;
        assert!(matches!(result.outcome, LoopOutcome::MaxTurnsExceeded { turn: 1, max_turns: 0 }));
    }

    #[tokio::test]
    async fn max_turns_exceeded_without_tool_calls_ever_terminating() {
        let dir = tempfile::tempdir().unwrap();
        let responses: Vec<_> = (0..3)
            .map(|_| {
                ScriptedResponse::Immediate(ChatResponse {
                    content: String::new(),
                    tool_calls: vec![ToolCall::new("x", "Read", r#"{"path":"/a"}"#)],
                    ..Default::default()
                })
            })
            .collect();
        let turn_loop = make_loop(dir.path(), responses, 2);
        let result = turn_loop.run("sess-1", CancellationHandle::new(), None, None).await;
        assert!(matches!(result.outcome, LoopOutcome::MaxTurnsExceeded { turn: 3, max_turns: 2 }));
    }

    // S4 — cancellation during streaming.
    #[tokio::test]
    async fn s4_cancellation_during_streaming_discards_partial_message() {
        let dir = tempfile::tempdir().unwrap();
        let turn_loop = make_loop(
            dir.path(),
            vec![ScriptedResponse::Delayed { delay_ms: 200, response: ChatResponse { content: "too-late".to_string(), ..Default::default() } }],
            10,
        );
        let signal = CancellationHandle::new();
        let cancel_signal = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(30)).await;
            cancel_signal.cancel();
        });
        let result = turn_loop.run("sess-1", signal, None, None).await;
        assert!(matches!(result.outcome, LoopOutcome::Aborted));
        assert!(turn_loop.context.messages().await.is_empty());
    }

    // S3 — parallel tool ordering.
    #[tokio::test]
    async fn s3_parallel_tool_results_appended_in_original_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(NamedReadTool { name: "A".to_string(), delay_ms: 30 })).unwrap();
        registry.register(Arc::new(NamedReadTool { name: "B".to_string(), delay_ms: 10 })).unwrap();
        registry.register(Arc::new(NamedReadTool { name: "C".to_string(), delay_ms: 0 })).unwrap();

        let store = Arc::new(SessionStore::new(dir.path()));
        let responses = vec![
            ScriptedResponse::Immediate(ChatResponse {
                content: String::new(),
                tool_calls: vec![ToolCall::new("a", "A", "{}"), ToolCall::new("b", "B", "{}"), ToolCall::new("c", "C", "{}")],
                ..Default::default()
            }),
            ScriptedResponse::Immediate(ChatResponse { content: "done".to_string(), ..Default::default() }),
        ];
        let chat: Arc<dyn ChatService> = Arc::new(ScriptedChatService::new(responses));
        let compaction = CompactionService::new(chat.clone());
        let context = Arc::new(ContextManager::new(
            Arc::new(HeuristicTokenCounter),
            compaction,
            CompactionConfig::default(),
            store,
            "sess-1",
            "/project",
            "/project",
        ));
        let pipeline = Arc::new(ExecutionPipeline::new(
            registry.clone(),
            Arc::new(PermissionEngine::with_defaults()),
            Arc::new(HookDispatcher::new(HookConfig::default(), PathBuf::from("/tmp"), 8)),
            PathBuf::from("/tmp"),
            Arc::new(AutoApprove),
        ));
        let turn_loop = AgentTurnLoop::new(chat, pipeline, registry, context.clone(), AgentConfig { max_turns: 10, ..Default::default() }, PermissionMode::Yolo);

        let result = turn_loop.run("sess-1", CancellationHandle::new(), None, None).await;
        assert!(result.is_success());

        let messages = context.messages().await;
        let tool_messages: Vec<&str> = messages.iter().filter_map(|m| m.tool_call_id()).collect();
        assert_eq!(tool_messages, vec!["a", "b", "c"]);
    }

    struct NamedReadTool {
        name: String,
        delay_ms: u64,
    }

    #[async_trait]
    impl Tool for NamedReadTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor { name: self.name.clone(), kind: ToolKind::ReadOnly, description: ToolDescription::default(), input_schema: serde_json::json!({}) }
        }
        async fn execute(&self, _params: Value, _ctx: &ExecutionContext) -> agentcore_kernel::Result<agentcore_kernel::ToolResult> {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
            Ok(agentcore_kernel::ToolResult::ok(self.name.clone()))
        }
    }
}
