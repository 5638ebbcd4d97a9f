//! `AgentHost` (§9 "process-wide services ... implement as owned values
//! held by an AgentHost root object"). Owns the Tool Registry, Permission
//! Engine, Hook Dispatcher, Context Manager, and Session Store for one
//! agent process; created at startup, dropped at shutdown, never global.

use std::path::PathBuf;
use std::sync::Arc;

use agentcore_hooks::HookDispatcher;
use agentcore_kernel::{CancellationHandle, KernelError, PermissionEngine, PermissionMode, Tool, ToolRegistry};
use agentcore_store::SessionStore;

use crate::chat::{ChatService, StreamCallbacks};
use crate::compaction::CompactionService;
use crate::config::RuntimeConfig;
use crate::context::ContextManager;
use crate::pipeline::{ConfirmationHandler, ExecutionPipeline};
use crate::tokens::HeuristicTokenCounter;
use crate::turnloop::{AgentTurnLoop, LoopResult, TurnCallbacks};

pub struct AgentHost {
    registry: Arc<ToolRegistry>,
    context: Arc<ContextManager>,
    turn_loop: AgentTurnLoop,
    permission_mode: PermissionMode,
}

impl AgentHost {
    /// Assembles every process-wide service from a loaded [`RuntimeConfig`].
    /// Tools are registered separately via [`AgentHost::register_tool`] since
    /// individual tool implementations are out of scope for this crate.
    pub fn new(
        config: &RuntimeConfig,
        chat: Arc<dyn ChatService>,
        confirmation: Arc<dyn ConfirmationHandler>,
        storage_root: PathBuf,
        project_dir: PathBuf,
        session_id: impl Into<String>,
        permission_mode: PermissionMode,
    ) -> Self {
        let session_id = session_id.into();
        let registry = Arc::new(ToolRegistry::new());
        let permission_engine = Arc::new(PermissionEngine::new(config.rule_set()).unwrap_or_else(|_| PermissionEngine::with_defaults()));
        let hooks = Arc::new(HookDispatcher::new(config.hooks.clone(), project_dir.clone(), config.limits.max_concurrent_hooks));
        let store = Arc::new(SessionStore::new(storage_root));

        let compaction = CompactionService::new(chat.clone());
        let project_path = project_dir.to_string_lossy().to_string();
        let cwd = project_path.clone();
        let context = Arc::new(ContextManager::new(
            Arc::new(HeuristicTokenCounter),
            compaction,
            config.context.compaction_config(),
            store,
            session_id.clone(),
            project_path,
            cwd,
        ));

        let pipeline = Arc::new(ExecutionPipeline::new(registry.clone(), permission_engine, hooks, project_dir, confirmation));
        let turn_loop = AgentTurnLoop::new(chat, pipeline, registry.clone(), context.clone(), config.agent_config(), permission_mode);

        Self { registry, context, turn_loop, permission_mode }
    }

    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), KernelError> {
        self.registry.register(tool)
    }

    /// Load prior transcript for this session from the resume-from-latest-
    /// compact-boundary slice (§4.6).
    pub async fn resume(&self) -> agentcore_store::Result<()> {
        self.context.resume().await
    }

    pub async fn run(
        &self,
        session_id: &str,
        signal: CancellationHandle,
        stream_callbacks: Option<StreamCallbacks>,
        turn_callbacks: Option<TurnCallbacks>,
    ) -> LoopResult {
        self.turn_loop.run(session_id, signal, stream_callbacks, turn_callbacks).await
    }

    pub fn permission_mode(&self) -> PermissionMode {
        self.permission_mode
    }

    pub fn tool_count(&self) -> usize {
        self.registry.count()
    }
}
