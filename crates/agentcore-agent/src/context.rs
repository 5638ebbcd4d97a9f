//! Context Manager (§4.5 "In-memory state", §5 "Shared-resource policy").
//!
//! Owns the in-memory message list. Only the turn loop mutates it through
//! this type -- append on each user/assistant/tool message, atomic replace
//! on compaction -- matching "only the Agent Loop mutates it" from §5.

use std::sync::Arc;

use agentcore_kernel::Message;
use agentcore_store::entry::{EntryMessage, EntryType, SessionEntry, ToolResultPayload, ToolUsePayload};
use agentcore_store::SessionStore;
use tokio::sync::RwLock;

use crate::compaction::{needs_compaction, CompactionConfig, CompactionOutcome, CompactionService};
use crate::tokens::TokenCounter;

pub struct ContextManager {
    messages: RwLock<Vec<Message>>,
    token_count: std::sync::atomic::AtomicU32,
    token_counter: Arc<dyn TokenCounter>,
    compaction: CompactionService,
    compaction_config: CompactionConfig,
    store: Arc<SessionStore>,
    session_id: String,
    project_path: String,
    cwd: String,
    version: String,
}

impl ContextManager {
    pub fn new(
        token_counter: Arc<dyn TokenCounter>,
        compaction: CompactionService,
        compaction_config: CompactionConfig,
        store: Arc<SessionStore>,
        session_id: impl Into<String>,
        project_path: impl Into<String>,
        cwd: impl Into<String>,
    ) -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            token_count: std::sync::atomic::AtomicU32::new(0),
            token_counter,
            compaction,
            compaction_config,
            store,
            session_id: session_id.into(),
            project_path: project_path.into(),
            cwd: cwd.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Load the effective conversation from the session store, replacing
    /// any in-memory state. Used at startup / `--resume`.
    pub async fn resume(&self) -> agentcore_store::Result<()> {
        let loaded = self.store.load(&self.project_path, &self.session_id).await?;
        let tokens = self.token_counter.count_messages(&loaded);
        *self.messages.write().await = loaded;
        self.token_count.store(tokens, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    pub fn token_count(&self) -> u32 {
        self.token_count.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Append one message, persist it, and update the cached token count.
    pub async fn append(&self, message: Message) {
        let added_tokens = self.token_counter.count_message(&message);
        self.persist(&message);
        {
            let mut guard = self.messages.write().await;
            guard.push(message);
        }
        self.token_count.fetch_add(added_tokens, std::sync::atomic::Ordering::SeqCst);
    }

    fn persist(&self, message: &Message) {
        let entry = to_session_entry(message, &self.session_id, &self.cwd, &self.version);
        self.store.append(&self.project_path, &self.session_id, entry);
    }

    pub fn needs_compaction(&self) -> bool {
        needs_compaction(self.token_count(), &self.compaction_config)
    }

    /// Runs compaction and atomically swaps the message list; from the
    /// loop's perspective this either fully commits or leaves the prior
    /// state (§4.5 "Atomicity") since the write lock is held for the whole
    /// swap.
    pub async fn compact(&self) -> CompactionOutcome {
        let snapshot = self.messages().await;
        let outcome = self.compaction.compact(&snapshot, &self.compaction_config).await;

        {
            let mut guard = self.messages.write().await;
            *guard = outcome.messages.clone();
        }
        let tokens = self.token_counter.count_messages(&outcome.messages);
        self.token_count.store(tokens, std::sync::atomic::Ordering::SeqCst);

        self.persist_compaction_boundary(&outcome);
        outcome
    }

    fn persist_compaction_boundary(&self, outcome: &CompactionOutcome) {
        let boundary = SessionEntry {
            uuid: uuid::Uuid::now_v7(),
            parent_uuid: None,
            session_id: self.session_id.clone(),
            timestamp: chrono::Utc::now(),
            entry_type: EntryType::System,
            subtype: Some("compact_boundary".to_string()),
            cwd: self.cwd.clone(),
            git_branch: None,
            version: self.version.clone(),
            message: EntryMessage { role: "system".to_string(), content: String::new(), model: None, usage: None },
            tool: Vec::new(),
            tool_result: None,
            is_compact_summary: None,
            compact_metadata: Some(serde_json::json!({"success": outcome.success})),
        };
        self.store.append(&self.project_path, &self.session_id, boundary);

        let summary = SessionEntry {
            uuid: uuid::Uuid::now_v7(),
            parent_uuid: None,
            session_id: self.session_id.clone(),
            timestamp: chrono::Utc::now(),
            entry_type: EntryType::User,
            subtype: None,
            cwd: self.cwd.clone(),
            git_branch: None,
            version: self.version.clone(),
            message: EntryMessage { role: "user".to_string(), content: outcome.summary.clone(), model: None, usage: None },
            tool: Vec::new(),
            tool_result: None,
            is_compact_summary: Some(true),
            compact_metadata: None,
        };
        self.store.append(&self.project_path, &self.session_id, summary);
    }
}

fn to_session_entry(message: &Message, session_id: &str, cwd: &str, version: &str) -> SessionEntry {
    let base = SessionEntry {
        uuid: uuid::Uuid::now_v7(),
        parent_uuid: None,
        session_id: session_id.to_string(),
        timestamp: chrono::Utc::now(),
        entry_type: EntryType::User,
        subtype: None,
        cwd: cwd.to_string(),
        git_branch: None,
        version: version.to_string(),
        message: EntryMessage { role: "user".to_string(), content: message.content().to_string(), model: None, usage: None },
        tool: Vec::new(),
        tool_result: None,
        is_compact_summary: None,
        compact_metadata: None,
    };

    match message {
        Message::System { content } => SessionEntry {
            entry_type: EntryType::System,
            message: EntryMessage { role: "system".to_string(), content: content.clone(), model: None, usage: None },
            ..base
        },
        Message::User { content } => SessionEntry {
            entry_type: EntryType::User,
            message: EntryMessage { role: "user".to_string(), content: content.clone(), model: None, usage: None },
            ..base
        },
        Message::Assistant { content, tool_calls, .. } => SessionEntry {
            entry_type: EntryType::Assistant,
            message: EntryMessage { role: "assistant".to_string(), content: content.clone(), model: None, usage: None },
            tool: tool_calls
                .iter()
                .map(|c| ToolUsePayload { id: c.id.clone(), name: c.name.clone(), arguments: c.arguments.clone() })
                .collect(),
            ..base
        },
        Message::Tool { tool_call_id, name, content } => SessionEntry {
            entry_type: EntryType::ToolResult,
            message: EntryMessage { role: "tool".to_string(), content: content.clone(), model: None, usage: None },
            tool_result: Some(ToolResultPayload { tool_call_id: tool_call_id.clone(), content: content.clone(), is_error: false }),
            subtype: Some(name.clone()),
            ..base
        },
    }
}
