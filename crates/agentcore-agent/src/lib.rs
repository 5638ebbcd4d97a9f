//! Chat Service contract, Tool Execution Pipeline, Compaction Service,
//! Context Manager, and the Agent Turn Loop that drives them (§4.1-§4.5,
//! §4.7).

pub mod chat;
pub mod compaction;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod router;
pub mod tokens;
pub mod turnloop;

pub use chat::{ChatRequest, ChatResponse, ChatService, ScriptedChatService, ScriptedResponse, StreamCallbacks, Usage};
pub use compaction::{needs_compaction, CompactionConfig, CompactionOutcome, CompactionService};
pub use config::{ContextConfig, LimitsConfig, PermissionConfig, RuntimeConfig};
pub use context::ContextManager;
pub use error::{AgentError, Result};
pub use host::AgentHost;
pub use pipeline::{AutoApprove, AutoDecline, ConfirmationHandler, ExecutionPipeline};
pub use router::{Complexity, ModelConfig, ModelRouter};
pub use tokens::{HeuristicTokenCounter, TokenCounter};
pub use turnloop::{AgentConfig, AgentTurnLoop, LoopOutcome, LoopResult, TurnCallbacks};
