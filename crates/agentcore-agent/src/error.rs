use thiserror::Error;

/// §7 error taxonomy. Variants map close to 1:1 with the table; the ones
/// marked "recovered locally" there (`tool_error`, `permission_denied`,
/// `hook_blocking_error`, `compaction_failed`, `persistence_error`) never
/// escape as this error type in practice -- they get folded into a `tool`
/// message or a logged warning instead -- but are kept here so a fatal path
/// can still report them with the same vocabulary.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("turn loop cancelled")]
    Aborted,

    #[error("turn limit exceeded: {turn} > {max_turns}")]
    MaxTurnsExceeded { turn: u32, max_turns: u32 },

    #[error("chat service is disabled")]
    ChatDisabled,

    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    #[error("chat service request failed: {0}")]
    LlmError(String),

    #[error("unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error(transparent)]
    Kernel(#[from] agentcore_kernel::KernelError),

    #[error(transparent)]
    Store(#[from] agentcore_store::StoreError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
