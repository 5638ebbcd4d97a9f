use thiserror::Error;

/// Errors raised by the tool registry and permission engine.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("tool `{tool_name}` is already registered")]
    DuplicateTool { tool_name: String },

    #[error("invalid permission rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("tool `{tool_name}` failed: {message}")]
    ToolExecutionFailed { tool_name: String, message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KernelError>;
