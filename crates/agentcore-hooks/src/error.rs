use thiserror::Error;

#[derive(Debug, Error)]
pub enum HooksError {
    #[error("hook command `{command}` failed to spawn: {source}")]
    Spawn { command: String, #[source] source: std::io::Error },

    #[error("hook command `{command}` timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("hook command `{command}` exited with a blocking error (code 2): {message}")]
    Blocking { command: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HooksError>;
