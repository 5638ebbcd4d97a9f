use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session `{session_id}` not found")]
    NotFound { session_id: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
