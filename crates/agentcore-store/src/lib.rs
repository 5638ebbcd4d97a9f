//! Append-only per-session transcript persistence (§4.6).

pub mod entry;
pub mod error;
pub mod escape;
pub mod session;

pub use entry::{EntryMessage, EntryType, SessionEntry, ToolResultPayload, ToolUsePayload, Usage};
pub use error::{Result, StoreError};
pub use escape::escape_project_path;
pub use session::{default_storage_root, SessionStore};
