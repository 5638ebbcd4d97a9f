//! Compaction Service (§4.5). Summarises the conversation with the Chat
//! Service when the token budget is nearly exhausted, falling back to a
//! statistics-only summary if that call fails.

use std::collections::HashSet;
use std::path::Path;

use agentcore_kernel::{CancellationHandle, Message};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatRequest, ChatService};
use crate::tokens::TokenCounter;

const MAX_FILE_READ_BYTES: usize = 16 * 1024;
const MAX_FILE_CANDIDATES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    pub max_context_tokens: u32,
    pub compression_threshold: f32,
    pub model: Option<String>,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self { max_context_tokens: 200_000, compression_threshold: 0.8, model: None }
    }
}

pub fn needs_compaction(tokens: u32, config: &CompactionConfig) -> bool {
    (tokens as f32) >= config.compression_threshold * config.max_context_tokens as f32
}

#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    pub messages: Vec<Message>,
    pub success: bool,
    pub summary: String,
}

pub struct CompactionService {
    chat: std::sync::Arc<dyn ChatService>,
}

impl CompactionService {
    pub fn new(chat: std::sync::Arc<dyn ChatService>) -> Self {
        Self { chat }
    }

    /// §8 boundary behavior: empty input returns unchanged.
    pub async fn compact(&self, messages: &[Message], config: &CompactionConfig) -> CompactionOutcome {
        if messages.is_empty() {
            return CompactionOutcome { messages: Vec::new(), success: true, summary: String::new() };
        }

        let candidates = rank_file_candidates(messages);
        let file_contents = read_candidates(&candidates).await;
        let prompt = build_summary_prompt(messages, &file_contents);

        let request = ChatRequest {
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            model: config.model.clone(),
            temperature: None,
            max_tokens: None,
        };

        match self.chat.chat(request, &CancellationHandle::new(), None).await {
            Ok(response) => {
                let retained = retain_latest_fraction(messages, 0.2);
                let retained = strip_orphan_tool_messages(retained);
                let summary_message = Message::user(wrap_summary(&response.content));
                let mut out = Vec::with_capacity(retained.len() + 1);
                out.push(summary_message);
                out.extend(retained);
                CompactionOutcome { messages: out, success: true, summary: response.content }
            }
            Err(err) => {
                tracing::warn!(error = %err, "compaction summarization call failed, falling back to stats-only summary");
                let retained = retain_latest_fraction(messages, 0.3);
                let retained = strip_orphan_tool_messages(retained);
                let omitted = messages.len().saturating_sub(retained.len());
                let stats = format!("[Compaction fallback: {omitted} earlier messages summarized by count only; the original summarization call failed.]");
                let mut out = Vec::with_capacity(retained.len() + 1);
                out.push(Message::user(wrap_summary(&stats)));
                out.extend(retained);
                CompactionOutcome { messages: out, success: false, summary: stats }
            }
        }
    }
}

fn wrap_summary(summary: &str) -> String {
    format!("<conversation-summary>\n{summary}\n</conversation-summary>")
}

/// Keep the latest `fraction` of messages by count, rounded up.
fn retain_latest_fraction(messages: &[Message], fraction: f32) -> Vec<Message> {
    let keep = ((messages.len() as f32) * fraction).ceil() as usize;
    let keep = keep.clamp(0, messages.len());
    messages[messages.len() - keep..].to_vec()
}

/// Drop `tool` messages whose `tool_call_id` isn't produced by any
/// assistant message still in the slice (§3 invariant, S2 seed test).
fn strip_orphan_tool_messages(messages: Vec<Message>) -> Vec<Message> {
    let live_ids: HashSet<&str> = messages.iter().flat_map(|m| m.tool_calls()).map(|call| call.id.as_str()).collect();
    messages
        .into_iter()
        .filter(|m| match m.tool_call_id() {
            Some(id) => live_ids.contains(id),
            None => true,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct FileCandidate {
    path: String,
    score: f32,
}

/// Mention-count x recency-weighted ranking (§ SPEC_FULL supplement,
/// grounded on the router's "pick the best match" scoring style). A later
/// mention counts for more than an earlier one of the same path.
fn rank_file_candidates(messages: &[Message]) -> Vec<String> {
    let path_re = regex_for_paths();
    let mut scores: std::collections::HashMap<String, f32> = std::collections::HashMap::new();
    let total = messages.len().max(1) as f32;

    for (idx, message) in messages.iter().enumerate() {
        let recency_weight = (idx as f32 + 1.0) / total;
        for candidate in path_re.find_iter(message.content()) {
            *scores.entry(candidate.as_str().to_string()).or_insert(0.0) += recency_weight;
        }
        for call in message.tool_calls() {
            if let Ok(value) = call.arguments_value() {
                if let Some(path) = value.get("file_path").and_then(|v| v.as_str()) {
                    *scores.entry(path.to_string()).or_insert(0.0) += recency_weight * 1.5;
                }
            }
        }
    }

    let mut ranked: Vec<FileCandidate> = scores.into_iter().map(|(path, score)| FileCandidate { path, score }).collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(MAX_FILE_CANDIDATES).map(|c| c.path).collect()
}

fn regex_for_paths() -> regex::Regex {
    regex::Regex::new(r"(?:\.?/)?[\w.\-/]+\.[A-Za-z0-9]{1,6}\b").expect("static pattern is valid")
}

async fn read_candidates(paths: &[String]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for path in paths {
        if let Ok(content) = tokio::fs::read_to_string(Path::new(path)).await {
            let truncated: String = content.chars().take(MAX_FILE_READ_BYTES).collect();
            out.push((path.clone(), truncated));
        }
    }
    out
}

/// Structured summarisation prompt (§4.5 step 2).
fn build_summary_prompt(messages: &[Message], file_contents: &[(String, String)]) -> String {
    let mut prompt = String::new();
    prompt.push_str("Summarize this conversation so work can continue without the full history.\n");
    prompt.push_str("Cover: primary request, key concepts, files/code, errors/fixes, problem-solving approach, user messages, pending tasks, current work, optional next step.\n\n");
    prompt.push_str("# Conversation\n");
    for message in messages {
        prompt.push_str(&format!("[{:?}] {}\n", message.role(), message.content()));
    }
    if !file_contents.is_empty() {
        prompt.push_str("\n# Referenced files\n");
        for (path, content) in file_contents {
            prompt.push_str(&format!("## {path}\n{content}\n"));
        }
    }
    prompt
}
