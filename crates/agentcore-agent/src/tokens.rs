//! Token Counter (§4.5 "Token counting").
//!
//! A model-aware tokenizer is the real-world answer; since the provider
//! integration is out of scope, this crate ships only the documented
//! fallback heuristic and a pluggable trait so a real tokenizer can be
//! dropped in without touching the compaction/context code above it.

use agentcore_kernel::Message;

const PER_MESSAGE_OVERHEAD: u32 = 4;

pub trait TokenCounter: Send + Sync {
    fn count_message(&self, message: &Message) -> u32;

    fn count_messages(&self, messages: &[Message]) -> u32 {
        messages.iter().map(|m| self.count_message(m)).sum()
    }
}

/// ~1 token / 4 ASCII bytes, ~1 token / 1.5 CJK characters, plus a fixed
/// 4-token per-message overhead covering role framing.
pub struct HeuristicTokenCounter;

impl HeuristicTokenCounter {
    fn count_str(text: &str) -> f32 {
        let mut tokens = 0.0_f32;
        for ch in text.chars() {
            if is_cjk(ch) {
                tokens += 1.0 / 1.5;
            } else {
                tokens += ch.len_utf8() as f32 / 4.0;
            }
        }
        tokens
    }
}

fn is_cjk(ch: char) -> bool {
    let c = ch as u32;
    (0x4E00..=0x9FFF).contains(&c) // CJK Unified Ideographs
        || (0x3040..=0x30FF).contains(&c) // Hiragana/Katakana
        || (0xAC00..=0xD7A3).contains(&c) // Hangul syllables
}

impl TokenCounter for HeuristicTokenCounter {
    fn count_message(&self, message: &Message) -> u32 {
        let mut tokens = Self::count_str(message.content());
        for call in message.tool_calls() {
            tokens += Self::count_str(&call.name);
            tokens += Self::count_str(&call.arguments);
        }
        if let agentcore_kernel::Message::Tool { name, .. } = message {
            tokens += Self::count_str(name);
        }
        tokens.ceil() as u32 + PER_MESSAGE_OVERHEAD
    }
}
