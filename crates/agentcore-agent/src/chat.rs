//! Chat Service contract (§4.7). The LLM wire protocol itself is out of
//! scope; this module defines only the interface the turn loop programs
//! against, plus a scripted test double for exercising it without a real
//! provider.

use std::sync::Arc;

use agentcore_kernel::{CancellationHandle, Message, ToolCall, ToolDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub reasoning_content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Streaming callbacks (§4.1, §4.7, §9 "event-emitter / callback
/// patterns"). A callback struct is used rather than a channel since the
/// loop is the sole consumer -- no concurrent-consumer fan-out is needed
/// here.
#[derive(Clone, Default)]
pub struct StreamCallbacks {
    pub on_content_delta: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_thinking_delta: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_tool_call_start: Option<Arc<dyn Fn(&str, &str) + Send + Sync>>,
    pub on_tool_call_delta: Option<Arc<dyn Fn(&str, &str) + Send + Sync>>,
}

impl StreamCallbacks {
    fn content_delta(&self, text: &str) {
        if let Some(cb) = &self.on_content_delta {
            cb(text);
        }
    }
    fn thinking_delta(&self, text: &str) {
        if let Some(cb) = &self.on_thinking_delta {
            cb(text);
        }
    }
    fn tool_call_start(&self, id: &str, name: &str) {
        if let Some(cb) = &self.on_tool_call_start {
            cb(id, name);
        }
    }
    fn tool_call_delta(&self, id: &str, partial_args: &str) {
        if let Some(cb) = &self.on_tool_call_delta {
            cb(id, partial_args);
        }
    }
}

/// §4.7: `chat(messages, tools?, signal?, streamCallbacks?) -> ChatResponse`.
/// Implementations must honor `signal` and retry once with backoff on
/// transient failure before surfacing `llm_error` (§4.1 "Failure
/// semantics") -- that retry lives in the concrete provider adapter, which
/// is out of scope here.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn chat(
        &self,
        request: ChatRequest,
        signal: &CancellationHandle,
        callbacks: Option<&StreamCallbacks>,
    ) -> Result<ChatResponse>;
}

/// Deterministic test double: returns a fixed sequence of responses, one
/// per call, optionally pausing mid-stream to exercise cancellation (S4).
pub struct ScriptedChatService {
    responses: std::sync::Mutex<std::collections::VecDeque<ScriptedResponse>>,
}

pub enum ScriptedResponse {
    Immediate(ChatResponse),
    /// Sleeps `delay_ms` in small slices, checking `signal` between each, to
    /// simulate a streaming call that can be cancelled mid-flight.
    Delayed { delay_ms: u64, response: ChatResponse },
}

impl ScriptedChatService {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self { responses: std::sync::Mutex::new(responses.into()) }
    }
}

#[async_trait]
impl ChatService for ScriptedChatService {
    async fn chat(
        &self,
        _request: ChatRequest,
        signal: &CancellationHandle,
        callbacks: Option<&StreamCallbacks>,
    ) -> Result<ChatResponse> {
        let scripted = {
            let mut guard = self.responses.lock().expect("scripted chat service mutex poisoned");
            guard.pop_front()
        };
        let scripted = scripted.ok_or_else(|| AgentError::LlmError("scripted chat service exhausted".to_string()))?;

        let response = match scripted {
            ScriptedResponse::Immediate(response) => response,
            ScriptedResponse::Delayed { delay_ms, response } => {
                let slices = (delay_ms / 10).max(1);
                for _ in 0..slices {
                    if signal.is_cancelled() {
                        return Err(AgentError::Aborted);
                    }
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms / slices)).await;
                }
                if signal.is_cancelled() {
                    return Err(AgentError::Aborted);
                }
                response
            }
        };

        if let Some(callbacks) = callbacks {
            if !response.content.is_empty() {
                callbacks.content_delta(&response.content);
            }
            if let Some(reasoning) = &response.reasoning_content {
                callbacks.thinking_delta(reasoning);
            }
            for call in &response.tool_calls {
                callbacks.tool_call_start(&call.id, &call.name);
                callbacks.tool_call_delta(&call.id, &call.arguments);
            }
        }

        Ok(response)
    }
}
