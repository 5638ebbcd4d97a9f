//! Placeholder [`ChatService`] for the CLI boundary. The LLM wire protocol
//! is out of scope for this crate; wiring in a real provider adapter is left
//! to whoever embeds `agentcore-agent` with one. Until then, `run` surfaces
//! a clear `chat_disabled` error rather than pretending to talk to a model.

use agentcore_agent::{AgentError, ChatRequest, ChatResponse, ChatService, Result, StreamCallbacks};
use agentcore_kernel::CancellationHandle;
use async_trait::async_trait;

pub struct DisabledChatService;

#[async_trait]
impl ChatService for DisabledChatService {
    async fn chat(&self, _request: ChatRequest, _signal: &CancellationHandle, _callbacks: Option<&StreamCallbacks>) -> Result<ChatResponse> {
        Err(AgentError::ChatDisabled)
    }
}
