use async_trait::async_trait;

use crate::errors::ArenaResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

/// Unified LLM provider trait. Planner and grounding queries both go through it,
/// so tests can substitute a scripted provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    /// Runs one chat completion and returns the full text once it is complete.
    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> ArenaResult<LlmResponse>;
}
