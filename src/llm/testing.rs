//! Scripted provider for unit tests.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{ArenaError, ArenaResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Replies from a queue first, then from the responder (fed the last user
/// message text). A queued reply starting with `ERR:` becomes a provider error.
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<String>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<(Vec<ChatMessage>, CallConfig)>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            queue: Mutex::new(replies.into_iter().map(Into::into).collect()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn responder(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(f)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every request's message list, in call order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn configs(&self) -> Vec<CallConfig> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    /// Text of the last message of every request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.last().map(ChatMessage::text).unwrap_or_default())
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> ArenaResult<LlmResponse> {
        let prompt = messages.last().map(ChatMessage::text).unwrap_or_default();
        self.calls.lock().unwrap().push((messages, cfg.clone()));

        let queued = self.queue.lock().unwrap().pop_front();
        let content = match (queued, &self.responder) {
            (Some(reply), _) => reply,
            (None, Some(f)) => f(&prompt),
            (None, None) => return Err(ArenaError::LlmProvider("script exhausted".into())),
        };
        if let Some(msg) = content.strip_prefix("ERR:") {
            return Err(ArenaError::LlmProvider(msg.to_string()));
        }
        Ok(LlmResponse {
            content,
            reasoning: String::new(),
        })
    }
}
