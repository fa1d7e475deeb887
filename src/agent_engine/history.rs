use crate::llm::types::ChatMessage;

/// Planner conversation, owned by one session.
///
/// Entries alternate user/assistant; a user turn without a reply is left
/// behind when a planning call fails and is dropped by [`repair`](Self::repair).
pub struct ConversationHistory {
    entries: Vec<ChatMessage>,
    n_prev: usize,
}

impl ConversationHistory {
    pub fn new(n_prev: usize) -> Self {
        Self {
            entries: Vec::new(),
            n_prev,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn push_user(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    pub fn push_assistant(&mut self, text: &str) {
        self.entries.push(ChatMessage::assistant(text));
    }

    /// Drop a trailing entry that is not an assistant reply. Returns whether
    /// anything was removed.
    pub fn repair(&mut self) -> bool {
        match self.entries.last() {
            Some(last) if !last.is_assistant() => {
                tracing::warn!(
                    role = %last.role,
                    len = self.entries.len(),
                    "history does not end with an assistant turn, dropping last entry"
                );
                self.entries.pop();
                true
            }
            _ => false,
        }
    }

    /// The most recent `2 * n_prev` entries.
    pub fn context(&self) -> Vec<ChatMessage> {
        let keep = self.n_prev.saturating_mul(2);
        let start = self.entries.len().saturating_sub(keep);
        self.entries[start..].to_vec()
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }
}
