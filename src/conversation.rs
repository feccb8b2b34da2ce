//! Conversation transcript.

use crate::llm::{ChatMessage, Role};

/// Ordered, append-only transcript that always starts with one system message.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn append(&mut self, message: ChatMessage) {
        debug_assert!(
            message.role != Role::System,
            "system message may only open the transcript"
        );
        self.messages.push(message);
    }

    /// Truncate back to a single fresh system message.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        self.messages.clear();
        self.messages.push(ChatMessage::system(system_prompt));
    }

    /// Read view handed to the model.
    pub fn snapshot(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .and_then(|m| m.content.as_deref())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
