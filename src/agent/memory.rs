//! Role-tagged conversation log for the actor's stateful model channel.

use serde_json::Value;

use crate::model::MessageBuilder;

/// Default number of user/assistant turns kept after the system seed.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Ordered message log sent with every actor call.
///
/// Seeded once with a system prompt. Only the newest user message carries
/// its screenshot; older ones keep a text placeholder in its place.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    messages: Vec<Value>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![MessageBuilder::create_system_message(system_prompt)],
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Append a user turn with the current screenshot.
    pub fn push_user(&mut self, text: &str, screenshot_base64: Option<&str>) {
        for message in self.messages.iter_mut() {
            if MessageBuilder::role_of(message) == Some("user") {
                MessageBuilder::strip_images_from_message(message);
            }
        }
        self.messages
            .push(MessageBuilder::create_user_message(text, screenshot_base64));
        self.enforce_turn_limit();
    }

    /// Append the raw model reply.
    pub fn push_assistant(&mut self, reply: &str) {
        self.messages
            .push(MessageBuilder::create_assistant_message(reply));
    }

    /// Drop a trailing user turn that never got a reply.
    pub fn rollback_unanswered(&mut self) -> bool {
        let trailing_user = self
            .messages
            .last()
            .map(|m| MessageBuilder::role_of(m) == Some("user"))
            .unwrap_or(false);
        if trailing_user && self.messages.len() > 1 {
            self.messages.pop();
            return true;
        }
        false
    }

    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of images still attached anywhere in the log.
    pub fn image_count(&self) -> usize {
        self.messages.iter().map(MessageBuilder::image_count).sum()
    }

    fn enforce_turn_limit(&mut self) {
        // messages[0] is the system seed; each turn is one user + one assistant.
        let max_len = 1 + self.max_turns * 2;
        while self.messages.len() > max_len {
            self.messages.remove(1);
            // Keep the log starting on a user message after the seed.
            if self
                .messages
                .get(1)
                .map(|m| MessageBuilder::role_of(m) == Some("assistant"))
                .unwrap_or(false)
            {
                self.messages.remove(1);
            }
        }
    }
}
