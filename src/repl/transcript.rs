use crate::ai::{ChatMessage, Role};

/// The rolling conversation. Element 0 is always the active profile's
/// instruction message and is never evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(instructions)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn instructions(&self) -> &str {
        &self.messages[0].content
    }

    /// Number of user/assistant messages after the instruction message.
    pub fn history_len(&self) -> usize {
        self.messages.len() - 1
    }

    /// Swaps the instruction message, keeping the history.
    pub fn set_instructions(&mut self, instructions: impl Into<String>) {
        self.messages[0] = ChatMessage::system(instructions);
    }

    /// Drops everything but the instruction message.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Copy keeping at most `window_turns` complete user/assistant pairs.
    pub fn trimmed(&self, window_turns: usize) -> Transcript {
        let history = &self.messages[1..];
        let max_messages = window_turns.saturating_mul(2);

        let mut kept = if history.len() <= max_messages {
            history
        } else {
            &history[history.len() - max_messages..]
        };
        // never start on the second half of a pair
        if kept.first().map(|m| m.role) == Some(Role::Assistant) {
            kept = &kept[1..];
        }

        let mut messages = Vec::with_capacity(kept.len() + 1);
        messages.push(self.messages[0].clone());
        messages.extend_from_slice(kept);
        Transcript { messages }
    }

    /// Messages to send for a new turn: the trimmed history plus `user`.
    /// Nothing is recorded until [`Transcript::commit`].
    pub fn request_with(&self, user: &str, window_turns: usize) -> Vec<ChatMessage> {
        let mut request = self.trimmed(window_turns).messages;
        request.push(ChatMessage::user(user));
        request
    }

    /// Records a completed turn and re-applies the window.
    pub fn commit(&mut self, user: &str, assistant: &str, window_turns: usize) {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
        *self = self.trimmed(window_turns);
    }
}
