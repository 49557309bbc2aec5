//! Canonical per-chat state.

use serde::{Deserialize, Serialize};

use super::message::{new_id, Message};

/// The transcript of one chat.
///
/// `messages` only grows; the single exception is the in-place update of
/// the most recently appended assistant message while its turn is live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub chat_id: String,
    pub messages: Vec<Message>,
}

impl ConversationState {
    /// Empty conversation bound to an existing chat/thread id.
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            messages: Vec::new(),
        }
    }

    /// Empty conversation with a freshly generated chat id.
    pub fn fresh() -> Self {
        Self::new(new_id())
    }

    /// The message of the turn currently in flight, if any.
    pub fn in_flight(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_in_flight())
    }

    /// Look up a message by id.
    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// The most recently appended message, if it has the given id.
    pub fn last_if_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.last_mut().filter(|m| m.id == id)
    }

    /// Content of the first message, used as the chat title.
    pub fn first_content(&self) -> Option<&str> {
        self.messages.first().map(|m| m.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
