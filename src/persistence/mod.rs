//! Persistence gateway: records settled turns for an authenticated user.

pub mod file;
pub mod memory;

pub use file::FileChatRepository;
pub use memory::{MemoryChatRepository, StaticAuthenticator};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_TITLE_MAX_CHARS;
use crate::error::Result;
use crate::types::{ConversationState, Message};

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AuthSession {
    pub fn for_user(id: impl Into<String>) -> Self {
        Self {
            user: AuthUser {
                id: id.into(),
                name: None,
            },
        }
    }
}

/// Resolves the current identity. `None` disables persistence.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn session(&self) -> Option<AuthSession>;
}

/// Durable chat storage.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn save_chat(&self, chat: &Chat) -> Result<()>;
    async fn load_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<Chat>>;
    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>>;
}

/// A stored transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub path: String,
}

impl Chat {
    /// Snapshot `state` for `user_id`, stamped with `created_at`.
    pub fn from_state(
        state: &ConversationState,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
        title_max_chars: usize,
    ) -> Self {
        Self {
            id: state.chat_id.clone(),
            title: truncate_chars(state.first_content().unwrap_or_default(), title_max_chars),
            user_id: user_id.into(),
            created_at,
            messages: state.messages.clone(),
            path: chat_path(&state.chat_id),
        }
    }

    /// Rebuild the in-memory state from a stored chat.
    pub fn to_state(&self) -> ConversationState {
        ConversationState {
            chat_id: self.id.clone(),
            messages: self.messages.clone(),
        }
    }
}

/// UI route of a chat.
pub fn chat_path(chat_id: &str) -> String {
    format!("/chat/{chat_id}")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Invoked once per settled turn.
///
/// Saves only when an identity is available; otherwise the in-memory state
/// stays the source of truth and nothing is written.
pub struct PersistenceGateway {
    auth: Arc<dyn Authenticator>,
    repository: Arc<dyn ChatRepository>,
    title_max_chars: usize,
}

impl PersistenceGateway {
    pub fn new(auth: Arc<dyn Authenticator>, repository: Arc<dyn ChatRepository>) -> Self {
        Self {
            auth,
            repository,
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }

    pub fn with_title_max_chars(mut self, max: usize) -> Self {
        self.title_max_chars = max;
        self
    }

    pub fn repository(&self) -> &Arc<dyn ChatRepository> {
        &self.repository
    }

    /// Save `state` for the current user.
    ///
    /// Returns the saved chat, or `None` when nobody is signed in.
    pub async fn persist(&self, state: &ConversationState) -> Result<Option<Chat>> {
        let Some(session) = self.auth.session().await else {
            debug!(chat_id = %state.chat_id, "no session, skipping save");
            return Ok(None);
        };

        let chat = Chat::from_state(state, session.user.id, Utc::now(), self.title_max_chars);
        self.repository.save_chat(&chat).await?;
        debug!(chat_id = %chat.id, user_id = %chat.user_id, messages = chat.messages.len(), "chat saved");
        Ok(Some(chat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_first(content: &str) -> ConversationState {
        let mut state = ConversationState::new("abc");
        state.messages.push(Message::user(content));
        state
    }

    #[test]
    fn chat_fields_derive_from_state() {
        let now = Utc::now();
        let chat = Chat::from_state(&state_with_first("What is LangGraph?"), "u1", now, 100);
        assert_eq!(chat.id, "abc");
        assert_eq!(chat.title, "What is LangGraph?");
        assert_eq!(chat.path, "/chat/abc");
        assert_eq!(chat.user_id, "u1");
        assert_eq!(chat.created_at, now);
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn title_is_truncated_on_char_boundaries() {
        let long = "\u{e9}".repeat(150);
        let chat = Chat::from_state(&state_with_first(&long), "u1", Utc::now(), 100);
        assert_eq!(chat.title.chars().count(), 100);
    }

    #[test]
    fn empty_state_has_empty_title() {
        let chat = Chat::from_state(&ConversationState::new("abc"), "u1", Utc::now(), 100);
        assert_eq!(chat.title, "");
    }

    #[tokio::test]
    async fn no_session_means_no_save() {
        let repo = Arc::new(MemoryChatRepository::new());
        let gateway = PersistenceGateway::new(Arc::new(StaticAuthenticator::anonymous()), repo.clone());
        let saved = gateway.persist(&state_with_first("Hi")).await.unwrap();
        assert!(saved.is_none());
        assert_eq!(repo.save_calls(), 0);
    }

    #[tokio::test]
    async fn session_saves_chat() {
        let repo = Arc::new(MemoryChatRepository::new());
        let gateway = PersistenceGateway::new(Arc::new(StaticAuthenticator::user("u1")), repo.clone());
        let saved = gateway.persist(&state_with_first("Hi")).await.unwrap().unwrap();
        assert_eq!(saved.user_id, "u1");
        assert_eq!(repo.save_calls(), 1);
        assert_eq!(repo.load_chat("u1", "abc").await.unwrap(), Some(saved));
    }
}
