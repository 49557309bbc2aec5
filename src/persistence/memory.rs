//! In-process authenticator and chat repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{AuthSession, Authenticator, Chat, ChatRepository};
use crate::error::{Result, SyncError};

/// Always reports the same identity, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    session: Option<AuthSession>,
}

impl StaticAuthenticator {
    pub fn anonymous() -> Self {
        Self { session: None }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            session: Some(AuthSession::for_user(id)),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn session(&self) -> Option<AuthSession> {
        self.session.clone()
    }
}

/// Chats kept in memory, keyed by `(user_id, chat_id)`.
#[derive(Debug, Default)]
pub struct MemoryChatRepository {
    chats: RwLock<HashMap<(String, String), Chat>>,
    saves: AtomicUsize,
}

impl MemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_chat` calls so far.
    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

fn poisoned() -> SyncError {
    SyncError::Persistence("chat repository lock poisoned".into())
}

#[async_trait]
impl ChatRepository for MemoryChatRepository {
    async fn save_chat(&self, chat: &Chat) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.chats
            .write()
            .map_err(|_| poisoned())?
            .insert((chat.user_id.clone(), chat.id.clone()), chat.clone());
        Ok(())
    }

    async fn load_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<Chat>> {
        let chats = self.chats.read().map_err(|_| poisoned())?;
        Ok(chats.get(&(user_id.to_string(), chat_id.to_string())).cloned())
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        let chats = self.chats.read().map_err(|_| poisoned())?;
        let mut list: Vec<Chat> = chats
            .values()
            .filter(|chat| chat.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}
