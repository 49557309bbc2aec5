//! File-backed chat repository: one JSON document per chat.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::{Chat, ChatRepository};
use crate::error::Result;

/// Stores chats as `<base_dir>/<user>/<chat_id>.json`.
///
/// # Example
/// ```no_run
/// use graphchat::persistence::{ChatRepository, FileChatRepository};
///
/// # async fn example() -> graphchat::error::Result<()> {
/// let repo = FileChatRepository::new_default();
/// for chat in repo.list_chats("user-1").await? {
///     println!("{} {}", chat.id, chat.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileChatRepository {
    base_dir: PathBuf,
}

impl FileChatRepository {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Repository under `~/.graphchat/chats`.
    pub fn new_default() -> Self {
        Self::new(crate::config::default_data_dir().join("chats"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.base_dir.join(normalize_label(user_id))
    }

    fn chat_path(&self, user_id: &str, chat_id: &str) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{}.json", normalize_label(chat_id)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFile {
    version: u32,
    chat: Chat,
}

#[async_trait]
impl ChatRepository for FileChatRepository {
    async fn save_chat(&self, chat: &Chat) -> Result<()> {
        let path = self.chat_path(&chat.user_id, &chat.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = ChatFile {
            version: 1,
            chat: chat.clone(),
        };
        let serialized = serde_json::to_vec_pretty(&file)?;

        // Write-then-rename so readers never see a half-written chat.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serialized).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<Chat>> {
        let path = self.chat_path(user_id, chat_id);
        let raw = match fs::read(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let file: ChatFile = serde_json::from_slice(&raw)?;
        Ok(Some(file.chat).filter(|chat| chat.user_id == user_id))
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        let dir = self.user_dir(user_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut chats = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read(&path).await?;
            match serde_json::from_slice::<ChatFile>(&raw) {
                Ok(file) if file.chat.user_id == user_id => chats.push(file.chat),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable chat file"),
            }
        }
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
