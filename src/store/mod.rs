//! Session state store: the canonical, observable state of one chat.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::persistence::PersistenceGateway;
use crate::types::ConversationState;

/// Cloneable handle to one conversation's state.
///
/// Writes are published through a [`watch`] channel, so every reader sees
/// the latest write as soon as it lands; nothing is buffered. Clones share
/// the same state. Different conversations use different stores and share
/// nothing.
#[derive(Clone)]
pub struct SessionStore {
    chat_id: Arc<str>,
    tx: Arc<watch::Sender<ConversationState>>,
    turn_lock: Arc<Mutex<()>>,
    commits: Arc<AtomicU64>,
    revision: Arc<AtomicU64>,
    gateway: Option<Arc<PersistenceGateway>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("chat_id", &self.chat_id)
            .field("messages", &self.tx.borrow().messages.len())
            .field("commits", &self.commit_count())
            .field("gateway", &self.gateway.as_ref().map(|_| ".."))
            .finish()
    }
}

impl SessionStore {
    pub fn new(initial: ConversationState) -> Self {
        let chat_id: Arc<str> = Arc::from(initial.chat_id.as_str());
        let (tx, _rx) = watch::channel(initial);
        Self {
            chat_id,
            tx: Arc::new(tx),
            turn_lock: Arc::new(Mutex::new(())),
            commits: Arc::new(AtomicU64::new(0)),
            revision: Arc::new(AtomicU64::new(0)),
            gateway: None,
        }
    }

    /// Route commits to a persistence gateway.
    pub fn with_gateway(mut self, gateway: Arc<PersistenceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Current snapshot.
    pub fn get(&self) -> ConversationState {
        self.tx.borrow().clone()
    }

    /// Subscribe to every published state.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.tx.subscribe()
    }

    /// Number of states published since creation.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Number of settled turns committed through this store.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Replace the state and publish it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidState`] if `next` belongs to another chat.
    pub fn update(&self, next: ConversationState) -> Result<()> {
        self.ensure_same_chat(&next)?;
        self.tx.send_modify(|state| {
            *state = next;
            self.revision.fetch_add(1, Ordering::SeqCst);
        });
        Ok(())
    }

    /// Apply an edit atomically against the latest state and publish it.
    ///
    /// The edit runs on a copy; nothing is published if it fails or if it
    /// changes the chat id.
    pub fn modify<T>(&self, edit: impl FnOnce(&mut ConversationState) -> Result<T>) -> Result<T> {
        let mut outcome = None;
        self.tx.send_if_modified(|state| {
            let mut next = state.clone();
            let result = edit(&mut next).and_then(|value| {
                self.ensure_same_chat(&next)?;
                Ok(value)
            });
            let publish = result.is_ok();
            if publish {
                *state = next;
                self.revision.fetch_add(1, Ordering::SeqCst);
            }
            outcome = Some(result);
            publish
        });
        outcome.unwrap_or_else(|| Err(SyncError::InvalidState("store edit did not run".into())))
    }

    /// Publish the settled state of a turn and hand it to persistence.
    ///
    /// Persistence failures propagate unchanged; the committed state stays
    /// published either way.
    pub async fn commit(&self, settled: ConversationState) -> Result<()> {
        self.update(settled.clone())?;
        let count = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(chat_id = %self.chat_id, commits = count, "turn committed");

        if let Some(gateway) = &self.gateway {
            gateway.persist(&settled).await?;
        }
        Ok(())
    }

    /// Claim the single in-flight turn slot for this conversation.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TurnInFlight`] if another turn holds it.
    pub fn try_lock_turn(&self) -> Result<OwnedMutexGuard<()>> {
        self.turn_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| SyncError::TurnInFlight {
                chat_id: self.chat_id.to_string(),
            })
    }

    fn ensure_same_chat(&self, next: &ConversationState) -> Result<()> {
        if next.chat_id.as_str() != &*self.chat_id {
            return Err(SyncError::InvalidState(format!(
                "chat id is immutable: {} != {}",
                next.chat_id, self.chat_id
            )));
        }
        Ok(())
    }
}
