//! Assistant message lifecycle: `pending -> streaming -> complete | error`.

use tracing::debug;

use crate::error::{Result, SyncError};
use crate::store::SessionStore;
use crate::types::{ConversationState, Message, MessageStatus};

/// Drives one assistant message through its lifecycle.
///
/// Every transition edits the message in the store and publishes the new
/// state before returning. Illegal transitions leave both the turn and the
/// store untouched.
///
/// Deltas and completion require the message to still be the newest one.
/// [`fail`](Self::fail) settles it wherever it sits, so a turn can always
/// be closed out.
#[derive(Debug)]
pub struct AssistantTurn {
    message_id: String,
    stream_id: String,
    status: MessageStatus,
    deltas: usize,
}

impl AssistantTurn {
    /// Append an empty `pending` assistant message and publish it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TurnInFlight`] if another assistant message has
    /// not settled yet.
    pub fn begin(store: &SessionStore) -> Result<Self> {
        let stream_id = uuid::Uuid::new_v4().to_string();
        let message = Message::pending_assistant(stream_id.clone());
        let message_id = message.id.clone();

        store.modify(|state| {
            if state.in_flight().is_some() {
                return Err(SyncError::TurnInFlight {
                    chat_id: state.chat_id.clone(),
                });
            }
            state.messages.push(message);
            Ok(())
        })?;

        debug!(chat_id = store.chat_id(), message_id = %message_id, "assistant turn pending");
        Ok(Self {
            message_id,
            stream_id,
            status: MessageStatus::Pending,
            deltas: 0,
        })
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Local placeholder until [`bind_run`](Self::bind_run), then the
    /// backend run id.
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Tie the message to the backend run; written with the next transition.
    pub fn bind_run(&mut self, run_id: &str) {
        if self.stream_id != run_id {
            self.stream_id = run_id.to_string();
        }
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    /// Number of deltas applied so far.
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    /// Append one delta and move to `streaming`.
    pub fn push_delta(&mut self, store: &SessionStore, delta: &str) -> Result<ConversationState> {
        let state = self.transition(store, MessageStatus::Streaming, Placement::Newest, |message| {
            message.content.push_str(delta);
        })?;
        self.deltas += 1;
        Ok(state)
    }

    /// Freeze the accumulated content as the final answer.
    pub fn complete(&mut self, store: &SessionStore) -> Result<ConversationState> {
        let state = self.transition(store, MessageStatus::Complete, Placement::Newest, |_| {})?;
        debug!(chat_id = store.chat_id(), deltas = self.deltas, "assistant turn complete");
        Ok(state)
    }

    /// Replace whatever was accumulated with a diagnostic for `error`.
    pub fn fail(&mut self, store: &SessionStore, error: &SyncError) -> Result<ConversationState> {
        let diagnostic = error.diagnostic();
        let state = self.transition(store, MessageStatus::Error, Placement::Anywhere, |message| {
            message.content = diagnostic;
        })?;
        debug!(chat_id = store.chat_id(), error = %error, "assistant turn failed");
        Ok(state)
    }

    fn transition(
        &mut self,
        store: &SessionStore,
        next: MessageStatus,
        placement: Placement,
        edit: impl FnOnce(&mut Message),
    ) -> Result<ConversationState> {
        if !self.status.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let message_id = &self.message_id;
        let stream_id = &self.stream_id;
        let state = store.modify(|state| {
            let message = match placement {
                Placement::Newest => state.last_if_mut(message_id).ok_or_else(|| {
                    SyncError::InvalidState(format!(
                        "assistant message {message_id} is no longer the newest message"
                    ))
                })?,
                Placement::Anywhere => state.message_mut(message_id).ok_or_else(|| {
                    SyncError::InvalidState(format!("assistant message {message_id} was removed"))
                })?,
            };
            edit(message);
            message.status = Some(next);
            message.stream_id = Some(stream_id.clone());
            Ok(state.clone())
        })?;

        self.status = next;
        Ok(state)
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Newest,
    Anywhere,
}
