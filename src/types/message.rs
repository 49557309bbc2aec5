//! Transcript message types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// A single transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Rendering variant for function-role messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lifecycle status, only set on assistant messages this crate produces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    /// Correlates the message with the run stream that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            name: None,
            status: None,
            stream_id: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a finished assistant message without lifecycle tracking.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an empty assistant message in `pending`, tied to a stream.
    pub fn pending_assistant(stream_id: impl Into<String>) -> Self {
        Self {
            status: Some(MessageStatus::Pending),
            stream_id: Some(stream_id.into()),
            ..Self::with_role(Role::Assistant, String::new())
        }
    }

    /// Create a function message carrying a structured payload.
    pub fn function(name: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::with_role(Role::Function, payload.to_string())
        }
    }

    /// Whether this message is a turn that has not settled yet.
    pub fn is_in_flight(&self) -> bool {
        self.status.is_some_and(|s| !s.is_terminal())
    }
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Function,
    Data,
    Tool,
}

/// Lifecycle status of an assistant message.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Streaming,
    Complete,
    Error,
}

impl MessageStatus {
    /// `complete` and `error` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// `streaming -> streaming` is legal: every accepted delta republishes
    /// the message in the same state.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Streaming)
                | (Pending, Complete)
                | (Pending, Error)
                | (Streaming, Streaming)
                | (Streaming, Complete)
                | (Streaming, Error)
        )
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}
