//! Error types for graphchat.

pub mod unified;

pub use unified::{Diagnostic, ErrorCategory};

use thiserror::Error;

use crate::types::MessageStatus;

/// Primary error type for all synchronizer operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Run failed: {message}")]
    Run { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: MessageStatus,
        to: MessageStatus,
    },

    #[error("A turn is already in flight for chat {chat_id}")]
    TurnInFlight { chat_id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SyncError {
    /// Create a backend error from an HTTP status and body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::Io(_) => ErrorCategory::Transport,
            Self::Api { status, .. } => match status {
                500..=599 => ErrorCategory::Transport,
                _ => ErrorCategory::Upstream,
            },
            Self::Run { .. } | Self::Serialization(_) => ErrorCategory::Upstream,
            Self::Persistence(_) => ErrorCategory::Persistence,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::InvalidTransition { .. } | Self::TurnInFlight { .. } => ErrorCategory::Lifecycle,
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Structured description of this error.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            error: self.category(),
            message: self.to_string(),
        }
    }

    /// JSON rendering of [`to_diagnostic`](Self::to_diagnostic), used as
    /// assistant content on the error path.
    pub fn diagnostic(&self) -> String {
        let diagnostic = self.to_diagnostic();
        serde_json::to_string(&diagnostic).unwrap_or_else(|_| diagnostic.message)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SyncError>;
