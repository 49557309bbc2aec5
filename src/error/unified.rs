//! Error classification and the diagnostic payload shown in place of an answer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Broad error category, matching the failure taxonomy of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// The backend could not be reached or the stream broke.
    Transport,
    /// The backend answered, but with an error or an unexpected shape.
    Upstream,
    /// Saving the transcript failed.
    Persistence,
    Configuration,
    /// An illegal message status transition or a busy conversation.
    Lifecycle,
    Unknown,
}

/// Serializable description of a failed turn.
///
/// Rendered to JSON and stored as the assistant message content when a
/// run fails, so the failure stays visible in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub error: ErrorCategory,
    pub message: String,
}
