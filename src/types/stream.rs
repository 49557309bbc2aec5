//! Raw run stream events.

use serde::{Deserialize, Serialize};

/// One unit of a remote run stream.
///
/// `event` is the transport-level frame name (`"events"`, `"metadata"`,
/// ...). `data` is the frame payload; for `"events"` frames it carries
/// `event` (the kind tag), `metadata` (including the originating node)
/// and `data` (kind-specific body).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunEvent {
    pub event: String,
    pub data: serde_json::Value,
}

impl RunEvent {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// The kind tag inside the payload (`data.event`).
    pub fn kind(&self) -> Option<&str> {
        self.data.get("event")?.as_str()
    }

    /// Backend run id carried by the leading `metadata` frame.
    pub fn run_id(&self) -> Option<&str> {
        if self.event != "metadata" {
            return None;
        }
        self.data.get("run_id")?.as_str()
    }

    /// A metadata field (`data.metadata.<field>`) as a string.
    pub fn metadata_str(&self, field: &str) -> Option<&str> {
        self.data.get("metadata")?.get(field)?.as_str()
    }
}

/// Input of a run: the question for the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunInput {
    pub question: String,
}
