//! Remote run client: the seam between the synchronizer and the backend.

pub mod http;
pub mod langgraph;
pub mod sse;

pub use langgraph::HttpRunClient;

use async_trait::async_trait;
use bon::Builder;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SyncError;
use crate::types::{RunEvent, RunInput};

/// A lazy, finite, non-restartable run event stream.
pub type RunEventStream = BoxStream<'static, Result<RunEvent, SyncError>>;

/// What the backend should stream back.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StreamMode {
    /// Fine-grained execution events, including token chunks.
    #[default]
    Events,
    Values,
    Updates,
    Messages,
}

/// Parameters for starting one run.
#[derive(Debug, Clone, Builder, PartialEq, Eq)]
pub struct RunRequest {
    #[builder(into)]
    pub thread_id: String,
    #[builder(into)]
    pub assistant_id: String,
    pub input: RunInput,
    #[builder(default)]
    pub stream_mode: StreamMode,
}

/// Starts runs on a graph backend and streams their events.
#[async_trait]
pub trait RunClient: Send + Sync {
    /// Create a remote thread and return its id.
    async fn create_thread(&self) -> Result<String, SyncError>;

    /// Start a run and stream its events.
    ///
    /// Failures surface either as the returned error or as an `Err` item
    /// that ends the stream.
    async fn stream_run(&self, request: RunRequest) -> Result<RunEventStream, SyncError>;
}
