//! Narrows a run event feed down to answer-text deltas.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::types::RunEvent;

/// Stream of accepted text deltas, in arrival order.
pub type DeltaStream = BoxStream<'static, Result<String, SyncError>>;

/// Selects content-stream events emitted by the generation node.
///
/// Anything else (other kinds, other nodes, malformed payloads) is dropped
/// without failing the turn. Drops are logged at `debug`, and
/// [`filter_deltas`](Self::filter_deltas) counts them per run so a
/// misconfigured node name shows up as a high discard count instead of a
/// silently empty answer. The filter itself holds no mutable state and can
/// be shared by any number of conversations.
#[derive(Debug, Clone)]
pub struct EventFilter {
    stream_event: String,
    generation_node: String,
    node_field: String,
}

/// Per-run bookkeeping filled in while a [`DeltaStream`] is consumed.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    inner: Arc<RunStatsInner>,
}

#[derive(Debug, Default)]
struct RunStatsInner {
    discarded: AtomicU64,
    run_id: OnceLock<String>,
}

impl RunStats {
    /// Events of this run dropped so far.
    pub fn discarded(&self) -> u64 {
        self.inner.discarded.load(Ordering::Relaxed)
    }

    /// Backend run id, once the run's `metadata` frame has been seen.
    pub fn run_id(&self) -> Option<&str> {
        self.inner.run_id.get().map(String::as_str)
    }

    fn record_discard(&self) {
        self.inner.discarded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_run_id(&self, run_id: &str) {
        let _ = self.inner.run_id.set(run_id.to_string());
    }
}

/// Accepted deltas of one run plus that run's [`RunStats`].
pub struct FilteredRun {
    pub deltas: DeltaStream,
    pub stats: RunStats,
}

impl EventFilter {
    pub fn new(stream_event: impl Into<String>, generation_node: impl Into<String>) -> Self {
        Self {
            stream_event: stream_event.into(),
            generation_node: generation_node.into(),
            node_field: crate::config::DEFAULT_NODE_FIELD.to_string(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.stream_event, &config.generation_node)
            .with_node_field(&config.node_field)
    }

    /// Metadata key naming the originating node.
    pub fn with_node_field(mut self, field: impl Into<String>) -> Self {
        self.node_field = field.into();
        self
    }

    pub fn generation_node(&self) -> &str {
        &self.generation_node
    }

    /// The text delta carried by `event`, if it is one we want.
    pub fn extract(&self, event: &RunEvent) -> Option<String> {
        let delta = self.select(event);
        if delta.is_none() {
            debug!(
                frame = %event.event,
                kind = event.kind().unwrap_or("<none>"),
                node = event.metadata_str(&self.node_field).unwrap_or("<none>"),
                "discarding run event"
            );
        }
        delta
    }

    fn select(&self, event: &RunEvent) -> Option<String> {
        if event.kind()? != self.stream_event {
            return None;
        }
        if event.metadata_str(&self.node_field)? != self.generation_node {
            return None;
        }
        chunk_text(event.data.get("data")?.get("chunk")?.get("content")?)
    }

    /// Adapt one run's event stream into a delta stream.
    ///
    /// Order is preserved. An error is forwarded once and ends the stream.
    /// The run's `metadata` frame is not a discard; it only records the
    /// run id.
    pub fn filter_deltas(&self, events: BoxStream<'static, Result<RunEvent, SyncError>>) -> FilteredRun {
        let filter = self.clone();
        let stats = RunStats::default();
        let tally = stats.clone();
        let deltas = async_stream::stream! {
            let mut inner = std::pin::pin!(events);
            while let Some(item) = inner.next().await {
                match item {
                    Ok(event) => {
                        if let Some(run_id) = event.run_id() {
                            tally.record_run_id(run_id);
                        } else if let Some(delta) = filter.extract(&event) {
                            yield Ok(delta);
                        } else {
                            tally.record_discard();
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };
        FilteredRun {
            deltas: Box::pin(deltas),
            stats,
        }
    }
}

/// Chunk content is either a plain string or a list of typed parts.
fn chunk_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    Value::String(s) => text.push_str(s),
                    Value::Object(_) if part.get("type").and_then(Value::as_str) == Some("text") => {
                        text.push_str(part.get("text")?.as_str()?);
                    }
                    Value::Object(_) => {} // tool-call chunks and the like carry no answer text
                    _ => return None,
                }
            }
            Some(text)
        }
        _ => None,
    }
}
