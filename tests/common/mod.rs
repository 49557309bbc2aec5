//! Shared test helpers and a scripted run client.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::Notify;

use graphchat::client::{RunClient, RunEventStream, RunRequest};
use graphchat::error::SyncError;
use graphchat::store::SessionStore;
use graphchat::types::{ConversationState, RunEvent};

/// What one `stream_run` call does.
pub enum Script {
    /// Yield these items, then end.
    Events(Vec<Result<RunEvent, SyncError>>),
    /// Wait for the gate, then yield these items.
    Gated(Arc<Notify>, Vec<Result<RunEvent, SyncError>>),
    /// Record the store right before each item is handed out.
    Observed(Observer, Vec<Result<RunEvent, SyncError>>),
    /// Fail before any event is produced.
    FailStart(SyncError),
}

/// Store state seen just before an item was pulled from the run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub revision: u64,
    pub state: ConversationState,
}

/// Captures [`Snapshot`]s of a store as a run is consumed.
#[derive(Clone)]
pub struct Observer {
    store: SessionStore,
    seen: Arc<Mutex<Vec<Snapshot>>>,
}

impl Observer {
    pub fn new(store: &SessionStore) -> Self {
        Self {
            store: store.clone(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self) {
        self.seen.lock().unwrap().push(Snapshot {
            revision: self.store.revision(),
            state: self.store.get(),
        });
    }
}

/// A run client that replays queued scripts and records every request.
pub struct MockRunClient {
    thread_id: String,
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<RunRequest>>,
}

impl MockRunClient {
    pub fn new(thread_id: &str) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Queue a run whose generation node produces `deltas`.
    pub fn queue_answer(&self, deltas: &[&str]) {
        self.queue(Script::Events(deltas.iter().map(|d| Ok(token(d))).collect()));
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunClient for MockRunClient {
    async fn create_thread(&self) -> Result<String, SyncError> {
        Ok(self.thread_id.clone())
    }

    async fn stream_run(&self, request: RunRequest) -> Result<RunEventStream, SyncError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Events(Vec::new()));

        match script {
            Script::Events(items) => Ok(futures::stream::iter(items).boxed()),
            Script::Gated(gate, items) => Ok(async_stream::stream! {
                gate.notified().await;
                for item in items {
                    yield item;
                }
            }
            .boxed()),
            Script::Observed(observer, items) => Ok(async_stream::stream! {
                for item in items {
                    observer.record();
                    yield item;
                }
                observer.record();
            }
            .boxed()),
            Script::FailStart(err) => Err(err),
        }
    }
}

/// A token chunk from `node`.
pub fn chunk(node: &str, text: &str) -> RunEvent {
    RunEvent::new(
        "events",
        json!({
            "event": "on_chat_model_stream",
            "metadata": { "langgraph_node": node },
            "data": { "chunk": { "content": text } }
        }),
    )
}

/// A token chunk from the generation node.
pub fn token(text: &str) -> RunEvent {
    chunk("generate_node", text)
}

/// A non-token event from the generation node.
pub fn chain_start() -> RunEvent {
    RunEvent::new(
        "events",
        json!({
            "event": "on_chain_start",
            "metadata": { "langgraph_node": "generate_node" },
            "data": {}
        }),
    )
}

/// An SSE body carrying `events` and a closing `end` frame.
pub fn sse_body(events: &[RunEvent]) -> String {
    let mut body = String::from("event: metadata\ndata: {\"run_id\":\"run-1\"}\n\n");
    for event in events {
        body.push_str(&format!("event: {}\ndata: {}\n\n", event.event, event.data));
    }
    body.push_str("event: end\ndata: null\n\n");
    body
}
