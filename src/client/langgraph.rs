//! HTTP run client for LangGraph-style graph servers.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::types::RunEvent;

use super::http::{api_headers, extract_message, status_to_error, stream_headers};
use super::sse::{SseDecoder, SseFrame};
use super::{RunClient, RunEventStream, RunRequest};

/// Talks to `POST /threads` and `POST /threads/{id}/runs/stream`.
#[derive(Debug, Clone)]
pub struct HttpRunClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRunClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build a client from config, applying its connect timeout.
    ///
    /// No overall request timeout is set: a run stream may stay open for
    /// as long as the backend keeps producing events.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            http,
            base_url: config.backend_url().to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RunClient for HttpRunClient {
    async fn create_thread(&self) -> Result<String, SyncError> {
        let url = format!("{}/threads", self.base_url);
        debug!(url = %url, "creating thread");

        let resp = self
            .http
            .post(&url)
            .headers(api_headers(self.api_key.as_deref()))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let thread: ThreadResponse = resp.json().await?;
        Ok(thread.thread_id)
    }

    async fn stream_run(&self, request: RunRequest) -> Result<RunEventStream, SyncError> {
        let url = format!("{}/threads/{}/runs/stream", self.base_url, request.thread_id);
        let body = serde_json::json!({
            "assistant_id": request.assistant_id,
            "input": request.input,
            "stream_mode": [request.stream_mode],
        });

        debug!(
            thread_id = %request.thread_id,
            assistant_id = %request.assistant_id,
            stream_mode = %request.stream_mode,
            "opening run stream"
        );

        let resp = self
            .http
            .post(&url)
            .headers(stream_headers(self.api_key.as_deref()))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut finished = false;
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(SyncError::Transport(e));
                        finished = true;
                        break;
                    }
                };

                for frame in decoder.push(&chunk) {
                    match classify_frame(frame) {
                        Frame::Event(event) => yield Ok(event),
                        Frame::End => {
                            finished = true;
                            break;
                        }
                        Frame::Error(err) => {
                            yield Err(err);
                            finished = true;
                            break;
                        }
                    }
                }
                if finished {
                    break;
                }
            }

            if !finished {
                if let Some(frame) = decoder.finish() {
                    match classify_frame(frame) {
                        Frame::Event(event) => yield Ok(event),
                        Frame::End => {}
                        Frame::Error(err) => yield Err(err),
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

enum Frame {
    Event(RunEvent),
    End,
    Error(SyncError),
}

fn classify_frame(frame: SseFrame) -> Frame {
    match frame.event.as_str() {
        "end" => Frame::End,
        "error" => Frame::Error(SyncError::Run {
            message: extract_message(&frame.data).unwrap_or(frame.data),
        }),
        _ => {
            // Unparseable payloads still flow through; the event filter drops them.
            let data = serde_json::from_str(&frame.data)
                .unwrap_or(serde_json::Value::String(frame.data));
            Frame::Event(RunEvent::new(frame.event, data))
        }
    }
}

#[derive(Deserialize)]
struct ThreadResponse {
    thread_id: String,
}
