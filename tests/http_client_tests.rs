mod common;

use std::sync::Arc;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{chain_start, chunk, sse_body, token};
use graphchat::client::{HttpRunClient, RunClient, RunRequest};
use graphchat::config::SyncConfig;
use graphchat::error::{ErrorCategory, SyncError};
use graphchat::persistence::{
    ChatRepository, FileChatRepository, PersistenceGateway, StaticAuthenticator,
};
use graphchat::store::SessionStore;
use graphchat::sync::Synchronizer;
use graphchat::types::{ConversationState, MessageStatus, RunInput};

fn request(thread_id: &str, question: &str) -> RunRequest {
    RunRequest::builder()
        .thread_id(thread_id)
        .assistant_id("graph")
        .input(RunInput {
            question: question.to_string(),
        })
        .build()
}

fn sse(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn mount_thread(server: &MockServer, thread_id: &str) {
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "thread_id": thread_id,
            "created_at": "2026-10-18T00:00:00Z",
            "metadata": {}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_thread_returns_id_and_sends_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "thread_id": "t-123" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpRunClient::new(server.uri(), Some("test-key".into()));
    assert_eq!(client.create_thread().await.unwrap(), "t-123");
}

#[tokio::test]
async fn create_thread_maps_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "detail": "invalid api key" })))
        .mount(&server)
        .await;

    let client = HttpRunClient::new(server.uri(), None);
    match client.create_thread().await.unwrap_err() {
        SyncError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn stream_run_posts_events_mode_and_decodes_frames() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/t-1/runs/stream"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({
            "assistant_id": "graph",
            "input": { "question": "Hi" },
            "stream_mode": ["events"]
        })))
        .respond_with(sse(sse_body(&[chain_start(), token("Hel"), token("lo")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpRunClient::new(server.uri(), None);
    let events: Vec<_> = client
        .stream_run(request("t-1", "Hi"))
        .await
        .unwrap()
        .collect()
        .await;

    let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
    // metadata, chain start, two tokens; the end frame is consumed.
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].event, "metadata");
    assert_eq!(events[1], chain_start());
    assert_eq!(events[2], token("Hel"));
    assert_eq!(events[3], token("lo"));
}

#[tokio::test]
async fn error_frame_ends_the_stream() {
    let server = MockServer::start().await;
    let body = format!(
        "event: events\ndata: {}\n\nevent: error\ndata: {{\"error\":\"ValueError\",\"message\":\"node exploded\"}}\n\nevent: events\ndata: {}\n\n",
        token("partial").data,
        token("after").data,
    );
    Mock::given(method("POST"))
        .and(path("/threads/t-1/runs/stream"))
        .respond_with(sse(body))
        .mount(&server)
        .await;

    let client = HttpRunClient::new(server.uri(), None);
    let items: Vec<_> = client
        .stream_run(request("t-1", "Hi"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    match &items[1] {
        Err(SyncError::Run { message }) => assert_eq!(message, "node exploded"),
        other => panic!("unexpected item: {other:?}"),
    }
}

#[tokio::test]
async fn stream_start_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/t-1/runs/stream"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let client = HttpRunClient::new(server.uri(), None);
    let err = match client.stream_run(request("t-1", "Hi")).await {
        Ok(_) => panic!("expected start failure"),
        Err(err) => err,
    };
    assert!(matches!(err, SyncError::Api { status: 500, .. }));
    assert_eq!(err.category(), ErrorCategory::Transport);
}

#[tokio::test]
async fn full_turn_over_http_is_saved_to_disk() {
    let server = MockServer::start().await;
    mount_thread(&server, "thread-http").await;
    Mock::given(method("POST"))
        .and(path("/threads/thread-http/runs/stream"))
        .respond_with(sse(sse_body(&[
            chunk("retrieve_node", "docs"),
            token("It is "),
            token("a graph "),
            token("engine."),
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let repo = Arc::new(FileChatRepository::new(dir.path()));
    let gateway = Arc::new(PersistenceGateway::new(
        Arc::new(StaticAuthenticator::user("u1")),
        repo.clone(),
    ));

    let config = SyncConfig::new().with_backend_url(server.uri());
    let client = Arc::new(HttpRunClient::from_config(&config).unwrap());
    let sync = Synchronizer::from_config(client, &config);
    let store = sync.start_conversation(Some(gateway)).await.unwrap();
    assert_eq!(store.chat_id(), "thread-http");

    let outcome = sync.submit_user_message(&store, "What is LangGraph?").await.unwrap();
    assert_eq!(outcome.state.messages[1].content, "It is a graph engine.");
    assert_eq!(outcome.state.messages[1].status, Some(MessageStatus::Complete));

    let saved = repo.load_chat("u1", "thread-http").await.unwrap().unwrap();
    assert_eq!(saved.title, "What is LangGraph?");
    assert_eq!(saved.to_state(), store.get());
}

#[tokio::test]
async fn unreachable_backend_becomes_transport_diagnostic() {
    // Nothing listens on the discard port.
    let client = Arc::new(HttpRunClient::new("http://127.0.0.1:9", None));
    let sync = Synchronizer::from_config(client, &SyncConfig::new());
    let store = SessionStore::new(ConversationState::new("offline"));

    let outcome = sync.submit_user_message(&store, "Hi").await.unwrap();

    let answer = &outcome.state.messages[1];
    assert_eq!(answer.status, Some(MessageStatus::Error));
    let body: serde_json::Value = serde_json::from_str(&answer.content).unwrap();
    assert_eq!(body["error"], "transport");
    assert_eq!(store.commit_count(), 1);
}
