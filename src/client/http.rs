//! Shared HTTP helpers for the backend API.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::error::SyncError;

/// Headers for a JSON request, with the optional `x-api-key`.
pub fn api_headers(api_key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
        if let Ok(val) = HeaderValue::from_str(key) {
            headers.insert("x-api-key", val);
        }
    }
    headers
}

/// Headers for a streaming run request.
pub fn stream_headers(api_key: Option<&str>) -> HeaderMap {
    let mut headers = api_headers(api_key);
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    headers
}

/// Map a non-success reply to an error, preferring the backend's own message.
pub fn status_to_error(status: u16, body: &str) -> SyncError {
    SyncError::api(status, extract_message(body).unwrap_or_else(|| body.to_string()))
}

/// Pull a human-readable message out of a JSON error body.
///
/// Accepts `{"detail": ..}`, `{"message": ..}` and `{"error": ..}` where the
/// value is a string.
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(text) = value.as_str() {
        return Some(text.to_string());
    }
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}
