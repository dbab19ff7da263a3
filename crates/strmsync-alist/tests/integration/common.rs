//! Shared test helpers for Alist integration tests
//!
//! Provides wiremock-based mock server setup for the Alist file-system API.

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use strmsync_alist::client::AlistClient;

pub const TOKEN: &str = "alist-test-token";

/// Starts a mock server and returns a client pointing at it
pub async fn setup_alist_mock() -> (MockServer, AlistClient) {
    let server = MockServer::start().await;
    let client = AlistClient::with_base_url(TOKEN, server.uri());
    (server, client)
}

/// Builds a listing entry
pub fn entry(name: &str, is_dir: bool) -> Value {
    let size: u64 = if is_dir { 0 } else { 1024 };
    json!({
        "name": name,
        "size": size,
        "is_dir": is_dir,
        "modified": "2024-05-01T12:00:00+08:00",
        "sign": "",
    })
}

/// Mounts `POST /api/fs/list` for one directory
pub async fn mount_listing(server: &MockServer, dir: &str, entries: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/api/fs/list"))
        .and(body_partial_json(json!({ "path": dir })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": { "content": entries, "total": entries.len() }
        })))
        .mount(server)
        .await;
}

/// Mounts `POST /api/fs/get` for one file
pub async fn mount_get(server: &MockServer, file: &str, data: Value) {
    Mock::given(method("POST"))
        .and(path("/api/fs/get"))
        .and(body_partial_json(json!({ "path": file })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": data
        })))
        .mount(server)
        .await;
}
