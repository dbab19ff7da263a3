//! Directory listing tests

use serde_json::json;
use strmsync_alist::provider::AlistProvider;
use strmsync_alist::AlistError;
use strmsync_core::ports::IRemoteLister;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{entry, mount_listing, setup_alist_mock, TOKEN};

fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_list_sends_token_and_parses_entries() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/fs/list"))
        .and(header("Authorization", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": { "content": [entry("a.mp4", false), entry("sub", true)], "total": 2 }
        })))
        .mount(&server)
        .await;

    let entries = client.list("/movies").await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "a.mp4");
    assert_eq!(entries[0].size, 1024);
    assert!(entries[1].is_dir);
}

#[tokio::test]
async fn test_null_content_is_empty_directory() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/fs/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": { "content": null, "total": 0 }
        })))
        .mount(&server)
        .await;

    assert!(client.list("/empty").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_api_error_code_is_reported() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/fs/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 500,
            "message": "object not found",
            "data": null
        })))
        .mount(&server)
        .await;

    let err = client.list("/missing").await.unwrap_err();
    match err {
        AlistError::Api { code, message } => {
            assert_eq!(code, 500);
            assert_eq!(message, "object not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_carries_server_message() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/fs/list"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "message": "token is invalidated"
        })))
        .mount(&server)
        .await;

    let err = client.list("/movies").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("token is invalidated"));
}

#[tokio::test]
async fn test_recursive_walk_filters_and_joins_paths() {
    let (server, client) = setup_alist_mock().await;
    mount_listing(
        &server,
        "/movies",
        vec![
            entry("a.mp4", false),
            entry("poster.jpg", false),
            entry("action", true),
        ],
    )
    .await;
    mount_listing(
        &server,
        "/movies/action",
        vec![entry("b.mkv", false), entry("c.MKV", false), entry("deep", true)],
    )
    .await;
    mount_listing(&server, "/movies/action/deep", vec![entry("d.mp4", false)]).await;

    let mut items = client
        .list_recursive("/movies", &exts(&["mp4", "mkv"]), true)
        .await
        .unwrap();
    items.sort_by(|a, b| a.path.cmp(&b.path));

    let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/movies/a.mp4", "/movies/action/b.mkv", "/movies/action/deep/d.mp4"]
    );
    assert!(items.iter().all(|i| !i.is_dir));
    assert!(items[0].modified.is_some());
}

#[tokio::test]
async fn test_case_insensitive_matching_is_opt_in() {
    let (server, client) = setup_alist_mock().await;
    mount_listing(&server, "/tv", vec![entry("A.MKV", false), entry("b.mkv", false)]).await;

    let strict = client.list_recursive("/tv", &exts(&["mkv"]), true).await.unwrap();
    assert_eq!(strict.len(), 1);

    let relaxed = client.list_recursive("/tv", &exts(&["mkv"]), false).await.unwrap();
    assert_eq!(relaxed.len(), 2);
}

#[tokio::test]
async fn test_subdirectory_failure_fails_walk() {
    let (server, client) = setup_alist_mock().await;
    mount_listing(&server, "/movies", vec![entry("broken", true)]).await;
    Mock::given(method("POST"))
        .and(path("/api/fs/list"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client
        .list_recursive("/movies", &exts(&["mp4"]), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AlistError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_provider_lists_through_port() {
    let (server, client) = setup_alist_mock().await;
    mount_listing(&server, "/m", vec![entry("x.MP4", false)]).await;

    let provider = AlistProvider::new(client, false);
    let items = provider.list_recursive("/m", &exts(&["mp4"])).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].path, "/m/x.MP4");
}
