//! URL resolution tests

use serde_json::json;
use strmsync_alist::client::AlistClient;
use strmsync_alist::provider::AlistProvider;
use strmsync_core::ports::IUrlResolver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{mount_get, setup_alist_mock, TOKEN};

#[tokio::test]
async fn test_raw_url_is_preferred() {
    let (server, client) = setup_alist_mock().await;
    mount_get(
        &server,
        "/movies/a.mp4",
        json!({ "name": "a.mp4", "raw_url": "https://cdn.test/a.mp4", "sign": "s1" }),
    )
    .await;

    let url = client.get_file_url("/movies/a.mp4").await.unwrap();
    assert_eq!(url, "https://cdn.test/a.mp4");
}

#[tokio::test]
async fn test_fallback_url_without_signing() {
    let (server, client) = setup_alist_mock().await;
    mount_get(&server, "/movies/a.mp4", json!({ "raw_url": "", "sign": "s1" })).await;

    let url = client.get_file_url("/movies/a.mp4").await.unwrap();
    assert_eq!(url, format!("{}/d/movies/a.mp4", server.uri()));
}

#[tokio::test]
async fn test_fallback_url_with_signing() {
    let (server, _) = setup_alist_mock().await;
    let client = AlistClient::with_base_url(TOKEN, format!("{}/", server.uri())).with_signing(true);
    mount_get(&server, "/movies/a.mp4", json!({ "raw_url": "", "sign": "abc" })).await;

    let url = client.get_file_url("/movies/a.mp4").await.unwrap();
    assert_eq!(url, format!("{}/d/movies/a.mp4?sign=abc", server.uri()));
}

#[tokio::test]
async fn test_signing_skipped_when_server_sends_no_sign() {
    let (server, _) = setup_alist_mock().await;
    let client = AlistClient::with_base_url(TOKEN, server.uri()).with_signing(true);
    mount_get(&server, "/x.mkv", json!({ "raw_url": "", "sign": "" })).await;

    let url = client.get_file_url("/x.mkv").await.unwrap();
    assert_eq!(url, format!("{}/d/x.mkv", server.uri()));
}

#[tokio::test]
async fn test_null_data_is_not_found() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/fs/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": null
        })))
        .mount(&server)
        .await;

    let err = client.get_file_url("/gone.mp4").await.unwrap_err();
    assert!(err.to_string().contains("file not found"));
}

#[tokio::test]
async fn test_provider_resolver_adds_context() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/fs/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 403,
            "message": "permission denied",
            "data": null
        })))
        .mount(&server)
        .await;

    let provider = AlistProvider::new(client, true);
    let err = provider.resolve("/secret.mp4").await.unwrap_err();
    let text = format!("{err:#}");
    assert!(text.contains("/secret.mp4"));
    assert!(text.contains("permission denied"));
}
