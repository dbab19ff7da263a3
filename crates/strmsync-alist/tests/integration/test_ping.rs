//! Health check tests

use strmsync_alist::provider::AlistProvider;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::setup_alist_mock;

#[tokio::test]
async fn test_ping_ok() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_ping_non_200_fails() {
    let (server, client) = setup_alist_mock().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = AlistProvider::new(client, true);
    let err = provider.check_connection().await.unwrap_err();
    assert!(format!("{err:#}").contains("unreachable"));
}
