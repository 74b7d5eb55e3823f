//! Integration tests for 401 recovery and single-flight token refresh

use futures::future::join_all;
use memboard_client::{ApiClient, ErrorKind};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn project_list() -> Value {
    json!({"items": [], "total": 0})
}

async fn mount_protected(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_list()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried() {
    let mock_server = MockServer::start().await;
    mount_protected(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "refresh-2",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    client.tokens().set("expired", "refresh-1");

    let projects = client.list_projects().await.unwrap();
    assert_eq!(projects.total, 0);
    assert_eq!(client.tokens().get().as_deref(), Some("fresh"));
    assert_eq!(client.tokens().refresh_token().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mock_server = MockServer::start().await;
    mount_protected(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "refresh_token": "refresh-2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    client.tokens().set("expired", "refresh-1");

    let results = join_all((0..5).map(|_| client.list_projects())).await;

    assert!(results.iter().all(Result::is_ok));
    assert!(!client.dispatcher().refresher().is_refreshing());
    assert_eq!(client.tokens().get().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_failed_refresh_ends_session_for_every_waiter() {
    let mock_server = MockServer::start().await;
    mount_protected(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Invalid refresh token"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    client.tokens().set("expired", "revoked");

    let results = join_all((0..3).map(|_| client.list_projects())).await;

    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthExpired);
        assert_eq!(err.status_code(), 401);
        // The caller sees its own 401, not the refresh failure
        assert_eq!(err.message(), "Token expired");
    }
    assert!(!client.tokens().is_authenticated());
    assert_eq!(client.tokens().refresh_token(), None);
}

#[tokio::test]
async fn test_retry_happens_at_most_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Nope"})))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "refresh_token": "refresh-2"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    client.tokens().set("expired", "refresh-1");

    let err = client.list_projects().await.unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.message(), "Nope");
    // The refresh itself succeeded, so the new pair is kept
    assert_eq!(client.tokens().get().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_no_refresh_without_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();

    let err = client.list_projects().await.unwrap_err();
    assert!(err.is_auth_expired());
    assert_eq!(err.message(), "Not authenticated");
}

#[tokio::test]
async fn test_excluded_request_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    // A stale session from an earlier login must not trigger a refresh
    client.tokens().set("stale", "refresh-1");

    let err = client.login("ada@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.message(), "Invalid credentials");
    assert!(client.tokens().is_authenticated());
}

#[tokio::test]
async fn test_raw_request_is_retried_after_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/projects/demo/memories/export"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/projects/demo/memories/export"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}\n", "application/x-ndjson"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "refresh_token": "refresh-2"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    client.tokens().set("expired", "refresh-1");

    let export = client
        .export_memories("demo", memboard_client::types::ExportFormat::Jsonl)
        .await
        .unwrap();
    assert_eq!(export.data, b"{}\n");
}
