//! Integration tests for Link-header pagination.

use std::sync::{Arc, Mutex};

use registry_client::{
    ErrorKind, LogHook, RegistryClient, RegistryConfig, RegistryError, RegistryUrl,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RegistryClient {
    let config = RegistryConfig::builder()
        .url(RegistryUrl::new(server.uri()).unwrap())
        .log_hook(LogHook::quiet())
        .build()
        .unwrap();
    RegistryClient::new(&config).unwrap()
}

fn page(tags: &[&str], next: Option<&str>) -> ResponseTemplate {
    let body = serde_json::json!({ "name": "app", "tags": tags });
    let template = ResponseTemplate::new(200).set_body_json(body);
    match next {
        Some(next) => template.insert_header("Link", format!(r#"<{next}>; rel="next""#).as_str()),
        None => template,
    }
}

// ============================================================================
// Exhaustion
// ============================================================================

#[tokio::test]
async fn test_tags_merges_three_pages_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .and(query_param("last", "d"))
        .respond_with(page(&["e"], None))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .and(query_param("last", "b"))
        .respond_with(page(&["c", "d"], Some("/v2/app/tags/list?n=2&last=d")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(page(&["a", "b"], Some("/v2/app/tags/list?n=2&last=b")))
        .expect(1)
        .mount(&server)
        .await;

    let tags = client(&server).tags("app").await.unwrap();

    assert_eq!(tags, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_null_tags_yield_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/empty/tags/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"empty","tags":null}"#))
        .expect(1)
        .mount(&server)
        .await;

    let tags = client(&server).tags("empty").await.unwrap();

    assert!(tags.is_empty());
}

#[tokio::test]
async fn test_repositories_follow_absolute_links() {
    let server = MockServer::start().await;
    let next = format!("{}/v2/_catalog?last=b", server.uri());

    Mock::given(method("GET"))
        .and(path("/v2/_catalog"))
        .and(query_param("last", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"repositories":["c"]}"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/_catalog"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"repositories":["a","b"]}"#)
                .insert_header("Link", format!(r#"<{next}>; rel="next""#).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let repositories = client(&server).repositories().await.unwrap();

    assert_eq!(repositories, vec!["a", "b", "c"]);
}

// ============================================================================
// Termination
// ============================================================================

#[tokio::test]
async fn test_link_back_to_first_page_is_protocol_violation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .and(query_param("last", "a"))
        .respond_with(page(&["b"], Some("/v2/app/tags/list")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(page(&["a"], Some("/v2/app/tags/list?last=a")))
        .expect(1)
        .mount(&server)
        .await;

    let error = client(&server).tags("app").await.unwrap_err();

    assert_eq!(error.kind(), Some(ErrorKind::ProtocolViolation));
}

#[tokio::test]
async fn test_failing_page_discards_earlier_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .and(query_param("last", "a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(page(&["a"], Some("/v2/app/tags/list?last=a")))
        .expect(1)
        .mount(&server)
        .await;

    let error = client(&server).tags("app").await.unwrap_err();

    assert_eq!(error.kind(), Some(ErrorKind::ServerError));
    assert_eq!(error.status(), Some(500));
}

#[tokio::test]
async fn test_undecodable_page_is_protocol_violation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let error = client(&server).tags("app").await.unwrap_err();

    assert_eq!(error.kind(), Some(ErrorKind::ProtocolViolation));
}

#[tokio::test]
async fn test_invalid_repository_is_rejected_before_any_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let error = client(&server).tags("../app").await.unwrap_err();

    assert!(matches!(error, RegistryError::InvalidRepository { .. }));
}

// ============================================================================
// Logging Hook
// ============================================================================

#[tokio::test]
async fn test_every_page_is_reported_to_log_hook() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .and(query_param("last", "a"))
        .respond_with(page(&["b"], None))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(page(&["a"], Some("/v2/app/tags/list?last=a")))
        .mount(&server)
        .await;

    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let config = RegistryConfig::builder()
        .url(RegistryUrl::new(server.uri()).unwrap())
        .log_hook(LogHook::new(move |line| {
            sink.lock().unwrap().push(line.to_string());
        }))
        .build()
        .unwrap();

    RegistryClient::new(&config).unwrap().tags("app").await.unwrap();

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        format!(
            "registry.tags url={}/v2/app/tags/list repository=app",
            server.uri()
        )
    );
    assert!(lines[1].contains("last=a"));
}
