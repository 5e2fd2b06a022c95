//! Integration tests for the authenticated transport chain.
//!
//! These tests run the full chain (error mapping, Basic, Bearer, network)
//! against a local mock registry and count the calls it receives.

use std::time::Duration;

use registry_client::clients::{HttpMethod, HttpRequest, TransportChain};
use registry_client::{
    ChallengeOrder, Credentials, ErrorKind, LogHook, RegistryConfig, RegistryUrl,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASIC_AUTH: &str = "Basic YWxpY2U6c2VjcmV0";

fn config(server: &MockServer) -> RegistryConfig {
    RegistryConfig::builder()
        .url(RegistryUrl::new(server.uri()).unwrap())
        .credentials(Credentials::new("alice", "secret"))
        .log_hook(LogHook::quiet())
        .build()
        .unwrap()
}

fn bearer_challenge(server: &MockServer) -> String {
    format!(
        r#"Bearer realm="{}/token",service="registry",scope="repository:app:pull""#,
        server.uri()
    )
}

fn get(server: &MockServer, route: &str) -> HttpRequest {
    HttpRequest::builder(HttpMethod::Get, format!("{}{route}", server.uri()))
        .build()
        .unwrap()
}

// ============================================================================
// Single-Retry Bound
// ============================================================================

#[tokio::test]
async fn test_second_bearer_challenge_surfaces_authentication_error() {
    let server = MockServer::start().await;
    let challenge = bearer_challenge(&server);

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token":"t0k3n"}"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", challenge.as_str()))
        .expect(2)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let error = chain
        .execute(&get(&server, "/v2/app/tags/list"))
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::Authentication);
    assert_eq!(error.status, Some(401));
}

#[tokio::test]
async fn test_second_basic_challenge_surfaces_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", r#"Basic realm="registry""#))
        .expect(2)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let error = chain.execute(&get(&server, "/v2/")).await.unwrap_err();

    assert_eq!(error.kind, ErrorKind::Authentication);
}

// ============================================================================
// Challenge Routing
// ============================================================================

#[tokio::test]
async fn test_basic_challenge_is_answered_without_token_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token":"unused"}"#))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", r#"Basic realm="registry""#))
        .expect(1)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let response = chain.execute(&get(&server, "/v2/")).await.unwrap();

    assert_eq!(response.code, 200);
}

#[tokio::test]
async fn test_bearer_challenge_is_answered_with_exchanged_token() {
    let server = MockServer::start().await;
    let challenge = bearer_challenge(&server);

    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("service", "registry"))
        .and(query_param("scope", "repository:app:pull"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"token":"t0k3n","expires_in":300}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"tags":["v1"]}"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", challenge.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let response = chain
        .execute(&get(&server, "/v2/app/tags/list"))
        .await
        .unwrap();

    assert_eq!(response.code, 200);
    assert_eq!(chain.token_cache().unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeat_request_sends_cached_token_without_challenge() {
    let server = MockServer::start().await;
    let challenge = bearer_challenge(&server);

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"token":"t0k3n","expires_in":300}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"tags":["v1"]}"#))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", challenge.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let request = get(&server, "/v2/app/tags/list");

    assert_eq!(chain.execute(&request).await.unwrap().code, 200);
    assert_eq!(chain.execute(&request).await.unwrap().code, 200);
}

#[tokio::test]
async fn test_token_first_order_still_answers_basic_challenges() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Basic"))
        .expect(1)
        .mount(&server)
        .await;

    let config = RegistryConfig::builder()
        .url(RegistryUrl::new(server.uri()).unwrap())
        .credentials(Credentials::new("alice", "secret"))
        .challenge_order(ChallengeOrder::TokenFirst)
        .build()
        .unwrap();
    let chain = TransportChain::from_config(&config).unwrap();

    assert_eq!(chain.execute(&get(&server, "/v2/")).await.unwrap().code, 200);
}

#[tokio::test]
async fn test_token_endpoint_failure_is_authentication_error() {
    let server = MockServer::start().await;
    let challenge = bearer_challenge(&server);

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", challenge.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let error = chain
        .execute(&get(&server, "/v2/app/tags/list"))
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::Authentication);
}

// ============================================================================
// Status Mapping
// ============================================================================

#[tokio::test]
async fn test_not_found_is_client_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/app/manifests/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"errors":[{"code":"MANIFEST_UNKNOWN","message":"manifest unknown"}]}"#,
        ))
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let error = chain
        .execute(&get(&server, "/v2/app/manifests/missing"))
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::ClientError);
    assert_eq!(error.status, Some(404));
    assert!(error.has_code("MANIFEST_UNKNOWN"));
}

#[tokio::test]
async fn test_service_unavailable_is_server_error_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let error = chain.execute(&get(&server, "/v2/")).await.unwrap_err();

    assert_eq!(error.kind, ErrorKind::ServerError);
    assert_eq!(error.status, Some(503));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let config = RegistryConfig::builder()
        .url(RegistryUrl::new("http://127.0.0.1:1").unwrap())
        .build()
        .unwrap();
    let chain = TransportChain::from_config(&config).unwrap();
    let request = HttpRequest::builder(HttpMethod::Get, "http://127.0.0.1:1/v2/")
        .build()
        .unwrap();

    let error = chain.execute(&request).await.unwrap_err();

    assert_eq!(error.kind, ErrorKind::Network);
    assert!(error.status.is_none());
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = RegistryConfig::builder()
        .url(RegistryUrl::new(server.uri()).unwrap())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let chain = TransportChain::from_config(&config).unwrap();

    let error = chain.execute(&get(&server, "/v2/")).await.unwrap_err();

    assert_eq!(error.kind, ErrorKind::Network);
}

// ============================================================================
// Error Shape
// ============================================================================

#[tokio::test]
async fn test_same_failure_classifies_identically() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let chain = TransportChain::from_config(&config(&server)).unwrap();
    let request = get(&server, "/v2/app/tags/list");

    let first = chain.execute(&request).await.unwrap_err();
    let second = chain.execute(&request).await.unwrap_err();

    assert_eq!(first.kind, second.kind);
    assert_eq!(first.status, second.status);
    assert_eq!(first.message, second.message);
}
