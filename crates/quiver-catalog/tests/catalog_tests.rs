//! Integration tests for catalog fetching
//!
//! Tests cover:
//! - Successful fetch and decode
//! - Structural validation errors surfaced from the network path
//! - HTTP status/reason on failure
//! - Credential selection in select_token and fetch_catalog_with_auth

mod common;

use common::*;
use quiver_catalog::{select_token, CatalogError};
use quiver_core::types::AuthMethod;
use quiver_core::ErrorClass;
use quiver_secrets::{AccessToken, CredentialResolver, StaticTokenStrategy};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_catalog_decodes_entries() {
    let server = MockServer::start().await;
    mock_catalog(&server, sample_catalog()).await;

    let catalog = local_client()
        .fetch_catalog(&catalog_url(&server), None)
        .await
        .unwrap();

    assert_eq!(catalog.version, 3);
    assert_eq!(catalog.extensions[0].id, "memory-lance");
    assert_eq!(catalog.skills[0].name, "good-skill");
}

#[tokio::test]
async fn test_fetch_catalog_missing_version() {
    let server = MockServer::start().await;
    mock_catalog(&server, json!({"extensions": [], "skills": []})).await;

    let err = local_client()
        .fetch_catalog(&catalog_url(&server), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("version"));
    assert_eq!(err.class(), ErrorClass::Validation);
}

#[tokio::test]
async fn test_fetch_catalog_missing_extensions() {
    let server = MockServer::start().await;
    mock_catalog(&server, json!({"version": 1, "skills": []})).await;

    let err = local_client()
        .fetch_catalog(&catalog_url(&server), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("extensions"));
}

#[tokio::test]
async fn test_fetch_catalog_http_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = local_client()
        .fetch_catalog(&catalog_url(&server), None)
        .await
        .unwrap_err();
    match &err {
        CatalogError::Http { status, reason, .. } => {
            assert_eq!(*status, 403);
            assert_eq!(reason, "Forbidden");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    assert!(err.to_string().contains("403 Forbidden"));
    assert_eq!(err.class(), ErrorClass::Network);
}

#[tokio::test]
async fn test_fetch_catalog_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(header("authorization", "Bearer secret-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_catalog()))
        .mount(&server)
        .await;

    let token = AccessToken::new("secret-1").unwrap();
    let catalog = local_client()
        .fetch_catalog(&catalog_url(&server), Some(&token))
        .await
        .unwrap();
    assert_eq!(catalog.version, 3);
}

fn delegated_resolver() -> CredentialResolver {
    CredentialResolver::with_strategies(vec![Box::new(StaticTokenStrategy::new(Some(
        "delegated-1",
    )))])
}

#[tokio::test]
async fn test_select_token_static_token_wins() {
    let token = select_token(
        AuthMethod::DelegatedCredential,
        Some("static-1"),
        &delegated_resolver(),
    )
    .await
    .unwrap();
    assert_eq!(token.expose(), "static-1");
}

#[tokio::test]
async fn test_delegated_token_is_sent_with_catalog_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(header("authorization", "Bearer delegated-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_catalog()))
        .expect(1)
        .mount(&server)
        .await;

    local_client()
        .fetch_catalog_with_auth(
            &catalog_url(&server),
            AuthMethod::DelegatedCredential,
            None,
            &delegated_resolver(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_select_token_ignores_resolver_without_delegation() {
    let token = select_token(AuthMethod::None, None, &delegated_resolver()).await;
    assert!(token.is_none());
}

#[tokio::test]
async fn test_missing_credential_degrades_to_unauthenticated() {
    let server = MockServer::start().await;
    mock_catalog(&server, sample_catalog()).await;

    let resolver = CredentialResolver::with_strategies(Vec::new());
    let catalog = local_client()
        .fetch_catalog_with_auth(
            &catalog_url(&server),
            AuthMethod::DelegatedCredential,
            None,
            &resolver,
        )
        .await
        .unwrap();
    assert_eq!(catalog.skills.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.headers.contains_key("authorization")));
}
