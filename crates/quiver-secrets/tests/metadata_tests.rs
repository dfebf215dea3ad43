//! Metadata server strategy tests against a mock endpoint

use quiver_secrets::{CredentialResolver, MetadataServerStrategy, StaticTokenStrategy, TokenStrategy};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

async fn metadata_strategy(server: &MockServer) -> MetadataServerStrategy {
    MetadataServerStrategy::new(Duration::from_secs(3))
        .with_endpoint(format!("{}{}", server.uri(), TOKEN_PATH))
}

#[tokio::test]
async fn test_metadata_token_requires_flavor_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .and(header("Metadata-Flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.meta",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = metadata_strategy(&server).await.token().await.unwrap().unwrap();
    assert_eq!(token.expose(), "ya29.meta");
}

#[tokio::test]
async fn test_metadata_error_status_falls_through_to_static() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = CredentialResolver::with_strategies(vec![
        Box::new(metadata_strategy(&server).await),
        Box::new(StaticTokenStrategy::new(Some("configured"))),
    ]);

    let resolved = resolver.resolve().await.unwrap();
    assert_eq!(resolved.strategy, "static-token");
    assert_eq!(resolved.token.expose(), "configured");
}

#[tokio::test]
async fn test_metadata_timeout_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(serde_json::json!({"access_token": "late"})),
        )
        .mount(&server)
        .await;

    let strategy = MetadataServerStrategy::new(Duration::from_millis(200))
        .with_endpoint(format!("{}{}", server.uri(), TOKEN_PATH));
    let resolver = CredentialResolver::with_strategies(vec![Box::new(strategy)]);

    assert!(resolver.resolve_token().await.is_none());
}
