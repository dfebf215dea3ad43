//! Common test infrastructure for quiver-catalog tests

#![allow(dead_code)]

use quiver_catalog::CatalogClient;
use quiver_fetch::{GuardedFetcher, SsrfPolicy};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CATALOG_PATH: &str = "/v1/catalog.json";

/// Catalog client allowed to reach the local mock server
pub fn local_client() -> CatalogClient {
    let fetcher = GuardedFetcher::new(SsrfPolicy::strict().with_allowed_host("127.0.0.1"));
    CatalogClient::new(fetcher, Duration::from_secs(5))
}

pub fn sample_catalog() -> Value {
    json!({
        "version": 3,
        "updatedAt": "2026-09-30T12:00:00Z",
        "registry": "https://us-npm.pkg.dev/acme/extensions/",
        "extensions": [
            {
                "id": "memory-lance",
                "name": "LanceDB Memory",
                "description": "Vector memory",
                "packageSpec": "@acme/memory-lance@1.4.0",
                "version": "1.4.0",
                "kind": "memory"
            }
        ],
        "skills": [
            {
                "name": "good-skill",
                "description": "A skill",
                "archiveUrl": "https://example.com/good-skill.tgz",
                "version": "0.1.0",
                "tags": ["demo"]
            }
        ]
    })
}

pub async fn mock_catalog(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn catalog_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), CATALOG_PATH)
}
