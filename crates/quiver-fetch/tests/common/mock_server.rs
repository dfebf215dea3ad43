//! Mock server helpers
//!
//! wiremock binds to 127.0.0.1, which the default policy blocks. Tests
//! allow the IP literal explicitly and map `localhost` to it through a
//! static resolver, leaving `localhost` itself subject to the policy.

use super::ReleaseCounter;
use quiver_fetch::{GuardedFetcher, SsrfPolicy, StaticResolver};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOOPBACK: &str = "127.0.0.1";

/// Fetcher that may reach the mock server by IP literal only
pub fn local_fetcher(counter: &ReleaseCounter) -> GuardedFetcher {
    let resolver = StaticResolver::new().with_host("localhost", LOOPBACK.parse().unwrap());
    GuardedFetcher::new(SsrfPolicy::strict().with_allowed_host(LOOPBACK))
        .with_resolver(Arc::new(resolver))
        .with_release_hook(counter.hook())
}

/// Port the mock server listens on
pub fn port_of(server: &MockServer) -> u16 {
    server.address().port()
}

pub async fn mock_body(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

pub async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn mock_redirect(server: &MockServer, route: &str, location: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
        .mount(server)
        .await;
}
