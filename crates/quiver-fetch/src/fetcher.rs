//! Guarded fetcher

use crate::error::{FetchError, Result};
use crate::policy::SsrfPolicy;
use crate::resolver::{HostResolver, SystemResolver};
use bytes::Bytes;
use futures_util::StreamExt;
use quiver_core::types::NetworkConfig;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{redirect, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use url::{Host, Url};

/// Callback invoked once when a fetch's resources are released
pub type ReleaseHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Request options
#[derive(Debug, Clone, Default)]
pub struct FetchInit {
    pub headers: HeaderMap,
    /// Sent as `Authorization: Bearer ...` to the original host only
    pub bearer_token: Option<String>,
}

impl FetchInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bearer(token: Option<String>) -> Self {
        Self {
            bearer_token: token,
            ..Self::default()
        }
    }
}

/// Fires its hook exactly once, when dropped or explicitly released
pub struct ReleaseGuard {
    url: String,
    hook: Option<ReleaseHook>,
}

impl ReleaseGuard {
    fn new(url: &str, hook: Option<ReleaseHook>) -> Self {
        Self {
            url: url.to_string(),
            hook,
        }
    }

    /// Release now instead of at end of scope
    pub fn release(self) {}
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        trace!("Releasing fetch resources for {}", self.url);
        if let Some(hook) = self.hook.take() {
            hook(&self.url);
        }
    }
}

impl fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("url", &self.url)
            .field("armed", &self.hook.is_some())
            .finish()
    }
}

/// Response of a guarded fetch.
///
/// Body reads stay bounded by the deadline of the original request. The
/// underlying connection is released when this value is consumed or dropped.
#[derive(Debug)]
pub struct GuardedResponse {
    response: reqwest::Response,
    final_url: Url,
    deadline: Instant,
    timeout: Duration,
    _guard: ReleaseGuard,
}

impl GuardedResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn is_success(&self) -> bool {
        self.response.status().is_success()
    }

    /// e.g. `404 Not Found`
    pub fn status_line(&self) -> String {
        let status = self.response.status();
        match status.canonical_reason() {
            Some(reason) => format!("{} {}", status.as_u16(), reason),
            None => status.as_u16().to_string(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// URL of the last hop, after redirects
    pub fn final_url(&self) -> &Url {
        &self.final_url
    }

    pub async fn bytes(self) -> Result<Bytes> {
        let url = self.final_url.to_string();
        let timeout = self.timeout;
        match tokio::time::timeout_at(self.deadline, self.response.bytes()).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(source)) => Err(FetchError::Request { url, source }),
            Err(_) => Err(timed_out(url, timeout)),
        }
    }

    pub async fn text(self) -> Result<String> {
        let url = self.final_url.to_string();
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let url = self.final_url.to_string();
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    /// Stream the body into `path`, returning the number of bytes written
    pub async fn write_to(self, path: &Path) -> Result<u64> {
        let url = self.final_url.to_string();
        let timeout = self.timeout;
        let deadline = self.deadline;
        let io_err = |source| FetchError::Io {
            url: url.clone(),
            source,
        };

        let copy = async {
            let mut file = tokio::fs::File::create(path).await.map_err(io_err)?;
            let mut written = 0u64;
            let mut stream = self.response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|source| FetchError::Request {
                    url: url.clone(),
                    source,
                })?;
                file.write_all(&chunk).await.map_err(io_err)?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(io_err)?;
            Ok(written)
        };

        match tokio::time::timeout_at(deadline, copy).await {
            Ok(result) => result,
            Err(_) => Err(timed_out(url.clone(), timeout)),
        }
    }
}

/// HTTP client that refuses private-network destinations on every hop
#[derive(Clone)]
pub struct GuardedFetcher {
    policy: SsrfPolicy,
    resolver: Arc<dyn HostResolver>,
    user_agent: String,
    max_redirects: usize,
    release_hook: Option<ReleaseHook>,
}

impl GuardedFetcher {
    pub fn new(policy: SsrfPolicy) -> Self {
        let defaults = NetworkConfig::default();
        Self {
            policy,
            resolver: Arc::new(SystemResolver),
            user_agent: defaults.user_agent,
            max_redirects: defaults.max_redirects,
            release_hook: None,
        }
    }

    pub fn from_network_config(network: &NetworkConfig) -> Self {
        Self::new(SsrfPolicy::from_network_config(network))
            .with_user_agent(network.user_agent.clone())
            .with_max_redirects(network.max_redirects)
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Hook called once per fetch when its resources are released
    pub fn with_release_hook(mut self, hook: ReleaseHook) -> Self {
        self.release_hook = Some(hook);
        self
    }

    pub fn policy(&self) -> &SsrfPolicy {
        &self.policy
    }

    /// GET `url`, following redirects, within `timeout` overall.
    ///
    /// Non-2xx statuses are returned, not treated as errors.
    pub async fn fetch(
        &self,
        url: &str,
        init: FetchInit,
        timeout: Duration,
    ) -> Result<GuardedResponse> {
        let guard = ReleaseGuard::new(url, self.release_hook.clone());
        let deadline = Instant::now() + timeout;

        match tokio::time::timeout_at(deadline, self.follow(url, &init)).await {
            Ok(Ok((response, final_url))) => Ok(GuardedResponse {
                response,
                final_url,
                deadline,
                timeout,
                _guard: guard,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(timed_out(url.to_string(), timeout)),
        }
    }

    async fn follow(&self, url: &str, init: &FetchInit) -> Result<(reqwest::Response, Url)> {
        let mut current = parse_url(url)?;
        let origin = current.origin();

        for hop in 0..=self.max_redirects {
            let client = self.pinned_client(&current).await?;
            let mut request = client.get(current.clone()).headers(init.headers.clone());
            if let Some(token) = &init.bearer_token {
                if current.origin() == origin {
                    request = request.bearer_auth(token);
                }
            }

            debug!("GET {} (hop {})", current, hop);
            let response = request.send().await.map_err(|source| FetchError::Request {
                url: current.to_string(),
                source,
            })?;

            if !is_followed_redirect(response.status()) {
                return Ok((response, current));
            }

            let Some(location) = response.headers().get(LOCATION) else {
                return Ok((response, current));
            };
            let location = location.to_str().map_err(|e| FetchError::BadRedirect {
                url: current.to_string(),
                reason: e.to_string(),
            })?;
            let next = current.join(location).map_err(|e| FetchError::BadRedirect {
                url: current.to_string(),
                reason: e.to_string(),
            })?;
            check_scheme(&next)?;

            debug!("Redirect {} -> {}", current, next);
            current = next;
        }

        Err(FetchError::TooManyRedirects {
            url: url.to_string(),
            max: self.max_redirects,
        })
    }

    /// Validate the destination of `url` and build a client whose DNS is
    /// pinned to the validated addresses.
    async fn pinned_client(&self, url: &Url) -> Result<reqwest::Client> {
        let host = url
            .host()
            .ok_or_else(|| FetchError::invalid_url(url.as_str(), "missing host"))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| FetchError::invalid_url(url.as_str(), "missing port"))?;

        // A proxy would resolve the host itself and skip the pinned addresses
        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .no_proxy()
            .user_agent(&self.user_agent);

        match host {
            Host::Ipv4(ip) => self.check(url, &ip.to_string(), &[IpAddr::V4(ip)])?,
            Host::Ipv6(ip) => self.check(url, &ip.to_string(), &[IpAddr::V6(ip)])?,
            Host::Domain(domain) => {
                let addrs = self
                    .resolver
                    .resolve(domain, port)
                    .await
                    .map_err(|e| FetchError::Dns {
                        host: domain.to_string(),
                        message: e.to_string(),
                    })?;
                if addrs.is_empty() {
                    return Err(FetchError::Dns {
                        host: domain.to_string(),
                        message: "no addresses returned".to_string(),
                    });
                }
                let ips: Vec<IpAddr> = addrs.iter().map(|a| a.ip()).collect();
                self.check(url, domain, &ips)?;
                builder = builder.resolve_to_addrs(domain, &addrs);
            }
        }

        builder.build().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }

    fn check(&self, url: &Url, host: &str, ips: &[IpAddr]) -> Result<()> {
        if let Some(addr) = self.policy.first_blocked(host, ips) {
            warn!(
                target: "quiver::security",
                "Blocked fetch of {}: {} resolves to {}",
                url,
                host,
                addr
            );
            return Err(FetchError::Blocked {
                url: url.to_string(),
                host: host.to_string(),
                addr,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for GuardedFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedFetcher")
            .field("policy", &self.policy)
            .field("user_agent", &self.user_agent)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(url, e.to_string()))?;
    check_scheme(&parsed)?;
    if parsed.host().is_none() {
        return Err(FetchError::invalid_url(url, "missing host"));
    }
    Ok(parsed)
}

fn check_scheme(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
            scheme: other.to_string(),
        }),
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn timed_out(url: String, timeout: Duration) -> FetchError {
    FetchError::Timeout {
        url,
        timeout_ms: timeout.as_millis(),
    }
}
