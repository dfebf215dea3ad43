//! SSRF-guarded HTTP fetching
//!
//! Every outbound request made on behalf of catalog or archive URLs goes
//! through [`GuardedFetcher`], which:
//! - resolves the hostname itself and refuses private, loopback and
//!   link-local destinations before any connection is opened
//! - follows redirects manually, re-validating every hop
//! - bounds the whole exchange (including body reads) by one deadline
//! - hands back a [`GuardedResponse`] whose release fires exactly once,
//!   on whichever path the caller leaves by

pub mod error;
pub mod fetcher;
pub mod policy;
pub mod resolver;

pub use error::{FetchError, Result};
pub use fetcher::{FetchInit, GuardedFetcher, GuardedResponse, ReleaseGuard, ReleaseHook};
pub use policy::{is_blocked_ip, SsrfPolicy};
pub use resolver::{HostResolver, StaticResolver, SystemResolver};
