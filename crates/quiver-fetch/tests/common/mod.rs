//! Common test infrastructure for quiver-fetch tests
//!
//! - `mock_server`: wiremock endpoints and a fetcher wired to a local server
//! - `ReleaseCounter`: counts release-hook invocations

#![allow(dead_code)]

pub mod mock_server;

pub use mock_server::*;

use quiver_fetch::ReleaseHook;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts how many times fetch resources were released
#[derive(Clone, Default)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> ReleaseHook {
        let count = self.0.clone();
        Arc::new(move |_url: &str| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
