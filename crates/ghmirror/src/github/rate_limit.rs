//! Proactive request pacing per credential.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub allows 5000 requests/hour per token; 10/sec leaves room for bursts
/// while keeping clear of the secondary limit on concurrent requests.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

/// A request pacer backed by governor.
///
/// Clones share the same bucket, so every clone of one client is paced
/// together.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second`. Zero is treated as one.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Wait until the next request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}
