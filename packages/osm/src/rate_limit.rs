//! Per-host token-bucket throttling for outbound requests.
//!
//! The public Nominatim and Overpass instances enforce usage policies of
//! roughly one request per second. Every outbound call waits on the bucket
//! for its host before it is sent. Waiting uses [`tokio::time`], so tests
//! can drive the clock with `start_paused`.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// A single token bucket.
///
/// Starts full. One token is returned every `interval`, up to `capacity`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    interval: Duration,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket. A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: u32, interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Waits until a token is available and takes it.
    ///
    /// Waiters are served in FIFO order: the bucket lock is held while
    /// sleeping.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        self.refill(&mut state);

        if state.tokens == 0 {
            tokio::time::sleep_until(state.last_refill + self.interval).await;
            self.refill(&mut state);
        }

        state.tokens = state.tokens.saturating_sub(1);
    }

    fn refill(&self, state: &mut BucketState) {
        if self.interval.is_zero() {
            state.tokens = self.capacity;
            state.last_refill = Instant::now();
            return;
        }

        let elapsed = Instant::now().saturating_duration_since(state.last_refill);
        let earned = elapsed.as_nanos() / self.interval.as_nanos();
        if earned == 0 {
            return;
        }

        let earned = u32::try_from(earned).unwrap_or(u32::MAX);
        state.tokens = state.tokens.saturating_add(earned).min(self.capacity);
        state.last_refill += self.interval * earned;
    }
}

/// Token buckets keyed by upstream host.
///
/// Hosts without a registered bucket are not throttled.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: BTreeMap<String, TokenBucket>,
}

impl RateLimiter {
    /// Creates a limiter with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the bucket for the host of `url`.
    pub fn register(&mut self, url: &str, burst: u32, interval: Duration) {
        let host = host_key(url);
        log::debug!("Rate limiting {host}: burst {burst}, interval {interval:?}");
        self.buckets.insert(host, TokenBucket::new(burst, interval));
    }

    /// Waits on the bucket for the host of `url`, if one is registered.
    pub async fn acquire(&self, url: &str) {
        if let Some(bucket) = self.buckets.get(&host_key(url)) {
            bucket.acquire().await;
        }
    }
}

fn host_key(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|host| u.port().map_or_else(|| host.to_string(), |port| format!("{host}:{port}")))
        })
        .unwrap_or_else(|| url.to_string())
}
