//! Fixed-window rate limiting middleware.
//!
//! # Responsibilities
//! - Identify the client (forwarded address, else real IP header, else anonymous)
//! - Count hits per client in a fixed window through a pluggable store
//! - Reject with 429 and `Retry-After` once the window's budget is spent
//!
//! # Design Decisions
//! - Counting lives behind `RateLimitStore` so a shared backend can replace the in-process map
//! - Allowed responses carry `X-RateLimit-Limit` / `X-RateLimit-Remaining`

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::{Request, Response};
use crate::middleware::{Middleware, Next};
use crate::observability::metrics;

/// State of a key after one increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits in the current window, including this one.
    pub count: u64,
    pub resets_in: Duration,
}

/// Hit counter backing a `RateLimiter`.
pub trait RateLimitStore: Send + Sync {
    /// Count a hit for `key`, opening a new window of `window` length if none is live.
    fn increment(&self, key: &str, window: Duration) -> WindowHit;

    /// Hits in the live window for `key`; 0 when there is none.
    fn get(&self, key: &str) -> u64;

    /// Forget `key` entirely.
    fn expire(&self, key: &str);
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    length: Duration,
    count: u64,
}

impl Window {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.started) < self.length
    }
}

/// In-process store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    windows: DashMap<String, Window>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows that have ended.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.windows.retain(|_, window| window.is_live(now));
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for InMemoryStore {
    fn increment(&self, key: &str, window: Duration) -> WindowHit {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            length: window,
            count: 0,
        });
        if !entry.is_live(now) {
            *entry = Window {
                started: now,
                length: window,
                count: 0,
            };
        }
        entry.count += 1;

        WindowHit {
            count: entry.count,
            resets_in: entry.length.saturating_sub(now.duration_since(entry.started)),
        }
    }

    fn get(&self, key: &str) -> u64 {
        let now = Instant::now();
        self.windows
            .get(key)
            .filter(|window| window.is_live(now))
            .map(|window| window.count)
            .unwrap_or(0)
    }

    fn expire(&self, key: &str) {
        self.windows.remove(key);
    }
}

pub struct RateLimiter<S = InMemoryStore> {
    store: Arc<S>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter<InMemoryStore> {
    pub fn in_memory(max_requests: u64, window: Duration) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), max_requests, window)
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::in_memory(config.max_requests, Duration::from_secs(config.window_secs))
    }
}

impl<S: RateLimitStore> RateLimiter<S> {
    pub fn with_store(store: Arc<S>, max_requests: u64, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: RateLimitStore + 'static> Middleware for RateLimiter<S> {
    fn handle(&self, request: Request, next: Next<'_>) -> Response {
        let key = client_key(&request);
        let hit = self.store.increment(&key, self.window);
        let limit = self.max_requests.to_string();

        if hit.count > self.max_requests {
            let retry_after = hit.resets_in.as_secs_f64().ceil().max(1.0) as u64;
            tracing::warn!(client = %key, hits = hit.count, retry_after, "Rate limit exceeded");
            metrics::record_rate_limited("window_exhausted");
            return Response::error(StatusCode::TOO_MANY_REQUESTS, "TooManyRequests", "Rate limit exceeded")
                .with_header("retry-after", &retry_after.to_string())
                .with_header("x-ratelimit-limit", &limit)
                .with_header("x-ratelimit-remaining", "0");
        }

        let remaining = (self.max_requests - hit.count).to_string();
        next.run(request)
            .with_header("x-ratelimit-limit", &limit)
            .with_header("x-ratelimit-remaining", &remaining)
    }

    fn name(&self) -> &'static str {
        "rate_limiter"
    }
}

/// Client identity used as the rate-limit key.
pub fn client_key(request: &Request) -> String {
    let forwarded = request
        .header("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or_else(|| request.header("x-real-ip").map(str::trim).filter(|ip| !ip.is_empty()))
        .unwrap_or("anonymous")
        .to_string()
}
