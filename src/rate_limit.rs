//! Per-client sliding window rate limiting.
//!
//! For every client the limiter keeps the timestamps of its accepted requests that are still
//! inside the window. A request is rejected when the window already holds
//! [`RateLimitConfig::max_requests`] timestamps, and rejected requests are not recorded.
//!
//! Clients are keyed by the raw peer IP address string. Clients that have been idle for a whole
//! window are dropped every [`RateLimitConfig::gc_interval`], so the map does not keep growing
//! with every address ever seen.
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::NobelError;

/// Configuration of a [`RateLimiter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// maximum number of requests accepted per client within `window`
    pub max_requests: usize,
    /// length of the sliding window
    pub window: Duration,
    /// how often idle clients are dropped
    pub gc_interval: Duration,
}

impl RateLimitConfig {
    /// `max_requests` per `window`, with the default gc interval
    pub fn new(max_requests: usize, window: Duration) -> Self {
        RateLimitConfig {
            max_requests,
            window,
            ..RateLimitConfig::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_requests: 5,
            window: Duration::from_secs(1),
            gc_interval: Duration::from_secs(60),
        }
    }
}

/// Sliding window rate limiter, shared by all requests
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: DashMap<String, VecDeque<Instant>>,
    last_gc: Mutex<Instant>,
}

impl RateLimiter {
    /// creates a limiter with no tracked clients
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            clients: DashMap::new(),
            last_gc: Mutex::new(Instant::now()),
        }
    }

    /// the limiter's configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// records a request from `client` made now. Returns `false` if the request must be rejected
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    /// records a request from `client` made at `now`. Returns `false` if the request must be
    /// rejected
    pub fn check_at(&self, client: &str, now: Instant) -> bool {
        self.maybe_gc(now);

        let mut timestamps = self.clients.entry(client.to_string()).or_default();

        // Remove timestamps outside the current window
        while let Some(front) = timestamps.front() {
            if now.saturating_duration_since(*front) > self.config.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.config.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// drops every client whose latest request is older than the window. Returns the number of
    /// clients dropped
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.clients.len();
        let window = self.config.window;
        self.clients.retain(|_, timestamps| {
            timestamps
                .back()
                .map_or(false, |last| now.saturating_duration_since(*last) <= window)
        });
        let evicted = before.saturating_sub(self.clients.len());
        if evicted > 0 {
            debug!(evicted, "dropped idle rate limit entries");
        }
        evicted
    }

    /// number of clients currently tracked
    pub fn tracked(&self) -> usize {
        self.clients.len()
    }

    fn maybe_gc(&self, now: Instant) {
        let mut last_gc = self.last_gc.lock().unwrap_or_else(|e| e.into_inner());
        if now.saturating_duration_since(*last_gc) >= self.config.gc_interval {
            *last_gc = now;
            drop(last_gc);
            self.evict_idle(now);
        }
    }
}

/// axum middleware rejecting requests with `429 Too Many Requests` once the peer address is over
/// its quota
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let client = peer.ip().to_string();
    if !limiter.check(&client) {
        warn!("rate limit exceeded for {}", client);
        return NobelError::RateLimited.into_response();
    }
    next.run(request).await
}
