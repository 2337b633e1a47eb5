//! Login throttling
//!
//! Failed logins are counted per email address and login requests per client
//! IP, each over a sliding window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Failed attempts allowed per email within `EMAIL_WINDOW`
pub const MAX_FAILED_LOGINS: usize = 5;
const EMAIL_WINDOW_MINUTES: i64 = 15;

/// Login requests allowed per IP within one minute
pub const MAX_IP_REQUESTS: usize = 20;
const IP_WINDOW_MINUTES: i64 = 1;

/// Timestamps of recent events per key
struct SlidingWindow<K> {
    limit: usize,
    window: Duration,
    events: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            events: RwLock::new(HashMap::new()),
        }
    }

    async fn is_limited(&self, key: &K, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.window;
        let events = self.events.read().await;
        events
            .get(key)
            .map(|times| times.iter().filter(|t| **t > cutoff).count() >= self.limit)
            .unwrap_or(false)
    }

    async fn record(&self, key: K, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        let mut events = self.events.write().await;
        let times = events.entry(key).or_default();
        times.retain(|t| *t > cutoff);
        times.push(now);
    }

    async fn clear(&self, key: &K) {
        self.events.write().await.remove(key);
    }

    async fn prune(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let mut events = self.events.write().await;
        events.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
        events.len()
    }
}

pub struct LoginRateLimiter {
    failed_by_email: SlidingWindow<String>,
    requests_by_ip: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::with_limits(MAX_FAILED_LOGINS, MAX_IP_REQUESTS)
    }

    pub fn with_limits(max_failed_logins: usize, max_ip_requests: usize) -> Self {
        Self {
            failed_by_email: SlidingWindow::new(
                max_failed_logins,
                Duration::minutes(EMAIL_WINDOW_MINUTES),
            ),
            requests_by_ip: SlidingWindow::new(max_ip_requests, Duration::minutes(IP_WINDOW_MINUTES)),
        }
    }

    /// Whether a login for `email` from `ip` must be refused right now.
    ///
    /// Counts the request against the IP either way.
    pub async fn check(&self, email: &str, ip: Option<IpAddr>) -> bool {
        let now = Utc::now();
        if let Some(ip) = ip {
            if self.requests_by_ip.is_limited(&ip, now).await {
                tracing::warn!("Login requests from {} throttled", ip);
                return true;
            }
            self.requests_by_ip.record(ip, now).await;
        }
        self.failed_by_email.is_limited(&normalize(email), now).await
    }

    pub async fn record_failure(&self, email: &str) {
        self.failed_by_email.record(normalize(email), Utc::now()).await;
    }

    /// Forget failures after a successful login
    pub async fn record_success(&self, email: &str) {
        self.failed_by_email.clear(&normalize(email)).await;
    }

    /// Drop expired entries; returns the number of keys still tracked
    pub async fn cleanup(&self) -> usize {
        let now = Utc::now();
        self.failed_by_email.prune(now).await + self.requests_by_ip.prune(now).await
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
