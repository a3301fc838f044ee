use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Admission control keyed by an arbitrary string such as `match:<user>`.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record a hit for `key` and report whether it is allowed.
    async fn check(&self, key: &str) -> anyhow::Result<bool>;
}

/// In-process sliding-window limiter.
///
/// Each key keeps the instants of its admitted hits inside the window. Rejected
/// hits are not recorded, so a client that backs off regains capacity as soon as
/// old hits age out. Idle keys are swept from `check` at most once per window.
pub struct SlidingWindowLimiter {
    prefix: String,
    max_requests: usize,
    window: Duration,
    enabled: bool,
    hits: Mutex<Windows>,
}

struct Windows {
    by_key: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl Windows {
    fn new(now: Instant) -> Self {
        Self {
            by_key: HashMap::new(),
            last_sweep: now,
        }
    }

    /// Drop keys whose newest hit is outside `window`.
    fn sweep(&mut self, window: Duration, now: Instant) {
        self.by_key.retain(|_, hits| {
            hits.back()
                .is_some_and(|&last| now.duration_since(last) < window)
        });
        self.last_sweep = now;
    }
}

impl SlidingWindowLimiter {
    pub fn new(prefix: &str, max_requests: u32, window: Duration, enabled: bool) -> Self {
        Self {
            prefix: prefix.to_string(),
            max_requests: max_requests as usize,
            window,
            enabled,
            hits: Mutex::new(Windows::new(Instant::now())),
        }
    }

    /// General API traffic: match previews, interviews, intro requests.
    pub fn api(max_requests: u32, window: Duration, enabled: bool) -> Self {
        Self::new("ff:api", max_requests, window, enabled)
    }

    /// Account-level actions such as role changes.
    pub fn auth(max_requests: u32, window: Duration, enabled: bool) -> Self {
        Self::new("ff:auth", max_requests, window, enabled)
    }

    fn check_at(&self, windows: &mut Windows, key: &str, now: Instant) -> bool {
        if now.duration_since(windows.last_sweep) >= self.window {
            windows.sweep(self.window, now);
        }
        let full_key = format!("{}:{key}", self.prefix);
        let window = windows.by_key.entry(full_key).or_default();
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() >= self.max_requests {
            debug!(prefix = %self.prefix, key, "Rate limit exceeded");
            return false;
        }
        window.push_back(now);
        true
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn check(&self, key: &str) -> anyhow::Result<bool> {
        if !self.enabled {
            return Ok(true);
        }
        let mut hits = self.hits.lock().await;
        Ok(self.check_at(&mut hits, key, Instant::now()))
    }
}
