use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_MAX_REQUESTS: usize = 60;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter: at most `max_requests` per `window`,
/// gating request admission before any sensor work runs. The contract a
/// per-client-IP HTTP front end would enforce; this core exposes it as a
/// reusable primitive rather than wiring it to a listener.
#[derive(Clone)]
pub struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    /// True if a request is admitted immediately without waiting.
    pub async fn try_acquire(&self) -> bool {
        let mut ts = self.timestamps.lock().await;
        let now = Instant::now();
        while let Some(&front) = ts.front() {
            if now.duration_since(front) >= self.window {
                ts.pop_front();
            } else {
                break;
            }
        }
        if ts.len() < self.max_requests {
            ts.push_back(now);
            true
        } else {
            false
        }
    }
}
