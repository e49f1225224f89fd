use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::DistributedCache;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory fallback backend, used when no Redis URL is configured and
/// as the default in tests. Never fails.
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedCache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if Instant::now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            drop(entry);
            self.entries.remove(key);
            None
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn close(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_within_ttl() {
        let cache = InMemoryCache::new();
        cache.set_raw("k", "v".to_string(), Duration::from_secs(60)).await;
        assert_eq!(cache.get_raw("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let cache = InMemoryCache::new();
        cache.set_raw("k", "v".to_string(), Duration::from_millis(0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get_raw("k").await, None);
    }
}
