use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

mod memory;
mod redis_backend;

pub use memory::InMemoryCache;
pub use redis_backend::RedisCache;

/// Bumping this invalidates every previously written key globally.
pub const CACHE_VERSION: &str = "v1";

fn versioned_key(key: &str) -> String {
    format!("dc:{}:{}", CACHE_VERSION, key)
}

/// Cache contract every sensor's TTL wrapper is built on.
///
/// Implementations must never surface backend failures to callers: a
/// failed `get` behaves like a miss, a failed `set` is a silent no-op.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Option<String>;
    async fn set_raw(&self, key: &str, value: String, ttl: Duration);
    async fn close(&self);
}

/// Typed convenience helpers layered over the raw string contract.
#[async_trait]
pub trait DistributedCacheExt: DistributedCache {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(&versioned_key(key)).await?;
        serde_json::from_str(&raw).ok()
    }

    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        if let Ok(raw) = serde_json::to_string(value) {
            self.set_raw(&versioned_key(key), raw, ttl).await;
        }
    }
}

impl<C: DistributedCache + ?Sized> DistributedCacheExt for C {}

/// Content-addressed cache key: `(component_version, ticker, qualifiers...)`.
pub fn cache_key(component: &str, component_version: &str, ticker: &str, qualifiers: &[&str]) -> String {
    let mut parts = vec![component, component_version, ticker];
    parts.extend_from_slice(qualifiers);
    parts.join(":")
}

/// An in-process entry used by sensors that keep their own short-lived
/// TTL cache in front of the shared `DistributedCache` (mirrors the
/// orchestrator's per-field `DashMap<String, CacheEntry<T>>` pattern).
pub struct CacheEntry<T> {
    pub data: T,
    pub cached_at: chrono::DateTime<chrono::Utc>,
}

/// A small keyed store of `CacheEntry<T>` with a fixed TTL, for sensors
/// that want a typed local cache rather than round-tripping through
/// JSON on every call.
pub struct TtlStore<T> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl: chrono::Duration,
}

impl<T: Clone> TtlStore<T> {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: chrono::Duration::seconds(ttl_secs),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if chrono::Utc::now() - entry.cached_at < self.ttl {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: String, data: T) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                cached_at: chrono::Utc::now(),
            },
        );
    }
}
