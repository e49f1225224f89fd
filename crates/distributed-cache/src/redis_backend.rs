use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::DistributedCache;

/// Redis-backed cache. Every operation swallows connection/IO errors and
/// logs at warn level rather than propagating, matching the contract
/// that callers must never see a cache failure.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }
}

#[async_trait]
impl DistributedCache for RedisCache {
    async fn get_raw(&self, key: &str) -> Option<String> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "redis connection failed on GET, treating as miss");
                return None;
            }
        };
        match conn.get::<_, Option<String>>(key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, %key, "redis GET failed");
                None
            }
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "redis connection failed on SET, dropping write");
                return;
            }
        };
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
        {
            tracing::warn!(error = %e, %key, "redis SET failed");
        }
    }

    async fn close(&self) {}
}
