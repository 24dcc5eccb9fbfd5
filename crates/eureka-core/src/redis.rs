/// Redis-backed key/value store with graceful degradation.
///
/// All operations return `Option<T>`/`bool`. On any Redis error the operation logs a warning
/// and reports a miss, so callers behave as if the key was never written. The recommender
/// is fully functional without Redis; it only loses persistence across restarts.
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::warn;

use crate::error::CommonError;
use crate::store::KeyValueStore;

#[derive(Clone)]
pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Build a client for `url`. If the URL is `None` or invalid, the cache degrades to no-ops.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, store disabled"))
                .ok()
        });
        Self { client }
    }

    /// Send a PING and report whether Redis answered.
    pub async fn probe(&self) -> Result<(), CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisUnavailable)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }
}

#[async_trait]
impl KeyValueStore for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()
            .flatten()
    }

    async fn set(&self, key: &str, value: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.set::<_, _, ()>(key, value)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SET failed"))
            .is_ok()
    }

    async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.del::<_, ()>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis DEL failed"))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_url_degrades_to_misses() {
        let cache = RedisCache::new(None);
        assert!(matches!(cache.probe().await, Err(CommonError::RedisUnavailable)));
        assert!(!cache.set("eureka-theme", "\"light\"").await);
        assert_eq!(cache.get("eureka-theme").await, None);
        assert!(!cache.delete("eureka-theme").await);
    }

    #[test]
    fn invalid_url_disables_client() {
        let cache = RedisCache::new(Some("not a redis url"));
        assert!(cache.client.is_none());
    }
}
