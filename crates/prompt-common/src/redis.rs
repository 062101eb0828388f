/// Redis cache wrapper with graceful degradation.
///
/// Reads return `Option<T>` and writes return `bool`. On any Redis error the operation logs
/// a warning and reports a miss, so callers fall through to the vector store. Prompt
/// search works the same with or without Redis, only slower.
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::warn;

const SCAN_BATCH: usize = 100;

pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Build a cache for the given URL. A `None` URL or an unparsable one yields a
    /// disabled cache whose reads always miss and whose writes always report `false`.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, cache disabled"))
                .ok()
        });
        Self { client }
    }

    /// A cache that never talks to Redis.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Send a PING. Returns `true` if Redis is reachable.
    pub async fn is_available(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    /// Returns `None` if Redis is unavailable or the key doesn't exist.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()
            .flatten()
    }

    /// Store a value that expires after `ttl_secs`.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    /// Delete every key under `prefix`, walking the keyspace with SCAN so large
    /// namespaces never block the server.
    pub async fn delete_by_prefix(&self, prefix: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        loop {
            let scanned: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;
            let (next_cursor, keys) = match scanned {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, pattern, "redis DEL failed during prefix delete");
                    return false;
                }
            }

            if next_cursor == 0 {
                return true;
            }
            cursor = next_cursor;
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_misses_everything() {
        let cache = RedisCache::disabled();
        assert!(!cache.is_enabled());
        assert!(!cache.is_available().await);
        assert_eq!(cache.get("prompts:v1:anything").await, None);
        assert!(!cache.set_with_ttl("prompts:v1:anything", "x", 10).await);
        assert!(!cache.delete_by_prefix("prompts:v1:").await);
    }

    #[test]
    fn test_missing_url_disables_cache() {
        assert!(!RedisCache::new(None).is_enabled());
        assert!(!RedisCache::new(Some("not a url")).is_enabled());
        assert!(RedisCache::new(Some("redis://127.0.0.1:6379")).is_enabled());
    }
}
