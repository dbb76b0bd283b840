use crate::models::Coordinate;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and L2 (Redis) caching strategy.
/// L1 is fastest but limited in size, L2 is shared across instances.
/// Without a Redis URL only L1 is used.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a new cache manager
    pub async fn new(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let conn = redis::aio::ConnectionManager::new(client).await?;
                Some(Arc::new(tokio::sync::Mutex::new(conn)))
            }
            None => None,
        };

        Ok(Self::build(redis, l1_size, ttl_secs))
    }

    /// In-process cache only
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self::build(None, l1_size, ttl_secs)
    }

    fn build(
        redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
        l1_size: u64,
        ttl_secs: u64,
    ) -> Self {
        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            redis,
            l1_cache,
            ttl_secs,
        }
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);

                // Populate L1 cache
                let bytes = json.as_bytes().to_vec();
                self.l1_cache.insert(key.to_string(), bytes).await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        let bytes = json.as_bytes().to_vec();
        self.l1_cache.insert(key.to_string(), bytes).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Invalidate all cache entries matching a pattern
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        // L1 has no pattern lookup, so it is cleared entirely
        self.l1_cache.invalidate_all();

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let keys: Vec<String> = redis::cmd("KEYS")
                .arg(pattern)
                .query_async(&mut *conn)
                .await?;

            if !keys.is_empty() {
                redis::cmd("DEL")
                    .arg(keys)
                    .query_async::<()>(&mut *conn)
                    .await?;
            }
        }

        tracing::debug!("Invalidated cache pattern: {}", pattern);
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.redis.is_some(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Prefix shared by every near-point key
    pub const EVENTS_NEAR_PATTERN: &'static str = "events:near:*";

    /// Prefix shared by every per-profile recommendation key
    pub const RECOMMENDED_PATTERN: &'static str = "recommended:*";

    /// Keys holding event rows; stale once any event changes
    pub const EVENT_PATTERNS: [&'static str; 2] =
        [Self::EVENTS_NEAR_PATTERN, Self::RECOMMENDED_PATTERN];

    /// Near-point fetch; coordinates rounded to 3 decimals (~100 m)
    pub fn events_near(origin: &Coordinate, radius_km: f64) -> String {
        format!(
            "events:near:{:.3}:{:.3}:{:.1}",
            origin.latitude, origin.longitude, radius_km
        )
    }

    /// Profile tags used for recommendations
    pub fn profile_tags(profile_id: &str) -> String {
        format!("profile_tags:{}", profile_id)
    }

    /// Recommended events for a profile
    pub fn recommended(profile_id: &str) -> String {
        format!("recommended:{}", profile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get_redis() {
        let cache = CacheManager::new(Some("redis://127.0.0.1:6379"), 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);

        cache.delete(key).await.unwrap();
        assert!(cache.get::<String>(key).await.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_set_get_delete() {
        let cache = CacheManager::in_memory(100, 60);
        assert!(!cache.has_redis());

        cache.set("k", &vec![1u32, 2, 3]).await.unwrap();
        let result: Vec<u32> = cache.get("k").await.unwrap();
        assert_eq!(result, vec![1, 2, 3]);

        cache.delete("k").await.unwrap();
        assert!(matches!(cache.get::<Vec<u32>>("k").await, Err(CacheError::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_invalidate_pattern_clears_l1() {
        let cache = CacheManager::in_memory(100, 60);
        cache.set("events:near:1", &1u8).await.unwrap();
        cache.invalidate_pattern(CacheKey::EVENTS_NEAR_PATTERN).await.unwrap();
        assert!(cache.get::<u8>("events:near:1").await.is_err());
    }

    fn matches_pattern(key: &str, pattern: &str) -> bool {
        key.starts_with(pattern.trim_end_matches('*'))
    }

    #[tokio::test]
    async fn test_event_patterns_cover_event_keys() {
        let origin = Coordinate::new(53.8008, -1.5491);
        let near = CacheKey::events_near(&origin, 500.0);
        let recommended = CacheKey::recommended("user123");

        for key in [&near, &recommended] {
            assert!(
                CacheKey::EVENT_PATTERNS.iter().any(|p| matches_pattern(key, p)),
                "{} not covered",
                key
            );
        }
        assert!(!CacheKey::EVENT_PATTERNS
            .iter()
            .any(|p| matches_pattern(&CacheKey::profile_tags("user123"), p)));

        let cache = CacheManager::in_memory(100, 60);
        cache.set(&near, &1u8).await.unwrap();
        cache.set(&recommended, &2u8).await.unwrap();
        for pattern in CacheKey::EVENT_PATTERNS {
            cache.invalidate_pattern(pattern).await.unwrap();
        }
        assert!(cache.get::<u8>(&near).await.is_err());
        assert!(cache.get::<u8>(&recommended).await.is_err());
    }

    #[test]
    fn test_cache_key_builder() {
        let origin = Coordinate::new(53.80081, -1.54912);
        assert_eq!(CacheKey::events_near(&origin, 500.0), "events:near:53.801:-1.549:500.0");
        assert_eq!(CacheKey::profile_tags("user123"), "profile_tags:user123");
        assert_eq!(CacheKey::recommended("user123"), "recommended:user123");
    }
}
