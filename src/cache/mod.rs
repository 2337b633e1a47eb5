//! Cache layer
//!
//! Read-mostly data (assembled articles) is cached as JSON behind the
//! `CacheLayer` trait. The in-process moka cache is the default; Redis is
//! available behind the `redis-cache` feature for multi-instance setups.

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Prefix shared by every cached article
pub const ARTICLE_PREFIX: &str = "article:";

/// Cache key of the article with `slug`
pub fn article_key(slug: &str) -> String {
    format!("{}{}", ARTICLE_PREFIX, slug)
}

/// Pattern matching every cached article
pub fn all_articles_pattern() -> String {
    format!("{}*", ARTICLE_PREFIX)
}

/// Cache operations.
///
/// The methods are generic over the value type, so the trait is not object
/// safe; `Cache` provides the runtime choice of backend.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;
}

/// Configured cache backend
#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

impl Cache {
    /// Lifetime applied to entries written by the services
    pub fn default_ttl(&self) -> Duration {
        match self {
            Cache::Memory(cache) => cache.default_ttl(),
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.default_ttl(),
        }
    }
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete(key).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete_pattern(pattern).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete_pattern(pattern).await,
        }
    }
}

/// Build the cache selected by `config.driver`
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    let ttl = Duration::from_secs(config.ttl_seconds);

    match config.driver {
        CacheDriver::Memory => {
            tracing::info!("Using in-memory cache (ttl {}s)", config.ttl_seconds);
            Ok(Arc::new(Cache::Memory(MemoryCache::with_capacity_and_ttl(
                10_000, ttl,
            ))))
        }
        CacheDriver::Redis => {
            #[cfg(feature = "redis-cache")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using the redis cache driver. \
                         Set 'cache.redis_url' or HEAVEN_CACHE_REDIS_URL."
                    )
                })?;
                tracing::info!("Using Redis cache at {}", redis_url);
                let cache = RedisCache::with_ttl(redis_url, ttl).await?;
                Ok(Arc::new(Cache::Redis(cache)))
            }

            #[cfg(not(feature = "redis-cache"))]
            {
                anyhow::bail!(
                    "The redis cache driver needs the 'redis-cache' feature. \
                     Build with `--features redis-cache` or use the memory driver."
                )
            }
        }
    }
}
