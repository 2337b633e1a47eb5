//! In-process cache backed by moka
//!
//! Entries are stored as JSON strings and each one carries its own
//! time-to-live, enforced through moka's `Expiry` policy.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_MAX_CAPACITY: u64 = 10_000;
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
struct CacheEntry {
    json: Arc<String>,
    ttl: Duration,
}

/// Expire each entry after the ttl it was written with
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Glob match supporting `*` (any run) and `?` (one char)
pub(crate) fn glob_matches(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ki));
            pi += 1;
        } else if let Some((sp, sk)) = star {
            // backtrack: let the last star swallow one more char
            pi = sp + 1;
            ki = sk + 1;
            star = Some((sp, sk + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => {
                let value = serde_json::from_str(&entry.json)
                    .context("Failed to deserialize cache value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        self.cache
            .insert(
                key.to_string(),
                CacheEntry {
                    json: Arc::new(json),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| glob_matches(pattern, key.as_str()))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in keys {
            self.cache.invalidate(&key).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
    struct Snapshot {
        slug: String,
        likes: i64,
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        let snap = Snapshot {
            slug: "a".to_string(),
            likes: 2,
        };
        cache.set("article:a", &snap, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get::<Snapshot>("article:a").await.unwrap(), Some(snap));

        cache.delete("article:a").await.unwrap();
        assert_eq!(cache.get::<Snapshot>("article:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_type_is_error() {
        let cache = MemoryCache::new();
        cache.set("n", &"text", Duration::from_secs(60)).await.unwrap();
        assert!(cache.get::<i64>("n").await.is_err());
    }

    #[tokio::test]
    async fn test_per_entry_ttl() {
        let cache = MemoryCache::new();
        cache.set("short", &1, Duration::from_millis(20)).await.unwrap();
        cache.set("long", &2, Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.cache.run_pending_tasks().await;

        assert_eq!(cache.get::<i32>("short").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("long").await.unwrap(), Some(2));
    }

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("article:*", "article:hello"));
        assert!(glob_matches("article:*", "article:"));
        assert!(!glob_matches("article:*", "tags"));
        assert!(glob_matches("a?c", "abc"));
        assert!(!glob_matches("a?c", "ac"));
        assert!(glob_matches("*:b*", "x:y:bz"));
        assert!(glob_matches("*", ""));
        assert!(!glob_matches("", "a"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(50))]

            #[test]
            fn prefix_star_matches_every_suffix(prefix in "[a-z:]{0,8}", rest in "[a-z0-9-]{0,12}") {
                let pattern = format!("{}*", prefix);
                let key = format!("{}{}", prefix, rest);
                prop_assert!(glob_matches(&pattern, &key));
            }

            #[test]
            fn literal_pattern_matches_only_itself(a in "[a-z]{1,10}", b in "[a-z]{1,10}") {
                prop_assert_eq!(glob_matches(&a, &b), a == b);
            }

            #[test]
            fn delete_pattern_spares_other_keys(
                slugs in proptest::collection::hash_set("[a-z0-9-]{1,12}", 1..8),
                others in proptest::collection::hash_set("[a-z]{1,8}", 1..8),
            ) {
                tokio_test::block_on(async {
                    let cache = MemoryCache::new();
                    let ttl = Duration::from_secs(60);
                    for slug in &slugs {
                        cache.set(&crate::cache::article_key(slug), &1, ttl).await.unwrap();
                    }
                    for key in &others {
                        cache.set(&format!("tag:{}", key), &2, ttl).await.unwrap();
                    }

                    cache.delete_pattern(&crate::cache::all_articles_pattern()).await.unwrap();

                    for slug in &slugs {
                        let key = crate::cache::article_key(slug);
                        assert_eq!(cache.get::<i32>(&key).await.unwrap(), None);
                    }
                    for key in &others {
                        let key = format!("tag:{}", key);
                        assert_eq!(cache.get::<i32>(&key).await.unwrap(), Some(2));
                    }
                });
            }
        }
    }
}
