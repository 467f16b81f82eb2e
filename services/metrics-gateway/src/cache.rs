//! Side cache for raw device reports keyed by device and timestamp.
//!
//! Writes are best effort: the gateway logs a failed write and moves on, and a
//! disabled or unreachable cache only degrades `/health`.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable")] Unavailable,
    #[error("encode error: {0}")] Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait SampleCache: Send + Sync {
    async fn put(&self, key: String, payload: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
}

pub fn cache_key(device_id: &str, timestamp: i64) -> String { format!("metric:{device_id}:{timestamp}") }

struct Entry { expires_at: Instant, payload: Vec<u8> }

/// In-process LRU with per-entry expiry.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(max_entries: NonZeroUsize) -> Self { Self { entries: Mutex::new(LruCache::new(max_entries)) } }
    pub fn len(&self) -> usize { self.entries.lock().len() }
    pub fn is_empty(&self) -> bool { self.entries.lock().is_empty() }
}

#[async_trait]
impl SampleCache for MemoryCache {
    async fn put(&self, key: String, payload: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.lock().put(key, Entry { expires_at: Instant::now() + ttl, payload });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => return Ok(Some(e.payload.clone())),
            Some(_) => true,
            None => false,
        };
        if expired { entries.pop(key); }
        Ok(None)
    }

    async fn ping(&self) -> Result<(), CacheError> { Ok(()) }
}

/// Stand-in used when caching is switched off; every call reports `Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

#[async_trait]
impl SampleCache for DisabledCache {
    async fn put(&self, _key: String, _payload: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> { Err(CacheError::Unavailable) }
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> { Err(CacheError::Unavailable) }
    async fn ping(&self) -> Result<(), CacheError> { Err(CacheError::Unavailable) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(n: usize) -> MemoryCache { MemoryCache::new(NonZeroUsize::new(n).unwrap()) }

    #[test]
    fn key_format() {
        assert_eq!(cache_key("d1", 1_700_000_000), "metric:d1:1700000000");
    }

    #[tokio::test]
    async fn stores_until_expiry() {
        let c = cache(4);
        c.put(cache_key("d1", 1), b"a".to_vec(), Duration::from_secs(600)).await.unwrap();
        c.put(cache_key("d1", 2), b"b".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(c.get("metric:d1:1").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(c.get("metric:d1:2").await.unwrap(), None);
        assert_eq!(c.len(), 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let c = cache(2);
        for ts in 0..3 { c.put(cache_key("d", ts), vec![ts as u8], Duration::from_secs(60)).await.unwrap(); }
        assert_eq!(c.get("metric:d:0").await.unwrap(), None);
        assert_eq!(c.get("metric:d:2").await.unwrap(), Some(vec![2]));
    }

    #[tokio::test]
    async fn disabled_cache_is_unavailable() {
        assert!(matches!(DisabledCache.ping().await, Err(CacheError::Unavailable)));
        assert!(DisabledCache.put("k".into(), vec![], Duration::ZERO).await.is_err());
    }
}
