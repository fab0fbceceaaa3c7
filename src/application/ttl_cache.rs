// TTL cache - Read-through cache over a persistent key/value area
use crate::domain::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Persistent string key/value area holding encoded cache entries.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn write(&self, key: &str, value: String) -> Result<(), CacheError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    key: String,
    value: T,
    stored_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TtlCache {
    storage: Arc<dyn CacheStorage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(storage: Arc<dyn CacheStorage>, ttl: Duration) -> Self {
        Self::with_clock(storage, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn CacheStorage>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            ttl,
        }
    }

    /// Return the cached value for `key` if it is younger than the TTL,
    /// otherwise call `fetch`, store its result and return it.
    ///
    /// Fetch errors are returned as-is and nothing is cached. Unreadable or
    /// corrupt entries count as misses.
    pub async fn get<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(value) = self.read_fresh(key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(value);
        }

        tracing::debug!("Cache miss for {}", key);
        let value = fetch().await?;
        self.store(key, &value).await;
        Ok(value)
    }

    async fn read_fresh<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read for {} failed: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Discarding corrupt cache entry {}: {}", key, e);
                return None;
            }
        };

        // A timestamp in the future (clock moved back) is stale too.
        let fresh = entry.key == key
            && (self.clock.now() - entry.stored_at)
                .to_std()
                .is_ok_and(|age| age < self.ttl);
        fresh.then_some(entry.value)
    }

    async fn store<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            stored_at: self.clock.now(),
        };

        let result = match serde_json::to_string(&entry) {
            Ok(encoded) => self.storage.write(key, encoded).await,
            Err(e) => Err(CacheError::from(e)),
        };
        if let Err(e) = result {
            tracing::warn!("Cache write for {} failed: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache_storage::MemoryCacheStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::from_std(by).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct BrokenStorage;

    #[async_trait]
    impl CacheStorage for BrokenStorage {
        async fn read(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }

        async fn write(&self, _key: &str, _value: String) -> Result<(), CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    fn setup() -> (Arc<MemoryCacheStorage>, Arc<ManualClock>, TtlCache) {
        let storage = Arc::new(MemoryCacheStorage::new());
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let cache = TtlCache::with_clock(storage.clone(), DEFAULT_TTL, clock.clone());
        (storage, clock, cache)
    }

    async fn counted_get(cache: &TtlCache, calls: &AtomicUsize, key: &str) -> anyhow::Result<u32> {
        cache
            .get(key, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) as u32;
                Ok(n + 1)
            })
            .await
    }

    #[tokio::test]
    async fn test_two_gets_within_ttl_fetch_once() {
        let (_, clock, cache) = setup();
        let calls = AtomicUsize::new(0);

        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 1);
        clock.advance(Duration::from_secs(2 * 60 * 60));
        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched_and_replaced() {
        let (_, clock, cache) = setup();
        let calls = AtomicUsize::new(0);

        counted_get(&cache, &calls, "k").await.unwrap();
        clock.advance(DEFAULT_TTL);
        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 2);

        clock.advance(Duration::from_secs(60));
        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let (_, _, cache) = setup();
        let calls = AtomicUsize::new(0);

        let failed: anyhow::Result<u32> = cache
            .get("k", || async { Err(anyhow::anyhow!("upstream down")) })
            .await;
        assert!(failed.is_err());

        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let (storage, _, cache) = setup();
        let calls = AtomicUsize::new(0);
        storage.write("k", "{not json".to_string()).await.unwrap();

        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entry_for_other_key_is_a_miss() {
        let (storage, clock, cache) = setup();
        let calls = AtomicUsize::new(0);
        let foreign = serde_json::json!({ "key": "other", "value": 99, "stored_at": clock.now() });
        storage.write("k", foreign.to_string()).await.unwrap();

        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_broken_storage_still_serves_fetched_value() {
        let cache = TtlCache::new(Arc::new(BrokenStorage), DEFAULT_TTL);
        let calls = AtomicUsize::new(0);

        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 1);
        assert_eq!(counted_get(&cache, &calls, "k").await.unwrap(), 2);
    }
}
