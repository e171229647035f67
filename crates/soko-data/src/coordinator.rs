//! Cached fetch coordination: cache check, single-flight, retry, store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use soko_cache::{AdvancedCache, CacheKey, CacheStats};

use crate::dedup::RequestDeduplicator;
use crate::error::FetchError;
use crate::retry::{run_with_retry, RetryPolicy};

/// Composes the cache, the request deduplicator, and the retry policy into
/// one fetch path.
///
/// For any key: repeated calls within a cache-valid window hit the cache
/// and perform zero fetches; overlapping calls share a single in-flight
/// fetch; failures propagate to every awaiter and cache nothing.
pub struct FetchCoordinator<V> {
    cache: Arc<AdvancedCache<V>>,
    dedup: RequestDeduplicator<V>,
    retry: RetryPolicy,
}

impl<V: Clone + Send + Sync + 'static> FetchCoordinator<V> {
    pub fn new(cache: AdvancedCache<V>, retry: RetryPolicy) -> Self {
        Self {
            cache: Arc::new(cache),
            dedup: RequestDeduplicator::new(),
            retry,
        }
    }

    /// Return the cached value for `key`, or run `fetcher` (deduplicated,
    /// retried) and cache its result under `ttl`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        fetcher: F,
    ) -> Result<V, FetchError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(hit);
        }

        let cache = Arc::clone(&self.cache);
        let retry = self.retry.clone();
        let store_key = key.clone();
        let fetch = async move {
            let value = run_with_retry(&retry, fetcher).await?;
            cache.set(store_key, value.clone(), ttl);
            Ok(value)
        };

        self.dedup.join(&key, fetch).await
    }

    /// Drop every cached entry. Mutations invalidate coarsely rather than
    /// patching individual entries.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Cache counters for debugging.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of fetches currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.dedup.in_flight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn coordinator() -> FetchCoordinator<u32> {
        FetchCoordinator::new(
            AdvancedCache::new(10, Duration::from_secs(300)),
            RetryPolicy::none(),
        )
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let coord = coordinator();
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value = coord
                .get_or_fetch(CacheKey::new("listings"), None, move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(42)
                    }
                })
                .await;
            assert_eq!(value, Ok(42));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coord.cache_stats().hits, 2);
    }

    #[tokio::test]
    async fn test_failure_caches_nothing() {
        let coord = coordinator();
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let result = coord
                .get_or_fetch(CacheKey::new("listings"), None, move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<u32, _>(FetchError::Connection("down".into()))
                    }
                })
                .await;
            assert!(result.is_err());
        }

        // Both calls hit the network; the rejection was never stored.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(coord.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_fetch_and_fill_cache() {
        let coord = Arc::new(coordinator());
        let calls = Arc::new(AtomicU32::new(0));

        let run = |coord: Arc<FetchCoordinator<u32>>, calls: Arc<AtomicU32>| async move {
            coord
                .get_or_fetch(CacheKey::new("listings"), None, move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(7)
                    }
                })
                .await
        };

        let (a, b) = futures::join!(
            run(coord.clone(), calls.clone()),
            run(coord.clone(), calls.clone())
        );

        assert_eq!(a, Ok(7));
        assert_eq!(b, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coord.cache_stats().entries, 1);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_refetch() {
        async fn fetch_once(
            coord: &FetchCoordinator<u32>,
            calls: Arc<AtomicU32>,
        ) -> Result<u32, FetchError> {
            coord
                .get_or_fetch(CacheKey::new("listings"), None, move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(1)
                    }
                })
                .await
        }

        let coord = coordinator();
        let calls = Arc::new(AtomicU32::new(0));

        fetch_once(&coord, calls.clone()).await.unwrap();
        coord.invalidate_all();
        fetch_once(&coord, calls.clone()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
