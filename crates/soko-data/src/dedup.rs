//! Request deduplication (single-flight).
//!
//! At most one underlying fetch runs per cache key; callers arriving while
//! a fetch is in flight await the same shared future and observe the
//! identical result or identical error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use soko_cache::CacheKey;

use crate::error::FetchError;

type InFlight<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

/// Registry of in-flight fetches keyed by cache key.
///
/// Entries exist only for the duration of an outstanding fetch; the
/// registration is removed as soon as the shared future settles.
pub struct RequestDeduplicator<V> {
    in_flight: Mutex<HashMap<CacheKey, InFlight<V>>>,
}

impl<V> Default for RequestDeduplicator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RequestDeduplicator<V> {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Number of currently outstanding fetches.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .expect("dedup mutex poisoned")
            .len()
    }
}

impl<V: Clone + Send + Sync + 'static> RequestDeduplicator<V> {
    /// Run `fetch` under `key`, joining an already-running fetch for the
    /// same key instead of starting a second one.
    pub async fn join<Fut>(&self, key: &CacheKey, fetch: Fut) -> Result<V, FetchError>
    where
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let shared = {
            let mut map = self.in_flight.lock().expect("dedup mutex poisoned");
            if let Some(existing) = map.get(key) {
                debug!(key = %key, "joining in-flight request");
                existing.clone()
            } else {
                let shared = fetch.boxed().shared();
                map.insert(key.clone(), shared.clone());
                shared
            }
        };

        let result = shared.clone().await;

        // Settled either way; deregister so the next call starts fresh.
        // Only our own registration though: a peer that resumed earlier
        // may have removed it already, and a newer fetch may occupy the
        // slot by now.
        let mut map = self.in_flight.lock().expect("dedup mutex poisoned");
        if map.get(key).is_some_and(|current| current.ptr_eq(&shared)) {
            map.remove(key);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use futures::task::noop_waker_ref;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let dedup: RequestDeduplicator<String> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicU32::new(0));
        let key = CacheKey::new("listings");

        // The sleep keeps the fetch in flight until all three callers have
        // joined it.
        let fetch = |calls: Arc<AtomicU32>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok("payload".to_string())
        };

        let (a, b, c) = futures::join!(
            dedup.join(&key, fetch(calls.clone())),
            dedup.join(&key, fetch(calls.clone())),
            dedup.join(&key, fetch(calls.clone())),
        );

        assert_eq!(a, Ok("payload".to_string()));
        assert_eq!(b, Ok("payload".to_string()));
        assert_eq!(c, Ok("payload".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_all_awaiters_see_the_same_rejection() {
        let dedup: RequestDeduplicator<String> = RequestDeduplicator::new();
        let key = CacheKey::new("listings");

        let failing = || async {
            tokio::task::yield_now().await;
            Err(FetchError::Timeout("slow upstream".into()))
        };

        let (a, b) = futures::join!(dedup.join(&key, failing()), dedup.join(&key, failing()));

        assert_eq!(a, Err(FetchError::Timeout("slow upstream".into())));
        assert_eq!(a, b);
        assert_eq!(dedup.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sequential_calls_fetch_again() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicU32::new(0));
        let key = CacheKey::new("listings");

        for _ in 0..2 {
            let calls = calls.clone();
            let result = dedup
                .join(&key, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(result, Ok(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_share() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicU32::new(0));

        let fetch = |calls: Arc<AtomicU32>, n: u32| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(n)
        };

        let products = CacheKey::new("products");
        let services = CacheKey::new("services");
        let (a, b) = futures::join!(
            dedup.join(&products, fetch(calls.clone(), 1)),
            dedup.join(&services, fetch(calls.clone(), 2)),
        );

        assert_eq!(a, Ok(1));
        assert_eq!(b, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // Polled by hand to pin down one interleaving: a late awaiter of an
    // already-settled fetch must not deregister a newer fetch that reused
    // the key in the meantime.
    #[tokio::test]
    async fn test_late_awaiter_keeps_newer_registration() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
        let key = CacheKey::new("listings");
        let mut cx = Context::from_waker(noop_waker_ref());

        let (first_tx, first_rx) = tokio::sync::oneshot::channel::<()>();
        let mut first = dedup
            .join(&key, async move {
                first_rx.await.ok();
                Ok(1)
            })
            .boxed_local();
        let mut late = dedup.join(&key, async { Ok(99) }).boxed_local();

        assert!(first.poll_unpin(&mut cx).is_pending());
        assert!(late.poll_unpin(&mut cx).is_pending());
        assert_eq!(dedup.in_flight(), 1);

        // Settle the first fetch and let one awaiter resume and clean up.
        first_tx.send(()).unwrap();
        assert_eq!(first.poll_unpin(&mut cx), Poll::Ready(Ok(1)));
        assert_eq!(dedup.in_flight(), 0);

        // A fresh fetch registers under the same key before the late
        // awaiter resumes.
        let (_second_tx, second_rx) = tokio::sync::oneshot::channel::<()>();
        let mut second = dedup
            .join(&key, async move {
                second_rx.await.ok();
                Ok(2)
            })
            .boxed_local();
        assert!(second.poll_unpin(&mut cx).is_pending());
        assert_eq!(dedup.in_flight(), 1);

        // The late awaiter observes the old result; the new fetch stays
        // registered, so the next caller joins it instead of starting a
        // third one.
        assert_eq!(late.poll_unpin(&mut cx), Poll::Ready(Ok(1)));
        assert_eq!(dedup.in_flight(), 1);
    }
}
