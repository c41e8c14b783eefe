// src/cache.rs
//! Per-source TTL cache with request coalescing and stale-serve fallback.
//!
//! Keys are `(domain, location bucket, category-set hash)` strings. The
//! store itself is generic over the cached value so unit tests can exercise
//! it without dragging in domain entities.
//!
//! Concurrency model: a `std::sync::RwLock` store with short critical
//! sections (never held across await), plus a per-key `tokio::sync::Mutex`
//! registry. The first caller to miss takes the key mutex and fetches;
//! everyone else queues on the same mutex and re-checks the store once it is
//! their turn, so a cold key costs exactly one upstream call.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::FeedError;
use crate::geo;
use crate::types::{ContentDomain, Location};

/// A cache read result. `stale` marks a value served past its TTL because
/// the upstream refresh failed.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub stale: bool,
}

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

pub struct FeedCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<V> Default for FeedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FeedCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every entry whose key starts with `prefix` (e.g. all buckets of
    /// a domain, or one `domain/bucket` on location change). Returns the
    /// number of evicted entries.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(target: "feed_cache", prefix, evicted, "cache invalidated");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> FeedCache<V> {
    /// Insert a value directly. Used by tests to seed aged entries.
    pub fn insert(&self, key: &str, value: V) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    fn lookup_fresh(&self, key: &str, max_age: Duration) -> Option<V> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < max_age)
            .map(|e| e.value.clone())
    }

    fn lookup_any(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(key).map(|e| e.value.clone())
    }

    /// Return a fresh cached value, or run `fetch` and cache its result.
    ///
    /// At most one fetch per key is in flight: concurrent callers queue on
    /// the key's mutex and pick up the winner's entry from the store. When
    /// the fetch fails and any entry exists (regardless of age), it is
    /// served with `stale = true` instead of propagating the error; with no
    /// entry at all the error surfaces.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        max_age: Duration,
        fetch: F,
    ) -> Result<Cached<V>, FeedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FeedError>>,
    {
        if let Some(value) = self.lookup_fresh(key, max_age) {
            metrics::counter!("feed_cache_hits_total").increment(1);
            return Ok(Cached {
                value,
                stale: false,
            });
        }

        let guard = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = {
            let _permit = guard.lock().await;

            // Re-check: a queued caller finds the winner's entry here.
            if let Some(value) = self.lookup_fresh(key, max_age) {
                metrics::counter!("feed_cache_coalesced_total").increment(1);
                Ok(Cached {
                    value,
                    stale: false,
                })
            } else {
                metrics::counter!("feed_cache_misses_total").increment(1);
                match fetch().await {
                    Ok(value) => {
                        self.insert(key, value.clone());
                        Ok(Cached {
                            value,
                            stale: false,
                        })
                    }
                    Err(e) => match self.lookup_any(key) {
                        Some(value) => {
                            metrics::counter!("feed_cache_stale_serves_total").increment(1);
                            tracing::warn!(
                                target: "feed_cache",
                                key,
                                error = %e,
                                "upstream refresh failed; serving stale entry"
                            );
                            Ok(Cached { value, stale: true })
                        }
                        None => Err(e),
                    },
                }
            }
        };

        drop(guard);
        // Prune the key mutex once nobody is queued on it anymore.
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(arc) = inflight.get(key) {
                if Arc::strong_count(arc) == 1 {
                    inflight.remove(key);
                }
            }
        }

        result
    }
}

/// Short digest of the (sorted, lowercased) category set for cache keys.
pub fn category_set_hash(categories: &BTreeSet<String>) -> String {
    use sha2::{Digest, Sha256};
    let joined = categories
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .join(",");
    let digest = Sha256::digest(joined.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Cache key for a domain batch: `domain/bucket/categories-hash`.
pub fn cache_key(
    domain: ContentDomain,
    origin: &Location,
    bucket_precision_km: f64,
    categories: &BTreeSet<String>,
) -> String {
    format!(
        "{}/{}/{}",
        domain,
        geo::bucket_key(origin, bucket_precision_km),
        category_set_hash(categories)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn fresh_entry_is_a_hit() {
        let cache: FeedCache<u32> = FeedCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let got = cache
                .get_or_fetch("k", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7u32)
                })
                .await
                .expect("get_or_fetch");
            assert_eq!(got.value, 7);
            assert!(!got.stale);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let cache: FeedCache<u32> = FeedCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
        };

        let first = cache
            .get_or_fetch("k", Duration::from_millis(20), fetch)
            .await
            .unwrap();
        assert_eq!(first.value, 0);

        tokio::time::sleep(Duration::from_millis(40)).await;

        let second = cache
            .get_or_fetch("k", Duration::from_millis(20), fetch)
            .await
            .unwrap();
        assert_eq!(second.value, 1);
        assert!(!second.stale);
    }

    #[tokio::test]
    async fn stale_entry_is_served_when_refresh_fails() {
        let cache: FeedCache<u32> = FeedCache::new();
        cache.insert("k", 42);
        tokio::time::sleep(Duration::from_millis(30)).await;

        let got = cache
            .get_or_fetch("k", Duration::from_millis(10), || async {
                Err(FeedError::Upstream("connection refused".into()))
            })
            .await
            .expect("stale entry must be served");
        assert_eq!(got.value, 42);
        assert!(got.stale);
    }

    #[tokio::test]
    async fn error_propagates_with_no_entry_at_all() {
        let cache: FeedCache<u32> = FeedCache::new();
        let err = cache
            .get_or_fetch("k", Duration::from_secs(60), || async {
                Err(FeedError::Upstream("connection refused".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Upstream(_)));
    }

    #[tokio::test]
    async fn concurrent_cold_requests_fetch_once() {
        let cache: Arc<FeedCache<u32>> = Arc::new(FeedCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("k", Duration::from_secs(60), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(25)).await;
                        Ok(9u32)
                    })
                    .await
                    .expect("fetch")
            }));
        }

        for h in handles {
            let got = h.await.expect("join");
            assert_eq!(got.value, 9);
            assert!(!got.stale);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prefix_invalidation_only_hits_matching_keys() {
        let cache: FeedCache<u32> = FeedCache::new();
        cache.insert("news/1:2/aa", 1);
        cache.insert("news/3:4/aa", 2);
        cache.insert("jobs/1:2/aa", 3);

        assert_eq!(cache.invalidate_prefix("news/"), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn category_hash_is_order_insensitive_and_case_folded() {
        let mut a = BTreeSet::new();
        a.insert("News".to_string());
        a.insert("sports".to_string());

        let mut b = BTreeSet::new();
        b.insert("SPORTS".to_string());
        b.insert("news".to_string());

        assert_eq!(category_set_hash(&a), category_set_hash(&b));

        let mut c = BTreeSet::new();
        c.insert("jobs".to_string());
        assert_ne!(category_set_hash(&a), category_set_hash(&c));
    }

    #[test]
    fn cache_keys_separate_domains_and_buckets() {
        let origin = Location::new(40.7128, -74.0060);
        let far = Location::new(34.0522, -118.2437);
        let cats = BTreeSet::new();

        let k1 = cache_key(ContentDomain::News, &origin, 5.0, &cats);
        let k2 = cache_key(ContentDomain::Jobs, &origin, 5.0, &cats);
        let k3 = cache_key(ContentDomain::News, &far, 5.0, &cats);
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
        assert!(k1.starts_with("news/"));
    }
}
