//! Time-boxed entity memoization
//!
//! An [`EntityCache`] sits in front of one read path. Entries older than the
//! TTL are treated as absent and overwritten on the next fetch; nothing is
//! purged proactively. Concurrent misses for the same key each fetch on their
//! own: only token refreshes are single-flighted.

use crate::error::Result;
use memboard_core::{Clock, SystemClock};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Per-call cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Skip the cached value and fetch, then replace the entry
    pub force: bool,
}

impl GetOptions {
    pub const fn forced() -> Self {
        Self { force: true }
    }
}

/// A memoized value and when it was fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at_epoch_ms: i64,
}

/// Shared key → value memo with TTL-based staleness
pub struct EntityCache<V> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for EntityCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V> fmt::Debug for EntityCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.lock().len())
            .finish()
    }
}

impl<V: Clone> EntityCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached value for `key`, without fetching
    pub fn peek(&self, key: &str) -> Option<V> {
        let now = self.clock.now_epoch_ms();
        self.lock()
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// Entry for `key` regardless of age
    pub fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.lock().get(key).cloned()
    }

    /// Cached value if fresh and not forced, otherwise the result of `fetch`
    ///
    /// A successful fetch replaces the entry wholesale. A failed fetch leaves
    /// any existing entry untouched and is returned to this caller only.
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` fails with
    pub async fn get<F, Fut>(&self, key: &str, options: GetOptions, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if !options.force {
            if let Some(value) = self.peek(key) {
                debug!(key, "Entity cache hit");
                return Ok(value);
            }
        }

        debug!(key, force = options.force, "Entity cache miss");
        let value = fetch().await?;
        let entry = CacheEntry {
            value: value.clone(),
            fetched_at_epoch_ms: self.clock.now_epoch_ms(),
        };
        self.lock().insert(key.to_string(), entry);
        Ok(value)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now_epoch_ms: i64) -> bool {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        now_epoch_ms.saturating_sub(entry.fetched_at_epoch_ms) < ttl_ms
    }
}

impl<V> EntityCache<V> {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use memboard_core::clock::ManualClock;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_millis(60_000);

    fn cache_with_clock() -> (EntityCache<String>, ManualClock) {
        let clock = ManualClock::default();
        let cache = EntityCache::with_clock(TTL, Arc::new(clock.clone()));
        (cache, clock)
    }

    async fn fetch_counted(calls: &AtomicUsize, value: &str) -> Result<String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value.to_string())
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_without_fetch() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v1"))
            .await
            .unwrap();
        clock.advance(Duration::from_millis(59_999));
        let second = cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v2"))
            .await
            .unwrap();

        assert_eq!(first, "v1");
        assert_eq!(second, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entry_expires_at_ttl() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v1"))
            .await
            .unwrap();
        clock.advance(TTL);
        assert_eq!(cache.peek("demo"), None);

        let value = cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v2"))
            .await
            .unwrap();
        assert_eq!(value, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_force_always_fetches() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v1"))
            .await
            .unwrap();
        let value = cache
            .get("demo", GetOptions::forced(), || fetch_counted(&calls, "v2"))
            .await
            .unwrap();

        assert_eq!(value, "v2");
        assert_eq!(cache.peek("demo").as_deref(), Some("v2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_existing_entry() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v1"))
            .await
            .unwrap();
        let before = cache.entry("demo").unwrap();

        clock.advance(Duration::from_millis(1_000));
        let err = cache
            .get("demo", GetOptions::forced(), || async {
                Err(ClientError::from_response_parts(
                    StatusCode::SERVICE_UNAVAILABLE,
                    b"",
                ))
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 503);
        assert_eq!(cache.entry("demo"), Some(before));
        assert_eq!(cache.peek("demo").as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        cache
            .get("alpha", GetOptions::default(), || fetch_counted(&calls, "a"))
            .await
            .unwrap();
        cache
            .get("beta", GetOptions::default(), || fetch_counted(&calls, "b"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek("alpha").as_deref(), Some("a"));
        assert_eq!(cache.peek("beta").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_clear_forces_next_fetch() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v1"))
            .await
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());

        let value = cache
            .get("demo", GetOptions::default(), || fetch_counted(&calls, "v2"))
            .await
            .unwrap();
        assert_eq!(value, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache: EntityCache<u32> = EntityCache::new(TTL);
        let other = cache.clone();
        assert!(other.is_empty());
        cache.lock().insert(
            "k".to_string(),
            CacheEntry {
                value: 1,
                fetched_at_epoch_ms: i64::MAX,
            },
        );
        assert_eq!(other.len(), 1);
    }
}
