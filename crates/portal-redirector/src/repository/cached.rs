use portal_cache::{Abandoned, SingleFlight};
use portal_core::{ReadRepository, ShortCode, UrlCache};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::{RedirectorError, Result};

/// How long a resolved mapping stays in the cache unless overridden.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// A read-only repository decorator that adds cache-aside reads with request
/// coalescing.
///
/// A cache hit is returned directly. On a miss, concurrent callers for the
/// same code share one lookup against the inner repository. The leader of
/// that lookup writes a found URL to the cache before publishing it, so
/// callers arriving after the flight completes hit the cache. Missing codes
/// are not cached.
///
/// Unlike the inner store it does not implement [`ReadRepository`]: `get`
/// can also fail on the cache or on an abandoned lookup, neither of which a
/// `StorageError` can carry, so it returns [`RedirectorError`].
#[derive(Debug)]
pub struct CachedRepository<R, C> {
    inner: R,
    cache: C,
    ttl: Duration,
    flights: SingleFlight<Result<Option<String>>>,
}

impl<R: ReadRepository, C: UrlCache> CachedRepository<R, C> {
    /// Creates a new cached repository decorator.
    ///
    /// # Arguments
    ///
    /// * `inner` - The authoritative repository
    /// * `cache` - The cache implementation (e.g., `RedisUrlCache`)
    pub fn new(inner: R, cache: C) -> Self {
        Self {
            inner,
            cache,
            ttl: DEFAULT_CACHE_TTL,
            flights: SingleFlight::new(),
        }
    }

    /// Overrides the TTL used when caching resolved URLs.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns a reference to the inner repository.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolves `code`, reading through the cache.
    ///
    /// Cache and store failures are surfaced rather than masked. Followers of
    /// a lookup whose leader was dropped receive [`RedirectorError::Cancelled`].
    pub async fn get(&self, code: &ShortCode) -> Result<Option<String>> {
        match self.cache.get_url(code).await {
            Ok(Some(long_url)) => {
                debug!(code = %code, "Cache hit");
                return Ok(Some(long_url));
            }
            Ok(None) => trace!(code = %code, "Cache miss"),
            Err(e) => {
                warn!(code = %code, error = %e, "Cache read failed");
                return Err(e.into());
            }
        }

        let key = format!("redirect:{code}");
        let flight = self
            .flights
            .run(&key, || self.load(code))
            .await
            .map_err(|Abandoned| {
                debug!(code = %code, "In-flight lookup abandoned by its leader");
                RedirectorError::Cancelled
            })?;

        if flight.shared {
            trace!(code = %code, "Shared in-flight lookup");
        }
        flight.value
    }

    async fn load(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Fetching from inner repository");

        let found = self.inner.find_by_short_code(code).await.map_err(|e| {
            warn!(code = %code, error = %e, "Store lookup failed");
            RedirectorError::from(e)
        })?;

        let Some(long_url) = found else {
            debug!(code = %code, "Short code not found in store");
            return Ok(None);
        };

        if let Err(e) = self.cache.set_url(code, &long_url, Some(self.ttl)).await {
            warn!(code = %code, error = %e, "Cache write failed");
            return Err(e.into());
        }

        Ok(Some(long_url))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use portal_cache::MokaUrlCache;
    use portal_core::{CacheError, Repository, StorageError};
    use portal_storage::InMemoryRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Wraps an in-memory store, counting lookups and optionally delaying them.
    #[derive(Default)]
    pub(crate) struct CountingRepository {
        pub(crate) inner: InMemoryRepository,
        pub(crate) lookups: AtomicUsize,
        pub(crate) delay: Option<Duration>,
        pub(crate) stall: bool,
    }

    #[async_trait]
    impl ReadRepository for CountingRepository {
        async fn find_by_short_code(
            &self,
            code: &ShortCode,
        ) -> portal_core::repository::Result<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.stall {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.find_by_short_code(code).await
        }

        async fn find_by_long_url(
            &self,
            long_url: &str,
        ) -> portal_core::repository::Result<Option<ShortCode>> {
            self.inner.find_by_long_url(long_url).await
        }

        async fn list_short_codes(&self) -> portal_core::repository::Result<Vec<ShortCode>> {
            self.inner.list_short_codes().await
        }
    }

    /// Wraps a Moka cache, counting reads and writes.
    #[derive(Default)]
    pub(crate) struct CountingCache {
        pub(crate) inner: MokaUrlCache,
        pub(crate) reads: AtomicUsize,
        pub(crate) writes: AtomicUsize,
    }

    #[async_trait]
    impl UrlCache for CountingCache {
        async fn get_url(&self, code: &ShortCode) -> portal_core::cache::Result<Option<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_url(code).await
        }

        async fn set_url(
            &self,
            code: &ShortCode,
            long_url: &str,
            ttl: Option<Duration>,
        ) -> portal_core::cache::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_url(code, long_url, ttl).await
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl UrlCache for BrokenCache {
        async fn get_url(&self, _code: &ShortCode) -> portal_core::cache::Result<Option<String>> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set_url(
            &self,
            _code: &ShortCode,
            _long_url: &str,
            _ttl: Option<Duration>,
        ) -> portal_core::cache::Result<()> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ReadRepository for BrokenStore {
        async fn find_by_short_code(
            &self,
            _code: &ShortCode,
        ) -> portal_core::repository::Result<Option<String>> {
            Err(StorageError::Unavailable("connection refused".into()))
        }

        async fn find_by_long_url(
            &self,
            _long_url: &str,
        ) -> portal_core::repository::Result<Option<ShortCode>> {
            Err(StorageError::Unavailable("connection refused".into()))
        }

        async fn list_short_codes(&self) -> portal_core::repository::Result<Vec<ShortCode>> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
    }

    fn code(n: u64) -> ShortCode {
        ShortCode::from_sequence(n)
    }

    async fn seeded(delay: Option<Duration>) -> CountingRepository {
        let repo = CountingRepository {
            delay,
            ..Default::default()
        };
        repo.inner.insert(&code(1), "https://example.com").await.unwrap();
        repo
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let repo = CachedRepository::new(seeded(None).await, CountingCache::default());

        assert_eq!(
            repo.get(&code(1)).await.unwrap().as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            repo.get(&code(1)).await.unwrap().as_deref(),
            Some("https://example.com")
        );

        assert_eq!(repo.inner().lookups.load(Ordering::SeqCst), 1);
        assert_eq!(repo.cache().writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_resolves_within_ttl_query_store_once() {
        let repo = CachedRepository::new(seeded(None).await, CountingCache::default())
            .with_ttl(Duration::from_secs(60));

        for _ in 0..10 {
            repo.get(&code(1)).await.unwrap();
        }

        assert_eq!(repo.inner().lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_reloaded() {
        let repo = CachedRepository::new(seeded(None).await, CountingCache::default())
            .with_ttl(Duration::from_millis(50));

        repo.get(&code(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        repo.get(&code(1)).await.unwrap();

        assert_eq!(repo.inner().lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_code_is_not_cached() {
        let repo = CachedRepository::new(seeded(None).await, CountingCache::default());

        assert!(repo.get(&code(2)).await.unwrap().is_none());
        assert!(repo.get(&code(2)).await.unwrap().is_none());

        assert_eq!(repo.inner().lookups.load(Ordering::SeqCst), 2);
        assert_eq!(repo.cache().writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_cold_misses_share_one_store_query() {
        let repo = Arc::new(CachedRepository::new(
            seeded(Some(Duration::from_millis(50))).await,
            CountingCache::default(),
        ));

        let mut handles = Vec::with_capacity(1000);
        for _ in 0..1000 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move { repo.get(&code(1)).await }));
        }

        for handle in handles {
            assert_eq!(
                handle.await.unwrap().unwrap().as_deref(),
                Some("https://example.com")
            );
        }

        assert_eq!(repo.inner().lookups.load(Ordering::SeqCst), 1);
        assert_eq!(repo.cache().writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_read_failure_is_surfaced() {
        let repo = CachedRepository::new(seeded(None).await, BrokenCache);

        let err = repo.get(&code(1)).await.unwrap_err();

        assert!(matches!(
            err,
            RedirectorError::Cache(CacheError::Unavailable(_))
        ));
        assert_eq!(repo.inner().lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_and_not_cached() {
        let repo = CachedRepository::new(BrokenStore, CountingCache::default());

        let err = repo.get(&code(1)).await.unwrap_err();

        assert!(matches!(
            err,
            RedirectorError::Storage(StorageError::Unavailable(_))
        ));
        assert_eq!(repo.cache().writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_leader_fails_followers() {
        let inner = CountingRepository {
            stall: true,
            ..Default::default()
        };
        let repo = Arc::new(CachedRepository::new(inner, CountingCache::default()));

        let leader = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.get(&code(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let follower = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.get(&code(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        assert!(matches!(
            follower.await.unwrap(),
            Err(RedirectorError::Cancelled)
        ));
        assert_eq!(repo.inner().lookups.load(Ordering::SeqCst), 1);
    }
}
