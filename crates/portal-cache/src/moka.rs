use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use portal_core::{ShortCode, UrlCache};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::Result;

#[derive(Debug, Clone)]
struct CachedUrl {
    long_url: String,
    ttl: Option<Duration>,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<ShortCode, CachedUrl> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &ShortCode,
        value: &CachedUrl,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &ShortCode,
        value: &CachedUrl,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// An in-process implementation of [`UrlCache`] using Moka.
///
/// Suited to single-node deployments and tests. Unlike a plain Moka cache
/// with a global time-to-live, each entry honours the TTL passed to
/// [`UrlCache::set_url`].
#[derive(Clone)]
pub struct MokaUrlCache {
    cache: Cache<ShortCode, CachedUrl>,
    default_ttl: Option<Duration>,
}

impl std::fmt::Debug for MokaUrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaUrlCache")
            .field("entries", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MokaUrlCache {
    /// Creates a cache holding at most 10,000 entries.
    pub fn new() -> Self {
        Self::builder().build().into()
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build().into()
    }

    pub fn builder() -> MokaCacheConfigBuilder {
        MokaCacheConfig::builder()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        match self.cache.get(code).await {
            Some(entry) => {
                debug!(code = %code, "Cache hit in Moka");
                Ok(Some(entry.long_url))
            }
            None => {
                trace!(code = %code, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Option<Duration>) -> Result<()> {
        let entry = CachedUrl {
            long_url: long_url.to_owned(),
            ttl: ttl.or(self.default_ttl),
        };
        self.cache.insert(code.clone(), entry).await;
        trace!(code = %code, ttl = ?ttl, "Cached URL in Moka");
        Ok(())
    }
}

/// Configuration for a [`MokaUrlCache`].
#[derive(Debug, TypedBuilder)]
pub struct MokaCacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default = 10_000)]
    max_capacity: u64,
    /// TTL applied when `set_url` is called without one. `None` keeps such
    /// entries until they are evicted for capacity.
    #[builder(default, setter(strip_option))]
    default_ttl: Option<Duration>,
}

impl From<MokaCacheConfig> for MokaUrlCache {
    fn from(config: MokaCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        MokaUrlCache {
            cache,
            default_ttl: config.default_ttl,
        }
    }
}
