use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::sentinel::{Config, Connection, Pool, SentinelServerType};
use portal_core::{CacheError, ShortCode, UrlCache};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::redis::ttl_seconds;
use crate::{Result, DEFAULT_KEY_PREFIX};

/// [`UrlCache`] over a Sentinel-managed Redis deployment.
///
/// Lookups go to a replica and writes go to the master; both pools resolve
/// their node through Sentinel, so they follow a failover. A replica may lag
/// the master, which shows up as an extra miss and one more store read.
#[derive(Clone)]
pub struct RedisHAUrlCache {
    master: Pool,
    replica: Pool,
    key_prefix: String,
}

impl std::fmt::Debug for RedisHAUrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisHAUrlCache")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn classify(err: &deadpool_redis::redis::RedisError, message: String) -> CacheError {
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

fn sentinel_pool(
    sentinels: &[String],
    service_name: &str,
    server_type: SentinelServerType,
) -> Result<Pool> {
    Config::from_urls(sentinels.to_vec(), service_name.to_owned(), server_type)
        .create_pool(None)
        .map_err(|e| CacheError::Initialization(format!("sentinel pool for {service_name}: {e}")))
}

async fn checkout(pool: &Pool, role: &str) -> Result<Connection> {
    pool.get().await.map_err(|e| {
        let message = format!("no {role} connection: {e}");
        warn!(role, error = %e, "Redis HA pool checkout failed");
        // Pool waits surface as timeouts; everything else means the node is gone.
        if message.to_ascii_lowercase().contains("timed out") {
            CacheError::Timeout(message)
        } else {
            CacheError::Unavailable(message)
        }
    })
}

impl RedisHAUrlCache {
    /// Connects through `sentinels` (e.g. `["redis://10.0.0.1:26379"]`) to the
    /// deployment registered as `service_name`, using the default key prefix.
    pub fn new<T: AsRef<str>>(sentinels: Vec<T>, service_name: &str) -> Result<Self> {
        Self::with_prefix(sentinels, service_name, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix<T: AsRef<str>>(
        sentinels: Vec<T>,
        service_name: &str,
        key_prefix: impl Into<String>,
    ) -> Result<Self> {
        let sentinels: Vec<String> = sentinels.iter().map(|s| s.as_ref().to_owned()).collect();

        Ok(Self {
            master: sentinel_pool(&sentinels, service_name, SentinelServerType::Master)?,
            replica: sentinel_pool(&sentinels, service_name, SentinelServerType::Replica)?,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, code: &ShortCode) -> String {
        format!("{}{code}", self.key_prefix)
    }
}

#[async_trait]
impl UrlCache for RedisHAUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Reading redirect from replica");
        let mut conn = checkout(&self.replica, "replica").await?;

        let found: Option<String> = conn.get(self.key(code)).await.map_err(|e| {
            warn!(code = %code, error = %e, "Replica GET failed");
            classify(&e, format!("GET on replica: {e}"))
        })?;

        if found.is_some() {
            debug!(code = %code, "Replica cache hit");
        }
        Ok(found)
    }

    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = checkout(&self.master, "master").await?;
        let key = self.key(code);

        let written: std::result::Result<(), _> = match ttl {
            Some(ttl) => conn.set_ex(&key, long_url, ttl_seconds(ttl)).await,
            None => conn.set(&key, long_url).await,
        };
        written.map_err(|e| {
            warn!(code = %code, error = %e, "Master SET failed");
            classify(&e, format!("SET on master: {e}"))
        })?;

        debug!(code = %code, ttl = ?ttl, "Cached redirect on master");
        Ok(())
    }
}
