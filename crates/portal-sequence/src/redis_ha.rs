use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use tracing::{trace, warn};

use crate::{checked_sequence, Result, SequenceAllocator, SequenceError, DEFAULT_SEQUENCE_KEY};

/// A Redis Sentinel-backed sequence.
///
/// Increments always go to the current master, so the counter survives a
/// Sentinel failover without any change on the engine side.
#[derive(Clone)]
pub struct RedisHASequence {
    master_pool: deadpool_redis::sentinel::Pool,
    key: String,
}

impl std::fmt::Debug for RedisHASequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisHASequence")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn map_pool_error(err: impl std::fmt::Display) -> SequenceError {
    let message = format!("failed to get master connection: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        SequenceError::Timeout(message)
    } else {
        SequenceError::Unavailable(message)
    }
}

fn map_redis_error(err: deadpool_redis::redis::RedisError) -> SequenceError {
    let message = format!("failed to increment counter on master: {err}");
    if err.is_timeout() {
        SequenceError::Timeout(message)
    } else {
        SequenceError::Unavailable(message)
    }
}

impl RedisHASequence {
    /// Creates a Sentinel-backed sequence on the default counter key.
    ///
    /// # Arguments
    ///
    /// * `sentinels` - List of sentinel addresses (e.g., `["redis://localhost:26379"]`)
    /// * `service_name` - The Redis service name to look up (e.g., "mymaster")
    pub fn new<T: AsRef<str>>(sentinels: Vec<T>, service_name: &str) -> Result<Self> {
        Self::with_key(sentinels, service_name, DEFAULT_SEQUENCE_KEY)
    }

    /// Creates a Sentinel-backed sequence on a custom counter key.
    pub fn with_key<T: AsRef<str>>(
        sentinels: Vec<T>,
        service_name: &str,
        key: impl Into<String>,
    ) -> Result<Self> {
        let sentinels = sentinels
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>();

        let config = deadpool_redis::sentinel::Config::from_urls(
            sentinels,
            service_name.into(),
            deadpool_redis::sentinel::SentinelServerType::Master,
        );

        let master_pool = config.create_pool(None).map_err(|e| {
            SequenceError::Unavailable(format!("failed to create master pool: {e}"))
        })?;

        Ok(Self {
            master_pool,
            key: key.into(),
        })
    }
}

#[async_trait]
impl SequenceAllocator for RedisHASequence {
    async fn next(&self) -> Result<u64> {
        trace!(key = %self.key, "Allocating sequence from Redis HA (master)");

        let mut conn = match self.master_pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to get connection from master pool");
                return Err(map_pool_error(e));
            }
        };

        match conn.incr::<_, _, i64>(&self.key, 1_i64).await {
            Ok(raw) => checked_sequence(raw),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Redis HA error on INCR");
                Err(map_redis_error(e))
            }
        }
    }
}
