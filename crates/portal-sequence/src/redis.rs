use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{trace, warn};

use crate::{checked_sequence, Result, SequenceAllocator, SequenceError, DEFAULT_SEQUENCE_KEY};

/// A sequence backed by Redis `INCR` on a single named counter.
///
/// `INCR` is atomic on the server, so every engine instance sharing the same
/// Redis and key observes one linearized sequence.
#[derive(Debug, Clone)]
pub struct RedisSequence {
    conn: redis::aio::MultiplexedConnection,
    key: String,
}

fn map_redis_error(err: redis::RedisError) -> SequenceError {
    let message = format!("failed to increment counter: {err}");
    if err.is_timeout() {
        SequenceError::Timeout(message)
    } else {
        SequenceError::Unavailable(message)
    }
}

impl RedisSequence {
    /// Creates a sequence on the default counter key.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_key(conn, DEFAULT_SEQUENCE_KEY)
    }

    /// Creates a sequence on a custom counter key.
    pub fn with_key(conn: redis::aio::MultiplexedConnection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl SequenceAllocator for RedisSequence {
    async fn next(&self) -> Result<u64> {
        trace!(key = %self.key, "Allocating sequence from Redis");

        let mut conn = self.conn.clone();
        match conn.incr::<_, _, i64>(&self.key, 1_i64).await {
            Ok(raw) => checked_sequence(raw),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Redis error on INCR");
                Err(map_redis_error(e))
            }
        }
    }
}
