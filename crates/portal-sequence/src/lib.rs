//! Sequence allocation for generated short codes.
//!
//! Every short code is the base-62 rendering of a number handed out by a
//! [`SequenceAllocator`]. Allocators never reuse a value; a value consumed by a
//! failed shorten call is simply skipped.

pub mod error;
pub mod memory;
pub mod redis;
pub mod redis_ha;

use async_trait::async_trait;
use std::sync::Arc;

pub use error::SequenceError;
pub use memory::InMemorySequence;
pub use self::redis::RedisSequence;
pub use redis_ha::RedisHASequence;

/// Result type for sequence allocation.
pub type Result<T> = std::result::Result<T, SequenceError>;

/// Default name of the shared counter key.
pub const DEFAULT_SEQUENCE_KEY: &str = "portal:seq:short_url";

/// Source of globally unique, strictly increasing sequence numbers.
///
/// Implementations backed by an external counter hold no local state and do
/// no local locking; ordering is whatever the counter linearizes.
#[async_trait]
pub trait SequenceAllocator: Send + Sync + 'static {
    /// Returns a value strictly greater than every value returned before.
    async fn next(&self) -> Result<u64>;
}

#[async_trait]
impl<T: SequenceAllocator + ?Sized> SequenceAllocator for Arc<T> {
    async fn next(&self) -> Result<u64> {
        (**self).next().await
    }
}

/// Validates a raw counter reply. Counters start at 1, so anything below is
/// a misconfigured or corrupted key.
pub(crate) fn checked_sequence(raw: i64) -> Result<u64> {
    u64::try_from(raw)
        .ok()
        .filter(|value| *value > 0)
        .ok_or(SequenceError::InvalidValue(raw))
}
