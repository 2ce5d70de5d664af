use crate::{Result, SequenceAllocator};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// A process-local sequence backed by an atomic counter.
///
/// Uniqueness only holds within a single process. This is meant for
/// single-node deployments and tests; clustered deployments must use a
/// shared counter such as [`RedisSequence`](crate::RedisSequence).
#[derive(Debug, Default)]
pub struct InMemorySequence {
    last: AtomicU64,
}

impl InMemorySequence {
    /// Creates a sequence whose first value is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence that continues after `last`.
    ///
    /// Useful for resuming from the largest sequence already present in
    /// the mapping store.
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Returns the most recently allocated value, or the starting offset.
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SequenceAllocator for InMemorySequence {
    async fn next(&self) -> Result<u64> {
        Ok(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
