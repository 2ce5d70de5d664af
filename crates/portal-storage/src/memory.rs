use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use portal_core::repository::{ReadRepository, Repository, Result};
use portal_core::{Mapping, ShortCode, StorageError};
use tracing::trace;

/// In-memory implementation of the repository contract using DashMap.
///
/// Two indexes enforce both uniqueness constraints: `by_code` holds the
/// mapping itself and `by_url` maps each long URL back to its code. DashMap
/// uses sharded locks, so lookups for unrelated keys never block each other.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    by_code: DashMap<ShortCode, Mapping>,
    by_url: DashMap<String, ShortCode>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_code: DashMap::with_capacity(capacity),
            by_url: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Returns the full mapping stored under `code`.
    pub fn mapping(&self, code: &ShortCode) -> Option<Mapping> {
        self.by_code.get(code).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<String>> {
        Ok(self
            .by_code
            .get(code)
            .map(|entry| entry.value().long_url.clone()))
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortCode>> {
        Ok(self.by_url.get(long_url).map(|entry| entry.value().clone()))
    }

    async fn list_short_codes(&self) -> Result<Vec<ShortCode>> {
        Ok(self.by_code.iter().map(|entry| entry.key().clone()).collect())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, code: &ShortCode, long_url: &str) -> Result<()> {
        // Claim the URL first; a concurrent insert of the same URL loses here.
        let url_slot = match self.by_url.entry(long_url.to_owned()) {
            Entry::Occupied(_) => {
                return Err(StorageError::Conflict(format!(
                    "long url already mapped: {long_url}"
                )))
            }
            Entry::Vacant(slot) => slot,
        };

        match self.by_code.entry(code.clone()) {
            Entry::Occupied(_) => {
                drop(url_slot);
                Err(StorageError::Conflict(format!(
                    "short code already mapped: {code}"
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(Mapping::new(code.clone(), long_url));
                url_slot.insert(code.clone());
                trace!(code = %code, "Stored mapping in memory");
                Ok(())
            }
        }
    }
}
