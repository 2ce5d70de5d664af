use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A persisted binding of one short code to one long URL.
///
/// Mappings are append-only: once inserted they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub short_code: ShortCode,
    pub long_url: String,
    /// Lowercase hex SHA-256 of `long_url`.
    pub long_url_digest: String,
    pub created_at: Timestamp,
}

impl Mapping {
    /// Builds a new mapping stamped with the current time.
    pub fn new(short_code: ShortCode, long_url: impl Into<String>) -> Self {
        let long_url = long_url.into();
        Self {
            long_url_digest: long_url_digest(&long_url),
            short_code,
            long_url,
            created_at: Timestamp::now(),
        }
    }
}

/// Computes the digest stored alongside a long URL for indexed duplicate lookups.
pub fn long_url_digest(long_url: &str) -> String {
    hex::encode(Sha256::digest(long_url.as_bytes()))
}

/// A read-only view of the mapping store.
///
/// Absence is reported as `Ok(None)`, never as an error.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Returns the long URL bound to `code`.
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Returns the short code already bound to `long_url`.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortCode>>;

    /// Lists every short code in the store.
    async fn list_short_codes(&self) -> Result<Vec<ShortCode>>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Persists a new mapping.
    ///
    /// Returns `Err(Conflict)` if either the short code or the long URL is
    /// already mapped.
    async fn insert(&self, code: &ShortCode, long_url: &str) -> Result<()>;
}

#[async_trait]
impl<T: ReadRepository + ?Sized> ReadRepository for Arc<T> {
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<String>> {
        (**self).find_by_short_code(code).await
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortCode>> {
        (**self).find_by_long_url(long_url).await
    }

    async fn list_short_codes(&self) -> Result<Vec<ShortCode>> {
        (**self).list_short_codes().await
    }
}

#[async_trait]
impl<T: Repository + ?Sized> Repository for Arc<T> {
    async fn insert(&self, code: &ShortCode, long_url: &str) -> Result<()> {
        (**self).insert(code, long_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_sha256_hex() {
        let digest = long_url_digest("http://example.com/page");
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        assert_eq!(digest, long_url_digest("http://example.com/page"));
        assert_ne!(digest, long_url_digest("http://example.com/page2"));
        assert_eq!(
            long_url_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn mapping_new_computes_digest() {
        let mapping = Mapping::new(ShortCode::from_sequence(7), "https://example.com");
        assert_eq!(mapping.long_url_digest, long_url_digest("https://example.com"));
        assert_eq!(mapping.short_code.sequence().unwrap(), 7);
    }
}
