use async_trait::async_trait;
use portal_core::{Repository, ShortCode};
use portal_sequence::SequenceAllocator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::error::{Result, ShortenerError};
use crate::shortener::Shortener;

/// A concrete implementation of the [`Shortener`] trait.
///
/// Every new short code is the encoding of a value drawn from the sequence
/// allocator, so codes never collide as long as the allocator never repeats.
/// No collision retry is performed: a storage conflict is surfaced as is.
///
/// The service writes only to the mapping store. It does not warm the
/// redirect cache or touch the existence filter.
#[derive(Debug, Clone)]
pub struct ShortenerService<R, S> {
    repository: Arc<R>,
    sequence: Arc<S>,
    domain: String,
    timeout: Option<Duration>,
}

impl<R: Repository, S: SequenceAllocator> ShortenerService<R, S> {
    /// Creates a service that issues short URLs under `domain`.
    pub fn new(repository: R, sequence: S, domain: impl Into<String>) -> Self {
        Self {
            repository: Arc::new(repository),
            sequence: Arc::new(sequence),
            domain: domain.into(),
            timeout: None,
        }
    }

    /// Bounds every `convert` call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Rejects URLs that already point at a short code issued here.
    ///
    /// Only the trailing path segment is inspected. A segment that cannot be
    /// a short code is a guaranteed miss, so the store is not queried.
    async fn ensure_not_short_url(&self, long_url: &str) -> Result<()> {
        let segment = long_url.rsplit('/').next().unwrap_or(long_url);
        let Ok(code) = ShortCode::parse(segment) else {
            return Ok(());
        };

        if self.repository.find_by_short_code(&code).await?.is_some() {
            debug!(code = %code, "Input is already a short url");
            return Err(ShortenerError::InputIsShortUrl(long_url.to_owned()));
        }
        Ok(())
    }

    async fn convert_inner(&self, long_url: &str) -> Result<String> {
        if long_url.is_empty() {
            return Err(ShortenerError::InvalidUrl("url cannot be empty".to_string()));
        }

        self.ensure_not_short_url(long_url).await?;

        if let Some(existing) = self.repository.find_by_long_url(long_url).await? {
            debug!(code = %existing, "Long url already mapped");
            return Err(ShortenerError::AlreadyMapped(existing.to_url(&self.domain)));
        }

        let sequence = self.sequence.next().await.inspect_err(|e| {
            warn!(error = %e, "Failed to allocate sequence");
        })?;
        let code = ShortCode::from_sequence(sequence);
        trace!(sequence, code = %code, "Allocated short code");

        self.repository.insert(&code, long_url).await?;
        debug!(code = %code, "Stored new mapping");

        Ok(code.to_url(&self.domain))
    }
}

#[async_trait]
impl<R: Repository, S: SequenceAllocator> Shortener for ShortenerService<R, S> {
    async fn convert(&self, long_url: &str) -> Result<String> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.convert_inner(long_url))
                .await
                .map_err(|_| ShortenerError::DeadlineExceeded)?,
            None => self.convert_inner(long_url).await,
        }
    }
}
