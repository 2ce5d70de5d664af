use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portal_cache::ExistenceFilter;
use portal_core::{ReadRepository, ShortCode, UrlCache};
use tracing::{debug, trace};

use crate::redirector::Redirector;
use crate::repository::CachedRepository;
use crate::{RedirectorError, Result};

/// Service for handling URL redirects.
///
/// Validation happens before any I/O: malformed codes never reach the cache
/// or the store. When an [`ExistenceFilter`] is attached, codes it proves
/// absent are rejected without touching either.
#[derive(Debug)]
pub struct RedirectorService<R, C> {
    repository: Arc<CachedRepository<R, C>>,
    filter: Option<Arc<ExistenceFilter>>,
    timeout: Option<Duration>,
}

impl<R, C> Clone for RedirectorService<R, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            filter: self.filter.clone(),
            timeout: self.timeout,
        }
    }
}

impl<R: ReadRepository, C: UrlCache> RedirectorService<R, C> {
    /// Creates a new RedirectorService resolving through `repository`.
    pub fn new(repository: CachedRepository<R, C>) -> Self {
        Self {
            repository: Arc::new(repository),
            filter: None,
            timeout: None,
        }
    }

    /// Enables the existence filter short-circuit.
    pub fn with_filter(mut self, filter: Arc<ExistenceFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Bounds every `redirect` call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn repository(&self) -> &CachedRepository<R, C> {
        &self.repository
    }

    async fn redirect_inner(&self, short_code: &str) -> Result<String> {
        trace!(short_code, "Resolving short code");
        let code = ShortCode::parse(short_code)?;

        if let Some(filter) = &self.filter {
            if filter.is_definitely_absent(&code) {
                debug!(code = %code, "Existence filter rejected short code");
                return Err(RedirectorError::NotFound(code.to_string()));
            }
        }

        match self.repository.get(&code).await? {
            Some(long_url) => {
                debug!(code = %code, url = %long_url, "Resolved short code");
                Ok(long_url)
            }
            None => {
                debug!(code = %code, "Short code not found");
                Err(RedirectorError::NotFound(code.to_string()))
            }
        }
    }
}

#[async_trait]
impl<R: ReadRepository, C: UrlCache> Redirector for RedirectorService<R, C> {
    async fn redirect(&self, short_code: &str) -> Result<String> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.redirect_inner(short_code))
                .await
                .map_err(|_| RedirectorError::DeadlineExceeded)?,
            None => self.redirect_inner(short_code).await,
        }
    }
}
