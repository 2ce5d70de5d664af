use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `long_url` and returns the full short URL.
    async fn convert(&self, long_url: &str) -> Result<String>;
}

#[async_trait]
impl<T: Shortener + ?Sized> Shortener for Arc<T> {
    async fn convert(&self, long_url: &str) -> Result<String> {
        (**self).convert(long_url).await
    }
}
