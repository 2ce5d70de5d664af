use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a caller-supplied short code to its long URL.
    async fn redirect(&self, short_code: &str) -> Result<String>;
}

#[async_trait]
impl<T: Redirector + ?Sized> Redirector for Arc<T> {
    async fn redirect(&self, short_code: &str) -> Result<String> {
        (**self).redirect(short_code).await
    }
}
