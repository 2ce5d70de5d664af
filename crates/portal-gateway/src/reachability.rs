use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("url could not be fetched: {0}")]
    Request(String),
    #[error("url answered with status {0}")]
    Status(u16),
    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Checks that a long URL is live before it is shortened.
#[async_trait]
pub trait UrlProbe: Send + Sync + 'static {
    async fn check(&self, url: &str) -> Result<(), ProbeError>;
}

/// Prefixes `http://` unless the URL already names an http(s) scheme.
pub fn with_scheme(url: &str) -> Cow<'_, str> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Cow::Borrowed(url)
    } else {
        Cow::Owned(format!("http://{url}"))
    }
}

/// Probes a URL with a single GET, succeeding only on `200 OK`.
///
/// Connections are never pooled: each probe targets an arbitrary host that
/// is unlikely to be contacted again.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn check(&self, url: &str) -> Result<(), ProbeError> {
        let url = with_scheme(url);
        let response = self
            .client
            .get(url.as_ref())
            .send()
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Probed url");
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}
