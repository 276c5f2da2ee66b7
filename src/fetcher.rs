//! Origin fetch abstraction.
//!
//! [`OriginFetcher`] is the seam between the request router and whatever
//! actually talks to the origin. [`HttpFetcher`] is the reqwest-backed
//! implementation the server uses; tests substitute their own.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Content retrieved from the origin.
///
/// `mime_type` and `url` are always present alongside the body; a response
/// lacking either never becomes a `FetchedItem`.
#[derive(Clone, Debug)]
pub struct FetchedItem {
    pub body: Bytes,
    /// Media type of the response, without parameters.
    pub mime_type: String,
    /// Final URL after redirects.
    pub url: Url,
}

/// Reasons an origin fetch did not produce a [`FetchedItem`].
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("origin returned status {0}")]
    Status(StatusCode),

    #[error("origin response has no content type")]
    MissingContentType,
}

#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fetch `url` and return its body, media type and resolved URL.
    async fn fetch(&self, url: &Url) -> Result<FetchedItem, FetchError>;
}

/// Origin fetcher backed by a pooled [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    /// Per-request timeout. `None` leaves a slow origin pending indefinitely.
    timeout: Option<Duration>,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Use an existing client, e.g. one with custom TLS or proxy settings.
    pub fn with_client(client: Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl OriginFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedItem, FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Origin fetch failed for {}: {}", url, e);
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Origin returned {} for {}", status, url);
            return Err(FetchError::Status(status));
        }

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(media_type)
            .ok_or_else(|| {
                warn!("Origin response for {} has no content type", url);
                FetchError::MissingContentType
            })?;

        let resolved = response.url().clone();
        let body = response.bytes().await?;

        debug!(
            "Fetched {} bytes ({}) from {}",
            body.len(),
            mime_type,
            resolved
        );

        Ok(FetchedItem {
            body,
            mime_type,
            url: resolved,
        })
    }
}

/// Strip parameters from a `Content-Type` value: `text/plain; charset=utf-8`
/// becomes `text/plain`. Returns `None` when nothing is left.
fn media_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    (!essence.is_empty()).then(|| essence.to_string())
}
