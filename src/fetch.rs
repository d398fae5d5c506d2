//! The byte-fetch capability the client delegates to.

use crate::error::{GatewayError, Result};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Status and body of a gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves resources by URL. Timeouts and connection policy belong to the
/// implementation.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch_response(&self, url: &str) -> Result<FetchResponse>;

    /// Fetches the whole resource, treating any non-2xx status as an error.
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        let response = self.fetch_response(url).await?;
        if !response.is_success() {
            return Err(GatewayError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_response(&self, url: &str) -> Result<FetchResponse> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            GatewayError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| GatewayError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!("{} answered {} with {} bytes", url, status, body.len());
        Ok(FetchResponse { status, body })
    }
}
