//! HTTP transport used to reach the Paperless API.
//!
//! The poller only ever needs a timeout-bounded GET with custom headers, so the
//! transport is a small trait. [`HttpClient`] implements it with reqwest; tests
//! substitute a scripted transport.

mod response;
#[cfg(test)]
pub(crate) mod scripted;

pub use response::HttpResponse;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use thiserror::Error;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("paperless-metrics/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Failure to get a response from the remote side at all.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid header value for {name}")]
    InvalidHeader { name: &'static str },
    #[error("connection error: {0}")]
    Connection(String),
}

/// Something that can execute a GET request and hand back status + body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<HttpResponse, TransportError>;
}

/// Builder for constructing an [`HttpClient`].
pub struct HttpClientBuilder {
    timeout: Duration,
}

impl HttpClientBuilder {
    /// Build the `HttpClient`.
    ///
    /// # Errors
    /// Returns an error if the underlying reqwest client cannot be initialized
    /// (for example when the TLS backend fails to load).
    pub fn build(self) -> Result<HttpClient, String> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        tracing::debug!("HTTP client ready (timeout {:?})", self.timeout);

        Ok(HttpClient { client })
    }
}

/// reqwest-backed [`Transport`] with a client-wide timeout.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a builder. The timeout bounds every request made by the client,
    /// body included, so a single poll cycle cannot hang.
    pub fn builder(timeout: Duration) -> HttpClientBuilder {
        HttpClientBuilder { timeout }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
