//! HTTP fetcher implementation
//!
//! This module handles the network side of the fetch stage:
//! - Building the shared reqwest client from configuration
//! - Scheme normalization for bare host names
//! - GET requests and error classification

use crate::config::HttpConfig;
use crate::fetch::FetchError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Fetches the body behind a URL
///
/// The fetch stage depends on this trait rather than on reqwest so the
/// worker pool can be driven by test doubles.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Downloads `url` (already normalized) and returns the whole body
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Prefixes `http://` unless the URL already carries an HTTP(S) scheme
///
/// No other validation happens here; malformed URLs fail when the request
/// is built.
///
/// # Examples
///
/// ```
/// use url_harvest::fetch::normalize_url;
///
/// assert_eq!(normalize_url("example.com/a"), "http://example.com/a");
/// assert_eq!(normalize_url("https://example.com"), "https://example.com");
/// ```
pub fn normalize_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    }
}

/// Builds an HTTP client from configuration
///
/// Redirects follow reqwest's default policy. No timeout is set unless
/// `timeout_secs` is configured.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .gzip(true)
        .brotli(true);

    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

/// [`Fetcher`] backed by a reqwest [`Client`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(classify_transport_error)?;

        // Anything but 200 counts as a failure, including other 2xx codes
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(body.to_vec())
    }
}

fn classify_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport(format!("request timeout: {}", e))
    } else if e.is_connect() {
        FetchError::Transport(format!("connection failed: {}", e))
    } else if e.is_builder() {
        FetchError::InvalidRequest(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}
