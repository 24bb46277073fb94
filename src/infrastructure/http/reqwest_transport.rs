//! `reqwest`-backed HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::domain::errors::{FetchError, FetchResult};
use crate::domain::ports::HttpTransport;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new() -> FetchResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport with a custom timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn map_send_error(err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::transport("request timed out")
        } else if err.is_connect() {
            FetchError::transport("failed to connect")
        } else {
            FetchError::transport(err.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> FetchResult<Bytes> {
        debug!(host = url.host_str().unwrap_or_default(), path = url.path(), "GET");

        // Request URLs carry the API key; keep them out of errors and logs.
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            let e = e.without_url();
            warn!(error = %e, "Request failed");
            Self::map_send_error(&e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(format!("failed to read body: {}", e.without_url())))
    }
}
