//! Port definition for raw HTTP access.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::domain::errors::FetchResult;

/// Port for issuing GET requests and collecting the response body.
///
/// Non-success statuses and connection failures are reported as
/// `FetchError::Transport`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Fetches the body at `url`.
    async fn get(&self, url: &Url) -> FetchResult<Bytes>;
}
