//! Flickr search request construction.

use reqwest::Url;

use crate::domain::errors::{FetchError, FetchResult};

/// Flickr REST endpoint.
pub const FLICKR_API_BASE: &str = "https://api.flickr.com/services/rest/";

/// Search method name.
pub const SEARCH_METHOD: &str = "flickr.photos.search";

/// Results per page.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Everything needed to build a search request URL.
#[derive(Debug, Clone)]
pub struct SearchEndpoint {
    base_url: String,
    api_key: String,
    per_page: u32,
}

impl SearchEndpoint {
    /// Creates an endpoint against the public Flickr API.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(FLICKR_API_BASE, api_key)
    }

    /// Creates an endpoint with a custom base URL.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Returns the configured page size.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Builds the search URL for `query` and 1-based `page`.
    ///
    /// The query is form-encoded, so reserved characters cannot leak into
    /// other parameters.
    ///
    /// # Errors
    /// Returns `FetchError::InvalidUrl` for page 0 or an unparsable base URL.
    pub fn search_url(&self, query: &str, page: u32) -> FetchResult<Url> {
        if page == 0 {
            return Err(FetchError::invalid_url(format!(
                "{}?text={query}&page=0",
                self.base_url
            )));
        }

        let per_page = self.per_page.to_string();
        let page = page.to_string();
        Url::parse_with_params(
            &self.base_url,
            [
                ("method", SEARCH_METHOD),
                ("api_key", self.api_key.as_str()),
                ("text", query),
                ("extras", "url_s"),
                ("format", "json"),
                ("nojsoncallback", "1"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ],
        )
        .map_err(|_| FetchError::invalid_url(&self.base_url))
    }
}
