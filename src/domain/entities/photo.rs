//! Photo and search page value types.

/// A single search hit: where to download the image and its natural size.
///
/// The URL doubles as the cache key for the decoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    url: String,
    width: f64,
    height: f64,
}

impl Photo {
    /// Creates a photo record.
    #[must_use]
    pub fn new(url: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }

    /// Returns the image URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the natural width in pixels.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Returns the natural height in pixels.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Width divided by height, `0.0` for a degenerate height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        }
    }

    /// Height a row needs to show this photo scaled to `row_width`.
    #[must_use]
    pub fn display_height(&self, row_width: f64) -> f64 {
        if self.width > 0.0 {
            self.height * row_width / self.width
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}x{})", self.url, self.width, self.height)
    }
}

/// One page of search results as returned by the service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageResult {
    /// 1-based page number reported by the service.
    pub page: u32,
    /// Total number of pages available for the query.
    pub total_pages: u32,
    /// Photos in service order.
    pub photos: Vec<Photo>,
}

impl PageResult {
    /// Creates a page result.
    #[must_use]
    pub const fn new(page: u32, total_pages: u32, photos: Vec<Photo>) -> Self {
        Self {
            page,
            total_pages,
            photos,
        }
    }

    /// Returns true if more pages follow this one.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}
