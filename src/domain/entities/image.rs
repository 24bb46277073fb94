//! Domain types for decoded images.

use std::sync::Arc;

/// A decoded image ready for display.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// URL the image was downloaded from (also its cache key).
    pub url: String,
    /// The decoded pixels, shared with the cache.
    pub image: Arc<image::DynamicImage>,
    /// Where the image came from.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Returns the decoded width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Returns the decoded height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Where an image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Served from the in-memory cache.
    MemoryCache,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Loading state of one list row's image slot.
#[derive(Debug, Clone, Default)]
pub enum ImageStatus {
    /// Nothing requested yet.
    #[default]
    NotStarted,
    /// A download or cache lookup is in flight.
    Loading,
    /// The image is available.
    Ready(LoadedImage),
    /// Loading failed; the slot stays empty.
    Failed(String),
}

impl ImageStatus {
    /// Returns true if the image is ready for rendering.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns true if the row should show a loading indicator.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if loading failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the image if ready.
    #[must_use]
    pub const fn image(&self) -> Option<&LoadedImage> {
        match self {
            Self::Ready(image) => Some(image),
            _ => None,
        }
    }
}
