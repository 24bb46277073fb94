//! Scroll position reported by the list view.

/// Geometry of the scrollable list at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Vertical scroll offset of the top of the viewport.
    pub offset_y: f64,
    /// Total height of the list content.
    pub content_height: f64,
    /// Height of the visible viewport.
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// Creates scroll metrics.
    #[must_use]
    pub const fn new(offset_y: f64, content_height: f64, viewport_height: f64) -> Self {
        Self {
            offset_y,
            content_height,
            viewport_height,
        }
    }

    /// Returns true once the viewport bottom reaches the end of the content.
    ///
    /// Content shorter than the viewport counts as reached.
    #[must_use]
    pub fn reached_end(&self) -> bool {
        self.offset_y >= self.content_height - self.viewport_height
    }
}
