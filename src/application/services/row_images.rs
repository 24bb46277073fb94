//! Per-row image slots for a recycling list view.
//!
//! List views reuse row widgets, so an image that finishes loading may
//! arrive after its row was reassigned to another photo. The view supplies
//! a stable [`RowToken`] per reusable row; each `bind` gets a fresh binding
//! id and a completion is installed only if its binding is still current.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::entities::{ImageStatus, LoadedImage, Photo};
use crate::domain::errors::FetchResult;
use crate::domain::ports::PhotoSearchPort;

/// Stable identity of a reusable row widget, supplied by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowToken(pub u64);

impl std::fmt::Display for RowToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// What happened to a slot when an image completion was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowImageUpdate {
    /// The image was installed in the row.
    Installed(RowToken),
    /// Loading failed; the row stays empty and stops loading.
    Failed(RowToken),
    /// The row was re-bound or unbound since the request; ignored.
    Stale(RowToken),
}

/// A finished image request for one binding.
#[derive(Debug)]
pub struct RowImageEvent {
    token: RowToken,
    binding: u64,
    result: FetchResult<LoadedImage>,
}

#[derive(Debug)]
struct RowSlot {
    url: String,
    binding: u64,
    status: ImageStatus,
}

/// Tracks which photo each row shows and that row's loading state.
pub struct RowImageSlots {
    port: Arc<dyn PhotoSearchPort>,
    slots: HashMap<RowToken, RowSlot>,
    next_binding: u64,
    outstanding: usize,
    events_tx: mpsc::UnboundedSender<RowImageEvent>,
    events_rx: mpsc::UnboundedReceiver<RowImageEvent>,
}

impl RowImageSlots {
    /// Creates an empty slot table loading images through `port`.
    #[must_use]
    pub fn new(port: Arc<dyn PhotoSearchPort>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            port,
            slots: HashMap::new(),
            next_binding: 0,
            outstanding: 0,
            events_tx,
            events_rx,
        }
    }

    /// Shows `photo` in `token`'s row and starts loading its image.
    pub fn bind(&mut self, token: RowToken, photo: &Photo) {
        self.next_binding += 1;
        let binding = self.next_binding;

        self.slots.insert(
            token,
            RowSlot {
                url: photo.url().to_string(),
                binding,
                status: ImageStatus::Loading,
            },
        );
        self.outstanding += 1;

        let port = self.port.clone();
        let tx = self.events_tx.clone();
        let photo = photo.clone();
        trace!(%token, url = photo.url(), binding, "Binding row");
        tokio::spawn(async move {
            let result = port.fetch_image(&photo).await;
            let _ = tx.send(RowImageEvent {
                token,
                binding,
                result,
            });
        });
    }

    /// Releases `token`'s row for reuse. Pending loads for it become stale.
    pub fn unbind(&mut self, token: RowToken) {
        self.slots.remove(&token);
    }

    /// Waits for the next image completion and applies it.
    ///
    /// Returns `None` when no load is outstanding.
    pub async fn next_update(&mut self) -> Option<RowImageUpdate> {
        if self.outstanding == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    /// Applies every completion that has already arrived.
    pub fn drain_updates(&mut self) -> Vec<RowImageUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            updates.push(self.apply(event));
        }
        updates
    }

    /// Returns the slot state for `token`, `None` if unbound.
    #[must_use]
    pub fn status(&self, token: RowToken) -> Option<&ImageStatus> {
        self.slots.get(&token).map(|slot| &slot.status)
    }

    /// Returns the URL `token`'s row is bound to.
    #[must_use]
    pub fn bound_url(&self, token: RowToken) -> Option<&str> {
        self.slots.get(&token).map(|slot| slot.url.as_str())
    }

    /// Returns true if `token`'s row should show a loading indicator.
    #[must_use]
    pub fn is_loading(&self, token: RowToken) -> bool {
        self.status(token).is_some_and(ImageStatus::is_loading)
    }

    /// Returns the image shown in `token`'s row, if loaded.
    #[must_use]
    pub fn image(&self, token: RowToken) -> Option<&LoadedImage> {
        self.status(token).and_then(ImageStatus::image)
    }

    fn apply(&mut self, event: RowImageEvent) -> RowImageUpdate {
        self.outstanding = self.outstanding.saturating_sub(1);
        let token = event.token;

        let Some(slot) = self
            .slots
            .get_mut(&token)
            .filter(|slot| slot.binding == event.binding)
        else {
            trace!(%token, binding = event.binding, "Ignoring image for re-bound row");
            return RowImageUpdate::Stale(token);
        };

        match event.result {
            Ok(image) => {
                slot.status = ImageStatus::Ready(image);
                RowImageUpdate::Installed(token)
            }
            Err(e) => {
                debug!(%token, url = %slot.url, error = %e, "Row image failed");
                slot.status = ImageStatus::Failed(e.to_string());
                RowImageUpdate::Failed(token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockPhotoSearch;

    fn photo(url: &str) -> Photo {
        Photo::new(url, 1.0, 1.0)
    }

    #[tokio::test]
    async fn test_bind_installs_image() {
        let mut slots = RowImageSlots::new(Arc::new(MockPhotoSearch::new()));
        let row = RowToken(1);

        slots.bind(row, &photo("a.jpg"));
        assert!(slots.is_loading(row));

        assert_eq!(slots.next_update().await, Some(RowImageUpdate::Installed(row)));
        assert!(!slots.is_loading(row));
        assert_eq!(slots.image(row).map(|i| i.url.as_str()), Some("a.jpg"));
        assert_eq!(slots.next_update().await, None);
    }

    #[tokio::test]
    async fn test_failure_clears_loading_and_leaves_slot_empty() {
        let port = Arc::new(MockPhotoSearch::new().with_failing_image("bad.jpg"));
        let mut slots = RowImageSlots::new(port);
        let row = RowToken(7);

        slots.bind(row, &photo("bad.jpg"));

        assert_eq!(slots.next_update().await, Some(RowImageUpdate::Failed(row)));
        assert!(!slots.is_loading(row));
        assert!(slots.image(row).is_none());
        assert!(slots.status(row).is_some_and(ImageStatus::is_failed));
    }

    #[tokio::test]
    async fn test_rebound_row_ignores_old_completion() {
        let mut slots = RowImageSlots::new(Arc::new(MockPhotoSearch::new()));
        let row = RowToken(3);

        slots.bind(row, &photo("old.jpg"));
        slots.bind(row, &photo("new.jpg"));

        let mut updates = Vec::new();
        while let Some(update) = slots.next_update().await {
            updates.push(update);
        }

        assert_eq!(
            updates,
            vec![RowImageUpdate::Stale(row), RowImageUpdate::Installed(row)]
        );
        assert_eq!(slots.bound_url(row), Some("new.jpg"));
        assert_eq!(slots.image(row).map(|i| i.url.as_str()), Some("new.jpg"));
    }

    #[tokio::test]
    async fn test_unbound_row_ignores_completion() {
        let mut slots = RowImageSlots::new(Arc::new(MockPhotoSearch::new()));
        let row = RowToken(9);

        slots.bind(row, &photo("a.jpg"));
        slots.unbind(row);

        assert_eq!(slots.next_update().await, Some(RowImageUpdate::Stale(row)));
        assert!(slots.status(row).is_none());
    }

    #[tokio::test]
    async fn test_rows_are_independent() {
        let mut slots = RowImageSlots::new(Arc::new(MockPhotoSearch::new()));

        slots.bind(RowToken(1), &photo("a.jpg"));
        slots.bind(RowToken(2), &photo("b.jpg"));
        while slots.next_update().await.is_some() {}

        assert_eq!(slots.image(RowToken(1)).map(|i| i.url.as_str()), Some("a.jpg"));
        assert_eq!(slots.image(RowToken(2)).map(|i| i.url.as_str()), Some("b.jpg"));
        assert!(slots.drain_updates().is_empty());
    }
}
