//! Paged search session state machine.
//!
//! The session owns the accumulated result list for one query at a time.
//! Page requests run on spawned tasks and report back over a channel the
//! session owns, so all state changes happen on the session's owner when it
//! calls [`SearchSession::next_update`] or [`SearchSession::drain_updates`].
//! Each request is tagged with the generation of the search that issued it;
//! completions from an older generation are discarded on arrival.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::viewport::ScrollMetrics;
use crate::domain::entities::{PageResult, Photo};
use crate::domain::errors::{FetchError, FetchResult};
use crate::domain::ports::PhotoSearchPort;

/// Observable phase of a [`SearchSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No search has been started.
    Idle,
    /// The first page of a new query is loading.
    FetchingFirstPage,
    /// A follow-up page is loading.
    FetchingNextPage,
    /// No request in flight; results (possibly none) are available.
    IdleWithResults,
}

/// Result of applying one page completion to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A page was appended to the result list.
    PageAppended {
        /// Page number now current.
        page: u32,
        /// Total pages reported by the service.
        total_pages: u32,
        /// Number of photos appended.
        added: usize,
    },
    /// The page request failed; the result list is unchanged.
    Failed {
        /// Page that was requested.
        page: u32,
        /// Why it failed.
        error: FetchError,
    },
    /// The completion belonged to a superseded search or an already
    /// merged page and was dropped.
    Discarded {
        /// Page that was requested.
        page: u32,
    },
}

/// A finished page request, tagged with the search generation that issued it.
#[derive(Debug)]
pub struct PageCompletion {
    generation: u64,
    requested_page: u32,
    result: FetchResult<PageResult>,
}

/// Accumulates paged search results for the current query.
pub struct SearchSession {
    port: Arc<dyn PhotoSearchPort>,
    query: String,
    current_page: u32,
    total_pages: u32,
    photos: Vec<Photo>,
    pending_page: Option<u32>,
    generation: u64,
    outstanding: usize,
    completions_tx: mpsc::UnboundedSender<PageCompletion>,
    completions_rx: mpsc::UnboundedReceiver<PageCompletion>,
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("query", &self.query)
            .field("current_page", &self.current_page)
            .field("total_pages", &self.total_pages)
            .field("photos", &self.photos.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl SearchSession {
    /// Creates an idle session that searches through `port`.
    #[must_use]
    pub fn new(port: Arc<dyn PhotoSearchPort>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            port,
            query: String::new(),
            current_page: 0,
            total_pages: 1,
            photos: Vec::new(),
            pending_page: None,
            generation: 0,
            outstanding: 0,
            completions_tx,
            completions_rx,
        }
    }

    /// Starts a new search, discarding the current results.
    ///
    /// Allowed while a fetch is in flight; its completion will be dropped.
    pub fn start_search(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.generation += 1;
        self.photos.clear();
        self.current_page = 0;
        self.total_pages = 1;

        info!(query = %self.query, generation = self.generation, "Starting search");
        self.request_page(1);
    }

    /// Requests the next page if one exists and nothing is in flight.
    ///
    /// Returns true if a request was issued.
    pub fn load_next_page_if_needed(&mut self) -> bool {
        if self.generation == 0 || self.is_fetching() || !self.has_more_pages() {
            trace!(
                current_page = self.current_page,
                total_pages = self.total_pages,
                fetching = self.is_fetching(),
                "Next page not needed"
            );
            return false;
        }
        self.request_page(self.current_page + 1);
        true
    }

    /// Requests the next page when the viewport has reached the end.
    ///
    /// Returns true if a request was issued.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        metrics.reached_end() && self.load_next_page_if_needed()
    }

    /// Waits for the next page completion and applies it.
    ///
    /// Returns `None` when no request is outstanding.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        Some(self.apply(completion))
    }

    /// Applies every completion that has already arrived, without waiting.
    pub fn drain_updates(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            updates.push(self.apply(completion));
        }
        updates
    }

    /// Prefetches the images of the given rows. Unknown rows are ignored.
    pub fn prefetch_rows(&self, rows: &[usize]) {
        for photo in rows.iter().filter_map(|&row| self.photos.get(row)) {
            self.port.prefetch(photo);
        }
    }

    /// Cancels prefetches for the images of the given rows.
    pub fn cancel_prefetch_rows(&self, rows: &[usize]) {
        let urls: Vec<String> = rows
            .iter()
            .filter_map(|&row| self.photos.get(row))
            .map(|photo| photo.url().to_string())
            .collect();
        if !urls.is_empty() {
            self.port.cancel_fetches(&urls);
        }
    }

    /// Returns the current query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the last successfully merged page, 0 before the first.
    #[must_use]
    pub const fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Returns the total number of pages reported by the service.
    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Returns true while a page request for the current search is in flight.
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.pending_page.is_some()
    }

    /// Returns true if pages beyond the current one exist.
    #[must_use]
    pub const fn has_more_pages(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Returns the session phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        match self.pending_page {
            Some(1) => SessionPhase::FetchingFirstPage,
            Some(_) => SessionPhase::FetchingNextPage,
            None if self.generation == 0 => SessionPhase::Idle,
            None => SessionPhase::IdleWithResults,
        }
    }

    /// Returns the accumulated photos in display order.
    #[must_use]
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Returns the number of list rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.photos.len()
    }

    /// Returns the photo shown in `row`.
    #[must_use]
    pub fn photo_at(&self, row: usize) -> Option<&Photo> {
        self.photos.get(row)
    }

    /// Returns the height of `row` when laid out `row_width` wide.
    #[must_use]
    pub fn row_height(&self, row: usize, row_width: f64) -> Option<f64> {
        self.photos.get(row).map(|p| p.display_height(row_width))
    }

    fn request_page(&mut self, page: u32) {
        self.pending_page = Some(page);
        self.outstanding += 1;

        let port = self.port.clone();
        let tx = self.completions_tx.clone();
        let query = self.query.clone();
        let generation = self.generation;

        debug!(query = %query, page, generation, "Requesting page");
        tokio::spawn(async move {
            let result = port.search(&query, page).await;
            let _ = tx.send(PageCompletion {
                generation,
                requested_page: page,
                result,
            });
        });
    }

    fn apply(&mut self, completion: PageCompletion) -> SessionUpdate {
        self.outstanding = self.outstanding.saturating_sub(1);
        let page = completion.requested_page;

        if completion.generation != self.generation {
            debug!(
                stale = completion.generation,
                current = self.generation,
                page,
                "Discarding completion from superseded search"
            );
            return SessionUpdate::Discarded { page };
        }

        self.pending_page = None;

        match completion.result {
            Ok(result) => {
                // The service omits or zeroes the page number on some errors.
                let merged_page = if result.page == 0 { page } else { result.page };
                // A service echoing an already merged page has nothing further.
                if merged_page <= self.current_page {
                    debug!(
                        page = merged_page,
                        current = self.current_page,
                        "Duplicate page, treating as end of results"
                    );
                    self.total_pages = self.current_page;
                    return SessionUpdate::Discarded { page };
                }

                let added = result.photos.len();
                self.photos.extend(result.photos);
                self.current_page = merged_page;
                self.total_pages = result.total_pages;

                info!(
                    query = %self.query,
                    page = self.current_page,
                    total_pages = self.total_pages,
                    added,
                    rows = self.photos.len(),
                    "Page merged"
                );
                SessionUpdate::PageAppended {
                    page: self.current_page,
                    total_pages: self.total_pages,
                    added,
                }
            }
            Err(error) => {
                warn!(query = %self.query, page, error = %error, "Page request failed");
                SessionUpdate::Failed { page, error }
            }
        }
    }
}
