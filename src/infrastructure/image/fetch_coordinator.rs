//! Search and image fetch orchestration.
//!
//! Every image URL has at most one download in flight. Callers asking for
//! the same URL while it downloads join the existing task and share its
//! outcome. Downloads started only by [`FetchCoordinator::prefetch`] can be
//! aborted with [`FetchCoordinator::cancel_fetches`]; once a foreground
//! caller joins, the download runs to completion.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use tokio::sync::{Semaphore, watch};
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

use crate::domain::entities::{ImageSource, LoadedImage, PageResult, Photo};
use crate::domain::errors::{FetchError, FetchResult};
use crate::domain::ports::{HttpTransport, ImageCachePort, PhotoSearchPort};
use crate::infrastructure::flickr::{SearchEndpoint, parse_search_bytes};

/// Default maximum concurrent image downloads.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

type ImageOutcome = FetchResult<Arc<image::DynamicImage>>;
type InFlightTable = Arc<Mutex<HashMap<String, InFlight>>>;

struct InFlight {
    id: u64,
    foreground: bool,
    outcome: watch::Receiver<Option<ImageOutcome>>,
    abort: AbortHandle,
}

/// Single path from a query or photo to data.
pub struct FetchCoordinator {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn ImageCachePort>,
    endpoint: SearchEndpoint,
    in_flight: InFlightTable,
    downloads: Arc<Semaphore>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("endpoint", &self.endpoint)
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

impl FetchCoordinator {
    /// Creates a coordinator over the given transport, cache and endpoint.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn ImageCachePort>,
        endpoint: SearchEndpoint,
    ) -> Self {
        Self {
            transport,
            cache,
            endpoint,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            downloads: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_DOWNLOADS)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Limits how many image downloads run at once.
    #[must_use]
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.downloads = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// Fetches one page of search results.
    ///
    /// # Errors
    /// `InvalidUrl` if the request cannot be built, `Transport` on network
    /// failure, `MalformedResponse` if the body cannot be parsed.
    pub async fn search_photos(&self, query: &str, page: u32) -> FetchResult<PageResult> {
        let url = self.endpoint.search_url(query, page)?;
        debug!(query, page, "Searching photos");

        let body = self.transport.get(&url).await.map_err(|e| {
            warn!(query, page, error = %e, "Search request failed");
            e
        })?;

        let result = parse_search_bytes(&body).map_err(|e| {
            warn!(query, page, error = %e, "Failed to parse search response");
            FetchError::from(e)
        })?;

        debug!(
            query,
            page = result.page,
            total_pages = result.total_pages,
            count = result.photos.len(),
            "Search page received"
        );
        Ok(result)
    }

    /// Resolves the image for `photo`, from cache when possible.
    ///
    /// # Errors
    /// `InvalidUrl` for an unparsable photo URL, `Transport` or
    /// `DecodeFailure` if the download fails, `Cancelled` if a shared
    /// download was aborted.
    pub async fn fetch_image(&self, photo: &Photo) -> FetchResult<LoadedImage> {
        if let Some(image) = self.cache.get(photo.url()).await {
            return Ok(LoadedImage {
                url: photo.url().to_string(),
                image,
                source: ImageSource::MemoryCache,
            });
        }

        let outcome = self.join_or_start(photo.url(), true)?;
        let image = wait_for_outcome(outcome, photo.url()).await?;

        Ok(LoadedImage {
            url: photo.url().to_string(),
            image,
            source: ImageSource::Network,
        })
    }

    /// Starts loading `photo` into the cache without waiting for it.
    pub fn prefetch(&self, photo: &Photo) {
        if self.cache.contains(photo.url()) {
            trace!(url = photo.url(), "Prefetch skipped, already cached");
            return;
        }
        match self.join_or_start(photo.url(), false) {
            Ok(_) => trace!(url = photo.url(), "Prefetch scheduled"),
            Err(e) => debug!(url = photo.url(), error = %e, "Prefetch skipped"),
        }
    }

    /// Aborts prefetch-only downloads for the given URLs.
    ///
    /// Unknown, finished and foreground downloads are left alone.
    pub fn cancel_fetches(&self, urls: &[String]) {
        let mut table = self.in_flight.lock();
        let mut cancelled = 0_usize;

        for url in urls {
            let Some(entry) = table.get(url.as_str()) else {
                continue;
            };
            if entry.foreground {
                trace!(url = %url, "Not cancelling download with a waiting caller");
                continue;
            }
            if let Some(entry) = table.remove(url.as_str()) {
                entry.abort.abort();
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            debug!(cancelled, "Cancelled prefetches");
        }
    }

    /// Returns the number of downloads in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Returns true if a download for `url` is in flight.
    #[must_use]
    pub fn is_in_flight(&self, url: &str) -> bool {
        self.in_flight.lock().contains_key(url)
    }

    fn join_or_start(
        &self,
        url: &str,
        foreground: bool,
    ) -> FetchResult<watch::Receiver<Option<ImageOutcome>>> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let mut table = self.in_flight.lock();
        if let Some(entry) = table.get_mut(url) {
            entry.foreground |= foreground;
            trace!(url, "Joining in-flight download");
            return Ok(entry.outcome.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        let task = DownloadTask {
            id,
            url: url.to_string(),
            parsed,
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            in_flight: self.in_flight.clone(),
            downloads: self.downloads.clone(),
        };
        let handle = tokio::spawn(task.run(tx));

        table.insert(
            url.to_string(),
            InFlight {
                id,
                foreground,
                outcome: rx.clone(),
                abort: handle.abort_handle(),
            },
        );
        Ok(rx)
    }
}

async fn wait_for_outcome(
    mut outcome: watch::Receiver<Option<ImageOutcome>>,
    url: &str,
) -> ImageOutcome {
    let published = outcome
        .wait_for(Option::is_some)
        .await
        .map_err(|_| FetchError::cancelled(url))?
        .clone();
    published.unwrap_or_else(|| Err(FetchError::cancelled(url)))
}

/// One image download, run on its own task.
struct DownloadTask {
    id: u64,
    url: String,
    parsed: Url,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn ImageCachePort>,
    in_flight: InFlightTable,
    downloads: Arc<Semaphore>,
}

impl DownloadTask {
    async fn run(self, tx: watch::Sender<Option<ImageOutcome>>) {
        let outcome = match self.download().await {
            Ok((image, ImageSource::Network)) => {
                self.cache.put(self.url.clone(), image.clone()).await;
                debug!(url = %self.url, "Image loaded");
                Ok(image)
            }
            Ok((image, ImageSource::MemoryCache)) => {
                trace!(url = %self.url, "Image cached while queued");
                Ok(image)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Image fetch failed");
                Err(e)
            }
        };

        tx.send_replace(Some(outcome));

        let mut table = self.in_flight.lock();
        if table.get(&self.url).is_some_and(|entry| entry.id == self.id) {
            table.remove(&self.url);
        }
    }

    /// Only a `Network` result is new to the cache.
    async fn download(&self) -> FetchResult<(Arc<image::DynamicImage>, ImageSource)> {
        if let Some(image) = self.cache.get(&self.url).await {
            return Ok((image, ImageSource::MemoryCache));
        }

        let _permit = self
            .downloads
            .acquire()
            .await
            .map_err(|_| FetchError::cancelled(&self.url))?;

        debug!(url = %self.url, "Downloading image");
        let bytes = self.transport.get(&self.parsed).await?;

        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| FetchError::decode(format!("decode task panicked: {e}")))?
            .map_err(|e| FetchError::decode(e.to_string()))?;

        Ok((Arc::new(decoded), ImageSource::Network))
    }
}

#[async_trait]
impl PhotoSearchPort for FetchCoordinator {
    async fn search(&self, query: &str, page: u32) -> FetchResult<PageResult> {
        self.search_photos(query, page).await
    }

    async fn fetch_image(&self, photo: &Photo) -> FetchResult<LoadedImage> {
        Self::fetch_image(self, photo).await
    }

    fn prefetch(&self, photo: &Photo) {
        Self::prefetch(self, photo);
    }

    fn cancel_fetches(&self, urls: &[String]) {
        Self::cancel_fetches(self, urls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;

    use bytes::Bytes;
    use tokio_test::{assert_err, assert_ok};

    use crate::domain::ports::mocks::MockHttpTransport;
    use crate::infrastructure::image::MemoryImageCache;

    const PHOTO_URL: &str = "https://live.staticflickr.com/65535/1_abc_m.jpg";

    fn png_bytes() -> Bytes {
        let mut buf = Vec::new();
        image::DynamicImage::new_rgb8(4, 3)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    fn photo() -> Photo {
        Photo::new(PHOTO_URL, 4.0, 3.0)
    }

    fn coordinator(
        transport: impl HttpTransport + 'static,
    ) -> (FetchCoordinator, Arc<MemoryImageCache>) {
        let cache = Arc::new(MemoryImageCache::with_capacity(16));
        let coordinator = FetchCoordinator::new(
            Arc::new(transport),
            cache.clone(),
            SearchEndpoint::new("test-key"),
        );
        (coordinator, cache)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    /// Transport that blocks every request until the gate opens.
    struct GatedTransport {
        gate: Semaphore,
        calls: AtomicUsize,
        body: Bytes,
    }

    impl GatedTransport {
        fn new(body: Bytes) -> Self {
            Self {
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
                body,
            }
        }

        fn open(&self) {
            self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for GatedTransport {
        async fn get(&self, _url: &Url) -> FetchResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| FetchError::transport("gate closed"))?;
            Ok(self.body.clone())
        }
    }

    fn gated() -> (Arc<GatedTransport>, FetchCoordinator, Arc<MemoryImageCache>) {
        let transport = Arc::new(GatedTransport::new(png_bytes()));
        let cache = Arc::new(MemoryImageCache::with_capacity(16));
        let coordinator = FetchCoordinator::new(
            transport.clone(),
            cache.clone(),
            SearchEndpoint::new("test-key"),
        );
        (transport, coordinator, cache)
    }

    /// Cache that counts writes reaching it.
    #[derive(Default)]
    struct CountingCache {
        inner: MemoryImageCache,
        puts: AtomicUsize,
    }

    impl CountingCache {
        fn puts(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageCachePort for CountingCache {
        async fn get(&self, key: &str) -> Option<Arc<image::DynamicImage>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: String, image: Arc<image::DynamicImage>) {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, image).await;
        }

        async fn evict(&self, key: &str) {
            self.inner.evict(key).await;
        }

        fn contains(&self, key: &str) -> bool {
            self.inner.contains(key)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        async fn clear(&self) {
            self.inner.clear().await;
        }
    }

    fn counted() -> (Arc<GatedTransport>, FetchCoordinator, Arc<CountingCache>) {
        let transport = Arc::new(GatedTransport::new(png_bytes()));
        let cache = Arc::new(CountingCache::default());
        let coordinator = FetchCoordinator::new(
            transport.clone(),
            cache.clone(),
            SearchEndpoint::new("test-key"),
        );
        (transport, coordinator, cache)
    }

    #[tokio::test]
    async fn test_search_parses_page() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .withf(|url| url.query_pairs().any(|(k, v)| k == "text" && v == "sunset"))
            .times(1)
            .returning(|_| {
                Ok(Bytes::from_static(
                    br#"{"photos":{"page":1,"pages":3,"photo":[{"url_s":"a.jpg","width_s":"100","height_s":"50"}]},"stat":"ok"}"#,
                ))
            });
        let (coordinator, _) = coordinator(transport);

        let page = assert_ok!(coordinator.search_photos("sunset", 1).await);

        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.photos, vec![Photo::new("a.jpg", 100.0, 50.0)]);
    }

    #[tokio::test]
    async fn test_search_malformed_response() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .returning(|_| Ok(Bytes::from_static(br#"{"stat":"ok"}"#)));
        let (coordinator, _) = coordinator(transport);

        let err = assert_err!(coordinator.search_photos("x", 1).await);
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_search_transport_failure() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .returning(|_| Err(FetchError::transport("offline")));
        let (coordinator, _) = coordinator(transport);

        let err = assert_err!(coordinator.search_photos("x", 1).await);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_search_invalid_page_issues_no_request() {
        let mut transport = MockHttpTransport::new();
        transport.expect_get().never();
        let (coordinator, _) = coordinator(transport);

        let err = assert_err!(coordinator.search_photos("x", 0).await);
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_fetch_image_caches_and_second_call_hits_cache() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_| Ok(png_bytes()));
        let (coordinator, cache) = coordinator(transport);

        let first = assert_ok!(coordinator.fetch_image(&photo()).await);
        assert_eq!(first.source, ImageSource::Network);
        assert_eq!((first.width(), first.height()), (4, 3));
        assert!(cache.peek(PHOTO_URL).await.is_some());

        let second = assert_ok!(coordinator.fetch_image(&photo()).await);
        assert_eq!(second.source, ImageSource::MemoryCache);
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure_caches_nothing() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .returning(|_| Ok(Bytes::from_static(b"<html>not an image</html>")));
        let (coordinator, cache) = coordinator(transport);

        let err = assert_err!(coordinator.fetch_image(&photo()).await);
        assert!(matches!(err, FetchError::DecodeFailure { .. }));
        assert!(cache.is_empty());
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_caches_nothing() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .returning(|_| Err(FetchError::transport("HTTP 404: Not Found")));
        let (coordinator, cache) = coordinator(transport);

        let err = assert_err!(coordinator.fetch_image(&photo()).await);
        assert!(err.is_transport());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_photo_url() {
        let mut transport = MockHttpTransport::new();
        transport.expect_get().never();
        let (coordinator, _) = coordinator(transport);

        let err = assert_err!(coordinator.fetch_image(&Photo::new("a.jpg", 1.0, 1.0)).await);
        assert_eq!(err, FetchError::invalid_url("a.jpg"));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_download() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_| Ok(png_bytes()));
        let (coordinator, _) = coordinator(transport);
        let p = photo();

        let (a, b) = tokio::join!(coordinator.fetch_image(&p), coordinator.fetch_image(&p));

        assert_ok!(a);
        assert_ok!(b);
    }

    #[tokio::test]
    async fn test_prefetch_then_fetch_joins_download() {
        let (transport, coordinator, _) = gated();

        coordinator.prefetch(&photo());
        settle().await;
        assert!(coordinator.is_in_flight(PHOTO_URL));

        transport.open();
        let loaded = assert_ok!(coordinator.fetch_image(&photo()).await);

        assert_eq!(loaded.url, PHOTO_URL);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_aborts_prefetch() {
        let (transport, coordinator, cache) = gated();

        coordinator.prefetch(&photo());
        settle().await;
        coordinator.cancel_fetches(&[PHOTO_URL.to_string()]);
        assert!(!coordinator.is_in_flight(PHOTO_URL));

        transport.open();
        settle().await;
        assert!(cache.peek(PHOTO_URL).await.is_none());

        // A later request downloads again.
        assert_ok!(coordinator.fetch_image(&photo()).await);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_leaves_foreground_fetch_alone() {
        let (transport, coordinator, _) = gated();
        let p = photo();

        let fetch = coordinator.fetch_image(&p);
        tokio::pin!(fetch);
        assert!(futures_util::poll!(fetch.as_mut()).is_pending());
        settle().await;

        coordinator.cancel_fetches(&[PHOTO_URL.to_string()]);
        assert!(coordinator.is_in_flight(PHOTO_URL));

        transport.open();
        assert_ok!(fetch.await);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let (transport, coordinator, cache) = gated();
        transport.open();

        assert_ok!(coordinator.fetch_image(&photo()).await);
        coordinator.cancel_fetches(&[PHOTO_URL.to_string(), "https://x/unknown.jpg".to_string()]);

        assert!(cache.peek(PHOTO_URL).await.is_some());
        let again = assert_ok!(coordinator.fetch_image(&photo()).await);
        assert_eq!(again.source, ImageSource::MemoryCache);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_evicted_entry_is_refetched() {
        let (transport, coordinator, cache) = gated();
        transport.open();

        assert_ok!(coordinator.fetch_image(&photo()).await);
        cache.purge().await;
        let again = assert_ok!(coordinator.fetch_image(&photo()).await);

        assert_eq!(again.source, ImageSource::Network);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_prefetch_of_cached_photo_writes_nothing() {
        let (transport, coordinator, cache) = counted();
        transport.open();

        assert_ok!(coordinator.fetch_image(&photo()).await);
        assert_eq!(cache.puts(), 1);

        coordinator.prefetch(&photo());
        assert!(!coordinator.is_in_flight(PHOTO_URL));
        settle().await;

        assert_eq!(cache.puts(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_download_finding_cached_image_does_not_rewrite_it() {
        let (transport, coordinator, cache) = counted();
        let seeded = Arc::new(image::DynamicImage::new_rgb8(2, 2));
        cache.inner.put(PHOTO_URL.to_string(), seeded).await;

        let outcome = assert_ok!(coordinator.join_or_start(PHOTO_URL, true));
        let image = assert_ok!(wait_for_outcome(outcome, PHOTO_URL).await);

        assert_eq!(image.width(), 2);
        assert_eq!(cache.puts(), 0);
        assert_eq!(transport.calls(), 0);
        settle().await;
        assert!(!coordinator.is_in_flight(PHOTO_URL));
    }

    #[tokio::test]
    async fn test_prefetch_and_fetch_race_writes_once() {
        let (transport, coordinator, cache) = counted();

        coordinator.prefetch(&photo());
        settle().await;
        let fetched_photo = photo();
        let fetch = coordinator.fetch_image(&fetched_photo);
        transport.open();
        assert_ok!(fetch.await);
        coordinator.prefetch(&photo());
        settle().await;

        assert_eq!(cache.puts(), 1);
        assert_eq!(transport.calls(), 1);
    }
}
