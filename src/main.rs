use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use photo_search::application::{RowImageSlots, RowImageUpdate, RowToken, SearchSession, SessionUpdate};
use photo_search::domain::ImageStatus;
use photo_search::infrastructure::{
    AppConfig, CliArgs, FetchCoordinator, MemoryImageCache, ReqwestTransport, SearchEndpoint,
    StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config.sanitized())
}

fn create_coordinator(config: &AppConfig, cache: Arc<MemoryImageCache>) -> Result<FetchCoordinator> {
    if config.search.api_key.is_empty() {
        bail!("no API key configured; set PHOTO_SEARCH_API_KEY or [search].api_key");
    }

    let transport = Arc::new(ReqwestTransport::with_timeout(Duration::from_secs(
        config.images.timeout_secs,
    ))?);
    let endpoint = SearchEndpoint::with_base_url(&config.search.base_url, &config.search.api_key)
        .with_per_page(config.search.per_page);

    Ok(FetchCoordinator::new(transport, cache, endpoint)
        .with_max_concurrent_downloads(config.images.max_concurrent_downloads))
}

async fn load_rows(
    session: &SearchSession,
    slots: &mut RowImageSlots,
    rows: std::ops::Range<usize>,
    row_width: f64,
) {
    for row in rows.clone() {
        if let Some(photo) = session.photo_at(row) {
            slots.bind(RowToken(row as u64), photo);
        }
    }

    while let Some(update) = slots.next_update().await {
        if let RowImageUpdate::Failed(token) = update {
            warn!(%token, "Image failed to load");
        }
    }

    for row in rows {
        let Some(photo) = session.photo_at(row) else {
            continue;
        };
        let height = photo.display_height(row_width);
        let decoded = match slots.status(RowToken(row as u64)) {
            Some(ImageStatus::Ready(image)) => {
                format!("{}x{} ({})", image.width(), image.height(), image.source)
            }
            Some(ImageStatus::Failed(reason)) => format!("failed: {reason}"),
            _ => "not loaded".to_string(),
        };
        println!(
            "{row:>4}  {}  {}x{}  row {height:.1}px  {decoded}",
            photo.url(),
            photo.width(),
            photo.height()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = photo_search::VERSION, query = %args.query, "Starting search");

    let cache = Arc::new(MemoryImageCache::new(config.images.cache_policy()));
    let coordinator = Arc::new(create_coordinator(&config, cache.clone())?);

    let mut session = SearchSession::new(coordinator.clone());
    let mut slots = RowImageSlots::new(coordinator);
    session.start_search(args.query.clone());

    while let Some(update) = session.next_update().await {
        match update {
            SessionUpdate::PageAppended {
                page,
                total_pages,
                added,
            } => {
                info!(page, total_pages, added, "Page loaded");
                let end = session.row_count();
                let rows: Vec<usize> = (end - added..end).collect();
                if args.prefetch {
                    session.prefetch_rows(&rows);
                }
                load_rows(&session, &mut slots, end - added..end, args.row_width).await;

                if page < args.pages {
                    session.load_next_page_if_needed();
                }
            }
            SessionUpdate::Failed { page, error } => {
                bail!("page {page} failed: {error}");
            }
            SessionUpdate::Discarded { page } => {
                warn!(page, "Discarded stale page");
            }
        }
    }

    if session.row_count() == 0 {
        println!("No photos found for {:?}", session.query());
    }
    eprintln!("{}", cache.stats().await);

    Ok(())
}
