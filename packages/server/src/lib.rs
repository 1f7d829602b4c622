#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the traffic map dashboard.
//!
//! Serves the REST API the dashboard frontend reads: the configured
//! segments for the map layer, bucketed sample timelines, and per-bucket
//! snapshots of enriched samples. Samples come from the JSON Lines store
//! through a small metadata-checked cache; the segment index can be
//! rebuilt at runtime via `POST /api/reload`.

mod handlers;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use traffic_map_sample_models::EnrichedSample;
use traffic_map_segment::{SegmentIndex, load_config};
use traffic_map_store::{DEFAULT_STORE_PATH, SampleStore, StoreError};

/// Default path the segment configuration is loaded from.
pub const DEFAULT_CONFIG_PATH: &str = "config/segments.toml";

/// Cache of the parsed sample history, keyed on store file metadata.
///
/// The poller appends to the store between requests; a request only
/// pays the full reparse when the file's modification time or size
/// changed since the last read.
pub struct SampleCache {
    store: SampleStore,
    snapshot: Option<CachedSnapshot>,
}

struct CachedSnapshot {
    modified: Option<SystemTime>,
    len: u64,
    samples: Arc<Vec<EnrichedSample>>,
}

impl SampleCache {
    /// Creates an empty cache over `store`.
    #[must_use]
    pub const fn new(store: SampleStore) -> Self {
        Self {
            store,
            snapshot: None,
        }
    }

    /// Returns the current sample history, reparsing the store file only
    /// when its metadata changed since the last read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store file exists but cannot be
    /// read.
    pub fn samples(&mut self) -> Result<Arc<Vec<EnrichedSample>>, StoreError> {
        // A missing store file reads as empty history downstream, so it
        // caches as (None, 0) rather than erroring here.
        let (modified, len) = std::fs::metadata(self.store.path())
            .map_or((None, 0), |meta| (meta.modified().ok(), meta.len()));

        if let Some(snapshot) = &self.snapshot
            && snapshot.modified == modified
            && snapshot.len == len
        {
            return Ok(Arc::clone(&snapshot.samples));
        }

        let samples = Arc::new(self.store.read_all()?);
        self.snapshot = Some(CachedSnapshot {
            modified,
            len,
            samples: Arc::clone(&samples),
        });
        Ok(samples)
    }
}

/// Shared application state.
pub struct AppState {
    /// Resolved segment index, swapped wholesale on reload. Handlers
    /// clone the inner `Arc` so in-flight requests keep their snapshot.
    pub index: RwLock<Arc<SegmentIndex>>,
    /// Parsed sample history cache over the JSON Lines store.
    pub cache: Mutex<SampleCache>,
    /// Path the segment configuration is reloaded from.
    pub config_path: PathBuf,
}

/// Starts the traffic map API server.
///
/// Loads the segment configuration, builds the index, and starts the
/// Actix-Web HTTP server. This is a regular async function; the caller
/// is responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if the segment configuration cannot be loaded.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config_path = std::env::var("SEGMENTS_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let store_path = std::env::var("SAMPLE_STORE")
        .map_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from);

    log::info!(
        "Loading segment configuration from {}...",
        config_path.display()
    );
    let config = load_config(&config_path).expect("Failed to load segment configuration");
    let index = SegmentIndex::build(&config.segments);

    let state = web::Data::new(AppState {
        index: RwLock::new(Arc::new(index)),
        cache: Mutex::new(SampleCache::new(SampleStore::new(store_path))),
        config_path,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/segments", web::get().to(handlers::segments))
                    .route("/timeline", web::get().to(handlers::timeline))
                    .route("/snapshot", web::get().to(handlers::snapshot))
                    .route("/reload", web::post().to(handlers::reload)),
            )
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
