//! PhotoWallet Core Library
//!
//! Local persistence and ordering for a small photo wallet: users import a
//! handful of images, browse and reorder them, and the collection survives
//! restarts. This crate is frontend-agnostic; a UI drives it through
//! [`PhotoRepository`] and receives progress through an [`EventSink`].
//!
//! # Architecture
//!
//! - `models`: Data structures (Photo, CandidateFile, AppSettings, exports)
//! - `db`: SQLite store implementing the `PhotoStore` trait
//! - `services`: Validation, repository, settings and display handles
//! - `events`: Event emission abstraction (EventSink trait)
//! - `paths`: Path provider abstraction (PathProvider trait)
//! - `utils`: Error handling and utilities
//!
//! # Example
//!
//! ```no_run
//! use photowallet_core::{
//!     events::NoOpEventSink, models::CandidateFile, paths::DefaultPathProvider,
//!     PhotowalletCore,
//! };
//! use std::sync::Arc;
//!
//! let core = PhotowalletCore::new(
//!     Arc::new(DefaultPathProvider::new()),
//!     Arc::new(NoOpEventSink),
//! )
//! .unwrap();
//!
//! let data = std::fs::read("holiday.jpg").unwrap();
//! let result = core
//!     .repository()
//!     .add_photos(vec![CandidateFile::new("holiday.jpg", "image/jpeg", data)]);
//! println!("added {} photos", result.success.len());
//! ```

pub mod db;
pub mod events;
pub mod models;
pub mod paths;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use db::{Database, DatabaseStats, PhotoStore, SharedPhotoStore};
pub use events::{EventSink, LoggingEventSink, NoOpEventSink, SharedEventSink};
pub use models::{AppSettings, CandidateFile, Photo, PhotoId, PhotoLimits, PhotoUploadResult};
pub use paths::{DefaultPathProvider, PathProvider, SharedPathProvider};
pub use services::{BlobUrl, BlobUrlRegistry, PhotoRepository, SettingsManager};
pub use utils::{AppError, AppResult, ErrorNotice};

use std::path::PathBuf;
use std::sync::Arc;

use models::{ExportData, ImportResult};
use services::validation::validate_limits;

/// PhotoWallet core application context.
///
/// Holds the shared resources a frontend needs: the database, settings,
/// the photo repository and the display handle registry.
pub struct PhotowalletCore {
    /// Database connection
    pub db: Arc<Database>,
    /// Path provider for resolving application paths
    pub path_provider: SharedPathProvider,
    /// Event sink for emitting events to the frontend
    pub event_sink: SharedEventSink,
    settings: SettingsManager,
    repository: Arc<PhotoRepository>,
    blob_urls: BlobUrlRegistry,
}

impl PhotowalletCore {
    /// Open the database under the provider's data directory and load
    /// the persisted settings.
    pub fn new(path_provider: SharedPathProvider, event_sink: SharedEventSink) -> AppResult<Self> {
        let db = Database::open_with_provider(path_provider.as_ref())?;
        Self::with_database(db, path_provider, event_sink)
    }

    /// Build the context around an already opened database.
    pub fn with_database(
        db: Database,
        path_provider: SharedPathProvider,
        event_sink: SharedEventSink,
    ) -> AppResult<Self> {
        db.init()?;

        let settings = SettingsManager::new(db.clone());
        let mut limits = settings.load()?.limits;
        if let Err(e) = validate_limits(&limits) {
            tracing::warn!("Stored limits are invalid, using defaults: {}", e);
            limits = PhotoLimits::default();
        }

        let db = Arc::new(db);
        let store: SharedPhotoStore = db.clone();
        let repository =
            Arc::new(PhotoRepository::new(store, limits).with_event_sink(event_sink.clone()));

        tracing::info!("PhotoWallet core ready: {:?}", db.path());

        Ok(Self {
            db,
            path_provider,
            event_sink,
            settings,
            repository,
            blob_urls: BlobUrlRegistry::new(),
        })
    }

    /// Get the database reference.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Get the path provider reference.
    pub fn paths(&self) -> &SharedPathProvider {
        &self.path_provider
    }

    /// Get the event sink reference.
    pub fn events(&self) -> &SharedEventSink {
        &self.event_sink
    }

    /// Get the photo repository.
    pub fn repository(&self) -> &Arc<PhotoRepository> {
        &self.repository
    }

    /// Get the settings manager.
    pub fn settings(&self) -> &SettingsManager {
        &self.settings
    }

    /// Get the display handle registry.
    pub fn blob_urls(&self) -> &BlobUrlRegistry {
        &self.blob_urls
    }

    /// Persist settings and apply the new limits to the repository.
    pub fn save_settings(&self, settings: &AppSettings) -> AppResult<()> {
        self.settings.save(settings)?;
        self.repository.set_limits(settings.limits.clone())
    }

    /// Export every photo together with the current settings.
    pub fn export_data(&self) -> AppResult<ExportData> {
        let settings = self.settings.load()?;
        self.repository.export_data(settings)
    }

    /// Export the wallet as a JSON file under the provider's exports
    /// directory and return the written path.
    pub fn export_to_file(&self) -> AppResult<PathBuf> {
        let data = self.export_data()?;
        let dir = self.path_provider.exports_dir();
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(PhotoRepository::export_file_name(&data));
        let json = serde_json::to_vec_pretty(&data)?;
        std::fs::write(&path, json)?;

        tracing::info!("Exported {} photos to {:?}", data.photos.len(), path);
        Ok(path)
    }

    /// Import photos through the normal validated path, then the settings.
    pub fn import_data(&self, data: &ExportData) -> AppResult<ImportResult> {
        let mut result = self.repository.import_data(data);

        match self.save_settings(&data.settings) {
            Ok(()) => result.settings_imported = true,
            Err(e) => {
                tracing::warn!("Failed to import settings: {}", e);
                result.errors.push(e.to_string());
            }
        }

        Ok(result)
    }
}
