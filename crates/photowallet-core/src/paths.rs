//! Path provider abstraction.
//!
//! Resolves application data paths so the core never hard-codes where a
//! frontend keeps its files.

use std::path::PathBuf;
use std::sync::Arc;

/// Trait for providing application data paths.
pub trait PathProvider: Send + Sync {
    /// Get the root application data directory.
    fn app_data_dir(&self) -> PathBuf;

    /// Get the database directory.
    fn database_dir(&self) -> PathBuf {
        self.app_data_dir().join("Database")
    }

    /// Get the logs directory.
    fn logs_dir(&self) -> PathBuf {
        self.app_data_dir().join("Logs")
    }

    /// Get the directory used for exported wallets.
    fn exports_dir(&self) -> PathBuf {
        self.app_data_dir().join("Exports")
    }

    /// Get the database file path.
    fn database_path(&self) -> PathBuf {
        self.database_dir().join("photowallet.db")
    }
}

/// Shared reference to a PathProvider implementation.
pub type SharedPathProvider = Arc<dyn PathProvider>;

/// Default path provider using the platform data directory
/// (e.g. `~/.local/share/PhotoWallet` on Linux).
#[derive(Debug, Clone)]
pub struct DefaultPathProvider {
    app_data_dir: PathBuf,
}

impl DefaultPathProvider {
    pub fn new() -> Self {
        let app_data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("PhotoWallet");
        Self { app_data_dir }
    }

    /// Create a provider rooted at a custom base directory.
    ///
    /// Useful for testing.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            app_data_dir: base_dir,
        }
    }
}

impl Default for DefaultPathProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PathProvider for DefaultPathProvider {
    fn app_data_dir(&self) -> PathBuf {
        self.app_data_dir.clone()
    }
}
