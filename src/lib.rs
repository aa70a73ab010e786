//! PhotoWallet - 本地照片钱包
//!
//! 前端使用的入口：初始化日志，打开核心库，并提供与存储保持同步的
//! 视图模型 [`PhotoWalletStore`]。

pub mod state;

use std::path::Path;
use std::sync::Arc;

use photowallet_core::{
    AppResult, DefaultPathProvider, LoggingEventSink, PathProvider, PhotowalletCore,
    SharedEventSink, SharedPathProvider,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub use photowallet_core;
pub use state::{AppView, PhotoWalletState, PhotoWalletStore, SyncPhase};

/// 日志文件名前缀
const LOG_FILE_NAME: &str = "photowallet.log";

/// 应用程序状态
pub struct AppState {
    pub core: PhotowalletCore,
    pub wallet: PhotoWalletStore,
}

impl AppState {
    pub fn new(path_provider: SharedPathProvider, event_sink: SharedEventSink) -> AppResult<Self> {
        let core = PhotowalletCore::new(path_provider, event_sink)?;
        let wallet = PhotoWalletStore::new(Arc::clone(core.repository()));
        Ok(Self { core, wallet })
    }

    /// 使用默认数据目录
    pub fn open_default() -> AppResult<Self> {
        Self::new(
            Arc::new(DefaultPathProvider::new()),
            Arc::new(LoggingEventSink),
        )
    }
}

/// 初始化日志系统
///
/// 始终输出到控制台；指定目录时另外按天滚动写入文件。返回的
/// [`WorkerGuard`] 需要保持到程序退出，否则缓冲中的日志会丢失。
/// 重复调用不会覆盖已安装的订阅者。
pub fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("日志系统已初始化，跳过");
    }

    guard
}

/// 启动：初始化日志并打开应用程序状态
pub fn bootstrap(path_provider: SharedPathProvider) -> AppResult<(AppState, Option<WorkerGuard>)> {
    let logs_dir = path_provider.logs_dir();
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("无法创建日志目录 {:?}: {}", logs_dir, e);
    }
    let guard = init_logging(Some(&logs_dir));

    tracing::info!("PhotoWallet 启动中...");
    tracing::info!("数据库路径: {:?}", path_provider.database_path());

    let state = AppState::new(path_provider, Arc::new(LoggingEventSink))?;
    tracing::info!("数据库初始化完成");

    Ok((state, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bootstrap_opens_empty_wallet() {
        let tmp = TempDir::new().unwrap();
        let provider: SharedPathProvider =
            Arc::new(DefaultPathProvider::with_base_dir(tmp.path().to_path_buf()));

        let (state, _guard) = bootstrap(provider).unwrap();
        assert!(tmp.path().join("Logs").exists());

        state.wallet.load_photos().await.unwrap();
        let snapshot = state.wallet.snapshot();
        assert!(snapshot.photos.is_empty());
        assert_eq!(snapshot.current_view, AppView::Welcome);
    }

    #[test]
    fn test_init_logging_twice() {
        let _first = init_logging(None);
        let _second = init_logging(None);
    }
}
