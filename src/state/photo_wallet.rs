//! 照片钱包视图模型
//!
//! 持有照片列表的内存副本、当前位置和当前视图，并在每次状态变化后
//! 通知订阅者。所有写操作都经过 [`PhotoRepository`]，视图模型从不直接
//! 写存储。仓库调用在 `spawn_blocking` 中执行。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use photowallet_core::models::{CandidateFile, Photo, PhotoId, PhotoUploadResult};
use photowallet_core::utils::{AppError, AppResult, ErrorNotice};
use photowallet_core::PhotoRepository;
use serde::{Deserialize, Serialize};

/// 当前视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AppView {
    #[default]
    Welcome,
    Manager,
    Viewer,
    Settings,
}

/// 写操作所处阶段
///
/// `Idle → Mutating → Reconciled | RolledBack`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    #[default]
    Idle,
    /// 本地已更新，等待存储确认
    Mutating,
    /// 已与存储结果对齐
    Reconciled,
    /// 写入失败，已恢复为存储中的内容
    RolledBack,
}

/// 视图模型状态
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoWalletState {
    pub photos: Vec<Photo>,
    pub current_index: usize,
    pub current_view: AppView,
    pub phase: SyncPhase,
    pub is_loading: bool,
    /// 导入进度 (0-100)，未在导入时为 None
    pub upload_progress: Option<f32>,
    pub error: Option<ErrorNotice>,
}

impl PhotoWalletState {
    /// 当前位置的照片
    pub fn current_photo(&self) -> Option<&Photo> {
        self.photos.get(self.current_index)
    }

    fn clamp_index(&mut self) {
        self.current_index = clamp_index(self.current_index, self.photos.len());
    }
}

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&PhotoWalletState) + Send + Sync>;

#[derive(Default)]
struct Shared {
    state: Mutex<PhotoWalletState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_listener: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, PhotoWalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 修改状态并通知订阅者（通知时不持有锁）
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PhotoWalletState),
    {
        let snapshot = {
            let mut state = self.state();
            f(&mut state);
            state.clone()
        };

        let listeners: Vec<Listener> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

/// 照片钱包状态容器
pub struct PhotoWalletStore {
    repository: Arc<PhotoRepository>,
    shared: Arc<Shared>,
}

impl PhotoWalletStore {
    pub fn new(repository: Arc<PhotoRepository>) -> Self {
        Self {
            repository,
            shared: Arc::new(Shared::default()),
        }
    }

    /// 当前状态的快照
    pub fn snapshot(&self) -> PhotoWalletState {
        self.shared.state().clone()
    }

    /// 订阅状态变化
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PhotoWalletState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners().push((id, Arc::new(listener)));
        id
    }

    /// 取消订阅，返回是否存在该订阅
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.shared.listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// 在阻塞线程池中调用仓库
    async fn run_blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&PhotoRepository) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let repository = Arc::clone(&self.repository);
        tokio::task::spawn_blocking(move || f(&repository))
            .await
            .map_err(|e| AppError::General(format!("后台任务失败: {}", e)))?
    }

    fn fail(&self, err: &AppError, phase: SyncPhase) {
        tracing::warn!("操作失败: {}", err);
        let notice = ErrorNotice::from(err);
        self.shared.update(|state| {
            state.is_loading = false;
            state.upload_progress = None;
            state.phase = phase;
            state.error = Some(notice);
        });
    }

    // ==================== 同步操作 ====================

    /// 从仓库重新加载照片
    pub async fn load_photos(&self) -> AppResult<()> {
        self.shared.update(|state| state.is_loading = true);

        let result = self
            .run_blocking(|repo| Ok((repo.list_photos()?, repo.current_index())))
            .await;

        match result {
            Ok((photos, cursor)) => {
                tracing::debug!("已加载 {} 张照片", photos.len());
                self.shared.update(|state| {
                    state.current_view = if photos.is_empty() {
                        AppView::Welcome
                    } else {
                        AppView::Manager
                    };
                    state.photos = photos;
                    state.current_index = cursor;
                    state.clamp_index();
                    state.is_loading = false;
                    state.phase = SyncPhase::Reconciled;
                });
                Ok(())
            }
            Err(err) => {
                self.fail(&err, SyncPhase::Idle);
                Err(err)
            }
        }
    }

    /// 批量导入照片
    ///
    /// 成功导入的照片合并进列表并切换到管理视图；单个文件的失败以第一条
    /// 错误提示显示。
    pub async fn add_photos(&self, files: Vec<CandidateFile>) -> AppResult<PhotoUploadResult> {
        self.shared.update(|state| {
            state.is_loading = true;
            state.upload_progress = Some(0.0);
            state.phase = SyncPhase::Mutating;
            state.error = None;
        });

        let shared = Arc::clone(&self.shared);
        let result = self
            .run_blocking(move |repo| {
                Ok(repo.add_photos_with_progress(files, |progress| {
                    shared.update(|state| state.upload_progress = Some(progress.percentage));
                }))
            })
            .await;

        let upload = match result {
            Ok(upload) => upload,
            Err(err) => {
                self.fail(&err, SyncPhase::RolledBack);
                return Err(err);
            }
        };

        let added = upload.success.clone();
        let notice = upload.errors.first().map(ErrorNotice::from);
        self.shared.update(|state| {
            if !added.is_empty() {
                state.photos.extend(added);
                state.photos.sort_by_key(|p| p.order);
                state.current_view = AppView::Manager;
            }
            state.clamp_index();
            state.is_loading = false;
            state.upload_progress = None;
            state.phase = SyncPhase::Reconciled;
            state.error = notice;
        });

        Ok(upload)
    }

    /// 删除照片，采用仓库重新计算的游标
    pub async fn remove_photo(&self, id: &PhotoId) -> AppResult<bool> {
        self.shared.update(|state| state.phase = SyncPhase::Mutating);

        let target = id.clone();
        let result = self
            .run_blocking(move |repo| Ok((repo.remove_photo(&target)?, repo.current_index())))
            .await;

        match result {
            Ok((removed, cursor)) => {
                self.shared.update(|state| {
                    if removed {
                        state.photos.retain(|p| &p.id != id);
                        for (index, photo) in state.photos.iter_mut().enumerate() {
                            photo.order = index as u32;
                        }
                        state.current_index = cursor;
                        state.clamp_index();
                        if state.photos.is_empty() {
                            state.current_view = AppView::Welcome;
                        }
                    }
                    state.phase = SyncPhase::Reconciled;
                });
                Ok(removed)
            }
            Err(err) => {
                self.fail(&err, SyncPhase::RolledBack);
                Err(err)
            }
        }
    }

    /// 移动照片
    ///
    /// 先在本地完成移动，再等待仓库确认；失败时换成仓库重新加载的列表。
    pub async fn reorder_photos(&self, from: usize, to: usize) -> AppResult<()> {
        let mut previous = None;
        self.shared.update(|state| {
            let len = state.photos.len();
            if len == 0 {
                return;
            }
            previous = Some(state.photos.clone());

            let from = clamp_index(from, len);
            let to = clamp_index(to, len);
            let moved = state.photos.remove(from);
            state.photos.insert(to, moved);
            for (index, photo) in state.photos.iter_mut().enumerate() {
                photo.order = index as u32;
            }
            state.phase = SyncPhase::Mutating;
        });

        let Some(previous) = previous else {
            return Ok(());
        };

        // 两种结果都带上仓库的游标
        enum Outcome {
            Saved(Vec<Photo>, usize),
            Reloaded {
                message: String,
                reloaded: Vec<Photo>,
                cursor: usize,
            },
        }

        let result = self
            .run_blocking(move |repo| match repo.reorder_photos(from, to) {
                Ok(photos) => Ok(Outcome::Saved(photos, repo.current_index())),
                Err(AppError::ReorderFailed { message, reloaded }) => Ok(Outcome::Reloaded {
                    message,
                    reloaded,
                    cursor: repo.current_index(),
                }),
                Err(err) => Err(err),
            })
            .await;

        match result {
            Ok(Outcome::Saved(photos, cursor)) => {
                self.shared.update(|state| {
                    state.photos = photos;
                    state.current_index = cursor;
                    state.clamp_index();
                    state.phase = SyncPhase::Reconciled;
                });
                Ok(())
            }
            Ok(Outcome::Reloaded {
                message,
                reloaded,
                cursor,
            }) => {
                tracing::warn!("排序保存失败，已恢复: {}", message);
                let err = AppError::ReorderFailed {
                    message,
                    reloaded: Vec::new(),
                };
                let notice = ErrorNotice::from(&err);
                self.shared.update(|state| {
                    state.photos = reloaded;
                    state.current_index = cursor;
                    state.clamp_index();
                    state.phase = SyncPhase::RolledBack;
                    state.error = Some(notice);
                });
                Err(err)
            }
            Err(err) => {
                self.shared.update(|state| {
                    state.photos = previous;
                    state.clamp_index();
                });
                self.fail(&err, SyncPhase::RolledBack);
                Err(err)
            }
        }
    }

    /// 删除所有照片并回到欢迎页
    pub async fn clear_all_photos(&self) -> AppResult<()> {
        self.shared.update(|state| state.phase = SyncPhase::Mutating);

        match self.run_blocking(|repo| repo.clear_all_photos()).await {
            Ok(()) => {
                self.shared.update(|state| {
                    state.photos.clear();
                    state.current_index = 0;
                    state.current_view = AppView::Welcome;
                    state.phase = SyncPhase::Reconciled;
                    state.error = None;
                });
                Ok(())
            }
            Err(err) => {
                self.fail(&err, SyncPhase::RolledBack);
                Err(err)
            }
        }
    }

    // ==================== 导航 ====================

    pub fn go_to_manager(&self) {
        self.shared
            .update(|state| state.current_view = AppView::Manager);
    }

    pub fn go_to_welcome(&self) {
        self.shared
            .update(|state| state.current_view = AppView::Welcome);
    }

    pub fn go_to_settings(&self) {
        self.shared
            .update(|state| state.current_view = AppView::Settings);
    }

    pub fn clear_error(&self) {
        self.shared.update(|state| state.error = None);
    }

    /// 设置当前位置（按数量截断），同时同步到仓库
    pub async fn set_current_index(&self, index: usize) -> AppResult<usize> {
        let index = clamp_index(index, self.shared.state().photos.len());
        let cursor = self
            .run_blocking(move |repo| repo.set_current_index(index))
            .await?;
        self.shared.update(|state| {
            state.current_index = cursor;
            state.clamp_index();
        });
        Ok(cursor)
    }

    /// 打开大图查看；没有照片时不切换视图
    pub async fn open_viewer(&self, index: usize) -> AppResult<()> {
        if self.shared.state().photos.is_empty() {
            return Ok(());
        }
        self.set_current_index(index).await?;
        self.shared
            .update(|state| state.current_view = AppView::Viewer);
        Ok(())
    }

    /// 下一张（末尾回到第一张）
    pub async fn next_photo(&self) -> AppResult<usize> {
        let (index, len) = {
            let state = self.shared.state();
            (state.current_index, state.photos.len())
        };
        if len == 0 {
            return Ok(0);
        }
        self.set_current_index((index + 1) % len).await
    }

    /// 上一张（第一张回到末尾）
    pub async fn previous_photo(&self) -> AppResult<usize> {
        let (index, len) = {
            let state = self.shared.state();
            (state.current_index, state.photos.len())
        };
        if len == 0 {
            return Ok(0);
        }
        self.set_current_index((index + len - 1) % len).await
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use photowallet_core::db::{Database, PhotoStore};
    use photowallet_core::models::{NewPhoto, PhotoLimits, UploadErrorType};
    use photowallet_core::utils::{DatabaseError, DatabaseErrorKind, DbResult, NoticeKind};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    fn png(name: &str) -> CandidateFile {
        let img = DynamicImage::ImageRgb8(RgbImage::new(64, 64));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        CandidateFile::new(name, "image/png", buf.into_inner())
    }

    fn names(state: &PhotoWalletState) -> Vec<&str> {
        state
            .photos
            .iter()
            .map(|p| p.original_name.as_str())
            .collect()
    }

    /// 可以让排序保存失败的存储
    struct FlakyStore {
        inner: Database,
        fail_reorder: AtomicBool,
    }

    impl PhotoStore for FlakyStore {
        fn get_all_photos(&self) -> DbResult<Vec<Photo>> {
            self.inner.get_all_photos()
        }
        fn get_photo(&self, id: &PhotoId) -> DbResult<Option<Photo>> {
            self.inner.get_photo(id)
        }
        fn photo_count(&self) -> DbResult<usize> {
            self.inner.photo_count()
        }
        fn add_photo(&self, photo: NewPhoto) -> DbResult<Photo> {
            self.inner.add_photo(photo)
        }
        fn remove_photo(&self, id: &PhotoId) -> DbResult<bool> {
            self.inner.remove_photo(id)
        }
        fn update_photo_order(&self, photos: &[Photo]) -> DbResult<()> {
            if self.fail_reorder.load(Ordering::SeqCst) {
                return Err(DatabaseError::from_kind(DatabaseErrorKind::Busy));
            }
            self.inner.update_photo_order(photos)
        }
        fn clear_all_photos(&self) -> DbResult<()> {
            self.inner.clear_all_photos().map(|_| ())
        }
    }

    fn setup(limits: PhotoLimits) -> (Arc<FlakyStore>, PhotoWalletStore) {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let store = Arc::new(FlakyStore {
            inner: db,
            fail_reorder: AtomicBool::new(false),
        });
        let repository = Arc::new(PhotoRepository::new(store.clone(), limits));
        (store, PhotoWalletStore::new(repository))
    }

    #[tokio::test]
    async fn test_load_empty_shows_welcome() {
        let (_store, wallet) = setup(PhotoLimits::default());
        wallet.go_to_settings();

        wallet.load_photos().await.unwrap();
        let state = wallet.snapshot();
        assert_eq!(state.current_view, AppView::Welcome);
        assert_eq!(state.current_index, 0);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_add_switches_to_manager() {
        let (_store, wallet) = setup(PhotoLimits::default());

        let result = wallet
            .add_photos(vec![png("a.png"), png("b.png")])
            .await
            .unwrap();
        assert_eq!(result.success.len(), 2);

        let state = wallet.snapshot();
        assert_eq!(state.current_view, AppView::Manager);
        assert_eq!(names(&state), vec!["a.png", "b.png"]);
        assert_eq!(state.phase, SyncPhase::Reconciled);
        assert_eq!(state.upload_progress, None);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_partial_failure_surfaces_first_error() {
        let (_store, wallet) = setup(PhotoLimits::with_max_photos(1));

        let result = wallet
            .add_photos(vec![png("a.png"), png("b.png")])
            .await
            .unwrap();
        assert_eq!(result.errors[0].error_type, UploadErrorType::StorageLimit);

        let state = wallet.snapshot();
        assert_eq!(names(&state), vec!["a.png"]);
        let notice = state.error.unwrap();
        assert_eq!(notice.code, "E_STORAGE_LIMIT");
        assert!(notice.message.contains("b.png"));
    }

    #[tokio::test]
    async fn test_remove_last_clamps_cursor() {
        let (_store, wallet) = setup(PhotoLimits::default());
        let added = wallet
            .add_photos(vec![png("a.png"), png("b.png"), png("c.png")])
            .await
            .unwrap();

        wallet.set_current_index(2).await.unwrap();
        assert!(wallet.remove_photo(&added.success[2].id).await.unwrap());

        let state = wallet.snapshot();
        assert_eq!(state.current_index, 1);
        assert_eq!(names(&state), vec!["a.png", "b.png"]);
    }

    #[tokio::test]
    async fn test_remove_middle_at_cursor_keeps_cursor_in_sync() {
        let (_store, wallet) = setup(PhotoLimits::default());
        let added = wallet
            .add_photos(vec![png("a.png"), png("b.png"), png("c.png")])
            .await
            .unwrap();

        wallet.set_current_index(1).await.unwrap();
        assert!(wallet.remove_photo(&added.success[1].id).await.unwrap());

        let state = wallet.snapshot();
        assert_eq!(names(&state), vec!["a.png", "c.png"]);
        assert_eq!(state.current_index, 1);
        assert_eq!(state.current_index, wallet.repository.current_index());
    }

    #[tokio::test]
    async fn test_remove_all_returns_to_welcome() {
        let (_store, wallet) = setup(PhotoLimits::default());
        let added = wallet.add_photos(vec![png("a.png")]).await.unwrap();

        wallet.remove_photo(&added.success[0].id).await.unwrap();
        let state = wallet.snapshot();
        assert!(state.photos.is_empty());
        assert_eq!(state.current_view, AppView::Welcome);
        assert_eq!(state.current_index, 0);
    }

    #[tokio::test]
    async fn test_reorder_reconciles() {
        let (_store, wallet) = setup(PhotoLimits::default());
        wallet
            .add_photos(vec![png("A.png"), png("B.png"), png("C.png"), png("D.png")])
            .await
            .unwrap();

        wallet.reorder_photos(0, 2).await.unwrap();
        let state = wallet.snapshot();
        assert_eq!(names(&state), vec!["B.png", "C.png", "A.png", "D.png"]);
        assert_eq!(state.phase, SyncPhase::Reconciled);
        let orders: Vec<u32> = state.photos.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_reorder_failure_rolls_back() {
        let (store, wallet) = setup(PhotoLimits::default());
        wallet
            .add_photos(vec![png("A.png"), png("B.png"), png("C.png")])
            .await
            .unwrap();

        let phases = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&phases);
        wallet.subscribe(move |state| recorded.lock().unwrap().push(state.phase));

        store.fail_reorder.store(true, Ordering::SeqCst);
        let err = wallet.reorder_photos(0, 2).await.unwrap_err();
        assert!(matches!(err, AppError::ReorderFailed { .. }));

        let state = wallet.snapshot();
        assert_eq!(names(&state), vec!["A.png", "B.png", "C.png"]);
        assert_eq!(state.phase, SyncPhase::RolledBack);
        let notice = state.error.unwrap();
        assert!(notice.recoverable);
        assert_eq!(notice.kind, NoticeKind::Storage);

        let phases = phases.lock().unwrap();
        assert_eq!(*phases, vec![SyncPhase::Mutating, SyncPhase::RolledBack]);
    }

    #[tokio::test]
    async fn test_reorder_failure_adopts_repository_cursor() {
        let (store, wallet) = setup(PhotoLimits::default());
        wallet
            .add_photos(vec![png("A.png"), png("B.png"), png("C.png")])
            .await
            .unwrap();
        wallet.set_current_index(2).await.unwrap();

        // 游标在视图之外被修改
        wallet.repository.set_current_index(0).unwrap();

        store.fail_reorder.store(true, Ordering::SeqCst);
        assert!(wallet.reorder_photos(2, 0).await.is_err());

        let state = wallet.snapshot();
        assert_eq!(state.phase, SyncPhase::RolledBack);
        assert_eq!(state.current_index, 0);
        assert_eq!(state.current_index, wallet.repository.current_index());
    }

    #[tokio::test]
    async fn test_clear_resets() {
        let (_store, wallet) = setup(PhotoLimits::default());
        wallet
            .add_photos(vec![png("a.png"), png("b.png")])
            .await
            .unwrap();
        wallet.set_current_index(1).await.unwrap();

        wallet.clear_all_photos().await.unwrap();
        let state = wallet.snapshot();
        assert!(state.photos.is_empty());
        assert_eq!(state.current_index, 0);
        assert_eq!(state.current_view, AppView::Welcome);

        let result = wallet.add_photos(vec![png("c.png")]).await.unwrap();
        assert_eq!(result.success[0].order, 0);
    }

    #[tokio::test]
    async fn test_navigation_wraps() {
        let (_store, wallet) = setup(PhotoLimits::default());
        wallet
            .add_photos(vec![png("a.png"), png("b.png"), png("c.png")])
            .await
            .unwrap();

        wallet.open_viewer(2).await.unwrap();
        assert_eq!(wallet.snapshot().current_view, AppView::Viewer);

        assert_eq!(wallet.next_photo().await.unwrap(), 0);
        assert_eq!(wallet.previous_photo().await.unwrap(), 2);
        assert_eq!(wallet.set_current_index(99).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_notifications() {
        let (_store, wallet) = setup(PhotoLimits::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let id = wallet.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        wallet.go_to_manager();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(wallet.unsubscribe(id));
        assert!(!wallet.unsubscribe(id));
        wallet.go_to_welcome();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
