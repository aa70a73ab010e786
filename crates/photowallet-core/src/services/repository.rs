//! 照片仓库服务
//!
//! 存储之上的业务门面：导入前校验、数量上限、排序与当前位置（游标）。
//! 仓库本身不持有持久化数据，所有依赖顺序的操作都先从存储重新读取。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::db::SharedPhotoStore;
use crate::events::{
    EventSinkExt, Notification, NotificationLevel, NoOpEventSink, PhotosChanged, SharedEventSink,
    UploadProgress, EVENT_NOTIFICATION, EVENT_PHOTOS_CHANGED, EVENT_UPLOAD_PROGRESS,
};
use crate::models::{
    AppSettings, CandidateFile, ExportData, ExportedPhoto, ImportResult, NewPhoto, Photo, PhotoId,
    PhotoLimits, PhotoUploadError, PhotoUploadResult, StorageQuota, StorageStats,
    UploadErrorType, EXPORT_FORMAT_VERSION,
};
use crate::utils::error::{AppError, AppResult};
use crate::utils::sanitize::{is_valid_id, sanitize_display_name, sanitize_file_name};

use super::validation::{
    probe_dimensions, validate_image_dimensions, validate_image_file, validate_limits,
    validate_photo_count,
};

/// 照片仓库
pub struct PhotoRepository {
    store: SharedPhotoStore,
    limits: RwLock<PhotoLimits>,
    event_sink: SharedEventSink,
    cursor: AtomicUsize,
}

impl PhotoRepository {
    /// 创建仓库（不发送事件）
    pub fn new(store: SharedPhotoStore, limits: PhotoLimits) -> Self {
        Self {
            store,
            limits: RwLock::new(limits),
            event_sink: Arc::new(NoOpEventSink),
            cursor: AtomicUsize::new(0),
        }
    }

    /// 设置事件接收器
    pub fn with_event_sink(mut self, event_sink: SharedEventSink) -> Self {
        self.event_sink = event_sink;
        self
    }

    /// 当前生效的限制
    pub fn limits(&self) -> PhotoLimits {
        self.limits
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 更新限制（设置保存后调用）
    pub fn set_limits(&self, limits: PhotoLimits) -> AppResult<()> {
        validate_limits(&limits)?;
        *self.limits.write().unwrap_or_else(PoisonError::into_inner) = limits;
        Ok(())
    }

    // ==================== 查询 ====================

    /// 按顺序列出所有照片
    pub fn list_photos(&self) -> AppResult<Vec<Photo>> {
        Ok(self.store.get_all_photos()?)
    }

    /// 根据 ID 获取照片
    pub fn get_photo(&self, id: &PhotoId) -> AppResult<Option<Photo>> {
        Ok(self.store.get_photo(id)?)
    }

    /// 当前游标位置
    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// 设置游标，按实际数量截断；返回生效后的位置
    pub fn set_current_index(&self, index: usize) -> AppResult<usize> {
        let count = self.store.photo_count()?;
        let clamped = clamp_index(index, count);
        self.cursor.store(clamped, Ordering::SeqCst);
        Ok(clamped)
    }

    /// 存储统计
    pub fn storage_stats(&self) -> AppResult<StorageStats> {
        Ok(self.store.storage_stats()?)
    }

    /// 以给定配额计算用量
    pub fn storage_quota(&self, quota_bytes: u64) -> AppResult<StorageQuota> {
        let used = self.store.storage_stats()?.total_size;
        let percentage = if quota_bytes == 0 {
            0.0
        } else {
            used as f64 / quota_bytes as f64
        };

        Ok(StorageQuota {
            used,
            available: quota_bytes.saturating_sub(used),
            total: quota_bytes,
            percentage,
        })
    }

    // ==================== 写入 ====================

    /// 批量导入
    ///
    /// 按输入顺序逐个处理，单个文件失败只记录错误，不会中断整批导入。
    pub fn add_photos(&self, files: Vec<CandidateFile>) -> PhotoUploadResult {
        self.add_photos_with_progress(files, |_| {})
    }

    /// 批量导入，每处理一个文件回调一次进度
    pub fn add_photos_with_progress<F>(
        &self,
        files: Vec<CandidateFile>,
        mut on_progress: F,
    ) -> PhotoUploadResult
    where
        F: FnMut(&UploadProgress),
    {
        let total = files.len();
        let limits = self.limits();
        let mut result = PhotoUploadResult::default();

        tracing::info!("开始导入 {} 个文件", total);

        for (index, file) in files.into_iter().enumerate() {
            let display_name = sanitize_display_name(&file.name);
            let progress = UploadProgress::new(index + 1, total, &display_name);
            on_progress(&progress);
            self.event_sink.emit_typed(EVENT_UPLOAD_PROGRESS, &progress);

            match self.add_one(file, display_name, &limits) {
                Ok(photo) => result.success.push(photo),
                Err(err) => {
                    tracing::warn!("导入失败 {}: {}", err.file_name, err.message);
                    result.errors.push(err);
                }
            }
        }

        tracing::info!(
            "导入完成: 成功 {}, 失败 {}",
            result.success.len(),
            result.errors.len()
        );

        if !result.success.is_empty() {
            self.emit_changed();
        }
        if !result.errors.is_empty() {
            self.event_sink.emit_typed(
                EVENT_NOTIFICATION,
                &Notification::new(
                    NotificationLevel::Warning,
                    format!("{} 个文件导入失败", result.errors.len()),
                ),
            );
        }

        result
    }

    fn add_one(
        &self,
        file: CandidateFile,
        display_name: String,
        limits: &PhotoLimits,
    ) -> Result<Photo, PhotoUploadError> {
        let fail = |error_type: UploadErrorType, message: String| {
            PhotoUploadError::new(&display_name, error_type, message)
        };

        validate_image_file(&file, limits).map_err(|e| fail(e.upload_error_type(), e.to_string()))?;

        let dimensions = probe_dimensions(&file.data);
        if let Some((width, height)) = dimensions {
            validate_image_dimensions(width, height, limits)
                .map_err(|e| fail(e.upload_error_type(), e.to_string()))?;
        } else {
            tracing::debug!("无法读取图片尺寸: {}", display_name);
        }

        // 每个文件都重新读取数量
        let count = self
            .store
            .photo_count()
            .map_err(|e| fail(UploadErrorType::Storage, e.to_string()))?;
        validate_photo_count(count, 1, limits)
            .map_err(|e| fail(e.upload_error_type(), e.to_string()))?;

        let new_photo =
            NewPhoto::from_candidate(file, display_name.clone()).with_dimensions(dimensions);
        self.store
            .add_photo(new_photo)
            .map_err(|e| fail(UploadErrorType::Storage, e.to_string()))
    }

    /// 删除照片并重新计算游标
    ///
    /// 删除位置在游标之前时游标前移；删除的正是游标所在照片时截断到
    /// 末尾；集合为空时归零。
    pub fn remove_photo(&self, id: &PhotoId) -> AppResult<bool> {
        if !is_valid_id(id.as_str()) {
            return Ok(false);
        }

        let before = self.store.get_photo_ids()?;
        let Some(position) = before.iter().position(|existing| existing == id) else {
            return Ok(false);
        };

        if !self.store.remove_photo(id)? {
            return Ok(false);
        }

        let count = before.len() - 1;
        let cursor = self.current_index();
        let next = if count == 0 {
            0
        } else if position < cursor {
            cursor - 1
        } else {
            cursor.min(count - 1)
        };
        self.cursor.store(next, Ordering::SeqCst);

        tracing::info!("照片已删除: {} (游标 {} -> {})", id, cursor, next);
        self.emit_changed_with(count);
        Ok(true)
    }

    /// 移动照片并持久化新顺序
    ///
    /// 两个下标都会被截断到 `[0, len-1]`。保存失败时从存储重新加载，
    /// 返回携带权威列表的 [`AppError::ReorderFailed`]。
    pub fn reorder_photos(&self, from: usize, to: usize) -> AppResult<Vec<Photo>> {
        let mut photos = self.store.get_all_photos()?;
        if photos.is_empty() {
            return Ok(photos);
        }

        let from = clamp_index(from, photos.len());
        let to = clamp_index(to, photos.len());
        let cursor_id = photos
            .get(clamp_index(self.current_index(), photos.len()))
            .map(|p| p.id.clone());

        if from != to {
            let moved = photos.remove(from);
            photos.insert(to, moved);
        }
        for (index, photo) in photos.iter_mut().enumerate() {
            photo.order = index as u32;
        }

        if let Err(err) = self.store.update_photo_order(&photos) {
            tracing::error!("保存排序失败，重新加载: {}", err);
            let reloaded = self.store.get_all_photos()?;
            let clamped = clamp_index(self.current_index(), reloaded.len());
            self.cursor.store(clamped, Ordering::SeqCst);
            return Err(AppError::ReorderFailed {
                message: format!("保存排序失败: {}", err),
                reloaded,
            });
        }

        if let Some(cursor_id) = cursor_id {
            if let Some(index) = photos.iter().position(|p| p.id == cursor_id) {
                self.cursor.store(index, Ordering::SeqCst);
            }
        }

        tracing::debug!("照片已移动: {} -> {}", from, to);
        self.emit_changed_with(photos.len());
        Ok(photos)
    }

    /// 删除所有照片
    pub fn clear_all_photos(&self) -> AppResult<()> {
        self.store.clear_all_photos()?;
        self.cursor.store(0, Ordering::SeqCst);
        tracing::info!("已清空所有照片");
        self.emit_changed_with(0);
        Ok(())
    }

    // ==================== 导入导出 ====================

    /// 导出所有照片（Base64）和设置
    pub fn export_data(&self, settings: AppSettings) -> AppResult<ExportData> {
        let photos = self
            .store
            .get_all_photos()?
            .iter()
            .map(|photo| ExportedPhoto {
                metadata: photo.metadata(),
                data: BASE64.encode(photo.blob.as_bytes()),
            })
            .collect::<Vec<_>>();

        tracing::info!("导出 {} 张照片", photos.len());

        Ok(ExportData {
            version: EXPORT_FORMAT_VERSION.to_string(),
            export_date: crate::models::photo::chrono_now(),
            photos,
            settings,
        })
    }

    /// 导出文件的建议名称
    pub fn export_file_name(data: &ExportData) -> String {
        let date = data.export_date.split('T').next().unwrap_or_default();
        sanitize_file_name(&format!("photowallet-export-{}.json", date))
    }

    /// 导入导出数据中的照片
    ///
    /// 照片按原顺序走普通导入流程（校验、数量上限），设置由调用方处理。
    pub fn import_data(&self, data: &ExportData) -> ImportResult {
        let mut result = ImportResult::default();

        if data.version != EXPORT_FORMAT_VERSION {
            tracing::warn!(
                "导出版本不一致: {} (当前 {})",
                data.version,
                EXPORT_FORMAT_VERSION
            );
        }

        let mut exported: Vec<&ExportedPhoto> = data.photos.iter().collect();
        exported.sort_by_key(|p| p.metadata.order);

        let mut files = Vec::with_capacity(exported.len());
        for photo in exported {
            match BASE64.decode(photo.data.as_bytes()) {
                Ok(bytes) => files.push(CandidateFile::new(
                    photo.metadata.original_name.clone(),
                    photo.metadata.mime_type.clone(),
                    bytes,
                )),
                Err(e) => {
                    result.skipped_photos += 1;
                    result
                        .errors
                        .push(format!("{}: 数据解码失败 ({})", photo.metadata.original_name, e));
                }
            }
        }

        let upload = self.add_photos(files);
        result.imported_photos = upload.success.len();
        result.skipped_photos += upload.errors.len();
        result.errors.extend(
            upload
                .errors
                .into_iter()
                .map(|e| format!("{}: {}", e.file_name, e.message)),
        );

        tracing::info!(
            "导入完成: {} 张, 跳过 {} 张",
            result.imported_photos,
            result.skipped_photos
        );
        result
    }

    fn emit_changed(&self) {
        match self.store.photo_count() {
            Ok(count) => self.emit_changed_with(count),
            Err(e) => tracing::warn!("无法读取照片数量: {}", e),
        }
    }

    fn emit_changed_with(&self, count: usize) {
        self.event_sink
            .emit_typed(EVENT_PHOTOS_CHANGED, &PhotosChanged { count });
    }
}

/// 把下标截断到 `[0, len-1]`，空集合返回 0
fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}
