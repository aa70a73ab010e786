//! 照片存储抽象
//!
//! 仓库层只依赖这个 trait，具体的嵌入式存储引擎（目前是 SQLite）
//! 是实现细节。实现方必须保证：
//!
//! - 读取只返回完整写入的记录
//! - 静止状态下顺序值恰好是 `0..count-1`
//! - 引擎错误统一以 [`DatabaseError`](crate::utils::DatabaseError) 返回

use std::sync::Arc;

use crate::models::{NewPhoto, Photo, PhotoId, StorageStats};
use crate::utils::error::DbResult;

use super::connection::Database;

/// 照片持久化存储
pub trait PhotoStore: Send + Sync {
    /// 所有照片，按顺序升序
    fn get_all_photos(&self) -> DbResult<Vec<Photo>>;

    /// 根据 ID 获取照片
    fn get_photo(&self, id: &PhotoId) -> DbResult<Option<Photo>>;

    /// 所有照片 ID，按顺序升序
    ///
    /// 默认实现读取完整记录；实现方可以只查询 ID 以避免加载图片数据。
    fn get_photo_ids(&self) -> DbResult<Vec<PhotoId>> {
        Ok(self.get_all_photos()?.into_iter().map(|p| p.id).collect())
    }

    /// 当前照片数量（每次都从存储读取）
    fn photo_count(&self) -> DbResult<usize>;

    /// 添加照片，顺序为当前数量（追加到末尾）
    fn add_photo(&self, photo: NewPhoto) -> DbResult<Photo>;

    /// 删除照片并重排剩余顺序；返回是否确实删除了记录
    fn remove_photo(&self, id: &PhotoId) -> DbResult<bool>;

    /// 以列表位置作为新顺序，全部成功或全部不生效
    fn update_photo_order(&self, photos: &[Photo]) -> DbResult<()>;

    /// 删除所有照片
    fn clear_all_photos(&self) -> DbResult<()>;

    /// 存储统计
    fn storage_stats(&self) -> DbResult<StorageStats> {
        let photos = self.get_all_photos()?;
        let total_size: u64 = photos.iter().map(|p| p.size).sum();
        let average_size = if photos.is_empty() {
            0.0
        } else {
            total_size as f64 / photos.len() as f64
        };

        Ok(StorageStats {
            photo_count: photos.len(),
            total_size,
            average_size,
        })
    }
}

/// 共享的存储引用
pub type SharedPhotoStore = Arc<dyn PhotoStore>;

impl PhotoStore for Database {
    fn get_all_photos(&self) -> DbResult<Vec<Photo>> {
        Database::get_all_photos(self)
    }

    fn get_photo(&self, id: &PhotoId) -> DbResult<Option<Photo>> {
        Database::get_photo(self, id)
    }

    fn get_photo_ids(&self) -> DbResult<Vec<PhotoId>> {
        Database::get_photo_ids(self)
    }

    fn photo_count(&self) -> DbResult<usize> {
        Database::photo_count(self)
    }

    fn add_photo(&self, photo: NewPhoto) -> DbResult<Photo> {
        Database::add_photo(self, photo)
    }

    fn remove_photo(&self, id: &PhotoId) -> DbResult<bool> {
        Database::remove_photo(self, id)
    }

    fn update_photo_order(&self, photos: &[Photo]) -> DbResult<()> {
        Database::update_photo_order(self, photos)
    }

    fn clear_all_photos(&self) -> DbResult<()> {
        Database::clear_all_photos(self).map(|_| ())
    }

    fn storage_stats(&self) -> DbResult<StorageStats> {
        Database::storage_stats(self)
    }
}
