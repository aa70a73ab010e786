//! PhotoWallet 数据模型模块
//!
//! 包含所有数据结构定义

pub mod photo;
pub mod settings;
pub mod storage;

// 重新导出常用类型
pub use photo::{
    CandidateFile, NewPhoto, Photo, PhotoBlob, PhotoId, PhotoMetadata, PhotoUploadError,
    PhotoUploadResult, UploadErrorType,
};
pub use settings::{
    AppSettings, GestureSensitivity, PhotoLimits, ThemeMode, ZoomBehavior, MAX_ZOOM_LEVEL,
    MIN_ZOOM_LEVEL,
};
pub use storage::{
    ExportData, ExportedPhoto, ImportResult, StorageQuota, StorageStats, EXPORT_FORMAT_VERSION,
};
