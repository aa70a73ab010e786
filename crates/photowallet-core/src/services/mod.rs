//! PhotoWallet 服务模块
//!
//! 包含所有业务逻辑服务

pub mod blob_urls;
pub mod repository;
pub mod settings;
pub mod validation;

// 重新导出常用类型
pub use blob_urls::{BlobUrl, BlobUrlRegistry};
pub use repository::PhotoRepository;
pub use settings::SettingsManager;
pub use validation::{
    probe_dimensions, validate_image_dimensions, validate_image_file, validate_photo_count,
    validate_photo_order, validate_storage_quota, validate_zoom_level, PhotoValidation,
    ValidationError, SUPPORTED_FILE_EXTENSIONS, SUPPORTED_IMAGE_TYPES,
};
