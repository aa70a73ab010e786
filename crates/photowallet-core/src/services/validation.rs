//! 导入校验
//!
//! 所有函数都是纯函数，不读写存储，只根据 [`PhotoLimits`] 判断候选文件
//! 是否可以导入。

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CandidateFile, PhotoLimits, UploadErrorType};
use crate::utils::format::format_file_size;

/// 支持的 MIME 类型
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// 支持的文件扩展名（小写，带点）
pub const SUPPORTED_FILE_EXTENSIONS: &[&str] =
    &[".jpg", ".jpeg", ".png", ".webp", ".heic", ".heif"];

/// 校验错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("文件过大，单个文件最大 {}", format_file_size(*.max))]
    FileTooLarge { size: u64, max: u64 },

    #[error("不支持的图片格式: {0}")]
    UnsupportedType(String),

    #[error("不支持的文件扩展名: {0}")]
    UnsupportedExtension(String),

    #[error("图片尺寸过小，至少需要 {min}x{min} 像素")]
    ImageTooSmall { min: u32 },

    #[error("图片尺寸过大，最大允许 {max}x{max} 像素")]
    ImageTooLarge { max: u32 },

    #[error("最多还能添加 {allowed} 张照片，上限为 {max} 张")]
    TooManyPhotos { allowed: usize, max: usize },

    #[error("存储空间不足")]
    QuotaExceeded,

    #[error("照片顺序无效: {order}")]
    InvalidOrder { order: i64, max: i64 },

    #[error("缩放级别必须在 {min} 到 {max} 之间")]
    InvalidZoomLevel { level: f64, min: f64, max: f64 },

    #[error("无效的限制配置: {0}")]
    InvalidLimits(String),
}

impl ValidationError {
    /// 对应的上传错误分类
    pub fn upload_error_type(&self) -> UploadErrorType {
        match self {
            ValidationError::FileTooLarge { .. } => UploadErrorType::FileSize,
            ValidationError::UnsupportedType(_) | ValidationError::UnsupportedExtension(_) => {
                UploadErrorType::FileType
            }
            ValidationError::ImageTooSmall { .. } | ValidationError::ImageTooLarge { .. } => {
                UploadErrorType::Processing
            }
            ValidationError::TooManyPhotos { .. } | ValidationError::QuotaExceeded => {
                UploadErrorType::StorageLimit
            }
            _ => UploadErrorType::Unknown,
        }
    }
}

/// 校验结果的纯数据形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhotoValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }
}

impl From<Result<(), ValidationError>> for PhotoValidation {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self {
                valid: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// 校验候选文件：先大小，再 MIME 类型，最后扩展名
pub fn validate_image_file(file: &CandidateFile, limits: &PhotoLimits) -> Result<(), ValidationError> {
    let size = file.size();
    if size > limits.max_file_size {
        return Err(ValidationError::FileTooLarge {
            size,
            max: limits.max_file_size,
        });
    }

    if !SUPPORTED_IMAGE_TYPES.contains(&file.mime_type.as_str()) {
        return Err(ValidationError::UnsupportedType(file.mime_type.clone()));
    }

    match file.extension() {
        Some(ext) if SUPPORTED_FILE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(ValidationError::UnsupportedExtension(ext)),
        None => Err(ValidationError::UnsupportedExtension(file.name.clone())),
    }
}

/// 校验像素尺寸
pub fn validate_image_dimensions(
    width: u32,
    height: u32,
    limits: &PhotoLimits,
) -> Result<(), ValidationError> {
    if width < limits.min_dimension || height < limits.min_dimension {
        return Err(ValidationError::ImageTooSmall {
            min: limits.min_dimension,
        });
    }

    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(ValidationError::ImageTooLarge {
            max: limits.max_dimension,
        });
    }

    Ok(())
}

/// 校验数量上限
pub fn validate_photo_count(
    current: usize,
    incoming: usize,
    limits: &PhotoLimits,
) -> Result<(), ValidationError> {
    if current + incoming > limits.max_photos {
        return Err(ValidationError::TooManyPhotos {
            allowed: limits.max_photos.saturating_sub(current),
            max: limits.max_photos,
        });
    }
    Ok(())
}

/// 校验存储配额
///
/// 超出配额返回错误；超过警告阈值时返回 `Ok(Some(提示))`。
pub fn validate_storage_quota(
    used: u64,
    additional: u64,
    quota: u64,
    limits: &PhotoLimits,
) -> Result<Option<String>, ValidationError> {
    let total = used.saturating_add(additional);
    if quota == 0 {
        return if total == 0 {
            Ok(None)
        } else {
            Err(ValidationError::QuotaExceeded)
        };
    }

    let ratio = total as f64 / quota as f64;
    if ratio > 1.0 {
        return Err(ValidationError::QuotaExceeded);
    }

    if ratio > limits.quota_warning_ratio {
        return Ok(Some(format!(
            "存储空间已使用 {}%，建议删除部分照片",
            (ratio * 100.0).round() as u32
        )));
    }

    Ok(None)
}

/// 校验顺序值是否在 `0..=max_order` 内
pub fn validate_photo_order(order: i64, max_order: i64) -> Result<(), ValidationError> {
    if order < 0 || order > max_order {
        return Err(ValidationError::InvalidOrder {
            order,
            max: max_order,
        });
    }
    Ok(())
}

/// 校验缩放级别
pub fn validate_zoom_level(level: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !level.is_finite() || level < min || level > max {
        return Err(ValidationError::InvalidZoomLevel { level, min, max });
    }
    Ok(())
}

/// 校验限制配置本身
pub fn validate_limits(limits: &PhotoLimits) -> Result<(), ValidationError> {
    if limits.max_photos == 0 {
        return Err(ValidationError::InvalidLimits("maxPhotos 不能为 0".to_string()));
    }
    if limits.max_file_size == 0 {
        return Err(ValidationError::InvalidLimits(
            "maxFileSize 不能为 0".to_string(),
        ));
    }
    if limits.min_dimension > limits.max_dimension {
        return Err(ValidationError::InvalidLimits(
            "minDimension 不能大于 maxDimension".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&limits.quota_warning_ratio) {
        return Err(ValidationError::InvalidLimits(
            "quotaWarningRatio 必须在 0 到 1 之间".to_string(),
        ));
    }
    Ok(())
}

/// 读取图片头部获取尺寸
///
/// 无法识别的格式（例如 HEIC）返回 `None`。
pub fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    reader.into_dimensions().ok()
}
