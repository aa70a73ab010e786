//! 存储统计与导入导出数据模型

use serde::{Deserialize, Serialize};

use super::photo::PhotoMetadata;
use super::settings::AppSettings;

/// 导出格式版本
pub const EXPORT_FORMAT_VERSION: &str = "2.0.0";

/// 存储统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub photo_count: usize,
    /// 图片数据总大小（字节）
    pub total_size: u64,
    pub average_size: f64,
}

/// 存储配额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageQuota {
    pub used: u64,
    pub available: u64,
    pub total: u64,
    /// 已用比例 (0.0 - 1.0)
    pub percentage: f64,
}

/// 导出的单张照片
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedPhoto {
    #[serde(flatten)]
    pub metadata: PhotoMetadata,
    /// Base64 编码的图片数据
    pub data: String,
}

/// 完整导出数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: String,
    pub export_date: String,
    pub photos: Vec<ExportedPhoto>,
    pub settings: AppSettings,
}

/// 导入结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub imported_photos: usize,
    pub skipped_photos: usize,
    pub errors: Vec<String>,
    pub settings_imported: bool,
}
