//! 应用程序设置数据模型

use serde::{Deserialize, Serialize};

/// 缩放级别下限
pub const MIN_ZOOM_LEVEL: f64 = 0.5;
/// 缩放级别上限
pub const MAX_ZOOM_LEVEL: f64 = 3.0;

/// 主题模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
    Auto,
}

/// 手势灵敏度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum GestureSensitivity {
    Low,
    #[default]
    Medium,
    High,
}

/// 缩放行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ZoomBehavior {
    #[default]
    Smooth,
    Instant,
}

/// 照片数量与文件限制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhotoLimits {
    /// 最多保存的照片数
    pub max_photos: usize,
    /// 单个文件大小上限（字节）
    pub max_file_size: u64,
    /// 最小边长（像素）
    pub min_dimension: u32,
    /// 最大边长（像素）
    pub max_dimension: u32,
    /// 存储用量告警比例
    pub quota_warning_ratio: f64,
}

impl Default for PhotoLimits {
    fn default() -> Self {
        Self {
            max_photos: 10,
            max_file_size: 50 * 1024 * 1024, // 50MB
            min_dimension: 50,
            max_dimension: 8192,
            quota_warning_ratio: 0.8,
        }
    }
}

impl PhotoLimits {
    /// 指定照片数量上限，其余取默认值
    pub fn with_max_photos(max_photos: usize) -> Self {
        Self {
            max_photos,
            ..Self::default()
        }
    }
}

/// 应用程序设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// 主题模式
    pub theme: ThemeMode,
    /// 手势灵敏度
    pub gestures_sensitivity: GestureSensitivity,
    /// 缩放行为
    pub zoom_behavior: ZoomBehavior,
    /// 自动旋转
    pub auto_rotate: bool,
    /// 是否显示新手引导
    pub show_tutorial: bool,
    /// 最大缩放级别
    pub max_zoom_level: f64,
    /// 照片限制
    pub limits: PhotoLimits,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::default(),
            gestures_sensitivity: GestureSensitivity::default(),
            zoom_behavior: ZoomBehavior::default(),
            auto_rotate: false,
            show_tutorial: true,
            max_zoom_level: MAX_ZOOM_LEVEL,
            limits: PhotoLimits::default(),
        }
    }
}
