//! 照片数据模型

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// 照片 ID
///
/// 创建时生成的不透明标识符，生命周期内不可变，删除后也不会复用。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    /// 生成新的照片 ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PhotoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PhotoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 照片二进制数据
///
/// 创建后不可变；克隆只增加引用计数，不复制数据。
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoBlob(Arc<[u8]>);

impl PhotoBlob {
    pub fn new(data: Vec<u8>) -> Self {
        Self(Arc::from(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 两个句柄是否指向同一块内存
    pub fn ptr_eq(&self, other: &PhotoBlob) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<u8>> for PhotoBlob {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for PhotoBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhotoBlob({} bytes)", self.0.len())
    }
}

/// 照片记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// 照片ID
    pub id: PhotoId,
    /// 导入时的文件名（仅用于显示）
    pub original_name: String,
    /// 图片数据
    #[serde(skip)]
    pub blob: PhotoBlob,
    /// 显示顺序，静止状态下为 0..count-1
    pub order: u32,
    /// 导入时间 (RFC 3339)
    pub import_date: String,
    /// 文件大小（字节）
    pub size: u64,
    /// MIME 类型
    #[serde(rename = "type")]
    pub mime_type: String,
    /// 宽度
    pub width: Option<u32>,
    /// 高度
    pub height: Option<u32>,
}

impl Photo {
    /// 不含图片数据的元信息
    pub fn metadata(&self) -> PhotoMetadata {
        PhotoMetadata {
            id: self.id.clone(),
            original_name: self.original_name.clone(),
            order: self.order,
            import_date: self.import_date.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// 照片元信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    pub id: PhotoId,
    pub original_name: String,
    pub order: u32,
    pub import_date: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// 待导入的候选文件
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// 文件名
    pub name: String,
    /// MIME 类型
    pub mime_type: String,
    /// 文件内容
    pub data: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// 文件大小（字节），始终取实际数据长度
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// 小写扩展名（含点号），例如 `.jpg`
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
    }
}

/// 写入存储前的照片
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub original_name: String,
    pub blob: PhotoBlob,
    pub size: u64,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl NewPhoto {
    /// 由候选文件构建，尺寸在探测后填入
    pub fn from_candidate(file: CandidateFile, original_name: String) -> Self {
        Self {
            original_name,
            size: file.size(),
            mime_type: file.mime_type,
            blob: PhotoBlob::new(file.data),
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Option<(u32, u32)>) -> Self {
        if let Some((width, height)) = dimensions {
            self.width = Some(width);
            self.height = Some(height);
        }
        self
    }
}

/// 上传错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadErrorType {
    FileType,
    FileSize,
    StorageLimit,
    Processing,
    Storage,
    Unknown,
}

impl UploadErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadErrorType::FileType => "file-type",
            UploadErrorType::FileSize => "file-size",
            UploadErrorType::StorageLimit => "storage-limit",
            UploadErrorType::Processing => "processing",
            UploadErrorType::Storage => "storage",
            UploadErrorType::Unknown => "unknown",
        }
    }
}

/// 单个文件的上传错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadError {
    pub file_name: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: UploadErrorType,
}

impl PhotoUploadError {
    pub fn new(file_name: &str, error_type: UploadErrorType, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            message: message.into(),
            error_type,
        }
    }
}

/// 批量上传结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadResult {
    pub success: Vec<Photo>,
    pub errors: Vec<PhotoUploadError>,
}

/// 获取当前 UTC 时间 (RFC 3339，毫秒精度)
pub fn chrono_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
