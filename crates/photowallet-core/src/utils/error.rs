//! PhotoWallet 错误处理模块
//!
//! 定义应用程序错误类型。存储引擎的错误在存储层边界统一转换为
//! [`DatabaseError`]，调用方不会直接看到 rusqlite 的错误类型。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Photo, PhotoUploadError, UploadErrorType};
use crate::services::validation::ValidationError;

/// 数据库错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseErrorKind {
    /// 存储空间不足
    QuotaExceeded,
    /// 数据库被占用
    Busy,
    /// 数据库文件损坏
    Corrupted,
    /// 记录不存在
    NotFound,
    /// 排序列表与存储内容不一致
    InvalidOrder,
    /// 其他错误
    Other,
}

impl DatabaseErrorKind {
    fn default_message(&self) -> &'static str {
        match self {
            DatabaseErrorKind::QuotaExceeded => "设备存储空间不足",
            DatabaseErrorKind::Busy => "数据库正忙，请稍后重试",
            DatabaseErrorKind::Corrupted => "数据库文件已损坏",
            DatabaseErrorKind::NotFound => "照片不存在",
            DatabaseErrorKind::InvalidOrder => "照片排序无效",
            DatabaseErrorKind::Other => "数据库操作失败",
        }
    }
}

/// 存储层错误
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DatabaseError {
    kind: DatabaseErrorKind,
    message: String,
    detail: Option<String>,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// 使用分类的默认提示信息
    pub fn from_kind(kind: DatabaseErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    /// 附加底层错误详情（仅用于日志）
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> DatabaseErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let kind = match &err {
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                ErrorCode::DiskFull => DatabaseErrorKind::QuotaExceeded,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => DatabaseErrorKind::Busy,
                ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                    DatabaseErrorKind::Corrupted
                }
                _ => DatabaseErrorKind::Other,
            },
            rusqlite::Error::QueryReturnedNoRows => DatabaseErrorKind::NotFound,
            _ => DatabaseErrorKind::Other,
        };

        tracing::warn!("存储引擎错误 ({:?}): {}", kind, err);
        DatabaseError::from_kind(kind).with_detail(err.to_string())
    }
}

/// 存储层结果类型别名
pub type DbResult<T> = Result<T, DatabaseError>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 数据库错误
    #[error("数据库错误: {0}")]
    Database(#[from] DatabaseError),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 校验失败
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 排序保存失败，已从存储重新加载
    #[error("{message}")]
    ReorderFailed {
        message: String,
        /// 重新加载后的权威列表
        reloaded: Vec<Photo>,
    },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 通用错误
    #[error("{0}")]
    General(String),
}

impl AppError {
    /// 用户是否可以继续操作（重试或忽略）
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Database(e) => !matches!(e.kind(), DatabaseErrorKind::Corrupted),
            AppError::Io(_) => false,
            AppError::Config(_) => false,
            _ => true,
        }
    }
}

/// 应用程序结果类型别名
pub type AppResult<T> = Result<T, AppError>;

/// 错误提示分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Storage,
    Validation,
    Unknown,
}

/// 交给前端展示的错误（纯数据）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub code: String,
    pub kind: NoticeKind,
    pub message: String,
    pub recoverable: bool,
    pub timestamp: String,
}

impl ErrorNotice {
    pub fn new(code: &str, kind: NoticeKind, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            code: code.to_string(),
            kind,
            message: message.into(),
            recoverable,
            timestamp: crate::models::photo::chrono_now(),
        }
    }
}

impl From<&AppError> for ErrorNotice {
    fn from(err: &AppError) -> Self {
        let (code, kind) = match err {
            AppError::Database(_) => ("E_DB_ERROR", NoticeKind::Storage),
            AppError::Io(_) => ("E_IO_ERROR", NoticeKind::Storage),
            AppError::Validation(_) => ("E_VALIDATION", NoticeKind::Validation),
            AppError::Serialization(_) => ("E_SERIALIZATION", NoticeKind::Unknown),
            AppError::ReorderFailed { .. } => ("E_REORDER_FAILED", NoticeKind::Storage),
            AppError::Config(_) => ("E_CONFIG", NoticeKind::Unknown),
            AppError::General(_) => ("E_GENERAL", NoticeKind::Unknown),
        };

        ErrorNotice::new(code, kind, err.to_string(), err.is_recoverable())
    }
}

impl From<AppError> for ErrorNotice {
    fn from(err: AppError) -> Self {
        ErrorNotice::from(&err)
    }
}

impl From<&PhotoUploadError> for ErrorNotice {
    fn from(err: &PhotoUploadError) -> Self {
        let (code, kind) = match err.error_type {
            UploadErrorType::FileType => ("E_FILE_TYPE", NoticeKind::Validation),
            UploadErrorType::FileSize => ("E_FILE_SIZE", NoticeKind::Validation),
            UploadErrorType::StorageLimit => ("E_STORAGE_LIMIT", NoticeKind::Validation),
            UploadErrorType::Processing => ("E_PROCESSING", NoticeKind::Unknown),
            UploadErrorType::Storage => ("E_DB_ERROR", NoticeKind::Storage),
            UploadErrorType::Unknown => ("E_UNKNOWN", NoticeKind::Unknown),
        };

        ErrorNotice::new(code, kind, format!("{}: {}", err.file_name, err.message), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Config("maxPhotos 不能为 0".to_string());
        assert_eq!(err.to_string(), "配置错误: maxPhotos 不能为 0");
    }

    #[test]
    fn test_rusqlite_error_is_wrapped() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), DatabaseErrorKind::NotFound);
        assert_eq!(err.to_string(), "照片不存在");
        assert!(err.detail().is_some());
    }

    #[test]
    fn test_disk_full_maps_to_quota() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        let err = DatabaseError::from(sqlite_err);
        assert_eq!(err.kind(), DatabaseErrorKind::QuotaExceeded);
    }

    #[test]
    fn test_notice_conversion() {
        let err = AppError::Database(DatabaseError::from_kind(DatabaseErrorKind::Busy));
        let notice: ErrorNotice = (&err).into();
        assert_eq!(notice.code, "E_DB_ERROR");
        assert_eq!(notice.kind, NoticeKind::Storage);
        assert!(notice.recoverable);

        let upload = PhotoUploadError::new("big.jpg", UploadErrorType::FileSize, "太大");
        let notice = ErrorNotice::from(&upload);
        assert_eq!(notice.code, "E_FILE_SIZE");
        assert!(notice.message.contains("big.jpg"));
    }
}
