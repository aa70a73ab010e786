//! PhotoWallet 数据库模块
//!
//! 包含数据库连接管理和数据访问层

pub mod connection;
pub mod photo_dao;
pub mod schema;
pub mod settings_dao;
pub mod store;

// 重新导出常用类型
pub use connection::{Database, DatabaseStats};
pub use settings_dao::SettingsRecord;
pub use store::{PhotoStore, SharedPhotoStore};
