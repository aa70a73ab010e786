//! 数据库 Schema 定义
//!
//! 包含所有表的 CREATE 语句和迁移脚本

/// 数据库版本
pub const SCHEMA_VERSION: i32 = 1;

/// 设置单例记录的固定 ID
pub const SETTINGS_ID: &str = "app-settings";

/// 初始化 Schema SQL
pub const INIT_SCHEMA: &str = r#"
-- 照片表
CREATE TABLE IF NOT EXISTS photos (
    id              TEXT PRIMARY KEY NOT NULL,
    original_name   TEXT NOT NULL,
    blob            BLOB NOT NULL,
    sort_order      INTEGER NOT NULL CHECK(sort_order >= 0),
    import_date     TEXT NOT NULL,
    size            INTEGER NOT NULL,
    mime_type       TEXT NOT NULL,
    width           INTEGER,
    height          INTEGER
);

-- 设置表（单例记录）
CREATE TABLE IF NOT EXISTS settings (
    id              TEXT PRIMARY KEY NOT NULL,
    payload         TEXT NOT NULL,
    last_updated    TEXT NOT NULL
);

-- 数据库版本表
CREATE TABLE IF NOT EXISTS schema_version (
    version         INTEGER PRIMARY KEY,
    applied_at      TEXT NOT NULL
);

-- 索引
CREATE INDEX IF NOT EXISTS idx_photos_sort_order ON photos(sort_order);
CREATE INDEX IF NOT EXISTS idx_photos_import_date ON photos(import_date);
"#;

/// 迁移脚本
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// 所有迁移脚本列表，按版本升序；新版本的 Schema 变更追加在这里
pub const MIGRATIONS: &[Migration] = &[];
