//! 数据库连接管理
//!
//! 提供 SQLite 数据库连接和初始化功能

use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::paths::PathProvider;
use crate::utils::error::{DatabaseError, DatabaseErrorKind, DbResult};

use super::schema::{INIT_SCHEMA, MIGRATIONS, SCHEMA_VERSION};

/// 数据库连接管理器
#[derive(Clone)]
pub struct Database {
    /// 数据库连接（使用 Arc<Mutex> 实现线程安全）
    conn: Arc<Mutex<Connection>>,
    /// 数据库文件路径
    path: PathBuf,
}

impl Database {
    /// 打开或创建数据库
    pub fn open(path: PathBuf) -> DbResult<Self> {
        // 确保父目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::new(DatabaseErrorKind::Other, format!("无法创建数据库目录: {}", e))
            })?;
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        // 配置数据库
        db.configure()?;

        Ok(db)
    }

    /// 使用 PathProvider 打开数据库
    pub fn open_with_provider(provider: &dyn PathProvider) -> DbResult<Self> {
        Self::open(provider.database_path())
    }

    /// 打开内存数据库（用于测试）
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        };

        db.configure()?;

        Ok(db)
    }

    /// 配置数据库连接
    fn configure(&self) -> DbResult<()> {
        let conn = self.connection()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;

        Ok(())
    }

    /// 初始化数据库 Schema
    pub fn init(&self) -> DbResult<()> {
        let conn = self.connection()?;

        // 检查是否已初始化
        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !table_exists {
            tracing::info!("初始化数据库 Schema...");

            conn.execute_batch(INIT_SCHEMA)?;

            let now = crate::models::photo::chrono_now();
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![SCHEMA_VERSION, now],
            )?;

            tracing::info!("数据库 Schema 初始化完成，版本: {}", SCHEMA_VERSION);
        } else {
            // 检查并执行迁移
            Self::migrate_internal(&conn)?;
        }

        Ok(())
    }

    /// 执行数据库迁移
    fn migrate_internal(conn: &Connection) -> DbResult<()> {
        let current_version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i32>>(0)
            })?
            .unwrap_or(0);

        tracing::info!("当前数据库版本: {}", current_version);

        for migration in MIGRATIONS {
            if migration.version > current_version {
                tracing::info!(
                    "执行迁移 v{}: {}",
                    migration.version,
                    migration.description
                );

                conn.execute_batch(migration.sql)?;

                let now = crate::models::photo::chrono_now();
                conn.execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, now],
                )?;

                tracing::info!("迁移 v{} 完成", migration.version);
            }
        }

        Ok(())
    }

    /// 获取数据库连接（用于执行查询）
    pub fn connection(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::Other, "数据库连接不可用")
                .with_detail(e.to_string())
        })
    }

    /// 执行事务
    ///
    /// 闭包返回错误时事务回滚，不会留下部分写入。
    pub fn transaction<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// 获取数据库文件路径
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// 获取数据库统计信息
    pub fn stats(&self) -> DbResult<DatabaseStats> {
        let conn = self.connection()?;

        let photo_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;

        let schema_version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i32>>(0)
            })?
            .unwrap_or(0);

        let db_size = std::fs::metadata(&self.path)
            .map(|m| m.len() as i64)
            .unwrap_or(0);

        Ok(DatabaseStats {
            photo_count,
            schema_version,
            db_size,
        })
    }
}

/// 数据库统计信息
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub photo_count: i64,
    pub schema_version: i32,
    pub db_size: i64,
}
