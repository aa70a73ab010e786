//! 设置数据访问层
//!
//! 设置以 JSON 形式保存在单例记录中

use rusqlite::params;

use crate::utils::error::{DatabaseError, DbResult};

use super::connection::Database;
use super::schema::SETTINGS_ID;

/// 设置记录
#[derive(Debug, Clone)]
pub struct SettingsRecord {
    pub payload: String,
    pub last_updated: String,
}

impl Database {
    /// 读取设置单例
    pub fn get_settings_record(&self) -> DbResult<Option<SettingsRecord>> {
        let conn = self.connection()?;

        let result = conn.query_row(
            "SELECT payload, last_updated FROM settings WHERE id = ?1",
            params![SETTINGS_ID],
            |row| {
                Ok(SettingsRecord {
                    payload: row.get(0)?,
                    last_updated: row.get(1)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// 写入设置单例（不存在则创建）
    pub fn put_settings_record(&self, payload: &str) -> DbResult<SettingsRecord> {
        let conn = self.connection()?;
        let now = crate::models::photo::chrono_now();

        conn.execute(
            r#"
            INSERT INTO settings (id, payload, last_updated) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, last_updated = excluded.last_updated
            "#,
            params![SETTINGS_ID, payload, now],
        )?;

        Ok(SettingsRecord {
            payload: payload.to_string(),
            last_updated: now,
        })
    }
}
