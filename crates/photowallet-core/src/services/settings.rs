//! 应用程序设置服务
//!
//! 设置以 JSON 形式保存在数据库的单例记录中

use crate::db::Database;
use crate::models::{AppSettings, MAX_ZOOM_LEVEL, MIN_ZOOM_LEVEL};
use crate::utils::error::{AppError, AppResult};

use super::validation::{validate_limits, validate_zoom_level};

/// 设置管理器
#[derive(Clone)]
pub struct SettingsManager {
    db: Database,
}

impl SettingsManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 加载设置
    ///
    /// 记录不存在时写入并返回默认设置；记录无法解析时返回默认设置。
    pub fn load(&self) -> AppResult<AppSettings> {
        let Some(record) = self.db.get_settings_record()? else {
            tracing::info!("设置记录不存在，使用默认设置");
            let defaults = AppSettings::default();
            self.save(&defaults)?;
            return Ok(defaults);
        };

        match serde_json::from_str::<AppSettings>(&record.payload) {
            Ok(settings) => {
                tracing::debug!("成功加载设置 (更新于 {})", record.last_updated);
                Ok(settings)
            }
            Err(e) => {
                tracing::warn!("设置记录格式错误，使用默认设置: {}", e);
                Ok(AppSettings::default())
            }
        }
    }

    /// 保存设置
    pub fn save(&self, settings: &AppSettings) -> AppResult<()> {
        validate_zoom_level(settings.max_zoom_level, MIN_ZOOM_LEVEL, MAX_ZOOM_LEVEL)?;
        validate_limits(&settings.limits)?;

        let payload = serde_json::to_string(settings)
            .map_err(|e| AppError::Config(format!("无法序列化设置: {}", e)))?;
        self.db.put_settings_record(&payload)?;

        tracing::info!("成功保存设置");
        Ok(())
    }

    /// 修改部分设置并保存，返回保存后的设置
    pub fn update<F>(&self, f: F) -> AppResult<AppSettings>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut settings = self.load()?;
        f(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }

    /// 重置为默认设置
    pub fn reset(&self) -> AppResult<AppSettings> {
        let default_settings = AppSettings::default();
        self.save(&default_settings)?;
        Ok(default_settings)
    }
}
