//! 用户设置存储 - 业务能力层
//!
//! 只负责按用户读写 [`AppSettings`]，保存频率由调用方决定

use crate::error::{AppError, AppResult};
use crate::models::settings::AppSettings;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, info};

/// 设置存储能力
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// 读取用户设置，不存在时返回 `None`
    async fn get(&self, user_id: &str) -> AppResult<Option<AppSettings>>;

    /// 保存用户设置（整体覆盖）
    async fn put(&self, user_id: &str, settings: &AppSettings) -> AppResult<()>;
}

/// 读取用户设置；不存在时写入并返回默认设置，方便用户之后修改
pub async fn load_or_init(store: &dyn SettingsStore, user_id: &str) -> AppResult<AppSettings> {
    match store.get(user_id).await? {
        Some(settings) => Ok(settings),
        None => {
            info!("用户 {} 没有保存的设置，使用默认细则", user_id);
            let settings = AppSettings::default();
            store.put(user_id, &settings).await?;
            Ok(settings)
        }
    }
}

/// 基于 TOML 文件的存储：每个用户一个 `<dir>/<user_id>.toml`
pub struct TomlSettingsStore {
    dir: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let file_name: String = user_id
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.toml", file_name))
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn get(&self, user_id: &str) -> AppResult<Option<AppSettings>> {
        let path = self.path_for(user_id);
        let shown = path.display().to_string();

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("设置文件不存在: {}", shown);
                return Ok(None);
            }
            Err(e) => return Err(AppError::file_read_failed(shown, e)),
        };

        let settings =
            toml::from_str(&content).map_err(|e| AppError::toml_parse_failed(&shown, e))?;
        Ok(Some(settings))
    }

    async fn put(&self, user_id: &str, settings: &AppSettings) -> AppResult<()> {
        let path = self.path_for(user_id);
        let shown = path.display().to_string();

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.dir.display().to_string(), e))?;

        let content = toml::to_string_pretty(settings)
            .map_err(|e| AppError::Other(format!("设置序列化失败: {}", e)))?;
        fs::write(&path, content)
            .await
            .map_err(|e| AppError::file_write_failed(&shown, e))?;

        info!("✓ 用户 {} 的设置已保存: {}", user_id, shown);
        Ok(())
    }
}

/// 内存存储
#[derive(Default)]
pub struct MemorySettingsStore {
    entries: Mutex<HashMap<String, AppSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, user_id: &str) -> AppResult<Option<AppSettings>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Other("设置存储锁已损坏".to_string()))?;
        Ok(entries.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, settings: &AppSettings) -> AppResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Other("设置存储锁已损坏".to_string()))?;
        entries.insert(user_id.to_string(), settings.clone());
        Ok(())
    }
}
