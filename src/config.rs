use crate::error::{AppError, Result};
use book_discovery_common::{DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// APIのURLを上書きする環境変数
pub const API_URL_ENV: &str = "BOOK_DISCOVERY_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub page_size: usize,
    pub search_limit: usize,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".into(),
            page_size: DEFAULT_PAGE_SIZE,
            search_limit: DEFAULT_SEARCH_LIMIT,
            timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// ファイルが無ければ既定値
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 設定ディレクトリ（セッションファイルも同じ場所に置く）
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("book-discovery"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// 実際に使うAPIのURL
    pub fn api_base_url(&self) -> String {
        // 環境変数を優先
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => self.api_base_url.clone(),
        }
    }

    pub fn set_api_base_url(&mut self, url: String) -> Result<()> {
        self.api_base_url = url;
        self.save()
    }
}
