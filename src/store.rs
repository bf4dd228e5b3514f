//! ログイントークンの保存
//!
//! 設定ディレクトリに1件だけ保持する。
//! 利用者は `session.json`、管理者は `admin_session.json`。

use crate::config::Config;
use crate::error::Result;
use book_discovery_common::{Credential, Session};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Config::config_dir()?.join("session.json")))
    }

    pub fn open_admin() -> Result<Self> {
        Ok(Self::new(Config::config_dir()?.join("admin_session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保存済みのセッション（無ければ未ログイン）
    pub fn load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::anonymous());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let stored: StoredSession = serde_json::from_str(&content)?;
        if stored.access_token.is_empty() {
            return Ok(Session::anonymous());
        }
        Ok(Session::with_credential(Credential::new(stored.access_token)))
    }

    /// ログイン中なら保存、未ログインなら削除
    pub fn save(&self, session: &Session) -> Result<()> {
        let Some(credential) = session.credential() else {
            return self.clear();
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredSession {
            access_token: credential.token().to_string(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
