//! 認証情報（ベアラートークン）
//!
//! グローバルな保存領域を読む代わりに、`Session` を各操作へ明示的に渡す。
//! ログインで設定し、ログアウトまたはユーザー情報取得の拒否で破棄する。

use serde::{Deserialize, Serialize};
use std::fmt;

/// ベアラートークン
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// `Authorization` ヘッダー値
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// トークンをログに出さない
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// 現在のセッション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<Credential>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn sign_in(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    pub fn sign_out(&mut self) {
        self.credential = None;
    }
}
