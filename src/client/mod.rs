//! バックエンドAPIクライアント
//!
//! 失敗は4種類に分類する:
//! - Network: 通信自体が完了しなかった
//! - Rejected: 2xx以外（サーバーの `detail` メッセージ付き）
//! - Malformed: 2xxだが本文を解釈できない
//! - MissingCredential: 認証が必要な操作をトークン無しで呼んだ（通信しない）
//!
//! リトライはしない。

mod http;
mod payload;

pub use http::HttpCatalogClient;

use book_discovery_common::{Book, BookId, Credential};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("サーバーに接続できません: {0}")]
    Network(String),

    #[error("サーバーが要求を拒否しました ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("レスポンスの形式が不正です: {0}")]
    Malformed(String),

    #[error("ログインが必要です")]
    MissingCredential,
}

impl ClientError {
    /// 利用者に見せるメッセージ（拒否時はサーバーの文言そのまま）
    pub fn detail(&self) -> String {
        match self {
            ClientError::Rejected { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Malformed(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// 検索・発見ビューが使う操作
///
/// 単一スレッドの協調スケジューリングで使うため `Send` は要求しない。
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Book>, ClientError>;

    async fn suggest(&self, partial_query: &str) -> Result<Vec<String>, ClientError>;

    async fn check_favorite(
        &self,
        book_id: &BookId,
        credential: Option<&Credential>,
    ) -> Result<bool, ClientError>;

    async fn add_favorite(
        &self,
        book_id: &BookId,
        credential: Option<&Credential>,
    ) -> Result<(), ClientError>;

    async fn remove_favorite(
        &self,
        book_id: &BookId,
        credential: Option<&Credential>,
    ) -> Result<(), ClientError>;

    async fn explain(&self, book: &Book) -> Result<String, ClientError>;
}
