use crate::client::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ログインしていません。`book-discovery login` でログインしてください")]
    NotLoggedIn,

    #[error("管理者としてログインしていません。`book-discovery admin login` でログインしてください")]
    AdminNotLoggedIn,

    #[error("書籍が見つかりません: {0}")]
    BookNotFound(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
