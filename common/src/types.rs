//! 書籍・アカウントの型定義
//!
//! バックエンドは2種類の書籍レコードを返す:
//! - 検索結果: `id` キー
//! - お気に入り一覧など: `book_id` キー
//!
//! どちらも境界で `Book` に正規化し、IDの無いレコードは不正として弾く。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// 詳細表示で説明文を折りたたむ文字数
pub const DESCRIPTION_PREVIEW_CHARS: usize = 400;

/// 書籍ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// 書籍レコード（受信後は不変）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBook")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishing_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<String>,
}

impl Book {
    /// 任意のJSON値から書籍を復元
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// 折りたたみ表示用の説明文
    ///
    /// 400文字を超える場合は先頭400文字 + "..." を返す
    pub fn description_preview(&self) -> Cow<'_, str> {
        if self.description.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
            return Cow::Borrowed(&self.description);
        }
        let head: String = self.description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        Cow::Owned(format!("{}...", head))
    }
}

/// 受信したままの書籍レコード
///
/// 年・ページ数・IDは文字列でも数値でも届く。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBook {
    id: Option<Value>,
    book_id: Option<Value>,
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    thumbnail: Option<Value>,
    link: Option<Value>,
    categories: Option<Value>,
    language: Option<Value>,
    publishing_year: Option<Value>,
    publisher: Option<Value>,
    num_pages: Option<Value>,
}

impl TryFrom<RawBook> for Book {
    type Error = Error;

    fn try_from(raw: RawBook) -> Result<Self> {
        let id = raw
            .id
            .and_then(text_of)
            .or_else(|| raw.book_id.and_then(text_of))
            .ok_or(Error::MissingBookId)?;

        Ok(Book {
            id: BookId(id),
            title: raw.title.unwrap_or_default(),
            author: raw.author.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            thumbnail: raw.thumbnail.and_then(text_of),
            link: raw.link.and_then(text_of),
            categories: raw.categories.and_then(text_of),
            language: raw.language.and_then(text_of),
            publishing_year: raw.publishing_year.and_then(text_of),
            publisher: raw.publisher.and_then(text_of),
            num_pages: raw.num_pages.and_then(text_of),
        })
    }
}

/// 文字列/数値のフィールドを文字列に揃える（空文字・nullは未設定扱い）
fn text_of(value: Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s,
        other => other.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 書籍レコード配列を正規化
///
/// IDの無いレコードは警告を出して読み飛ばす
pub fn books_from_values(values: Vec<Value>) -> Vec<Book> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match Book::from_value(value) {
            Ok(book) => Some(book),
            Err(e) => {
                warn!(index, error = %e, "discarding malformed book record");
                None
            }
        })
        .collect()
}

/// ログイン中ユーザー情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub email: String,
}

/// 管理画面: ユーザー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// 管理画面: 全体統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminOverview {
    pub total_users: u64,
    pub total_favorites: u64,
    pub total_books: u64,
}

/// 用途別トークン使用量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurposeUsage {
    pub input: u64,
    pub output: u64,
}

/// トークン使用量サマリー
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsageSummary {
    pub by_purpose: HashMap<String, PurposeUsage>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
}

/// トークン使用ログ1件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsageLog {
    pub purpose: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub created_at: Option<String>,
}

/// 管理画面: トークン使用量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub summary: TokenUsageSummary,
    pub logs: Vec<TokenUsageLog>,
}
