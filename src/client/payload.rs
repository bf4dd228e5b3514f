//! リクエスト/レスポンス本文

use book_discovery_common::{Book, BookId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
pub(super) struct ExplainRequest<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub description: &'a str,
}

impl<'a> From<&'a Book> for ExplainRequest<'a> {
    fn from(book: &'a Book) -> Self {
        Self {
            title: &book.title,
            author: &book.author,
            description: &book.description,
        }
    }
}

#[derive(Serialize)]
pub(super) struct FavoriteRequest<'a> {
    pub book_id: &'a BookId,
}

#[derive(Serialize)]
pub(super) struct LoginRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(super) struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(super) struct ChatRequest<'a> {
    pub message: &'a str,
}

/// 書籍配列（レコード単位で正規化するため一旦Valueで受ける）
#[derive(Deserialize)]
pub(super) struct SearchResponse {
    pub results: Vec<Value>,
}

#[derive(Deserialize)]
pub(super) struct FavoritesResponse {
    pub favorites: Vec<Value>,
}

#[derive(Deserialize)]
pub(super) struct SuggestionEntry {
    pub query: String,
}

#[derive(Deserialize)]
pub(super) struct SuggestResponse {
    pub suggestions: Vec<SuggestionEntry>,
}

#[derive(Deserialize)]
pub(super) struct IsFavoriteResponse {
    pub is_favorite: bool,
}

#[derive(Deserialize)]
pub(super) struct ExplainResponse {
    pub reason: String,
}

#[derive(Deserialize)]
pub(super) struct ChatResponse {
    pub reply: String,
}

#[derive(Deserialize)]
pub(super) struct LoginResponse {
    pub access_token: String,
}

#[derive(Deserialize)]
pub(super) struct BookCountResponse {
    pub total_books: u64,
}

/// エラー本文の `detail`
///
/// 文字列、またはバリデーションエラーの配列（`[{msg: ...}]`）で届く
#[derive(Deserialize)]
pub(super) struct ErrorBody {
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
