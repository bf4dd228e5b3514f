//! reqwest によるAPIクライアント実装

use super::payload::{
    BookCountResponse, ChatRequest, ChatResponse, ErrorBody, ExplainRequest, ExplainResponse,
    FavoriteRequest, FavoritesResponse, IsFavoriteResponse, LoginRequest, LoginResponse,
    RegisterRequest, SearchResponse, SuggestResponse,
};
use super::{CatalogApi, ClientError};
use crate::config::Config;
use crate::error::{AppError, Result};
use book_discovery_common::{
    books_from_values, AdminOverview, AdminUser, Book, BookId, Credential, TokenUsage, UserInfo,
};
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("APIのURLが不正です ({}): {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!("APIのURLが不正です: {}", base_url)));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("HTTPクライアントを初期化できません: {}", e)))?;

        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_base_url(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// ベースURLにパス要素を連結（要素はパーセントエンコードされる）
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(
        &self,
        request: RequestBuilder,
        credential: Option<&Credential>,
    ) -> ClientResult<RequestBuilder> {
        let credential = credential.ok_or(ClientError::MissingCredential)?;
        Ok(request.header(AUTHORIZATION, credential.bearer()))
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "catalog response");

        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(rejection(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self.execute(request).await?;
        let body = response.bytes().await?;
        decode_body(&body)
    }

    // ---------------------------------------------
    // アカウント
    // ---------------------------------------------

    pub async fn login(&self, identifier: &str, password: &str) -> ClientResult<Credential> {
        let request = self
            .http
            .post(self.endpoint(&["login", ""]))
            .json(&LoginRequest { identifier, password });
        let response: LoginResponse = self.fetch(request).await?;
        Ok(Credential::new(response.access_token))
    }

    /// 管理者ログイン（通常ユーザーのトークンとは別物）
    pub async fn admin_login(&self, identifier: &str, password: &str) -> ClientResult<Credential> {
        let request = self
            .http
            .post(self.endpoint(&["admin", "login", ""]))
            .json(&LoginRequest { identifier, password });
        let response: LoginResponse = self.fetch(request).await?;
        Ok(Credential::new(response.access_token))
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> ClientResult<()> {
        let request = self
            .http
            .post(self.endpoint(&["register", ""]))
            .json(&RegisterRequest {
                username,
                email,
                password,
            });
        self.execute(request).await.map(|_| ())
    }

    pub async fn user_info(&self, credential: Option<&Credential>) -> ClientResult<UserInfo> {
        let request = self.authorized(self.http.get(self.endpoint(&["logininfo"])), credential)?;
        self.fetch(request).await
    }

    pub async fn user_favorites(&self, credential: Option<&Credential>) -> ClientResult<Vec<Book>> {
        let request = self.authorized(self.http.get(self.endpoint(&["userfavorites"])), credential)?;
        let response: FavoritesResponse = self.fetch(request).await?;
        Ok(books_from_values(response.favorites))
    }

    pub async fn chat(&self, message: &str) -> ClientResult<String> {
        let request = self
            .http
            .post(self.endpoint(&["chatbot-recommend"]))
            .json(&ChatRequest { message });
        let response: ChatResponse = self.fetch(request).await?;
        Ok(response.reply)
    }

    // ---------------------------------------------
    // 管理
    // ---------------------------------------------

    pub async fn admin_overview(&self, credential: Option<&Credential>) -> ClientResult<AdminOverview> {
        let request = self.authorized(self.http.get(self.endpoint(&["admin", "overview"])), credential)?;
        self.fetch(request).await
    }

    pub async fn admin_book_count(&self, credential: Option<&Credential>) -> ClientResult<u64> {
        let request = self.authorized(
            self.http.get(self.endpoint(&["admin", "books", "count"])),
            credential,
        )?;
        let response: BookCountResponse = self.fetch(request).await?;
        Ok(response.total_books)
    }

    pub async fn admin_search_users(
        &self,
        query: &str,
        credential: Option<&Credential>,
    ) -> ClientResult<Vec<AdminUser>> {
        let request = self.authorized(
            self.http
                .get(self.endpoint(&["admin", "users", "search"]))
                .query(&[("query", query)]),
            credential,
        )?;
        self.fetch(request).await
    }

    pub async fn admin_delete_user(&self, user_id: i64, credential: Option<&Credential>) -> ClientResult<()> {
        let id = user_id.to_string();
        let request = self.authorized(
            self.http.delete(self.endpoint(&["admin", "users", &id])),
            credential,
        )?;
        self.execute(request).await.map(|_| ())
    }

    pub async fn admin_search_books(
        &self,
        query: &str,
        credential: Option<&Credential>,
    ) -> ClientResult<Vec<Book>> {
        let request = self.authorized(
            self.http
                .get(self.endpoint(&["admin", "books", "search"]))
                .query(&[("query", query)]),
            credential,
        )?;
        let records: Vec<Value> = self.fetch(request).await?;
        Ok(books_from_values(records))
    }

    pub async fn admin_delete_book(&self, book_id: &BookId, credential: Option<&Credential>) -> ClientResult<()> {
        let request = self.authorized(
            self.http
                .delete(self.endpoint(&["admin", "books", book_id.as_str()])),
            credential,
        )?;
        self.execute(request).await.map(|_| ())
    }

    pub async fn admin_token_usage(&self, credential: Option<&Credential>) -> ClientResult<TokenUsage> {
        let request = self.authorized(
            self.http.get(self.endpoint(&["admin", "token-usage"])),
            credential,
        )?;
        self.fetch(request).await
    }
}

impl CatalogApi for HttpCatalogClient {
    async fn search(&self, query: &str, limit: usize) -> ClientResult<Vec<Book>> {
        debug!(%query, limit, "search");
        let request = self
            .http
            .get(self.endpoint(&["bookrcm"]))
            .query(&[("query", query)])
            .query(&[("k", limit)]);
        let response: SearchResponse = self.fetch(request).await?;
        Ok(books_from_values(response.results))
    }

    async fn suggest(&self, partial_query: &str) -> ClientResult<Vec<String>> {
        let request = self
            .http
            .get(self.endpoint(&["suggestions"]))
            .query(&[("query", partial_query)]);
        let response: SuggestResponse = self.fetch(request).await?;
        Ok(response.suggestions.into_iter().map(|s| s.query).collect())
    }

    async fn check_favorite(&self, book_id: &BookId, credential: Option<&Credential>) -> ClientResult<bool> {
        let request = self.authorized(
            self.http.get(self.endpoint(&["is_favorite", book_id.as_str()])),
            credential,
        )?;
        let response: IsFavoriteResponse = self.fetch(request).await?;
        Ok(response.is_favorite)
    }

    async fn add_favorite(&self, book_id: &BookId, credential: Option<&Credential>) -> ClientResult<()> {
        let request = self.authorized(
            self.http
                .post(self.endpoint(&["favorites", ""]))
                .json(&FavoriteRequest { book_id }),
            credential,
        )?;
        self.execute(request).await.map(|_| ())
    }

    async fn remove_favorite(&self, book_id: &BookId, credential: Option<&Credential>) -> ClientResult<()> {
        let request = self.authorized(
            self.http.delete(self.endpoint(&["favorites", book_id.as_str()])),
            credential,
        )?;
        self.execute(request).await.map(|_| ())
    }

    async fn explain(&self, book: &Book) -> ClientResult<String> {
        let request = self
            .http
            .post(self.endpoint(&["explain"]))
            .json(&ExplainRequest::from(book));
        let response: ExplainResponse = self.fetch(request).await?;
        Ok(response.reason)
    }
}

/// 2xx以外の応答を分類
fn rejection(status: StatusCode, body: &[u8]) -> ClientError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
    ClientError::Rejected {
        status: status.as_u16(),
        detail,
    }
}

/// 2xx応答の本文を解釈
///
/// バックエンドは内部エラー時に 200 + `{"error": "..."}` を返すので、その文言を添える
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        let server_error = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
        ClientError::Malformed(server_error.unwrap_or_else(|| e.to_string()))
    })
}
