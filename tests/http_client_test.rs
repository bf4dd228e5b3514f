//! APIクライアントテスト
//!
//! axum で立てたローカルサーバーに対してリクエスト/レスポンスを検証

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use book_discovery::account;
use book_discovery::client::{CatalogApi, ClientError, HttpCatalogClient};
use book_discovery::error::AppError;
use book_discovery::store::SessionStore;
use book_discovery_common::{Book, BookId, Credential};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

type Reply = (StatusCode, Json<Value>);

const TOKEN: &str = "good-token";
const ADMIN_TOKEN: &str = "admin-token";

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
}

fn admin_unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Admin token invalid"})),
    )
}

fn bearer_is(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", token))
}

fn is_authorized(headers: &HeaderMap) -> bool {
    bearer_is(headers, TOKEN)
}

/// 管理APIは管理者トークンのみ受け付ける
fn is_admin(headers: &HeaderMap) -> bool {
    bearer_is(headers, ADMIN_TOKEN)
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Reply {
    let query = params.get("query").cloned().unwrap_or_default();
    let k = params.get("k").cloned().unwrap_or_default();
    ok(json!({
        "results": [
            {"id": "b1", "title": query, "author": k, "description": "first", "publishing_year": 1965},
            {"title": "no id"},
            {"id": 2, "title": "second", "author": "x"}
        ]
    }))
}

async fn suggestions(Query(params): Query<HashMap<String, String>>) -> Reply {
    let query = params.get("query").cloned().unwrap_or_default();
    ok(json!({"suggestions": [{"query": format!("{} messiah", query)}, {"query": query}]}))
}

async fn is_favorite(headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    ok(json!({"is_favorite": id == "fav"}))
}

async fn add_favorite(headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    match body.get("book_id").and_then(Value::as_str) {
        Some("fav") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Book already in favorites"})),
        ),
        Some(_) => ok(json!({"message": "Book added to favorites"})),
        None => (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({}))),
    }
}

async fn remove_favorite(headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    if id == "fav" {
        ok(json!({"message": "Book removed from favorites"}))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Not in favorites"})))
    }
}

async fn explain(Json(body): Json<Value>) -> Reply {
    let title = body["title"].as_str().unwrap_or_default();
    if title == "boom" {
        return ok(json!({"error": "generation failed"}));
    }
    ok(json!({"reason": format!("{} by {}", title, body["author"].as_str().unwrap_or_default())}))
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["identifier"] == "alice" && body["password"] == "secret" {
        ok(json!({"access_token": TOKEN, "token_type": "bearer"}))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        )
    }
}

async fn admin_login(Json(body): Json<Value>) -> Reply {
    if body["identifier"] == "admin" && body["password"] == "Admin@123" {
        ok(json!({"access_token": ADMIN_TOKEN, "token_type": "bearer"}))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid admin credentials"})),
        )
    }
}

async fn register(Json(body): Json<Value>) -> Reply {
    if body["email"].as_str().is_some_and(|e| e.contains('@')) {
        ok(json!({"message": "User registered"}))
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "email"], "msg": "value is not a valid email address"}]})),
        )
    }
}

async fn login_info(headers: HeaderMap) -> Reply {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    ok(json!({"username": "alice", "email": "alice@example.com"}))
}

async fn user_favorites(headers: HeaderMap) -> Reply {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    ok(json!({"favorites": [{"book_id": 7, "title": "Dune", "author": "Frank Herbert"}]}))
}

async fn chat(Json(body): Json<Value>) -> Reply {
    ok(json!({"reply": format!("re: {}", body["message"].as_str().unwrap_or_default())}))
}

async fn admin_overview(headers: HeaderMap) -> Reply {
    if !is_admin(&headers) {
        return admin_unauthorized();
    }
    ok(json!({"total_users": 3, "total_favorites": 10, "total_books": 1200}))
}

async fn admin_users(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    if !is_admin(&headers) {
        return admin_unauthorized();
    }
    let query = params.get("query").cloned().unwrap_or_default();
    ok(json!([{"id": 1, "username": query, "email": "bob@example.com"}]))
}

async fn admin_delete_user(headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    if !is_admin(&headers) {
        return admin_unauthorized();
    }
    if id == 1 {
        ok(json!({"message": "deleted"}))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "User not found"})))
    }
}

async fn admin_token_usage(headers: HeaderMap) -> Reply {
    if !is_admin(&headers) {
        return admin_unauthorized();
    }
    ok(json!({
        "summary": {
            "by_purpose": {"explain": {"input": 100, "output": 40}},
            "total_input_tokens": 100,
            "total_output_tokens": 40,
            "total_tokens": 140
        },
        "logs": [{"purpose": "explain", "input_tokens": 100, "output_tokens": 40, "total_tokens": 140}]
    }))
}

fn router() -> Router {
    Router::new()
        .route("/bookrcm", get(search))
        .route("/suggestions", get(suggestions))
        .route("/is_favorite/{id}", get(is_favorite))
        .route("/favorites/", post(add_favorite))
        .route("/favorites/{id}", delete(remove_favorite))
        .route("/explain", post(explain))
        .route("/login/", post(login))
        .route("/register/", post(register))
        .route("/logininfo", get(login_info))
        .route("/userfavorites", get(user_favorites))
        .route("/chatbot-recommend", post(chat))
        .route("/admin/login/", post(admin_login))
        .route("/admin/overview", get(admin_overview))
        .route("/admin/users/search", get(admin_users))
        .route("/admin/users/{id}", delete(admin_delete_user))
        .route("/admin/token-usage", get(admin_token_usage))
}

/// テスト用サーバーを起動してクライアントを返す
async fn serve() -> HttpCatalogClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    HttpCatalogClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

fn credential() -> Credential {
    Credential::new(TOKEN)
}

fn sample_book(title: &str) -> Book {
    Book::from_value(json!({"id": "b1", "title": title, "author": "Frank Herbert", "description": "Spice."})).unwrap()
}

/// 検索パラメータが渡り、IDの無いレコードは除外される
#[tokio::test]
async fn test_search_sends_query_and_limit() {
    let client = serve().await;
    let books = client.search("dune & sons", 1000).await.unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].title, "dune & sons");
    assert_eq!(books[0].author, "1000");
    assert_eq!(books[0].publishing_year.as_deref(), Some("1965"));
    assert_eq!(books[1].id, BookId::from("2"));
}

#[tokio::test]
async fn test_suggest() {
    let client = serve().await;
    let suggestions = client.suggest("dune").await.unwrap();
    assert_eq!(suggestions, vec!["dune messiah".to_string(), "dune".to_string()]);
}

#[tokio::test]
async fn test_check_favorite_with_credential() {
    let client = serve().await;
    let cred = credential();

    assert!(client.check_favorite(&BookId::from("fav"), Some(&cred)).await.unwrap());
    assert!(!client.check_favorite(&BookId::from("other"), Some(&cred)).await.unwrap());
}

/// トークン無しは通信せずに失敗する
#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    // 接続先が存在しなくても MissingCredential になる
    let client = HttpCatalogClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();

    let result = client.check_favorite(&BookId::from("x"), None).await;
    assert!(matches!(result, Err(ClientError::MissingCredential)));

    let result = client.add_favorite(&BookId::from("x"), None).await;
    assert!(matches!(result, Err(ClientError::MissingCredential)));

    let result = client.admin_overview(None).await;
    assert!(matches!(result, Err(ClientError::MissingCredential)));
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let client = serve().await;
    let bad = Credential::new("bad");

    let err = client.user_info(Some(&bad)).await.unwrap_err();
    assert!(err.is_rejection());
    assert!(matches!(err, ClientError::Rejected { status: 401, .. }));
    assert_eq!(err.detail(), "Could not validate credentials");
}

/// 拒否理由はサーバーの文言そのまま
#[tokio::test]
async fn test_favorite_mutations_surface_detail() {
    let client = serve().await;
    let cred = credential();

    client.add_favorite(&BookId::from("new"), Some(&cred)).await.unwrap();
    client.remove_favorite(&BookId::from("fav"), Some(&cred)).await.unwrap();

    let err = client.add_favorite(&BookId::from("fav"), Some(&cred)).await.unwrap_err();
    assert_eq!(err.detail(), "Book already in favorites");

    let err = client.remove_favorite(&BookId::from("new"), Some(&cred)).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 404, .. }));
    assert_eq!(err.detail(), "Not in favorites");
}

#[tokio::test]
async fn test_explain() {
    let client = serve().await;
    let reason = client.explain(&sample_book("Dune")).await.unwrap();
    assert_eq!(reason, "Dune by Frank Herbert");
}

/// 200 + {"error": ...} は形式不正として扱う
#[tokio::test]
async fn test_error_payload_is_malformed() {
    let client = serve().await;
    let err = client.explain(&sample_book("boom")).await.unwrap_err();
    match err {
        ClientError::Malformed(message) => assert_eq!(message, "generation failed"),
        other => panic!("expected Malformed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_and_user_info() {
    let client = serve().await;

    let cred = client.login("alice", "secret").await.unwrap();
    assert_eq!(cred.token(), TOKEN);

    let user = client.user_info(Some(&cred)).await.unwrap();
    assert_eq!(user.username, "alice");

    let err = client.login("alice", "wrong").await.unwrap_err();
    assert_eq!(err.detail(), "Incorrect username or password");
}

/// バリデーションエラーは msg を連結して表示
#[tokio::test]
async fn test_register_validation_detail() {
    let client = serve().await;

    client.register("bob", "bob@example.com", "pw").await.unwrap();
    let err = client.register("bob", "not-an-email", "pw").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 422, .. }));
    assert_eq!(err.detail(), "value is not a valid email address");
}

/// お気に入り一覧は book_id キーでも正規化される
#[tokio::test]
async fn test_user_favorites_normalizes_ids() {
    let client = serve().await;
    let books = client.user_favorites(Some(&credential())).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, BookId::from("7"));
}

#[tokio::test]
async fn test_chat() {
    let client = serve().await;
    assert_eq!(client.chat("sci-fi please").await.unwrap(), "re: sci-fi please");
}

#[tokio::test]
async fn test_admin_endpoints() {
    let client = serve().await;
    let cred = client.admin_login("admin", "Admin@123").await.unwrap();
    assert_eq!(cred.token(), ADMIN_TOKEN);

    let overview = client.admin_overview(Some(&cred)).await.unwrap();
    assert_eq!(overview.total_books, 1200);

    let users = client.admin_search_users("bob", Some(&cred)).await.unwrap();
    assert_eq!(users[0].username, "bob");

    client.admin_delete_user(1, Some(&cred)).await.unwrap();
    let err = client.admin_delete_user(99, Some(&cred)).await.unwrap_err();
    assert_eq!(err.detail(), "User not found");

    let usage = client.admin_token_usage(Some(&cred)).await.unwrap();
    assert_eq!(usage.summary.total_tokens, 140);
    assert_eq!(usage.summary.by_purpose["explain"].output, 40);
    assert_eq!(usage.logs.len(), 1);
}

/// 利用者のトークンでは管理APIに入れない
#[tokio::test]
async fn test_user_token_rejected_by_admin_endpoints() {
    let client = serve().await;
    let user = client.login("alice", "secret").await.unwrap();

    let err = client.admin_overview(Some(&user)).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 401, .. }));
    assert_eq!(err.detail(), "Admin token invalid");
}

#[tokio::test]
async fn test_admin_login_wrong_password() {
    let client = serve().await;
    let err = client.admin_login("admin", "nope").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 400, .. }));
    assert_eq!(err.detail(), "Invalid admin credentials");
}

/// 管理者トークンは専用の保存先に置かれ、利用者のセッションに触れない
#[tokio::test]
async fn test_admin_login_persists_separately() {
    let client = serve().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let user_store = SessionStore::new(dir.path().join("session.json"));
    let admin_store = SessionStore::new(dir.path().join("admin_session.json"));

    account::login(&client, &user_store, "alice", "secret").await.unwrap();
    account::admin_login(&client, &admin_store, "admin", "Admin@123").await.unwrap();

    let admin = account::admin_session(&admin_store).unwrap();
    let overview = client.admin_overview(admin.credential()).await.unwrap();
    assert_eq!(overview.total_users, 3);

    // 利用者側の復元は管理者トークンの影響を受けない
    let (session, user) = account::restore(&client, &user_store).await.unwrap();
    assert_eq!(session.credential().map(Credential::token), Some(TOKEN));
    assert_eq!(user.unwrap().username, "alice");
    assert!(admin_store.path().exists());
}

/// 管理APIが 401 を返したら管理者トークンを破棄する
#[tokio::test]
async fn test_rejected_admin_token_is_discarded() {
    let client = serve().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let admin_store = SessionStore::new(dir.path().join("admin_session.json"));
    admin_store
        .save(&book_discovery_common::Session::with_credential(Credential::new("expired")))
        .unwrap();

    let session = account::admin_session(&admin_store).unwrap();
    let err: AppError = client.admin_overview(session.credential()).await.unwrap_err().into();
    account::discard_rejected_admin(&admin_store, &err).unwrap();

    assert!(!admin_store.path().exists());
    assert!(matches!(
        account::admin_session(&admin_store),
        Err(AppError::AdminNotLoggedIn)
    ));
}

/// 404 などの拒否ではトークンを残す
#[tokio::test]
async fn test_admin_not_found_keeps_token() {
    let client = serve().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let admin_store = SessionStore::new(dir.path().join("admin_session.json"));
    let session = account::admin_login(&client, &admin_store, "admin", "Admin@123").await.unwrap();

    let err: AppError = client.admin_delete_user(99, session.credential()).await.unwrap_err().into();
    account::discard_rejected_admin(&admin_store, &err).unwrap();
    assert!(admin_store.path().exists());
}

/// 接続できない場合は Network
#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpCatalogClient::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = client.search("dune", 10).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}
