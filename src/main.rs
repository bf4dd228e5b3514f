use book_discovery::{account, cli, client, config, discovery, error, logging, output, store};
use book_discovery_common::{chat::CHAT_FAILURE, Book, BookId, ChatTranscript, Session};
use clap::Parser;
use cli::{AdminCommands, Cli, Commands};
use client::{CatalogApi, HttpCatalogClient};
use config::Config;
use dialoguer::{Confirm, Input, Password};
use discovery::DiscoverySession;
use error::{AppError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use store::SessionStore;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Search { query, page } => {
            let session = open_session(&config)?;
            let pb = spinner(format!("「{}」を検索中...", query));
            session.search(&query).await;
            pb.finish_and_clear();

            if page > 1 && !session.go_to_page(page) {
                eprintln!("{}ページ目はありません", page);
            }
            output::print_notices(&session.take_notices());
            output::print_results(&session.view());
        }

        Commands::Suggest { prefix } => {
            let session = open_session(&config)?;
            session.edit_query(&prefix).await;
            let view = session.view();
            if view.suggestions().is_empty() {
                println!("候補はありません");
            }
            for (index, suggestion) in view.suggestions().iter().enumerate() {
                println!("{:>2}. {}", index + 1, suggestion);
            }
        }

        Commands::Show { query, book_id } => {
            let session = open_session(&config)?;
            let book = find_book(&session, &query, &book_id).await?;
            session.open_book(book.clone()).await;

            output::print_book(&book, session.view().favorite_status());
            output::print_notices(&session.take_notices());
        }

        Commands::Favorite { query, book_id } => {
            let session = open_session(&config)?;
            let book = find_book(&session, &query, &book_id).await?;
            session.open_book(book.clone()).await;

            session.toggle_favorite().await;

            println!("{}", book.title);
            output::print_notices(&session.take_notices());
        }

        Commands::Explain { query, book_id } => {
            let session = open_session(&config)?;
            let book = find_book(&session, &query, &book_id).await?;

            let pb = spinner("おすすめ理由を生成中...".to_string());
            session.explain(&book).await;
            pb.finish_and_clear();

            println!("{}\n", book.title);
            output::print_explanation(session.view().explanation());
        }

        Commands::Login { identifier } => {
            let client = HttpCatalogClient::from_config(&config)?;
            let store = SessionStore::open_default()?;

            let identifier = match identifier {
                Some(identifier) => identifier,
                None => Input::new().with_prompt("ユーザー名またはメールアドレス").interact_text()?,
            };
            let password = Password::new().with_prompt("パスワード").interact()?;

            account::login(&client, &store, &identifier, &password).await?;
            println!("✔ ログインしました");
        }

        Commands::Register { username, email } => {
            let client = HttpCatalogClient::from_config(&config)?;

            let username = match username {
                Some(username) => username,
                None => Input::new().with_prompt("ユーザー名").interact_text()?,
            };
            let email = match email {
                Some(email) => email,
                None => Input::new().with_prompt("メールアドレス").interact_text()?,
            };
            let password = Password::new()
                .with_prompt("パスワード")
                .with_confirmation("パスワード（確認）", "パスワードが一致しません")
                .interact()?;

            client.register(&username, &email, &password).await?;
            println!("✔ 登録しました。`book-discovery login` でログインしてください");
        }

        Commands::Logout => {
            account::logout(&SessionStore::open_default()?)?;
            println!("✔ ログアウトしました");
        }

        Commands::Whoami => {
            let client = HttpCatalogClient::from_config(&config)?;
            let store = SessionStore::open_default()?;
            match account::restore(&client, &store).await? {
                (_, Some(user)) => println!("{} <{}>", user.username, user.email),
                (session, None) if session.is_authenticated() => {
                    println!("ログイン中（ユーザー情報を取得できませんでした）")
                }
                _ => println!("ログインしていません"),
            }
        }

        Commands::Favorites => {
            let client = HttpCatalogClient::from_config(&config)?;
            let session = verified_session(&client).await?;

            let books = match client.user_favorites(session.credential()).await {
                Ok(books) => books,
                Err(e) => {
                    warn!(error = %e, "favorites unavailable");
                    Vec::new()
                }
            };
            println!("お気に入り: {}件\n", books.len());
            output::print_book_list(&books);
        }

        Commands::Chat { message } => {
            let client = HttpCatalogClient::from_config(&config)?;
            run_chat(&client, message).await?;
        }

        Commands::Admin { command } => {
            let client = HttpCatalogClient::from_config(&config)?;
            let store = SessionStore::open_admin()?;
            match command {
                AdminCommands::Login { identifier } => {
                    let identifier = match identifier {
                        Some(identifier) => identifier,
                        None => Input::new().with_prompt("管理者ID").interact_text()?,
                    };
                    let password = Password::new().with_prompt("パスワード").interact()?;

                    account::admin_login(&client, &store, &identifier, &password).await?;
                    println!("✔ 管理者としてログインしました");
                }
                AdminCommands::Logout => {
                    account::logout(&store)?;
                    println!("✔ 管理者ログアウトしました");
                }
                command => {
                    let session = account::admin_session(&store)?;
                    if let Err(e) = run_admin(&client, &session, command).await {
                        account::discard_rejected_admin(&store, &e)?;
                        return Err(e);
                    }
                }
            }
        }

        Commands::Config { set_api_url, show } => {
            let mut config = config;

            if let Some(url) = set_api_url {
                HttpCatalogClient::new(&url, Duration::from_secs(config.timeout_seconds))?;
                config.set_api_base_url(url)?;
                println!("✔ APIのURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  APIのURL: {}", config.api_base_url());
                println!("  ページサイズ: {}", config.page_size);
                println!("  検索件数: {}", config.search_limit);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  設定ファイル: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 保存済みセッションで発見ビューを開く
fn open_session(config: &Config) -> Result<DiscoverySession<HttpCatalogClient>> {
    let client = HttpCatalogClient::from_config(config)?;
    let session = SessionStore::open_default()?.load()?;
    Ok(DiscoverySession::new(client, session, config.page_size, config.search_limit))
}

/// ログイン必須の操作用（トークンをサーバーで確認する）
async fn verified_session(client: &HttpCatalogClient) -> Result<Session> {
    let store = SessionStore::open_default()?;
    let (session, _) = account::restore(client, &store).await?;
    if !session.is_authenticated() {
        return Err(AppError::NotLoggedIn);
    }
    Ok(session)
}

/// 検索結果から書籍を探す
async fn find_book<C: CatalogApi>(
    session: &DiscoverySession<C>,
    query: &str,
    book_id: &str,
) -> Result<Book> {
    session.search(query).await;
    output::print_notices(&session.take_notices());

    let id = BookId::from(book_id);
    let found = session.view().results().iter().find(|book| book.id == id).cloned();
    found.ok_or_else(|| AppError::BookNotFound(book_id.to_string()))
}

async fn run_chat(client: &HttpCatalogClient, first: Option<String>) -> Result<()> {
    let mut transcript = ChatTranscript::new();
    let interactive = first.is_none();
    let mut pending = first;

    loop {
        let input = match pending.take() {
            Some(message) => message,
            None if interactive => Input::<String>::new()
                .with_prompt("メッセージ（空行で終了）")
                .allow_empty(true)
                .interact_text()?,
            None => break,
        };
        let Some(ticket) = transcript.send(&input) else {
            break;
        };

        let pb = spinner("回答を待っています...".to_string());
        let reply = match client.chat(&ticket.message).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(error = %e, "chat failed");
                None
            }
        };
        pb.finish_and_clear();

        transcript.finish(reply);
        if let Some(message) = transcript.messages().last() {
            output::print_chat_message(message);
            if message.text == CHAT_FAILURE {
                eprintln!("しばらくしてから再度お試しください");
            }
        }
    }
    Ok(())
}

async fn run_admin(client: &HttpCatalogClient, session: &Session, command: AdminCommands) -> Result<()> {
    let credential = session.credential();

    match command {
        AdminCommands::Overview => {
            let overview = client.admin_overview(credential).await?;
            output::print_overview(&overview);
        }

        AdminCommands::Users { query } => {
            let users = client.admin_search_users(&query, credential).await?;
            output::print_users(&users);
        }

        AdminCommands::Books { query } => {
            let total = client.admin_book_count(credential).await?;
            let books = client.admin_search_books(&query, credential).await?;
            println!("登録書籍: {}冊\n", total);
            output::print_book_list(&books);
        }

        AdminCommands::DeleteUser { user_id, yes } => {
            if yes || confirm(&format!("ユーザー {} を削除しますか？", user_id))? {
                client.admin_delete_user(user_id, credential).await?;
                println!("✔ ユーザーを削除しました");
            }
        }

        AdminCommands::DeleteBook { book_id, yes } => {
            if yes || confirm(&format!("書籍 {} を削除しますか？", book_id))? {
                client.admin_delete_book(&BookId::new(book_id), credential).await?;
                println!("✔ 書籍を削除しました");
            }
        }

        AdminCommands::TokenUsage => {
            let usage = client.admin_token_usage(credential).await?;
            output::print_token_usage(&usage);
        }

        AdminCommands::Login { .. } | AdminCommands::Logout => {}
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}
