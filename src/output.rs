//! 端末への表示

use book_discovery_common::{
    AdminOverview, AdminUser, Book, ChatMessage, DiscoveryView, ExplanationState, FavoriteStatus,
    Notice, PageSlot, Sender, TokenUsage,
};

/// 現在ページの一覧とページ番号の並び
pub fn print_results(view: &DiscoveryView) {
    let page = view.page_view();
    if view.results().is_empty() {
        println!("該当する書籍はありません");
        return;
    }

    println!("{}件 / {}ページ中 {}ページ目\n", view.results().len(), page.total_pages, page.current_page);
    for (offset, book) in view.current_items().iter().enumerate() {
        println!("{:>4}. {} / {}  [{}]", page.item_range.start + offset + 1, book.title, book.author, book.id);
    }
    println!("\n{}", page_window_line(&page.window, page.current_page));
}

/// ページ番号の並び（現在ページは角括弧）
pub fn page_window_line(window: &[PageSlot], current_page: usize) -> String {
    window
        .iter()
        .map(|slot| match slot {
            PageSlot::Page(page) if *page == current_page => format!("[{}]", page),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_book(book: &Book, favorite: FavoriteStatus) {
    println!("{}", book.title);
    println!("  著者: {}", book.author);
    println!("  ID: {}", book.id);

    let details = [
        ("カテゴリ", &book.categories),
        ("言語", &book.language),
        ("出版年", &book.publishing_year),
        ("出版社", &book.publisher),
        ("ページ数", &book.num_pages),
        ("リンク", &book.link),
    ];
    for (label, value) in details {
        if let Some(value) = value {
            println!("  {}: {}", label, value);
        }
    }

    println!("  お気に入り: {}", favorite_label(favorite));
    if !book.description.is_empty() {
        println!("\n{}", book.description_preview());
    }
}

pub fn favorite_label(status: FavoriteStatus) -> &'static str {
    match status {
        FavoriteStatus::Unknown => "不明",
        FavoriteStatus::Favorited => "★ 登録済み",
        FavoriteStatus::NotFavorited => "☆ 未登録",
    }
}

pub fn print_explanation(state: &ExplanationState) {
    match state {
        ExplanationState::Hidden => {}
        ExplanationState::Loading => println!("おすすめ理由を取得中..."),
        ExplanationState::Ready(text) => println!("おすすめ理由:\n{}", text),
    }
}

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice {
            Notice::FavoriteSaved(_) => println!("✔ {}", notice),
            _ => eprintln!("⚠ {}", notice),
        }
    }
}

pub fn print_chat_message(message: &ChatMessage) {
    let speaker = match message.sender {
        Sender::User => "あなた",
        Sender::Bot => "AI",
    };
    println!("{}: {}", speaker, message.text);
}

pub fn print_overview(overview: &AdminOverview) {
    println!("利用状況:");
    println!("  ユーザー数: {}", overview.total_users);
    println!("  お気に入り数: {}", overview.total_favorites);
    println!("  書籍数: {}", overview.total_books);
}

pub fn print_users(users: &[AdminUser]) {
    if users.is_empty() {
        println!("該当するユーザーはいません");
    }
    for user in users {
        println!("{:>6}  {}  <{}>", user.id, user.username, user.email);
    }
}

pub fn print_book_list(books: &[Book]) {
    if books.is_empty() {
        println!("該当する書籍はありません");
    }
    for book in books {
        println!("- {} / {}  [{}]", book.title, book.author, book.id);
    }
}

pub fn print_token_usage(usage: &TokenUsage) {
    let summary = &usage.summary;
    println!("トークン使用量:");
    println!("  入力: {}", summary.total_input_tokens);
    println!("  出力: {}", summary.total_output_tokens);
    println!("  合計: {}", summary.total_tokens);

    let mut purposes: Vec<_> = summary.by_purpose.iter().collect();
    purposes.sort_by(|a, b| a.0.cmp(b.0));
    for (purpose, usage) in purposes {
        println!("  - {}: 入力 {} / 出力 {}", purpose, usage.input, usage.output);
    }

    if !usage.logs.is_empty() {
        println!("\n最近の記録:");
        for log in &usage.logs {
            println!(
                "  {} {} 入力 {} / 出力 {}",
                log.created_at.as_deref().unwrap_or("-"),
                log.purpose,
                log.input_tokens,
                log.output_tokens
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_discovery_common::visible_pages;

    #[test]
    fn test_page_window_line_marks_current() {
        let window = visible_pages(15, 8);
        assert_eq!(page_window_line(&window, 8), "1 ... 6 7 [8] 9 10 ... 15");
    }

    #[test]
    fn test_favorite_label() {
        assert_eq!(favorite_label(FavoriteStatus::Unknown), "不明");
    }
}
