//! 検索・発見ビューの非同期ドライバ
//!
//! `DiscoveryView` の操作を発行し、APIの応答を戻す。
//! 状態は `RefCell` に置き、`.await` をまたいで借用しないので、
//! 1スレッド上で複数の操作を並行に進められる。

use crate::client::CatalogApi;
use book_discovery_common::{
    Book, CheckTicket, Credential, DiscoveryView, FavoriteAction, FavoriteMutation, FavoriteRequest,
    Notice, SearchTicket, Session,
};
use std::cell::{Ref, RefCell};
use tracing::{debug, info, warn};

pub struct DiscoverySession<C: CatalogApi> {
    api: C,
    session: RefCell<Session>,
    view: RefCell<DiscoveryView>,
}

impl<C: CatalogApi> DiscoverySession<C> {
    pub fn new(api: C, session: Session, page_size: usize, search_limit: usize) -> Self {
        Self {
            api,
            session: RefCell::new(session),
            view: RefCell::new(DiscoveryView::new(page_size, search_limit)),
        }
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    pub fn view(&self) -> Ref<'_, DiscoveryView> {
        self.view.borrow()
    }

    pub fn session(&self) -> Ref<'_, Session> {
        self.session.borrow()
    }

    pub fn sign_in(&self, credential: Credential) {
        self.session.borrow_mut().sign_in(credential);
    }

    pub fn sign_out(&self) {
        self.session.borrow_mut().sign_out();
    }

    fn credential(&self) -> Option<Credential> {
        self.session.borrow().credential().cloned()
    }

    // ---------------------------------------------
    // 入力・検索
    // ---------------------------------------------

    /// 入力を更新して候補を取得（失敗時は候補なし）
    pub async fn edit_query(&self, text: &str) {
        let ticket = self.view.borrow_mut().edit_query(text);
        let Some(ticket) = ticket else {
            return;
        };

        let suggestions = match self.api.suggest(&ticket.query).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                debug!(query = %ticket.query, error = %e, "suggestions unavailable");
                Vec::new()
            }
        };
        self.view.borrow_mut().finish_suggestions(&ticket, suggestions);
    }

    /// 入力欄を書き換えて検索
    pub async fn search(&self, query: &str) -> bool {
        let ticket = {
            let mut view = self.view.borrow_mut();
            view.replace_query(query);
            view.submit()
        };
        self.run_search(ticket).await
    }

    /// 現在の入力で検索（ボタン / Enter）
    pub async fn submit(&self) -> bool {
        let ticket = self.view.borrow_mut().submit();
        self.run_search(ticket).await
    }

    pub async fn select_suggestion(&self, index: usize) -> bool {
        let ticket = self.view.borrow_mut().select_suggestion(index);
        self.run_search(ticket).await
    }

    /// 検索を実行。結果が反映されたら `true`
    async fn run_search(&self, ticket: Option<SearchTicket>) -> bool {
        let Some(ticket) = ticket else {
            return false;
        };

        let results = match self.api.search(&ticket.query, ticket.limit).await {
            Ok(books) => Some(books),
            Err(e) => {
                warn!(query = %ticket.query, error = %e, "search failed");
                None
            }
        };
        self.view.borrow_mut().finish_search(&ticket, results)
    }

    // ---------------------------------------------
    // ページング
    // ---------------------------------------------

    pub fn go_to_page(&self, page: usize) -> bool {
        self.view.borrow_mut().go_to_page(page)
    }

    pub fn previous_page(&self) -> bool {
        self.view.borrow_mut().previous_page()
    }

    pub fn next_page(&self) -> bool {
        self.view.borrow_mut().next_page()
    }

    // ---------------------------------------------
    // 詳細ポップアップ・お気に入り
    // ---------------------------------------------

    /// 書籍を開き、ログイン中ならお気に入り状態を確認する
    pub async fn open_book(&self, book: Book) {
        let ticket = {
            let session = self.session.borrow();
            self.view.borrow_mut().open_book(book, &session)
        };
        if let Some(ticket) = ticket {
            self.run_check(ticket).await;
        }
    }

    /// 状態確認を送り、確認待ちだった切り替えがあれば続けて送る
    async fn run_check(&self, ticket: CheckTicket) {
        let credential = self.credential();
        let is_favorite = match self
            .api
            .check_favorite(&ticket.book_id, credential.as_ref())
            .await
        {
            Ok(flag) => flag,
            Err(e) => {
                debug!(book_id = %ticket.book_id, error = %e, "favorite check failed, assuming not favorited");
                false
            }
        };

        let next = self.view.borrow_mut().finish_check(&ticket, is_favorite);
        if let Some(mutation) = next {
            self.drive_mutations(mutation).await;
        }
    }

    pub fn close_book(&self) {
        self.view.borrow_mut().close_book();
    }

    /// 開いている書籍のお気に入りを切り替える
    pub async fn toggle_favorite(&self) {
        let request = {
            let session = self.session.borrow();
            self.view.borrow_mut().toggle_favorite(&session)
        };
        match request {
            Some(FavoriteRequest::Check(ticket)) => self.run_check(ticket).await,
            Some(FavoriteRequest::Mutate(mutation)) => self.drive_mutations(mutation).await,
            None => {}
        }
    }

    /// 同じ書籍の更新を待ち行列が空になるまで順に送る
    async fn drive_mutations(&self, first: FavoriteMutation) {
        let mut mutation = first;
        loop {
            let credential = self.credential();
            let result = match mutation.action {
                FavoriteAction::Add => {
                    self.api
                        .add_favorite(&mutation.book_id, credential.as_ref())
                        .await
                }
                FavoriteAction::Remove => {
                    self.api
                        .remove_favorite(&mutation.book_id, credential.as_ref())
                        .await
                }
            };

            match &result {
                Ok(()) => info!(book_id = %mutation.book_id, action = ?mutation.action, "favorite updated"),
                Err(e) => warn!(book_id = %mutation.book_id, error = %e, "favorite update rolled back"),
            }

            let next = self
                .view
                .borrow_mut()
                .settle_favorite(&mutation, result.map_err(|e| e.detail()));
            match next {
                Some(queued) => mutation = queued,
                None => break,
            }
        }
    }

    // ---------------------------------------------
    // おすすめ理由
    // ---------------------------------------------

    pub async fn explain(&self, book: &Book) {
        let ticket = self.view.borrow_mut().request_explanation(book);

        let reason = match self.api.explain(&ticket.book).await {
            Ok(reason) => Some(reason),
            Err(e) => {
                warn!(book_id = %ticket.book.id, error = %e, "explanation failed");
                None
            }
        };
        self.view.borrow_mut().finish_explanation(&ticket, reason);
    }

    pub fn dismiss_explanation(&self) {
        self.view.borrow_mut().dismiss_explanation();
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.view.borrow_mut().take_notices()
    }
}
