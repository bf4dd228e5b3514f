//! 検索・発見ビューの状態
//!
//! 入力候補・検索結果・ページング・詳細ポップアップ・お気に入り・
//! おすすめ理由オーバーレイをまとめて管理する。I/Oは行わない。
//!
//! 各操作は発行すべきリクエスト（チケット）を返し、
//! 通信結果はチケットと一緒に `finish_*` / `settle_*` で戻す。
//!
//! ## 競合の扱い
//! - 候補: 世代番号が一致する応答のみ表示
//! - 検索: 最後に送信した検索の応答のみ反映（古い応答は捨てる）
//! - お気に入り: 書籍ごとに直列化、書籍間は独立
//! - おすすめ理由: 直列化もキャンセルもしない（最後に届いた応答が残る）

use crate::favorite::{
    CheckTicket, FavoriteMutation, FavoriteRequest, FavoriteStatus, FavoriteUnit, ToggleOutcome,
    TransactionPhase,
};
use crate::pagination::{PageState, PageView, DEFAULT_PAGE_SIZE};
use crate::session::Session;
use crate::suggestion::{SuggestTicket, SuggestionController};
use crate::types::{Book, BookId};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// 1回の検索で取得する件数（`k`）
pub const DEFAULT_SEARCH_LIMIT: usize = 1000;

/// おすすめ理由の取得失敗時に表示する文言
pub const EXPLANATION_FAILURE: &str = "おすすめ理由を取得できませんでした。";

/// 検索リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub generation: u64,
    pub query: String,
    pub limit: usize,
}

/// おすすめ理由リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainTicket {
    pub sequence: u64,
    pub book: Book,
}

/// おすすめ理由オーバーレイ
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExplanationState {
    #[default]
    Hidden,
    Loading,
    Ready(String),
}

/// 利用者への通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// 認証が必要な操作を未ログインで行った
    LoginRequired,
    /// お気に入り更新がサーバーに拒否された（メッセージはそのまま表示）
    FavoriteRejected(String),
    /// 検索結果を取得できなかった
    SearchFailed,
    /// お気に入り更新がサーバーで確定した（確定後の状態）
    FavoriteSaved(FavoriteStatus),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LoginRequired => f.write_str("お気に入りを操作するにはログインしてください"),
            Notice::FavoriteRejected(detail) => f.write_str(detail),
            Notice::SearchFailed => f.write_str("検索結果を取得できませんでした"),
            Notice::FavoriteSaved(FavoriteStatus::Favorited) => f.write_str("お気に入りに追加しました"),
            Notice::FavoriteSaved(FavoriteStatus::NotFavorited) => {
                f.write_str("お気に入りから削除しました")
            }
            Notice::FavoriteSaved(FavoriteStatus::Unknown) => f.write_str("お気に入りを更新しました"),
        }
    }
}

/// 検索・発見ビュー
#[derive(Debug, Clone)]
pub struct DiscoveryView {
    query: String,
    suggestions: SuggestionController,
    search_generation: u64,
    search_limit: usize,
    loading: bool,
    results: Vec<Book>,
    page: PageState,
    selected: Option<Book>,
    lanes: HashMap<BookId, FavoriteUnit>,
    /// 破棄したレーンが発行した最大のエポック
    retired_epoch: u64,
    explanation: ExplanationState,
    explain_sequence: u64,
    notices: Vec<Notice>,
}

impl DiscoveryView {
    pub fn new(page_size: usize, search_limit: usize) -> Self {
        Self {
            query: String::new(),
            suggestions: SuggestionController::new(),
            search_generation: 0,
            search_limit,
            loading: false,
            results: Vec::new(),
            page: PageState::new(page_size),
            selected: None,
            lanes: HashMap::new(),
            retired_epoch: 0,
            explanation: ExplanationState::Hidden,
            explain_sequence: 0,
            notices: Vec::new(),
        }
    }

    // ---------------------------------------------
    // 入力・候補
    // ---------------------------------------------

    pub fn query(&self) -> &str {
        &self.query
    }

    /// 入力変更。候補リクエストを返す（空文字なら無し）
    pub fn edit_query(&mut self, text: impl Into<String>) -> Option<SuggestTicket> {
        self.query = text.into();
        self.suggestions.on_query_edit(&self.query)
    }

    /// 候補を出さずに入力欄を書き換える
    pub fn replace_query(&mut self, text: impl Into<String>) {
        self.query = text.into();
        self.suggestions.dismiss();
    }

    pub fn finish_suggestions(&mut self, ticket: &SuggestTicket, suggestions: Vec<String>) -> bool {
        self.suggestions.on_response(ticket, suggestions)
    }

    pub fn suggestions(&self) -> &[String] {
        self.suggestions.visible()
    }

    /// 候補を選択して検索
    pub fn select_suggestion(&mut self, index: usize) -> Option<SearchTicket> {
        let chosen = self.suggestions.select(index)?;
        self.query = chosen;
        self.submit()
    }

    // ---------------------------------------------
    // 検索
    // ---------------------------------------------

    /// 検索を送信（ボタン / Enter）
    ///
    /// 空白のみの入力は無視する
    pub fn submit(&mut self) -> Option<SearchTicket> {
        if self.query.trim().is_empty() {
            return None;
        }

        self.suggestions.dismiss();
        self.search_generation += 1;
        self.loading = true;
        Some(SearchTicket {
            generation: self.search_generation,
            query: self.query.clone(),
            limit: self.search_limit,
        })
    }

    /// 検索結果を反映
    ///
    /// 最新の送信以外の応答は捨てる。`None` は取得失敗（空の結果 + 通知）
    pub fn finish_search(&mut self, ticket: &SearchTicket, results: Option<Vec<Book>>) -> bool {
        if ticket.generation != self.search_generation {
            debug!(
                stale = ticket.generation,
                live = self.search_generation,
                query = %ticket.query,
                "dropping superseded search results"
            );
            return false;
        }

        self.loading = false;
        let results = results.unwrap_or_else(|| {
            self.notices.push(Notice::SearchFailed);
            Vec::new()
        });
        info!(query = %ticket.query, count = results.len(), "search results applied");
        self.page.reset(results.len());
        self.results = results;
        true
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn results(&self) -> &[Book] {
        &self.results
    }

    // ---------------------------------------------
    // ページング
    // ---------------------------------------------

    pub fn page(&self) -> &PageState {
        &self.page
    }

    pub fn page_view(&self) -> PageView {
        self.page.view()
    }

    pub fn current_items(&self) -> &[Book] {
        self.page.current_items(&self.results)
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.page.go_to(page)
    }

    pub fn previous_page(&mut self) -> bool {
        self.page.previous()
    }

    pub fn next_page(&mut self) -> bool {
        self.page.next()
    }

    // ---------------------------------------------
    // 詳細ポップアップ・お気に入り
    // ---------------------------------------------

    /// 書籍を開く。お気に入り状態は不明に戻し、ログイン中なら確認を発行する
    pub fn open_book(&mut self, book: Book, session: &Session) -> Option<CheckTicket> {
        let retired = self.retired_epoch;
        let lane = self
            .lanes
            .entry(book.id.clone())
            .or_insert_with(|| FavoriteUnit::starting_at(book.id.clone(), retired));

        let ticket = if session.is_authenticated() {
            Some(lane.begin_check())
        } else {
            lane.reset();
            None
        };

        if let Some(previous) = self.selected.replace(book) {
            self.release_lane(&previous.id);
        }
        ticket
    }

    /// ポップアップを閉じる（おすすめ理由はそのまま）
    pub fn close_book(&mut self) {
        if let Some(book) = self.selected.take() {
            self.release_lane(&book.id);
        }
    }

    pub fn selected(&self) -> Option<&Book> {
        self.selected.as_ref()
    }

    /// 開いている書籍のお気に入り表示値
    pub fn favorite_status(&self) -> FavoriteStatus {
        self.selected
            .as_ref()
            .and_then(|book| self.lanes.get(&book.id))
            .map(FavoriteUnit::displayed)
            .unwrap_or_default()
    }

    pub fn lane(&self, book_id: &BookId) -> Option<&FavoriteUnit> {
        self.lanes.get(book_id)
    }

    pub fn finish_check(&mut self, ticket: &CheckTicket, is_favorite: bool) -> Option<FavoriteMutation> {
        let lane = self.lanes.get_mut(&ticket.book_id)?;
        let next = lane.finish_check(ticket, is_favorite);
        self.release_lane(&ticket.book_id);
        next
    }

    /// 開いている書籍のお気に入りを切り替える
    ///
    /// 未ログインなら通知のみでリクエストは出さない。
    /// 状態が不明で確認も出ていなければ（未ログインで開いた後のログインなど）、
    /// 切り替えを待ち行列に積んで確認を発行する
    pub fn toggle_favorite(&mut self, session: &Session) -> Option<FavoriteRequest> {
        let book_id = self.selected.as_ref()?.id.clone();
        if !session.is_authenticated() {
            self.notices.push(Notice::LoginRequired);
            return None;
        }

        let lane = self.lanes.get_mut(&book_id)?;
        match lane.toggle() {
            ToggleOutcome::Dispatch(mutation) => Some(FavoriteRequest::Mutate(mutation)),
            ToggleOutcome::Queued if !lane.status().is_known() && !lane.is_check_pending() => {
                debug!(%book_id, "favorite status unknown, checking before toggle");
                Some(FavoriteRequest::Check(lane.begin_check()))
            }
            ToggleOutcome::Queued => {
                debug!(%book_id, queued = lane.queued(), "favorite toggle queued");
                None
            }
        }
    }

    /// お気に入り更新の応答を反映。次に発行する更新を返す
    pub fn settle_favorite(
        &mut self,
        mutation: &FavoriteMutation,
        result: Result<(), String>,
    ) -> Option<FavoriteMutation> {
        let lane = self.lanes.get_mut(&mutation.book_id)?;
        let settlement = lane.settle(result)?;

        if let Some(detail) = settlement.rejection {
            self.notices.push(Notice::FavoriteRejected(detail));
        } else if settlement.transaction.phase() == TransactionPhase::Confirmed {
            self.notices
                .push(Notice::FavoriteSaved(settlement.transaction.resolved_status()));
        }
        let next = settlement.next;
        self.release_lane(&mutation.book_id);
        next
    }

    /// 開いておらず処理中でもないレーンを片付ける
    fn release_lane(&mut self, book_id: &BookId) {
        let is_open = self.selected.as_ref().is_some_and(|b| &b.id == book_id);
        let idle = self.lanes.get(book_id).is_some_and(|lane| !lane.is_busy());
        if !is_open && idle {
            if let Some(lane) = self.lanes.remove(book_id) {
                self.retired_epoch = self.retired_epoch.max(lane.epoch());
            }
        }
    }

    // ---------------------------------------------
    // おすすめ理由
    // ---------------------------------------------

    /// おすすめ理由を要求。直ちに読み込み中表示にする
    pub fn request_explanation(&mut self, book: &Book) -> ExplainTicket {
        self.explain_sequence += 1;
        self.explanation = ExplanationState::Loading;
        ExplainTicket {
            sequence: self.explain_sequence,
            book: book.clone(),
        }
    }

    /// おすすめ理由を反映（最後に届いたものが残る）
    pub fn finish_explanation(&mut self, ticket: &ExplainTicket, reason: Option<String>) {
        if ticket.sequence != self.explain_sequence {
            debug!(
                sequence = ticket.sequence,
                latest = self.explain_sequence,
                "applying explanation from an earlier request"
            );
        }
        self.explanation =
            ExplanationState::Ready(reason.unwrap_or_else(|| EXPLANATION_FAILURE.to_string()));
    }

    pub fn explanation(&self) -> &ExplanationState {
        &self.explanation
    }

    pub fn dismiss_explanation(&mut self) {
        self.explanation = ExplanationState::Hidden;
    }

    // ---------------------------------------------
    // 通知
    // ---------------------------------------------

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

impl Default for DiscoveryView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT)
    }
}
