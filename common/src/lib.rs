//! Book Discovery Common Library
//!
//! 書籍検索クライアントの型と、I/Oを持たない状態機械:
//! - 入力候補（世代番号による古い応答の破棄）
//! - ページング（省略記号付きのページ番号）
//! - お気に入り（楽観的更新と二相トランザクション）
//! - 検索・発見ビュー（上記の統合）

pub mod chat;
pub mod discovery;
pub mod error;
pub mod favorite;
pub mod pagination;
pub mod session;
pub mod suggestion;
pub mod types;

pub use chat::{ChatMessage, ChatTicket, ChatTranscript, Sender};
pub use discovery::{
    DiscoveryView, ExplainTicket, ExplanationState, Notice, SearchTicket, DEFAULT_SEARCH_LIMIT,
    EXPLANATION_FAILURE,
};
pub use error::{Error, Result};
pub use favorite::{
    CheckTicket, FavoriteAction, FavoriteMutation, FavoriteRequest, FavoriteStatus, FavoriteTransaction, FavoriteUnit,
    Settlement, ToggleOutcome, TransactionPhase,
};
pub use pagination::{paginate, visible_pages, PageSlot, PageState, PageView, DEFAULT_PAGE_SIZE};
pub use session::{Credential, Session};
pub use suggestion::{SuggestTicket, SuggestionController, SuggestionState};
pub use types::{
    books_from_values, AdminOverview, AdminUser, Book, BookId, TokenUsage, UserInfo,
};
