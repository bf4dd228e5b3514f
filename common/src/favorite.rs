//! お気に入り状態の同期
//!
//! 書籍ごとに1本の「レーン」を持ち、楽観的な表示とサーバー確定値を突き合わせる。
//!
//! - 状態確認: `begin_check` → `finish_check`（エポック不一致の応答は捨てる）
//! - 切り替え: 二相トランザクション（Proposed → Confirmed | RolledBack）
//! - 同一書籍の更新は常に1件のみ飛行させ、後続の切り替えは待ち行列に積む
//!
//! 表示値は「確定値を、未確定の切り替え回数ぶん反転したもの」。

use crate::types::BookId;
use tracing::{debug, warn};

/// お気に入り状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoriteStatus {
    #[default]
    Unknown,
    Favorited,
    NotFavorited,
}

impl FavoriteStatus {
    pub fn from_flag(is_favorite: bool) -> Self {
        if is_favorite {
            FavoriteStatus::Favorited
        } else {
            FavoriteStatus::NotFavorited
        }
    }

    pub fn is_known(self) -> bool {
        self != FavoriteStatus::Unknown
    }

    pub fn flipped(self) -> Self {
        match self {
            FavoriteStatus::Unknown => FavoriteStatus::Unknown,
            FavoriteStatus::Favorited => FavoriteStatus::NotFavorited,
            FavoriteStatus::NotFavorited => FavoriteStatus::Favorited,
        }
    }

    fn flipped_times(self, times: usize) -> Self {
        if times % 2 == 0 {
            self
        } else {
            self.flipped()
        }
    }
}

/// 追加/削除
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteAction {
    Add,
    Remove,
}

/// 発行すべきお気に入り更新リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteMutation {
    pub book_id: BookId,
    pub action: FavoriteAction,
}

/// 状態確認リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    pub book_id: BookId,
    pub epoch: u64,
}

/// トランザクションの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Proposed,
    Confirmed,
    RolledBack,
}

/// 切り替え1回分の二相トランザクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteTransaction {
    previous: FavoriteStatus,
    proposed: FavoriteStatus,
    phase: TransactionPhase,
}

impl FavoriteTransaction {
    fn propose(previous: FavoriteStatus) -> Self {
        Self {
            previous,
            proposed: previous.flipped(),
            phase: TransactionPhase::Proposed,
        }
    }

    pub fn previous(&self) -> FavoriteStatus {
        self.previous
    }

    pub fn proposed(&self) -> FavoriteStatus {
        self.proposed
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    pub fn action(&self) -> FavoriteAction {
        if self.proposed == FavoriteStatus::Favorited {
            FavoriteAction::Add
        } else {
            FavoriteAction::Remove
        }
    }

    /// 決着後の確定値（未決着なら変更前の値）
    pub fn resolved_status(&self) -> FavoriteStatus {
        match self.phase {
            TransactionPhase::Confirmed => self.proposed,
            TransactionPhase::Proposed | TransactionPhase::RolledBack => self.previous,
        }
    }

    fn confirm(mut self) -> Self {
        self.phase = TransactionPhase::Confirmed;
        self
    }

    fn roll_back(mut self) -> Self {
        self.phase = TransactionPhase::RolledBack;
        self
    }
}

/// 切り替え操作で発行すべきリクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteRequest {
    /// 状態が不明なので先に確認する（切り替えは確認後に送る）
    Check(CheckTicket),
    Mutate(FavoriteMutation),
}

/// 切り替え要求の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// 直ちに発行する
    Dispatch(FavoriteMutation),
    /// 先行する更新（または状態確認）の完了待ち
    Queued,
}

/// 更新応答の反映結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub transaction: FavoriteTransaction,
    /// ロールバック時のサーバーメッセージ
    pub rejection: Option<String>,
    /// 待ち行列から次に発行する更新
    pub next: Option<FavoriteMutation>,
}

/// 1冊分のお気に入りレーン
#[derive(Debug, Clone)]
pub struct FavoriteUnit {
    book_id: BookId,
    status: FavoriteStatus,
    epoch: u64,
    check_pending: bool,
    in_flight: Option<FavoriteTransaction>,
    queued: usize,
}

impl FavoriteUnit {
    pub fn new(book_id: BookId) -> Self {
        Self::starting_at(book_id, 0)
    }

    /// エポックを `epoch` の次から発行するレーン
    ///
    /// 破棄したレーンの確認応答と取り違えないよう、作り直すときに使う
    pub fn starting_at(book_id: BookId, epoch: u64) -> Self {
        Self {
            book_id,
            status: FavoriteStatus::Unknown,
            epoch,
            check_pending: false,
            in_flight: None,
            queued: 0,
        }
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    /// サーバー確定値
    pub fn status(&self) -> FavoriteStatus {
        self.status
    }

    /// 表示値（未確定の切り替えを反映）
    pub fn displayed(&self) -> FavoriteStatus {
        let pending = self.queued + usize::from(self.in_flight.is_some());
        self.status.flipped_times(pending)
    }

    pub fn in_flight(&self) -> Option<&FavoriteTransaction> {
        self.in_flight.as_ref()
    }

    pub fn queued(&self) -> usize {
        self.queued
    }

    /// 最後に発行した確認のエポック
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_check_pending(&self) -> bool {
        self.check_pending
    }

    /// 更新が飛行中または待ち行列にある
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.queued > 0
    }

    /// 状態を不明に戻し、状態確認を発行する
    pub fn begin_check(&mut self) -> CheckTicket {
        self.reset();
        self.check_pending = true;
        CheckTicket {
            book_id: self.book_id.clone(),
            epoch: self.epoch,
        }
    }

    /// 状態を不明に戻す（確認は発行しない）
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.status = FavoriteStatus::Unknown;
        self.check_pending = false;
    }

    /// 状態確認の応答を反映
    ///
    /// 確認待ちだった切り替えがあれば、次に発行する更新を返す
    pub fn finish_check(&mut self, ticket: &CheckTicket, is_favorite: bool) -> Option<FavoriteMutation> {
        if !self.check_pending || ticket.book_id != self.book_id || ticket.epoch != self.epoch {
            debug!(book_id = %ticket.book_id, epoch = ticket.epoch, "dropping stale favorite check");
            return None;
        }

        self.check_pending = false;
        self.status = FavoriteStatus::from_flag(is_favorite);
        self.dispatch_queued()
    }

    /// 切り替え要求
    pub fn toggle(&mut self) -> ToggleOutcome {
        self.queued += 1;
        match self.dispatch_queued() {
            Some(mutation) => ToggleOutcome::Dispatch(mutation),
            None => ToggleOutcome::Queued,
        }
    }

    /// 飛行中の更新の応答を反映
    ///
    /// `Err` にはサーバーのメッセージ（そのまま利用者に見せる）を渡す
    pub fn settle(&mut self, result: Result<(), String>) -> Option<Settlement> {
        let Some(transaction) = self.in_flight.take() else {
            warn!(book_id = %self.book_id, "favorite response without a pending transaction");
            return None;
        };

        let (transaction, rejection) = match result {
            Ok(()) => (transaction.confirm(), None),
            Err(detail) => {
                debug!(book_id = %self.book_id, %detail, "rolling back favorite toggle");
                (transaction.roll_back(), Some(detail))
            }
        };
        self.status = transaction.resolved_status();

        let next = self.dispatch_queued();
        Some(Settlement {
            transaction,
            rejection,
            next,
        })
    }

    /// 待ち行列の先頭を発行できるなら発行する
    fn dispatch_queued(&mut self) -> Option<FavoriteMutation> {
        if self.in_flight.is_some() || self.queued == 0 || !self.status.is_known() {
            return None;
        }

        self.queued -= 1;
        let transaction = FavoriteTransaction::propose(self.status);
        let mutation = FavoriteMutation {
            book_id: self.book_id.clone(),
            action: transaction.action(),
        };
        self.in_flight = Some(transaction);
        Some(mutation)
    }
}
