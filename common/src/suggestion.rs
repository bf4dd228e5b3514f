//! 入力候補（オートコンプリート）の状態管理
//!
//! 入力のたびに世代番号を進め、候補リクエストに世代を付けて発行する。
//! 応答は到着時点の世代と一致する場合のみ表示する。
//! 遅れて届いた古い入力の候補が新しい候補を上書きすることはない。

use tracing::debug;

/// 候補リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestTicket {
    pub generation: u64,
    pub query: String,
}

/// 候補の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionState {
    Idle,
    Pending {
        generation: u64,
        query: String,
    },
    Displayed {
        generation: u64,
        query: String,
        suggestions: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct SuggestionController {
    generation: u64,
    state: SuggestionState,
}

impl SuggestionController {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: SuggestionState::Idle,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    /// 入力変更
    ///
    /// 空文字なら候補を閉じてリクエストは出さない（飛行中の応答は世代不一致で捨てられる）
    pub fn on_query_edit(&mut self, query: &str) -> Option<SuggestTicket> {
        self.generation += 1;

        if query.is_empty() {
            self.state = SuggestionState::Idle;
            return None;
        }

        self.state = SuggestionState::Pending {
            generation: self.generation,
            query: query.to_string(),
        };
        Some(SuggestTicket {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    /// 候補の応答を反映。世代が古ければ捨てて `false`
    pub fn on_response(&mut self, ticket: &SuggestTicket, suggestions: Vec<String>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                live = self.generation,
                query = %ticket.query,
                "dropping stale suggestions"
            );
            return false;
        }

        self.state = SuggestionState::Displayed {
            generation: ticket.generation,
            query: ticket.query.clone(),
            suggestions,
        };
        true
    }

    /// 表示中の候補
    pub fn visible(&self) -> &[String] {
        match &self.state {
            SuggestionState::Displayed {
                query, suggestions, ..
            } if !query.is_empty() => suggestions,
            _ => &[],
        }
    }

    /// 候補を選択。候補を閉じて選ばれた文字列を返す
    pub fn select(&mut self, index: usize) -> Option<String> {
        let chosen = self.visible().get(index)?.clone();
        self.dismiss();
        Some(chosen)
    }

    /// 候補を閉じる（飛行中の応答も無効にする）
    pub fn dismiss(&mut self) {
        self.generation += 1;
        self.state = SuggestionState::Idle;
    }
}

impl Default for SuggestionController {
    fn default() -> Self {
        Self::new()
    }
}
