//! ページネーション
//!
//! 検索結果の件数・ページサイズ・現在ページから、
//! 現在ページの表示範囲とページ番号の並び（省略記号付き）を求める。
//!
//! ページ番号の並び:
//! - 10ページ以下: 全ページ
//! - 現在ページ ≤ 4: `1 2 3 4 5 … 最終`
//! - 現在ページ ≥ 最終-3: `1 … 最終-4 … 最終`
//! - それ以外: `1 … c-2 c-1 c c+1 c+2 … 最終`

use std::fmt;
use std::ops::Range;

/// 1ページあたりの既定件数
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// これ以下のページ数なら省略せずに全ページを並べる
const FULL_WINDOW_LIMIT: usize = 10;

/// ページ番号の並びの1要素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(usize),
    Ellipsis,
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSlot::Page(page) => write!(f, "{}", page),
            PageSlot::Ellipsis => f.write_str("..."),
        }
    }
}

/// 描画用のページ情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub total_pages: usize,
    pub current_page: usize,
    /// 現在ページに表示する要素の範囲
    pub item_range: Range<usize>,
    pub window: Vec<PageSlot>,
}

/// 総ページ数（空なら0）
pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// 現在ページの要素範囲
///
/// 範囲外のページを指定しても要素数を超えないように切り詰める
pub fn page_range(len: usize, page_size: usize, current_page: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let start = current_page.saturating_sub(1).saturating_mul(page_size).min(len);
    let end = current_page.saturating_mul(page_size).min(len);
    start..end
}

/// 表示するページ番号の並び
pub fn visible_pages(total_pages: usize, current_page: usize) -> Vec<PageSlot> {
    use PageSlot::{Ellipsis, Page};

    if total_pages <= FULL_WINDOW_LIMIT {
        return (1..=total_pages).map(Page).collect();
    }

    let mut pages = Vec::with_capacity(9);
    if current_page <= 4 {
        pages.extend((1..=5).map(Page));
        pages.push(Ellipsis);
        pages.push(Page(total_pages));
    } else if current_page + 3 >= total_pages {
        pages.push(Page(1));
        pages.push(Ellipsis);
        pages.extend((total_pages - 4..=total_pages).map(Page));
    } else {
        pages.push(Page(1));
        pages.push(Ellipsis);
        pages.extend((current_page - 2..=current_page + 2).map(Page));
        pages.push(Ellipsis);
        pages.push(Page(total_pages));
    }
    pages
}

/// 件数・ページサイズ・現在ページからページ情報を計算
pub fn paginate(len: usize, page_size: usize, current_page: usize) -> PageView {
    let total_pages = total_pages(len, page_size);
    PageView {
        total_pages,
        current_page,
        item_range: page_range(len, page_size, current_page),
        window: visible_pages(total_pages, current_page),
    }
}

/// 現在ページの状態
///
/// 不変条件: `1 <= current_page <= max(1, total_pages)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page_size: usize,
    total_items: usize,
    current_page: usize,
}

impl PageState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            total_items: 0,
            current_page: 1,
        }
    }

    /// 検索結果の差し替え時に呼ぶ（1ページ目に戻る）
    pub fn reset(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.current_page = 1;
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_items, self.page_size)
    }

    /// 指定ページへ移動。範囲外なら何もせず `false`
    pub fn go_to(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn previous(&mut self) -> bool {
        self.has_previous() && self.go_to(self.current_page - 1)
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current_page + 1)
    }

    pub fn view(&self) -> PageView {
        paginate(self.total_items, self.page_size, self.current_page)
    }

    /// 現在ページの要素を切り出す
    pub fn current_items<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[page_range(items.len(), self.page_size, self.current_page)]
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use PageSlot::{Ellipsis, Page};

    #[test]
    fn test_window_first_pages() {
        assert_eq!(
            visible_pages(15, 1),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(15)]
        );
        assert_eq!(visible_pages(15, 4), visible_pages(15, 1));
    }

    #[test]
    fn test_window_last_pages() {
        assert_eq!(
            visible_pages(15, 15),
            vec![Page(1), Ellipsis, Page(11), Page(12), Page(13), Page(14), Page(15)]
        );
        assert_eq!(visible_pages(15, 12), visible_pages(15, 15));
    }

    #[test]
    fn test_window_centered() {
        assert_eq!(
            visible_pages(15, 8),
            vec![
                Page(1),
                Ellipsis,
                Page(6),
                Page(7),
                Page(8),
                Page(9),
                Page(10),
                Ellipsis,
                Page(15)
            ]
        );
    }

    #[test]
    fn test_window_small_shows_all() {
        assert_eq!(visible_pages(0, 1), vec![]);
        assert_eq!(visible_pages(3, 2), vec![Page(1), Page(2), Page(3)]);
        assert_eq!(visible_pages(10, 5).len(), 10);
        assert!(!visible_pages(10, 5).contains(&Ellipsis));
    }

    #[test]
    fn test_page_slot_display() {
        let rendered: Vec<String> = visible_pages(15, 1).iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered.join(" "), "1 2 3 4 5 ... 15");
    }

    #[test]
    fn test_empty_collection() {
        let mut state = PageState::new(20);
        state.reset(0);

        assert_eq!(state.total_pages(), 0);
        assert_eq!(state.current_page(), 1);
        assert!(!state.go_to(1));
        assert!(!state.next());
        assert!(!state.previous());
        assert!(state.current_items::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_navigation_rejects_out_of_range() {
        let mut state = PageState::new(20);
        state.reset(45);
        assert_eq!(state.total_pages(), 3);

        assert!(!state.go_to(0));
        assert!(!state.go_to(4));
        assert_eq!(state.current_page(), 1);

        assert!(state.go_to(3));
        assert!(!state.next());
        assert!(!state.has_next());
        assert_eq!(state.current_page(), 3);

        assert!(state.previous());
        assert_eq!(state.current_page(), 2);
    }

    #[test]
    fn test_reset_returns_to_first_page() {
        let mut state = PageState::new(10);
        state.reset(100);
        state.go_to(7);
        state.reset(30);
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.total_pages(), 3);
    }

    #[test]
    fn test_current_items_slice() {
        let items: Vec<usize> = (0..45).collect();
        let mut state = PageState::new(20);
        state.reset(items.len());

        assert_eq!(state.current_items(&items), &items[0..20]);
        state.go_to(3);
        assert_eq!(state.current_items(&items), &items[40..45]);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let state = PageState::new(0);
        assert_eq!(state.page_size(), 1);
        assert_eq!(total_pages(5, 0), 5);
    }

    proptest! {
        #[test]
        fn prop_total_pages_is_ceiling(len in 0usize..5_000, size in 1usize..100) {
            let expected = if len % size == 0 { len / size } else { len / size + 1 };
            prop_assert_eq!(total_pages(len, size), expected);
        }

        #[test]
        fn prop_last_page_holds_remainder(len in 1usize..5_000, size in 1usize..100) {
            let last = total_pages(len, size);
            let range = page_range(len, size, last);
            let expected = if len % size == 0 { size } else { len % size };
            prop_assert_eq!(range.len(), expected);
        }

        #[test]
        fn prop_pages_never_exceed_size(len in 0usize..5_000, size in 1usize..100, page in 0usize..200) {
            prop_assert!(page_range(len, size, page).len() <= size);
        }

        #[test]
        fn prop_out_of_range_navigation_is_noop(len in 0usize..2_000, size in 1usize..50, start in 1usize..60) {
            let mut state = PageState::new(size);
            state.reset(len);
            state.go_to(start);
            let before = state.current_page();

            prop_assert!(!state.go_to(0));
            prop_assert!(!state.go_to(state.total_pages() + 1));
            prop_assert_eq!(state.current_page(), before);
            prop_assert!(before >= 1 && before <= state.total_pages().max(1));
        }

        #[test]
        fn prop_window_contains_current_and_bounds(total in 11usize..500, current_seed in 0usize..500) {
            let current = current_seed % total + 1;
            let window = visible_pages(total, current);

            prop_assert_eq!(window.first(), Some(&Page(1)));
            prop_assert_eq!(window.last(), Some(&Page(total)));
            prop_assert!(window.contains(&Page(current)));
        }
    }
}
