//! Sidebar list of past chats and the search that filters it.
//!
//! Every list request is numbered. A completion is applied only when it
//! carries the most recently issued number, so typing quickly can never leave
//! an older result on screen.

use tracing::{debug, warn};

use crate::api::{ApiError, ChatApi, ChatListItem};

/// Cosmetic row glyphs. All are a single terminal cell wide.
pub const ICON_PALETTE: [&str; 9] = ["◆", "●", "▲", "■", "◇", "○", "△", "□", "◈"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListQuery {
    All,
    Search(String),
}

impl ListQuery {
    /// Blank terms mean the full list.
    pub fn for_term(term: &str) -> Self {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            ListQuery::All
        } else {
            ListQuery::Search(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub seq: u64,
    pub query: ListQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Stale,
    Applied { items: usize },
    Failed(ApiError),
}

#[derive(Debug, Default)]
pub struct SidebarState {
    items: Vec<ChatListItem>,
    icons: Vec<&'static str>,
    search_term: String,
    selected: usize,
    latest_seq: u64,
    loading: bool,
}

impl SidebarState {
    pub fn items(&self) -> &[ChatListItem] {
        &self.items
    }

    pub fn icon(&self, index: usize) -> &'static str {
        self.icons
            .get(index)
            .copied()
            .unwrap_or(ICON_PALETTE[index % ICON_PALETTE.len()])
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&ChatListItem> {
        self.items.get(self.selected)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn issue(&mut self, query: ListQuery) -> ListRequest {
        self.latest_seq += 1;
        self.loading = true;
        ListRequest {
            seq: self.latest_seq,
            query,
        }
    }

    /// Requests the unfiltered list and clears the search term.
    pub fn request_all(&mut self) -> ListRequest {
        self.search_term.clear();
        self.issue(ListQuery::All)
    }

    /// Re-issues whatever the sidebar currently shows.
    pub fn request_current(&mut self) -> ListRequest {
        let query = ListQuery::for_term(&self.search_term);
        self.issue(query)
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) -> ListRequest {
        self.search_term = term.into();
        self.request_current()
    }

    pub fn apply(&mut self, seq: u64, result: Result<Vec<ChatListItem>, ApiError>) -> ListOutcome {
        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, "discarding stale chat list");
            return ListOutcome::Stale;
        }
        self.loading = false;

        match result {
            Ok(mut items) => {
                sort_by_latest(&mut items);
                self.icons = shuffled_icons(items.len());
                self.items = items;
                self.selected = self.selected.min(self.items.len().saturating_sub(1));
                ListOutcome::Applied {
                    items: self.items.len(),
                }
            }
            Err(err) => {
                warn!(error = %err, "keeping previous chat list");
                ListOutcome::Failed(err)
            }
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.items.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

/// Newest first. Entries without a timestamp go last; ties keep server order.
pub fn sort_by_latest(items: &mut [ChatListItem]) {
    items.sort_by(|a, b| match (a.latest_time, b.latest_time) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Assigns `count` icons by cycling through a freshly shuffled palette.
pub fn shuffled_icons(count: usize) -> Vec<&'static str> {
    let mut palette = ICON_PALETTE;
    let mut rng = XorShift::seeded();
    for i in (1..palette.len()).rev() {
        let j = rng.below(i + 1);
        palette.swap(i, j);
    }
    palette.iter().copied().cycle().take(count).collect()
}

struct XorShift(u64);

impl XorShift {
    fn seeded() -> Self {
        let mut bytes = [0u8; 8];
        if let Err(err) = getrandom::fill(&mut bytes) {
            debug!(%err, "falling back to a fixed icon seed");
        }
        // Zero would lock the generator.
        Self(u64::from_le_bytes(bytes) | 1)
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

pub async fn fetch_list(api: &dyn ChatApi, query: &ListQuery) -> Result<Vec<ChatListItem>, ApiError> {
    match query {
        ListQuery::All => api.get_chats().await,
        ListQuery::Search(keyword) => api.search_logs(keyword).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiErrorKind, ApiOperation};
    use crate::utils::test_utils::{chat_item, FakeApi};
    use std::collections::HashSet;

    #[test]
    fn applied_list_is_sorted_newest_first_and_stable() {
        let mut sidebar = SidebarState::default();
        let request = sidebar.request_all();

        sidebar.apply(
            request.seq,
            Ok(vec![
                chat_item("a", Some(100)),
                chat_item("b", None),
                chat_item("c", Some(300)),
                chat_item("d", Some(100)),
                chat_item("e", None),
            ]),
        );

        let keys: Vec<&str> = sidebar.items().iter().map(|i| i.unique_key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "d", "b", "e"]);
        assert!(!sidebar.is_loading());
    }

    #[test]
    fn blank_search_is_a_full_list_request() {
        let mut sidebar = SidebarState::default();
        assert_eq!(sidebar.set_search_term("   ").query, ListQuery::All);
        assert_eq!(
            sidebar.set_search_term(" timeout ").query,
            ListQuery::Search("timeout".into())
        );
    }

    #[test]
    fn only_latest_request_is_applied() {
        let mut sidebar = SidebarState::default();
        let first = sidebar.set_search_term("a");
        let second = sidebar.set_search_term("ab");
        assert!(second.seq > first.seq);

        let applied = sidebar.apply(second.seq, Ok(vec![chat_item("ab", Some(2))]));
        assert_eq!(applied, ListOutcome::Applied { items: 1 });

        let stale = sidebar.apply(first.seq, Ok(vec![chat_item("a", Some(1))]));
        assert_eq!(stale, ListOutcome::Stale);
        assert_eq!(sidebar.items()[0].unique_key, "ab");
    }

    #[test]
    fn failure_keeps_previous_list() {
        let mut sidebar = SidebarState::default();
        let first = sidebar.request_all();
        sidebar.apply(first.seq, Ok(vec![chat_item("kept", Some(1))]));

        let second = sidebar.request_current();
        let outcome = sidebar.apply(
            second.seq,
            Err(ApiError::new(
                ApiOperation::ListChats,
                ApiErrorKind::Status(500),
                "boom",
            )),
        );

        assert!(matches!(outcome, ListOutcome::Failed(_)));
        assert_eq!(sidebar.items().len(), 1);
        assert!(!sidebar.is_loading());
    }

    #[test]
    fn selection_is_clamped_to_new_list() {
        let mut sidebar = SidebarState::default();
        let first = sidebar.request_all();
        sidebar.apply(
            first.seq,
            Ok(vec![
                chat_item("a", Some(3)),
                chat_item("b", Some(2)),
                chat_item("c", Some(1)),
            ]),
        );
        sidebar.select_next();
        sidebar.select_next();
        sidebar.select_next();
        assert_eq!(sidebar.selected(), 2);

        let second = sidebar.set_search_term("x");
        sidebar.apply(second.seq, Ok(vec![chat_item("x", Some(1))]));
        assert_eq!(sidebar.selected(), 0);
        assert_eq!(sidebar.selected_item().unwrap().unique_key, "x");
    }

    #[test]
    fn refetching_unchanged_list_keeps_order() {
        let chats = || {
            vec![
                chat_item("tie-1", Some(200)),
                chat_item("none-1", None),
                chat_item("old", Some(50)),
                chat_item("tie-2", Some(200)),
                chat_item("none-2", None),
                chat_item("new", Some(900)),
                chat_item("tie-3", Some(200)),
            ]
        };
        let keys = |sidebar: &SidebarState| -> Vec<String> {
            sidebar
                .items()
                .iter()
                .map(|item| item.unique_key.clone())
                .collect()
        };

        let mut sidebar = SidebarState::default();
        let first = sidebar.request_all();
        sidebar.apply(first.seq, Ok(chats()));
        let before = keys(&sidebar);

        let second = sidebar.request_current();
        assert_eq!(second.query, ListQuery::All);
        sidebar.apply(second.seq, Ok(chats()));

        assert_eq!(keys(&sidebar), before);
        assert_eq!(
            before,
            vec!["new", "tie-1", "tie-2", "tie-3", "old", "none-1", "none-2"]
        );
    }

    #[test]
    fn shuffled_icons_use_whole_palette_before_repeating() {
        let icons = shuffled_icons(ICON_PALETTE.len());
        let distinct: HashSet<&str> = icons.iter().copied().collect();
        assert_eq!(distinct.len(), ICON_PALETTE.len());

        let many = shuffled_icons(20);
        assert_eq!(many.len(), 20);
        assert_eq!(many[0], many[ICON_PALETTE.len()]);
    }

    #[tokio::test]
    async fn fetch_list_routes_by_query() {
        let api = FakeApi::default();
        api.set_chats(vec![chat_item("all", Some(1))]);
        api.set_search_results(vec![chat_item("hit", Some(1))]);

        let all = fetch_list(&api, &ListQuery::All).await.unwrap();
        let hits = fetch_list(&api, &ListQuery::Search("oom".into())).await.unwrap();

        assert_eq!(all[0].unique_key, "all");
        assert_eq!(hits[0].unique_key, "hit");
        assert_eq!(api.calls(), vec!["get_chats".to_string(), "search_logs oom".to_string()]);
    }
}
