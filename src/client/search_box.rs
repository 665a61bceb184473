//! Header search box: debounced queries, keyboard navigation and recent searches.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tracing::debug;

use crate::models::posts::PostSummary;

use super::{local_store::LocalStore, BlogApi, ClientResult};

pub const DEBOUNCE: Duration = Duration::from_millis(300);
pub const HISTORY_KEY: &str = "search_history";
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Down,
    Up,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    None,
    Navigate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// Nothing searched for the current input yet.
    Idle,
    Loading,
    /// The latest request failed; holds its message.
    Failed(String),
    NoResults,
    Results(usize),
}

/// A query cleared to go out, tagged with its request sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub query: String,
}

#[derive(Debug, Default)]
pub struct SearchBox {
    query: String,
    results: Vec<PostSummary>,
    open: bool,
    focused: Option<usize>,
    loading: bool,
    has_searched: bool,
    error: Option<String>,
    generation: u64,
    issued_seq: u64,
}

impl SearchBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[PostSummary] {
        &self.results
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> SearchStatus {
        if self.loading {
            SearchStatus::Loading
        } else if !self.has_searched {
            SearchStatus::Idle
        } else if let Some(error) = &self.error {
            SearchStatus::Failed(error.clone())
        } else if self.results.is_empty() {
            SearchStatus::NoResults
        } else {
            SearchStatus::Results(self.results.len())
        }
    }

    /// Registers a keystroke. Returns the generation a debounce timer must still see
    /// current before querying, or `None` when the input is blank and was cleared.
    pub fn input(&mut self, text: impl Into<String>) -> Option<u64> {
        self.query = text.into();
        self.generation += 1;
        self.focused = None;

        if self.query.trim().is_empty() {
            self.reset_results();
            self.open = false;
            return None;
        }
        self.open = true;
        Some(self.generation)
    }

    /// Called when the debounce for `generation` expires.
    pub fn begin_request(&mut self, generation: u64) -> Option<SearchRequest> {
        if generation != self.generation || self.query.trim().is_empty() {
            return None;
        }
        self.issued_seq += 1;
        self.loading = true;

        Some(SearchRequest {
            seq: self.issued_seq,
            query: self.query.trim().to_string(),
        })
    }

    /// Applies a response unless a newer request was issued since. Returns whether
    /// it was applied.
    pub fn apply_response(&mut self, seq: u64, response: ClientResult<Vec<PostSummary>>) -> bool {
        if seq != self.issued_seq {
            debug!(seq, latest = self.issued_seq, "discarding stale search response");
            return false;
        }
        self.loading = false;
        self.has_searched = true;
        self.focused = None;

        match response {
            Ok(posts) => {
                self.results = posts;
                self.error = None;
            }
            Err(err) => {
                self.results.clear();
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn key(&mut self, key: Key) -> SearchAction {
        if !self.open {
            return SearchAction::None;
        }

        match key {
            Key::Down if !self.results.is_empty() => {
                let last = self.results.len() - 1;
                self.focused = Some(self.focused.map_or(0, |i| (i + 1).min(last)));
                SearchAction::None
            }
            Key::Up if !self.results.is_empty() => {
                self.focused = Some(self.focused.map_or(0, |i| i.saturating_sub(1)));
                SearchAction::None
            }
            Key::Enter => match self.focused.and_then(|i| self.results.get(i)) {
                Some(post) => {
                    let target = format!("/posts/{}", post.slug);
                    self.query.clear();
                    self.generation += 1;
                    self.reset_results();
                    self.open = false;
                    SearchAction::Navigate(target)
                }
                None => SearchAction::None,
            },
            Key::Escape => {
                self.open = false;
                self.focused = None;
                SearchAction::None
            }
            _ => SearchAction::None,
        }
    }

    fn reset_results(&mut self) {
        self.results.clear();
        self.has_searched = false;
        self.loading = false;
        self.error = None;
        // Anything still in flight now belongs to an abandoned query.
        self.issued_seq += 1;
    }
}

/// Runs the debounce timers and requests for a shared [`SearchBox`].
pub struct SearchDriver {
    state: Arc<Mutex<SearchBox>>,
    api: Arc<dyn BlogApi>,
    debounce: Duration,
    history: Option<Arc<SearchHistory>>,
}

impl SearchDriver {
    pub fn new(state: Arc<Mutex<SearchBox>>, api: Arc<dyn BlogApi>) -> Self {
        Self {
            state,
            api,
            debounce: DEBOUNCE,
            history: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_history(mut self, history: Arc<SearchHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn state(&self) -> &Arc<Mutex<SearchBox>> {
        &self.state
    }

    /// Feeds a keystroke and schedules the debounced query. Only the last keystroke
    /// inside a debounce window ends up sending a request.
    pub async fn on_input(&self, text: impl Into<String>) -> Option<JoinHandle<()>> {
        let generation = self.state.lock().await.input(text)?;

        let state = self.state.clone();
        let api = self.api.clone();
        let history = self.history.clone();
        let debounce = self.debounce;

        Some(tokio::spawn(async move {
            sleep(debounce).await;

            let Some(request) = state.lock().await.begin_request(generation) else {
                return;
            };
            let response = api.search_posts(&request.query).await.map(|r| r.posts);
            let succeeded = response.is_ok();

            let applied = state.lock().await.apply_response(request.seq, response);
            if applied && succeeded {
                if let Some(history) = history {
                    history.record(&request.query);
                }
            }
        }))
    }

    pub async fn on_key(&self, key: Key) -> SearchAction {
        self.state.lock().await.key(key)
    }
}

/// Splits `text` into `(segment, is_match)` pieces, matching `query`
/// case-insensitively.
pub fn highlight<'a>(text: &'a str, query: &str) -> Vec<(&'a str, bool)> {
    let needle: Vec<char> = query.trim().chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return vec![(text, false)];
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let lowered: Vec<char> = chars
        .iter()
        .map(|(_, c)| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i + needle.len() <= lowered.len() {
        if lowered[i..i + needle.len()] == needle[..] {
            let start = chars[i].0;
            let end = chars
                .get(i + needle.len())
                .map_or(text.len(), |(offset, _)| *offset);
            if plain_start < start {
                segments.push((&text[plain_start..start], false));
            }
            segments.push((&text[start..end], true));
            plain_start = end;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    if plain_start < text.len() {
        segments.push((&text[plain_start..], false));
    }
    segments
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub timestamp: i64,
}

/// Most recent distinct queries, newest first, kept in the local store.
pub struct SearchHistory {
    store: Arc<dyn LocalStore>,
}

impl SearchHistory {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self
            .store
            .get(HISTORY_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        entries.truncate(HISTORY_LIMIT);
        entries
    }

    pub fn record(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let lowered = query.to_lowercase();
        let mut entries = self.entries();
        entries.retain(|e| e.query.to_lowercase() != lowered);
        entries.insert(
            0,
            HistoryEntry {
                query: query.to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        );
        entries.truncate(HISTORY_LIMIT);
        self.save(&entries);
    }

    pub fn remove(&self, query: &str) {
        let mut entries = self.entries();
        entries.retain(|e| e.query != query);
        self.save(&entries);
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(HISTORY_KEY) {
            debug!(%err, "failed to clear search history");
        }
    }

    fn save(&self, entries: &[HistoryEntry]) {
        let written = serde_json::to_string(entries)
            .map_err(std::io::Error::from)
            .and_then(|raw| self.store.set(HISTORY_KEY, &raw));
        if let Err(err) = written {
            debug!(%err, "failed to persist search history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{local_store::MemoryLocalStore, ClientError};
    use chrono::Utc;
    use uuid::Uuid;

    fn post(slug: &str) -> PostSummary {
        PostSummary {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            excerpt: None,
            cover_image: None,
            created_at: Utc::now(),
            author: None,
            category: None,
        }
    }

    fn searched(results: Vec<PostSummary>) -> SearchBox {
        let mut search = SearchBox::new();
        let generation = search.input("rust").unwrap();
        let request = search.begin_request(generation).unwrap();
        assert!(search.apply_response(request.seq, Ok(results)));
        search
    }

    #[test]
    fn blank_input_clears_immediately() {
        let mut search = searched(vec![post("a")]);
        assert_eq!(search.status(), SearchStatus::Results(1));

        assert_eq!(search.input("   "), None);
        assert_eq!(search.status(), SearchStatus::Idle);
        assert!(search.results().is_empty());
        assert!(!search.is_open());
    }

    #[test]
    fn distinguishes_never_searched_from_empty() {
        let mut search = SearchBox::new();
        assert_eq!(search.status(), SearchStatus::Idle);

        let generation = search.input("zzz").unwrap();
        let request = search.begin_request(generation).unwrap();
        assert_eq!(search.status(), SearchStatus::Loading);

        search.apply_response(request.seq, Ok(Vec::new()));
        assert_eq!(search.status(), SearchStatus::NoResults);
    }

    #[test]
    fn superseded_generation_does_not_query() {
        let mut search = SearchBox::new();
        let first = search.input("r").unwrap();
        let second = search.input("ru").unwrap();

        assert!(search.begin_request(first).is_none());
        assert_eq!(search.begin_request(second).unwrap().query, "ru");
    }

    #[test]
    fn only_latest_issued_response_applies() {
        let mut search = SearchBox::new();
        let g1 = search.input("ru").unwrap();
        let old = search.begin_request(g1).unwrap();
        let g2 = search.input("rust").unwrap();
        let new = search.begin_request(g2).unwrap();

        assert!(search.apply_response(new.seq, Ok(vec![post("fresh")])));
        assert!(!search.apply_response(old.seq, Ok(vec![post("stale")])));
        assert_eq!(search.results()[0].slug, "fresh");
    }

    #[test]
    fn failed_search_is_not_reported_as_empty() {
        let mut search = SearchBox::new();
        let generation = search.input("rust").unwrap();
        let request = search.begin_request(generation).unwrap();
        search.apply_response(
            request.seq,
            Err(ClientError::RateLimited {
                message: "Rate limit exceeded".into(),
                retry_after: None,
            }),
        );
        assert_eq!(search.error(), Some("Rate limit exceeded"));
        assert_eq!(
            search.status(),
            SearchStatus::Failed("Rate limit exceeded".to_string())
        );

        let generation = search.input("rust ").unwrap();
        let retry = search.begin_request(generation).unwrap();
        search.apply_response(retry.seq, Ok(Vec::new()));
        assert_eq!(search.error(), None);
        assert_eq!(search.status(), SearchStatus::NoResults);
    }

    #[test]
    fn arrow_keys_clamp_and_enter_navigates() {
        let mut search = searched(vec![post("a"), post("b")]);

        assert_eq!(search.key(Key::Up), SearchAction::None);
        assert_eq!(search.focused(), Some(0));
        search.key(Key::Down);
        search.key(Key::Down);
        search.key(Key::Down);
        assert_eq!(search.focused(), Some(1));
        search.key(Key::Up);
        search.key(Key::Up);
        assert_eq!(search.focused(), Some(0));

        search.key(Key::Down);
        assert_eq!(search.key(Key::Enter), SearchAction::Navigate("/posts/b".into()));
        assert!(!search.is_open());
        assert!(search.query().is_empty());
        assert!(search.results().is_empty());
    }

    #[test]
    fn enter_without_focus_and_escape() {
        let mut search = searched(vec![post("a")]);
        assert_eq!(search.key(Key::Enter), SearchAction::None);

        search.key(Key::Escape);
        assert!(!search.is_open());
        assert_eq!(search.key(Key::Down), SearchAction::None);
        assert_eq!(search.focused(), None);
    }

    #[test]
    fn highlight_is_case_insensitive() {
        assert_eq!(
            highlight("Rust and rust", "RUST"),
            vec![("Rust", true), (" and ", false), ("rust", true)]
        );
        assert_eq!(highlight("plain", ""), vec![("plain", false)]);
        assert_eq!(highlight("Ünïcode text", "ünï"), vec![("Ünï", true), ("code text", false)]);
    }

    #[test]
    fn history_keeps_ten_distinct_newest_first() {
        let history = SearchHistory::new(Arc::new(MemoryLocalStore::new()));
        for i in 0..12 {
            history.record(&format!("query {i}"));
        }
        history.record("QUERY 11");

        let entries = history.entries();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        assert_eq!(entries[0].query, "QUERY 11");
        assert_eq!(entries[1].query, "query 10");
        assert!(!entries.iter().any(|e| e.query == "query 11"));

        history.remove("query 10");
        assert_eq!(history.entries()[1].query, "query 9");

        history.clear();
        assert!(history.entries().is_empty());
    }
}
