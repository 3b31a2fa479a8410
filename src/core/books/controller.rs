//! List fetch controller.
//!
//! Turns filter, search, sort and page changes into catalog list requests
//! and folds the responses back into view state. Every request carries a
//! [`RequestToken`]; only the response holding the most recently issued
//! token may touch the visible page, so a slow early request can never
//! overwrite a faster later one.
//!
//! Requests run as spawned tokio tasks and report back over an unbounded
//! channel. The owner drives the controller from its event loop by calling
//! [`ListController::tick`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::debounce::Debouncer;
use super::filter::{Availability, FilterField, FilterState};
use super::query::BookQuery;
use super::sort::{SortField, SortState};
use crate::config::ListConfig;
use crate::core::catalog::{Book, BookDraft, BookId, BookPage, CatalogApi, CatalogError};

// ── Tokens & outcomes ───────────────────────────────────────────────────────

/// Monotonically increasing request generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// A finished list request.
#[derive(Debug)]
struct FetchOutcome {
    token: RequestToken,
    query: BookQuery,
    result: Result<BookPage, CatalogError>,
}

/// A finished create/update request.
#[derive(Debug)]
struct SaveOutcome {
    token: RequestToken,
    result: Result<Book, CatalogError>,
}

/// What happened to a response when it arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Latest request succeeded; the visible page was replaced.
    Applied,
    /// Latest request failed; the page was cleared and the error set.
    Failed,
    /// A newer request had been issued; the response was dropped.
    Superseded,
}

/// Progress of a create/update, tagged with the token [`ListController::save`]
/// handed out for it.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SaveState {
    #[default]
    Idle,
    Saving(RequestToken),
    Saved { token: RequestToken, book: Book },
    Failed { token: RequestToken, message: String },
}

impl SaveState {
    pub fn token(&self) -> Option<RequestToken> {
        match self {
            Self::Idle => None,
            Self::Saving(token) => Some(*token),
            Self::Saved { token, .. } | Self::Failed { token, .. } => Some(*token),
        }
    }
}

// ── Pagination ──────────────────────────────────────────────────────────────

/// Pagination metadata for the visible page.
///
/// A page count is only known when the catalog reports a total. Without
/// one, a full page is taken to mean there may be another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub total: Option<u64>,
    pub total_pages: Option<u32>,
    pub has_next: bool,
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            page: 1,
            total: None,
            total_pages: None,
            has_next: false,
        }
    }
}

impl PageInfo {
    fn from_response(query: &BookQuery, total: Option<u64>, returned: usize) -> Self {
        let page = query.page();
        let limit = u64::from(query.limit.max(1));
        let total_pages = total.map(|t| {
            let pages = t.div_ceil(limit).max(1);
            u32::try_from(pages).unwrap_or(u32::MAX)
        });
        let has_next = match total_pages {
            Some(pages) => page < pages,
            None => returned as u64 >= limit,
        };
        Self {
            page,
            total,
            total_pages,
            has_next,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

// ── Controller ──────────────────────────────────────────────────────────────

pub struct ListController {
    api: Arc<dyn CatalogApi>,
    page_size: u32,

    filters: FilterState,
    search: Debouncer<String>,
    /// Debounced title; the only title text that reaches a query.
    settled_title: String,

    /// Query behind `latest_token`, for change detection.
    last_issued: Option<BookQuery>,
    latest_token: RequestToken,
    in_flight: Vec<(RequestToken, AbortHandle)>,

    books: Vec<Book>,
    page_info: PageInfo,
    /// Query `page_info` was computed from; `None` after a failure.
    page_info_query: Option<BookQuery>,
    loading: bool,
    error: Option<String>,

    /// Last token handed out by `save`.
    save_token: RequestToken,
    /// State of the most recent save only.
    save: SaveState,
    /// Every save that finished and has not been taken yet.
    finished_saves: VecDeque<SaveState>,

    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    save_tx: mpsc::UnboundedSender<SaveOutcome>,
    save_rx: mpsc::UnboundedReceiver<SaveOutcome>,
    torn_down: bool,
}

impl ListController {
    pub fn new(api: Arc<dyn CatalogApi>, config: &ListConfig) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (save_tx, save_rx) = mpsc::unbounded_channel();
        Self {
            api,
            page_size: config.page_size.max(1),
            filters: FilterState::new(),
            search: Debouncer::new(config.search_debounce()),
            settled_title: String::new(),
            last_issued: None,
            latest_token: RequestToken::default(),
            in_flight: Vec::new(),
            books: Vec::new(),
            page_info: PageInfo::default(),
            page_info_query: None,
            loading: false,
            error: None,
            save_token: RequestToken::default(),
            save: SaveState::Idle,
            finished_saves: VecDeque::new(),
            outcome_tx,
            outcome_rx,
            save_tx,
            save_rx,
            torn_down: false,
        }
    }

    // ── Read side (rendering boundary) ──────────────────────────────────

    /// Visible books, ordered by the active sort.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sort(&self) -> SortState {
        self.filters.sort()
    }

    pub fn page_info(&self) -> PageInfo {
        self.page_info
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn save_state(&self) -> &SaveState {
        &self.save
    }

    pub fn settled_title(&self) -> &str {
        &self.settled_title
    }

    /// Whether typed search text is still waiting out the debounce.
    pub fn search_pending(&self) -> bool {
        self.search.is_pending()
    }

    pub fn latest_token(&self) -> RequestToken {
        self.latest_token
    }

    /// Query that would be sent for the current state.
    pub fn current_query(&self) -> BookQuery {
        BookQuery::derive(&self.filters, &self.settled_title, self.page_size)
    }

    // ── User actions ────────────────────────────────────────────────────

    /// Issue the first request.
    pub fn start(&mut self) {
        self.sync_query();
    }

    /// A genre/publisher/author/availability input changed.
    pub fn on_filter_changed(&mut self, field: FilterField, value: &str) {
        self.filters.set_field(field, value);
        self.sync_query();
    }

    pub fn on_availability_changed(&mut self, availability: Availability) {
        self.filters.set_availability(availability);
        self.sync_query();
    }

    /// The title search box changed. The text goes through the debouncer;
    /// only the page reset takes effect immediately.
    pub fn on_search_changed(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.filters.set_title(text.clone());
        self.search.push(text, now);
        self.sync_query();
    }

    /// A column header was selected. Re-orders the visible page only.
    pub fn on_sort_column(&mut self, field: SortField) {
        self.filters.select_sort_column(field);
        self.sort_books();
    }

    /// Jump to `page`, clamped to the last page when the visible page info
    /// belongs to the current predicates.
    pub fn on_page_changed(&mut self, page: u32) {
        let page = match self.current_page_bounds().and_then(|info| info.total_pages) {
            Some(last) => page.min(last),
            None => page,
        };
        self.filters.set_page(page);
        self.sync_query();
    }

    pub fn next_page(&mut self) {
        let has_next = self.current_page_bounds().is_none_or(|info| info.has_next);
        if has_next {
            self.on_page_changed(self.filters.page().saturating_add(1));
        }
    }

    pub fn prev_page(&mut self) {
        if self.filters.page() > 1 {
            self.on_page_changed(self.filters.page() - 1);
        }
    }

    /// Drop every predicate, including any title still being debounced.
    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.search.cancel();
        self.settled_title.clear();
        self.sync_query();
    }

    /// Re-issue the current query even if it has not changed.
    pub fn refresh(&mut self) {
        if self.torn_down {
            return;
        }
        let query = self.current_query();
        self.issue(query);
    }

    /// Forward a form payload to create (no id) or update, then refresh
    /// the list once it lands.
    ///
    /// The returned token comes back on the matching [`SaveState`], so the
    /// caller can tell its own save apart from an older one.
    pub fn save(&mut self, id: Option<BookId>, draft: BookDraft) -> Option<RequestToken> {
        if self.torn_down {
            return None;
        }
        let token = self.save_token.next();
        self.save_token = token;
        self.save = SaveState::Saving(token);

        let api = Arc::clone(&self.api);
        let tx = self.save_tx.clone();
        tokio::spawn(async move {
            let result = match id {
                Some(ref id) => api.update_book(id, &draft).await,
                None => api.create_book(&draft).await,
            };
            let _ = tx.send(SaveOutcome { token, result });
        });
        Some(token)
    }

    /// Next finished save, oldest first.
    pub fn take_finished_save(&mut self) -> Option<SaveState> {
        self.finished_saves.pop_front()
    }

    /// Stop the controller: cancel the pending search emission, abort
    /// in-flight requests and ignore anything that still arrives.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.search.cancel();
        for (_, handle) in self.in_flight.drain(..) {
            handle.abort();
        }
        self.loading = false;
        tracing::debug!("list controller torn down");
    }

    // ── Event loop hooks ────────────────────────────────────────────────

    /// Advance the debouncer and fold in finished requests.
    pub fn tick(&mut self, now: Instant) {
        if let Some(title) = self.search.poll(now) {
            self.settled_title = title;
            self.sync_query();
        }
        self.poll();
    }

    /// Apply every response that has arrived since the last call.
    pub fn poll(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply(outcome);
        }
        while let Ok(outcome) = self.save_rx.try_recv() {
            self.apply_save(outcome);
        }
    }

    /// Wait for the next list response and apply it.
    pub async fn wait_for_outcome(&mut self) -> Option<Disposition> {
        let outcome = self.outcome_rx.recv().await?;
        Some(self.apply(outcome))
    }

    /// Wait for the next save to finish and apply it.
    pub async fn wait_for_save(&mut self) -> Option<SaveState> {
        let outcome = self.save_rx.recv().await?;
        self.apply_save(outcome)
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Visible page info, if it was computed for the predicates now in
    /// effect. A response for other filters says nothing about this
    /// result set's page count.
    fn current_page_bounds(&self) -> Option<&PageInfo> {
        let shown = self.page_info_query.as_ref()?;
        shown
            .same_predicates(&self.current_query())
            .then_some(&self.page_info)
    }

    /// Issue the derived query if it differs from the last one sent.
    fn sync_query(&mut self) -> Option<RequestToken> {
        if self.torn_down {
            return None;
        }
        let query = self.current_query();
        if self.last_issued.as_ref() == Some(&query) {
            return None;
        }
        Some(self.issue(query))
    }

    fn issue(&mut self, query: BookQuery) -> RequestToken {
        let token = self.latest_token.next();
        self.latest_token = token;
        self.last_issued = Some(query.clone());
        self.loading = true;

        tracing::debug!(token = token.value(), ?query, "issuing book list request");

        let api = Arc::clone(&self.api);
        let tx = self.outcome_tx.clone();
        let handle = tokio::spawn(async move {
            let result = api.list_books(&query).await;
            let _ = tx.send(FetchOutcome {
                token,
                query,
                result,
            });
        });
        self.in_flight.push((token, handle.abort_handle()));
        token
    }

    fn apply(&mut self, outcome: FetchOutcome) -> Disposition {
        self.in_flight.retain(|(t, _)| *t != outcome.token);

        if self.torn_down || outcome.token != self.latest_token {
            tracing::debug!(
                token = outcome.token.value(),
                latest = self.latest_token.value(),
                "discarding superseded book list response"
            );
            return Disposition::Superseded;
        }

        self.loading = false;
        match outcome.result {
            Ok(page) => {
                tracing::debug!(
                    token = outcome.token.value(),
                    count = page.books.len(),
                    total = ?page.total,
                    "applied book list response"
                );
                self.page_info =
                    PageInfo::from_response(&outcome.query, page.total, page.books.len());
                self.page_info_query = Some(outcome.query);
                self.books = page.books;
                self.sort_books();
                self.error = None;
                Disposition::Applied
            }
            Err(e) => {
                tracing::warn!(token = outcome.token.value(), "Failed to load books: {e}");
                self.books.clear();
                self.page_info = PageInfo {
                    page: outcome.query.page(),
                    ..PageInfo::default()
                };
                self.page_info_query = None;
                self.error = Some(e.user_message());
                Disposition::Failed
            }
        }
    }

    fn apply_save(&mut self, outcome: SaveOutcome) -> Option<SaveState> {
        if self.torn_down {
            return None;
        }
        let token = outcome.token;
        let finished = match outcome.result {
            Ok(book) => {
                tracing::info!(
                    token = token.value(),
                    id = %book.id,
                    title = %book.title,
                    "book saved"
                );
                self.refresh();
                SaveState::Saved { token, book }
            }
            Err(e) => {
                tracing::warn!(token = token.value(), "Failed to save book: {e}");
                SaveState::Failed {
                    token,
                    message: e.user_message(),
                }
            }
        };
        if token == self.save_token {
            self.save = finished.clone();
        }
        self.finished_saves.push_back(finished.clone());
        Some(finished)
    }

    fn sort_books(&mut self) {
        self.filters.sort().apply(&mut self.books);
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        for (_, handle) in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::books::sort::SortDirection;
    use crate::core::catalog::{MockCatalogApi, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    // ── Fixtures ────────────────────────────────────────────────────────

    fn book(title: &str) -> Book {
        Book {
            id: BookId::new(title),
            title: title.to_string(),
            author: "Anon".to_string(),
            genre: "Fiction".to_string(),
            publisher: "Planeta".to_string(),
            available: true,
            description: None,
            price: 10.0,
            image: None,
        }
    }

    fn page_of(titles: &[&str]) -> BookPage {
        BookPage {
            books: titles.iter().map(|t| book(t)).collect(),
            total: None,
        }
    }

    fn titles(ctl: &ListController) -> Vec<String> {
        ctl.books().iter().map(|b| b.title.clone()).collect()
    }

    fn draft() -> BookDraft {
        BookDraft {
            title: "Nuevo".into(),
            author: "Autora".into(),
            genre: "Poetry".into(),
            publisher: "Anagrama".into(),
            available: true,
            description: String::new(),
            price: 20.0,
            image: None,
        }
    }

    fn controller(api: impl CatalogApi + 'static) -> ListController {
        ListController::new(Arc::new(api), &ListConfig::default())
    }

    async fn settle(ctl: &mut ListController) {
        while ctl.is_loading() {
            ctl.wait_for_outcome().await;
        }
    }

    /// Catalog whose list calls block until the test answers them.
    struct GatedCatalog {
        calls: mpsc::UnboundedSender<PendingCall>,
    }

    struct PendingCall {
        query: BookQuery,
        respond: oneshot::Sender<Result<BookPage>>,
    }

    impl GatedCatalog {
        fn new() -> (Self, mpsc::UnboundedReceiver<PendingCall>) {
            let (calls, rx) = mpsc::unbounded_channel();
            (Self { calls }, rx)
        }
    }

    #[async_trait]
    impl CatalogApi for GatedCatalog {
        async fn list_books(&self, query: &BookQuery) -> Result<BookPage> {
            let (respond, rx) = oneshot::channel();
            let _ = self.calls.send(PendingCall {
                query: query.clone(),
                respond,
            });
            rx.await.unwrap_or_else(|_| Ok(BookPage::default()))
        }

        async fn create_book(&self, _draft: &BookDraft) -> Result<Book> {
            Err(CatalogError::Validation("not supported".into()))
        }

        async fn update_book(&self, _id: &BookId, _draft: &BookDraft) -> Result<Book> {
            Err(CatalogError::Validation("not supported".into()))
        }
    }

    // ── Ordering ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_older_response_arriving_late_is_discarded() {
        let (api, mut calls) = GatedCatalog::new();
        let mut ctl = controller(api);

        ctl.start();
        ctl.on_filter_changed(FilterField::Genre, "Fiction");
        assert_eq!(ctl.latest_token().value(), 2);

        let a = calls.recv().await.unwrap();
        let b = calls.recv().await.unwrap();
        let (older, newer) = if a.query.genre.is_none() { (a, b) } else { (b, a) };
        assert_eq!(newer.query.genre.as_deref(), Some("Fiction"));

        newer.respond.send(Ok(page_of(&["Dune"]))).unwrap();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Applied));

        older.respond.send(Ok(page_of(&["Stale"]))).unwrap();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Superseded));

        assert_eq!(titles(&ctl), ["Dune"]);
        assert!(!ctl.is_loading());
        assert!(ctl.error().is_none());
    }

    #[tokio::test]
    async fn test_superseded_response_leaves_loading_and_previous_page() {
        let (api, mut calls) = GatedCatalog::new();
        let mut ctl = controller(api);

        ctl.start();
        let first = calls.recv().await.unwrap();
        first.respond.send(Ok(page_of(&["Visible"]))).unwrap();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Applied));

        ctl.on_filter_changed(FilterField::Author, "Borges");
        ctl.on_filter_changed(FilterField::Author, "Cortázar");
        let a = calls.recv().await.unwrap();
        let b = calls.recv().await.unwrap();
        let (older, newer) = if a.query.author.as_deref() == Some("Borges") {
            (a, b)
        } else {
            (b, a)
        };

        older.respond.send(Ok(page_of(&["Aleph"]))).unwrap();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Superseded));
        assert!(ctl.is_loading());
        assert_eq!(titles(&ctl), ["Visible"]);

        newer.respond.send(Ok(page_of(&["Rayuela"]))).unwrap();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Applied));
        assert!(!ctl.is_loading());
        assert_eq!(titles(&ctl), ["Rayuela"]);
    }

    #[tokio::test]
    async fn test_late_failure_of_older_request_keeps_newer_page() {
        let (api, mut calls) = GatedCatalog::new();
        let mut ctl = controller(api);

        ctl.start();
        ctl.on_filter_changed(FilterField::Genre, "Drama");
        let a = calls.recv().await.unwrap();
        let b = calls.recv().await.unwrap();
        let (older, newer) = if a.query.genre.is_none() { (a, b) } else { (b, a) };

        newer.respond.send(Ok(page_of(&["Yerma"]))).unwrap();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Applied));

        older
            .respond
            .send(Err(CatalogError::Status {
                status: 500,
                body: "boom".into(),
            }))
            .unwrap();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Superseded));

        assert_eq!(titles(&ctl), ["Yerma"]);
        assert!(ctl.error().is_none());
        assert!(!ctl.is_loading());
        assert_eq!(ctl.page_info().page, 1);
    }

    #[tokio::test]
    async fn test_failure_clears_books_and_sets_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut api = MockCatalogApi::new();
        api.expect_list_books().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(page_of(&["Dune"]))
            } else {
                Err(CatalogError::Status {
                    status: 503,
                    body: "down".into(),
                })
            }
        });
        let mut ctl = controller(api);

        ctl.start();
        settle(&mut ctl).await;
        assert_eq!(titles(&ctl), ["Dune"]);

        ctl.refresh();
        assert!(ctl.is_loading());
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Failed));

        assert!(ctl.books().is_empty());
        assert!(ctl.error().is_some());
        assert!(!ctl.is_loading());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_next_filter_change_recovers_from_error() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .withf(|q| q.publisher.is_none())
            .times(1)
            .returning(|_| {
                Err(CatalogError::Status {
                    status: 500,
                    body: String::new(),
                })
            });
        api.expect_list_books()
            .withf(|q| q.publisher.as_deref() == Some("Alfaguara"))
            .times(1)
            .returning(|_| Ok(page_of(&["Cien años"])));
        let mut ctl = controller(api);

        ctl.start();
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Failed));

        ctl.on_filter_changed(FilterField::Publisher, "Alfaguara");
        assert_eq!(ctl.wait_for_outcome().await, Some(Disposition::Applied));
        assert!(ctl.error().is_none());
        assert_eq!(titles(&ctl), ["Cien años"]);
    }

    // ── Change detection ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_unchanged_query_is_not_refetched() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .times(1)
            .returning(|_| Ok(page_of(&["b", "a"])));
        let mut ctl = controller(api);

        ctl.start();
        ctl.on_filter_changed(FilterField::Genre, "");
        ctl.on_availability_changed(Availability::Unset);
        ctl.on_page_changed(1);
        ctl.on_sort_column(SortField::Author);
        settle(&mut ctl).await;

        assert_eq!(ctl.latest_token().value(), 1);
    }

    #[tokio::test]
    async fn test_sort_reorders_visible_page_without_fetch() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .times(1)
            .returning(|_| Ok(page_of(&["b", "c", "a"])));
        let mut ctl = controller(api);

        ctl.start();
        settle(&mut ctl).await;
        assert_eq!(titles(&ctl), ["a", "b", "c"]);

        ctl.on_sort_column(SortField::Title);
        assert_eq!(ctl.sort().direction, SortDirection::Desc);
        assert_eq!(titles(&ctl), ["c", "b", "a"]);
        assert!(!ctl.is_loading());
    }

    // ── Debounced search ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_search_only_reaches_query_after_quiet_period() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .withf(|q| q.title.is_none())
            .times(1)
            .returning(|_| Ok(page_of(&["All"])));
        api.expect_list_books()
            .withf(|q| q.title.as_deref() == Some("dune"))
            .times(1)
            .returning(|_| Ok(page_of(&["Dune"])));
        let mut ctl = controller(api);

        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);

        ctl.start();
        for (ms, text) in [(0, "d"), (100, "du"), (200, "dun"), (300, "dune")] {
            ctl.on_search_changed(text, at(ms));
            ctl.tick(at(ms));
        }
        ctl.tick(at(699));
        assert_eq!(ctl.latest_token().value(), 1);
        assert!(ctl.search_pending());

        ctl.tick(at(700));
        assert_eq!(ctl.latest_token().value(), 2);
        assert_eq!(ctl.settled_title(), "dune");
        assert_eq!(ctl.current_query().title.as_deref(), Some("dune"));

        settle(&mut ctl).await;
        assert_eq!(titles(&ctl), ["Dune"]);
    }

    #[tokio::test]
    async fn test_typing_resets_page_immediately() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .returning(|_| {
                Ok(page_of(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]))
            });
        let mut ctl = controller(api);

        ctl.start();
        settle(&mut ctl).await;
        ctl.on_page_changed(3);
        assert_eq!(ctl.current_query().offset, 20);

        ctl.on_search_changed("x", Instant::now());
        assert_eq!(ctl.filters().page(), 1);
        let q = ctl.current_query();
        assert_eq!(q.offset, 0);
        assert_eq!(q.title, None);
        settle(&mut ctl).await;
    }

    #[tokio::test]
    async fn test_clear_filters_cancels_pending_search() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .withf(|q| q.is_unfiltered())
            .returning(|_| Ok(page_of(&[])));
        api.expect_list_books()
            .withf(|q| q.genre.is_some())
            .times(1)
            .returning(|_| Ok(page_of(&[])));
        let mut ctl = controller(api);
        let t0 = Instant::now();

        ctl.start();
        ctl.on_filter_changed(FilterField::Genre, "Drama");
        ctl.on_search_changed("ham", t0);
        ctl.clear_filters();
        ctl.tick(t0 + Duration::from_secs(5));

        assert!(!ctl.search_pending());
        assert_eq!(ctl.settled_title(), "");
        assert!(ctl.current_query().is_unfiltered());
        settle(&mut ctl).await;
    }

    // ── Pagination ──────────────────────────────────────────────────────

    #[test]
    fn test_page_info_with_total() {
        let mut f = FilterState::new();
        f.set_page(2);
        let q = BookQuery::derive(&f, "", 10);

        let info = PageInfo::from_response(&q, Some(31), 10);
        assert_eq!(info.page, 2);
        assert_eq!(info.total_pages, Some(4));
        assert!(info.has_next);
        assert!(info.has_prev());

        let info = PageInfo::from_response(&q, Some(0), 0);
        assert_eq!(info.total_pages, Some(1));
        assert!(!info.has_next);
    }

    #[test]
    fn test_page_info_without_total_uses_full_page() {
        let q = BookQuery::derive(&FilterState::new(), "", 10);
        assert!(PageInfo::from_response(&q, None, 10).has_next);
        assert!(!PageInfo::from_response(&q, None, 9).has_next);
        assert_eq!(PageInfo::from_response(&q, None, 10).total_pages, None);
    }

    #[tokio::test]
    async fn test_next_page_only_when_more_available() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books().returning(|q| {
            Ok(BookPage {
                books: (0..q.limit.min(4)).map(|i| book(&format!("b{i}"))).collect(),
                total: Some(14),
            })
        });
        let config = ListConfig {
            page_size: 4,
            ..ListConfig::default()
        };
        let mut ctl = ListController::new(Arc::new(api), &config);

        ctl.start();
        settle(&mut ctl).await;
        assert_eq!(ctl.page_info().total_pages, Some(4));

        for _ in 0..10 {
            ctl.next_page();
            settle(&mut ctl).await;
        }
        assert_eq!(ctl.filters().page(), 4);
        assert!(!ctl.page_info().has_next);

        ctl.on_page_changed(99);
        assert_eq!(ctl.filters().page(), 4);

        ctl.prev_page();
        assert_eq!(ctl.current_query().offset, 8);
        settle(&mut ctl).await;
    }

    #[tokio::test]
    async fn test_page_bounds_of_other_filters_do_not_clamp() {
        let (api, mut calls) = GatedCatalog::new();
        let mut ctl = controller(api);

        ctl.start();
        calls.recv().await.unwrap().respond.send(Ok(page_of(&[]))).unwrap();
        settle(&mut ctl).await;

        ctl.on_filter_changed(FilterField::Genre, "Poetry");
        let poetry = calls.recv().await.unwrap();
        poetry
            .respond
            .send(Ok(BookPage {
                books: vec![book("Odas")],
                total: Some(5),
            }))
            .unwrap();
        settle(&mut ctl).await;
        assert_eq!(ctl.page_info().total_pages, Some(1));
        assert!(!ctl.page_info().has_next);

        // Unfiltered request still in flight; Poetry's single page says
        // nothing about how many pages it has.
        ctl.on_filter_changed(FilterField::Genre, "");
        assert!(ctl.is_loading());

        ctl.on_page_changed(3);
        assert_eq!(ctl.filters().page(), 3);
        assert_eq!(ctl.current_query().offset, 20);

        ctl.next_page();
        assert_eq!(ctl.filters().page(), 4);
    }

    #[tokio::test]
    async fn test_page_bounds_apply_while_next_page_loads() {
        let (api, mut calls) = GatedCatalog::new();
        let config = ListConfig {
            page_size: 4,
            ..ListConfig::default()
        };
        let mut ctl = ListController::new(Arc::new(api), &config);

        ctl.start();
        let first = calls.recv().await.unwrap();
        first
            .respond
            .send(Ok(BookPage {
                books: vec![book("a"), book("b"), book("c"), book("d")],
                total: Some(6),
            }))
            .unwrap();
        settle(&mut ctl).await;

        ctl.next_page();
        assert!(ctl.is_loading());
        ctl.on_page_changed(9);
        assert_eq!(ctl.filters().page(), 2);
    }

    // ── Saving ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_then_refresh() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books()
            .times(2)
            .returning(|_| Ok(page_of(&["Nuevo"])));
        api.expect_create_book()
            .withf(|d| d.title == "Nuevo" && d.available)
            .times(1)
            .returning(|_| Ok(book("Nuevo")));
        api.expect_update_book().never();
        let mut ctl = controller(api);

        ctl.start();
        settle(&mut ctl).await;

        let token = ctl.save(None, draft()).unwrap();
        assert_eq!(ctl.save_state(), &SaveState::Saving(token));
        let state = ctl.wait_for_save().await;
        assert!(matches!(
            state,
            Some(SaveState::Saved { token: t, ref book }) if t == token && book.title == "Nuevo"
        ));

        assert_eq!(ctl.latest_token().value(), 2);
        settle(&mut ctl).await;

        assert_eq!(ctl.take_finished_save(), state);
        assert_eq!(ctl.take_finished_save(), None);
    }

    #[tokio::test]
    async fn test_update_routes_by_id() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books().returning(|_| Ok(page_of(&[])));
        api.expect_update_book()
            .withf(|id, _| id.as_str() == "17")
            .times(1)
            .returning(|_, _| Ok(book("Editado")));
        api.expect_create_book().never();
        let mut ctl = controller(api);

        ctl.save(Some(BookId::new("17")), draft());
        let state = ctl.wait_for_save().await;
        assert!(matches!(state, Some(SaveState::Saved { .. })));
        settle(&mut ctl).await;
    }

    #[tokio::test]
    async fn test_overlapping_saves_each_report_under_own_token() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books().returning(|_| Ok(page_of(&[])));
        api.expect_create_book().returning(|d| Ok(book(&d.title)));
        let mut ctl = controller(api);

        let first = ctl.save(None, draft()).unwrap();
        let mut second_draft = draft();
        second_draft.title = "Segundo".into();
        let second = ctl.save(None, second_draft).unwrap();
        assert_ne!(first, second);
        assert_eq!(ctl.save_state(), &SaveState::Saving(second));

        let a = ctl.wait_for_save().await.unwrap();
        let b = ctl.wait_for_save().await.unwrap();
        let mut tokens = [a.token().unwrap(), b.token().unwrap()];
        tokens.sort();
        assert_eq!(tokens, [first, second]);

        match ctl.save_state() {
            SaveState::Saved { token, book } => {
                assert_eq!(*token, second);
                assert_eq!(book.title, "Segundo");
            }
            other => panic!("expected latest save to be shown, got {other:?}"),
        }
        assert!(ctl.take_finished_save().is_some());
        assert!(ctl.take_finished_save().is_some());
        assert!(ctl.take_finished_save().is_none());
        settle(&mut ctl).await;
    }

    #[tokio::test]
    async fn test_rejected_save_reports_message_without_refresh() {
        let mut api = MockCatalogApi::new();
        api.expect_list_books().never();
        api.expect_create_book()
            .times(1)
            .returning(|_| Err(CatalogError::Validation("price must be positive".into())));
        let mut ctl = controller(api);

        let token = ctl.save(None, draft()).unwrap();
        let state = ctl.wait_for_save().await;
        assert_eq!(
            state,
            Some(SaveState::Failed {
                token,
                message: "price must be positive".to_string(),
            })
        );
        assert_eq!(ctl.latest_token().value(), 0);
    }

    // ── Teardown ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_teardown_stops_everything() {
        let (api, _calls) = GatedCatalog::new();
        let mut ctl = controller(api);
        let t0 = Instant::now();

        ctl.start();
        ctl.on_search_changed("pending", t0);
        ctl.teardown();

        ctl.tick(t0 + Duration::from_secs(10));
        ctl.refresh();
        ctl.on_filter_changed(FilterField::Genre, "Noir");

        assert_eq!(ctl.latest_token().value(), 1);
        assert!(!ctl.is_loading());
        assert!(!ctl.search_pending());
        assert_eq!(ctl.settled_title(), "");
        assert_eq!(ctl.save(None, draft()), None);
    }
}
