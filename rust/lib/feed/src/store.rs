use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::fetcher::PageFetcher;
use crate::model::{FeedItem, FeedPage, ItemId, ItemPatch, PaginationCursor};
use crate::notify::{FeedChange, Subscribers, SubscriptionId};

/// Why a load call returned without fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another load/refresh is outstanding on this store.
    InFlight,
    /// Everything the server reported has been loaded.
    Exhausted,
    /// The store was closed.
    Closed,
}

/// Result of `load_initial`, `load_more` or `refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was merged; `added` items were new to the store.
    Applied { added: usize },
    /// No fetch was issued.
    Skipped(SkipReason),
    /// The store was closed while the fetch was outstanding; the response
    /// was dropped without touching state.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Initial,
    More,
    Refresh,
}

impl FetchKind {
    fn as_str(self) -> &'static str {
        match self {
            FetchKind::Initial => "initial",
            FetchKind::More => "more",
            FetchKind::Refresh => "refresh",
        }
    }
}

/// Canonical in-memory feed for one query (home feed, one profile, ...).
///
/// - `load_initial()` replaces the list with page 1.
/// - `load_more()` appends the next page, skipping ids already present.
/// - `refresh()` re-reads page 1 and prepends ids not seen before.
/// - `apply_remote_*()` fold confirmed server mutations into the list.
///
/// The three loads share one in-flight flag: at most one fetch is
/// outstanding per store. State updates happen under a short lock that
/// is never held across an `.await`; observers are notified after it is
/// released and may read the store from their callback.
pub struct FeedStore {
    fetcher: Arc<dyn PageFetcher>,
    state: RwLock<FeedState>,
    subscribers: Subscribers,
}

#[derive(Default)]
struct FeedState {
    /// Newest-first.
    items: Vec<FeedItem>,
    /// Ids present in `items`; always the same set.
    known_ids: HashSet<ItemId>,
    cursor: PaginationCursor,
    last_error: Option<FeedError>,
    /// Bumped by `close()`; responses from an older generation are dropped.
    generation: u64,
    closed: bool,
}

/// Holds the in-flight flag for the duration of one fetch. Released on
/// drop, so success, failure and a dropped future all clear it.
struct InFlight<'a> {
    store: &'a FeedStore,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.store.write().cursor.in_flight = false;
    }
}

impl FeedStore {
    /// Create an empty store paging through `fetcher`.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            state: RwLock::new(FeedState::default()),
            subscribers: Subscribers::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FeedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ====================================================================
    // Loads
    // ====================================================================

    /// Load page 1, replacing whatever the store held.
    pub async fn load_initial(&self) -> Result<LoadOutcome, FeedError> {
        self.run(FetchKind::Initial).await
    }

    /// Load the page after `current_page` and append unseen items.
    ///
    /// No fetch is issued while another load is in flight or once
    /// `has_more` is false. `current_page` only advances when the page
    /// contributed at least one new item.
    pub async fn load_more(&self) -> Result<LoadOutcome, FeedError> {
        self.run(FetchKind::More).await
    }

    /// Re-read page 1 and prepend items not seen before.
    ///
    /// Known items stay where they are and `current_page` is left alone;
    /// only the total and `has_more` are refreshed. On a store that has
    /// never merged a page, this counts as loading page 1.
    pub async fn refresh(&self) -> Result<LoadOutcome, FeedError> {
        self.run(FetchKind::Refresh).await
    }

    /// Claim the in-flight flag and pick the page to fetch.
    fn begin(&self, kind: FetchKind) -> Result<(InFlight<'_>, u64, u32), SkipReason> {
        let mut state = self.write();
        if state.closed {
            return Err(SkipReason::Closed);
        }
        if state.cursor.in_flight {
            return Err(SkipReason::InFlight);
        }
        let page = match kind {
            FetchKind::Initial | FetchKind::Refresh => 1,
            FetchKind::More => {
                if !state.cursor.has_more {
                    return Err(SkipReason::Exhausted);
                }
                state.cursor.current_page + 1
            }
        };
        state.cursor.in_flight = true;
        Ok((InFlight { store: self }, state.generation, page))
    }

    async fn run(&self, kind: FetchKind) -> Result<LoadOutcome, FeedError> {
        let (ticket, generation, page) = match self.begin(kind) {
            Ok(claim) => claim,
            Err(reason) => {
                debug!(kind = kind.as_str(), ?reason, "feed load skipped");
                return Ok(LoadOutcome::Skipped(reason));
            }
        };
        self.subscribers.notify(FeedChange::Cursor);

        let result = self.fetcher.fetch(page).await;

        let (outcome, changes) = {
            let mut state = self.write();
            if state.closed || state.generation != generation {
                debug!(kind = kind.as_str(), page, "dropping response for closed feed");
                (Ok(LoadOutcome::Discarded), Vec::new())
            } else {
                match result {
                    Ok(fetched) => {
                        let fetched_len = fetched.items.len();
                        let added = match kind {
                            FetchKind::Initial => state.replace_with(fetched),
                            FetchKind::More => state.append(page, fetched),
                            FetchKind::Refresh => state.prepend(fetched),
                        };
                        info!(
                            kind = kind.as_str(),
                            page,
                            fetched = fetched_len,
                            added,
                            total = state.items.len(),
                            has_more = state.cursor.has_more,
                            "feed page merged"
                        );
                        let mut changes = Vec::with_capacity(3);
                        if added > 0 || kind == FetchKind::Initial {
                            changes.push(FeedChange::Items);
                        }
                        changes.push(FeedChange::Cursor);
                        if state.last_error.take().is_some() {
                            changes.push(FeedChange::Error);
                        }
                        (Ok(LoadOutcome::Applied { added }), changes)
                    }
                    Err(err) => {
                        warn!(kind = kind.as_str(), page, error = %err, "feed fetch failed");
                        state.last_error = Some(err.clone());
                        (Err(err), vec![FeedChange::Error, FeedChange::Cursor])
                    }
                }
            }
        };
        drop(ticket);
        self.subscribers.notify_all(&changes);
        outcome
    }

    // ====================================================================
    // Remote mutations
    // ====================================================================

    /// Insert a server-confirmed new item at the front.
    ///
    /// Returns false (and changes nothing) if the id is already present.
    pub fn apply_remote_create(&self, item: FeedItem) -> bool {
        let inserted = {
            let mut state = self.write();
            if state.closed || !state.known_ids.insert(item.id.clone()) {
                false
            } else {
                state.items.insert(0, item);
                if let Some(total) = state.cursor.total_count.as_mut() {
                    *total += 1;
                }
                state.recompute_has_more();
                true
            }
        };
        if inserted {
            self.subscribers.notify_all(&[FeedChange::Items, FeedChange::Cursor]);
        }
        inserted
    }

    /// Remove an item. Returns false if it was not present.
    pub fn apply_remote_delete(&self, id: &ItemId) -> bool {
        let removed = {
            let mut state = self.write();
            if state.closed || !state.known_ids.remove(id) {
                false
            } else {
                state.items.retain(|item| &item.id != id);
                if let Some(total) = state.cursor.total_count.as_mut() {
                    *total = total.saturating_sub(1);
                }
                state.recompute_has_more();
                true
            }
        };
        if removed {
            self.subscribers.notify_all(&[FeedChange::Items, FeedChange::Cursor]);
        }
        removed
    }

    /// Patch an item in place. A missing id is a no-op returning false;
    /// deletes racing updates are expected.
    pub fn apply_remote_update(&self, id: &ItemId, patch: &ItemPatch) -> bool {
        match self.modify_item(id, |item| patch.apply_to(item)) {
            Some(_) => true,
            None => {
                debug!(%id, "update for item not in feed ignored");
                false
            }
        }
    }

    /// Run `f` on the item with `id` under the state lock.
    ///
    /// Returns `None` if the item is absent. Observers get `Items` when `f`
    /// reports a change.
    pub(crate) fn modify_item<F>(&self, id: &ItemId, f: F) -> Option<bool>
    where
        F: FnOnce(&mut FeedItem) -> bool,
    {
        let changed = {
            let mut state = self.write();
            if state.closed {
                return None;
            }
            let item = state.items.iter_mut().find(|item| &item.id == id)?;
            f(item)
        };
        if changed {
            self.subscribers.notify(FeedChange::Items);
        }
        Some(changed)
    }

    // ====================================================================
    // Lifecycle
    // ====================================================================

    /// Tear the store down: outstanding responses are discarded, state is
    /// cleared, subscribers are dropped and further loads are skipped.
    pub fn close(&self) {
        {
            let mut state = self.write();
            if state.closed {
                return;
            }
            let generation = state.generation + 1;
            *state = FeedState {
                generation,
                closed: true,
                ..Default::default()
            };
            state.cursor.has_more = false;
        }
        self.subscribers.clear();
        debug!("feed store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Forget the last error (e.g. after the UI dismissed it).
    pub fn clear_error(&self) {
        let had = self.write().last_error.take().is_some();
        if had {
            self.subscribers.notify(FeedChange::Error);
        }
    }

    // ====================================================================
    // Read accessors
    // ====================================================================

    /// Snapshot of the item list, newest-first.
    pub fn items(&self) -> Vec<FeedItem> {
        self.read().items.clone()
    }

    pub fn item(&self, id: &ItemId) -> Option<FeedItem> {
        self.read().items.iter().find(|item| &item.id == id).cloned()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.read().known_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.read().cursor.clone()
    }

    pub fn has_more(&self) -> bool {
        self.read().cursor.has_more
    }

    /// True while a load or refresh is outstanding.
    pub fn is_loading(&self) -> bool {
        self.read().cursor.in_flight
    }

    pub fn last_error(&self) -> Option<FeedError> {
        self.read().last_error.clone()
    }

    // ====================================================================
    // Subscriptions
    // ====================================================================

    /// Observe changes. The handler runs synchronously on the thread that
    /// made the change, after the store lock is released.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(FeedChange) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(handler)
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl FeedState {
    /// Totals of 0 are treated as "not reported".
    fn reported_total(page: &FeedPage) -> Option<u64> {
        page.total_count.filter(|t| *t > 0)
    }

    fn loaded(&self) -> u64 {
        self.items.len() as u64
    }

    /// Recompute `has_more` when the total is known; otherwise keep it.
    fn recompute_has_more(&mut self) {
        if let Some(total) = self.cursor.total_count {
            self.cursor.has_more = self.loaded() < total;
        }
    }

    /// Push `item` unless its id is known. Returns whether it was added.
    fn push_unique(&mut self, item: FeedItem) -> bool {
        if self.known_ids.insert(item.id.clone()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    fn replace_with(&mut self, page: FeedPage) -> usize {
        let total = Self::reported_total(&page);
        self.items.clear();
        self.known_ids.clear();
        self.cursor.last_page_len = page.items.len();
        for item in page.items {
            self.push_unique(item);
        }
        self.cursor.current_page = 1;
        self.cursor.total_count = total;
        self.cursor.has_more = match total {
            Some(total) => self.loaded() < total,
            None => !self.items.is_empty(),
        };
        self.items.len()
    }

    fn append(&mut self, page_no: u32, page: FeedPage) -> usize {
        let total = Self::reported_total(&page);
        self.cursor.last_page_len = page.items.len();
        let mut added = 0;
        for item in page.items {
            if self.push_unique(item) {
                added += 1;
            }
        }
        if added > 0 {
            self.cursor.current_page = page_no;
        }
        if total.is_some() {
            self.cursor.total_count = total;
        }
        self.cursor.has_more = match self.cursor.total_count {
            Some(total) => self.loaded() < total,
            None => added > 0,
        };
        added
    }

    fn prepend(&mut self, page: FeedPage) -> usize {
        let total = Self::reported_total(&page);
        let first_load = self.cursor.current_page == 0;
        self.cursor.last_page_len = page.items.len();

        let known = &mut self.known_ids;
        let fresh: Vec<FeedItem> = page
            .items
            .into_iter()
            .filter(|item| known.insert(item.id.clone()))
            .collect();
        let added = fresh.len();
        let older = std::mem::replace(&mut self.items, fresh);
        self.items.extend(older);

        if first_load {
            self.cursor.current_page = 1;
        }
        if total.is_some() {
            self.cursor.total_count = total;
        }
        match self.cursor.total_count {
            Some(total) => self.cursor.has_more = self.loaded() < total,
            None if first_load => self.cursor.has_more = !self.items.is_empty(),
            None => {}
        }
        added
    }
}
