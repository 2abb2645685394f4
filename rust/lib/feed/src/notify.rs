use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// What part of a feed changed. Observers re-read the store on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedChange {
    /// The item list (membership, order or item fields).
    Items,
    /// Pagination cursor: page, total, `has_more`, in-flight flag.
    Cursor,
    /// `last_error` was set or cleared.
    Error,
}

/// Callback type for feed change notifications.
pub type ChangeHandler = Arc<dyn Fn(FeedChange) + Send + Sync>;

/// Unique handle for a subscription, returned by `FeedStore::subscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Subscriber list with monotonic ids.
///
/// Handlers run on the notifying thread, after the list lock is released,
/// so a handler may subscribe, unsubscribe or read the store.
pub(crate) struct Subscribers {
    handlers: RwLock<Vec<(SubscriptionId, ChangeHandler)>>,
    next_id: AtomicU64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(FeedChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let len = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        handlers.len() < len
    }

    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn notify(&self, change: FeedChange) {
        let snapshot: Vec<ChangeHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in snapshot {
            handler(change);
        }
    }

    pub fn notify_all(&self, changes: &[FeedChange]) {
        for change in changes {
            self.notify(*change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn notify_reaches_every_subscriber() {
        let subs = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let a = seen.clone();
        let b = seen.clone();
        subs.subscribe(move |c| a.lock().unwrap().push(("a", c)));
        subs.subscribe(move |c| b.lock().unwrap().push(("b", c)));

        subs.notify(FeedChange::Items);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![("a", FeedChange::Items), ("b", FeedChange::Items)]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let subs = Subscribers::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let id = subs.subscribe(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        subs.notify(FeedChange::Cursor);
        assert!(subs.unsubscribe(id));
        subs.notify(FeedChange::Cursor);

        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(!subs.unsubscribe(id));
    }

    #[test]
    fn ids_are_unique() {
        let subs = Subscribers::new();
        let a = subs.subscribe(|_| {});
        let b = subs.subscribe(|_| {});
        assert_ne!(a, b);
        assert_eq!(subs.len(), 2);
        subs.clear();
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let subs = Arc::new(Subscribers::new());
        let slot = Arc::new(Mutex::new(None::<SubscriptionId>));
        let subs_c = subs.clone();
        let slot_c = slot.clone();
        let id = subs.subscribe(move |_| {
            if let Some(id) = *slot_c.lock().unwrap() {
                subs_c.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        // Must not deadlock.
        subs.notify(FeedChange::Error);
        assert_eq!(subs.len(), 0);
    }
}
