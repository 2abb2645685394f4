//! User-initiated mutations on a [`FeedStore`].
//!
//! Likes are applied optimistically and rolled back if the backend call
//! fails. When toggles on one item overlap, only the newest one decides
//! what the store shows; older answers just update the confirmed state. Deletes are removed up front with no re-insertion on failure.
//! Creates and edits wait for the server and merge the canonical item it
//! returns, never the local draft.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::model::{Comment, FeedItem, ItemId, ItemPatch, PostDraft};
use crate::store::FeedStore;

/// Backend mutation endpoints.
#[async_trait::async_trait]
pub trait FeedApi: Send + Sync + 'static {
    /// Like `item_id` as `user_id`; returns the like count the server
    /// reports, if it sent one.
    async fn like(&self, item_id: &ItemId, user_id: &str) -> Result<Option<u32>, FeedError>;
    async fn unlike(&self, item_id: &ItemId, user_id: &str) -> Result<Option<u32>, FeedError>;
    async fn create(&self, draft: &PostDraft) -> Result<FeedItem, FeedError>;
    async fn update(&self, item_id: &ItemId, draft: &PostDraft) -> Result<FeedItem, FeedError>;
    async fn delete(&self, item_id: &ItemId) -> Result<(), FeedError>;
    async fn add_comment(&self, item_id: &ItemId, body: &str) -> Result<Comment, FeedError>;
    async fn remove_comment(&self, item_id: &ItemId, comment_id: &str) -> Result<(), FeedError>;
}

#[async_trait::async_trait]
impl<T: FeedApi + ?Sized> FeedApi for Arc<T> {
    async fn like(&self, item_id: &ItemId, user_id: &str) -> Result<Option<u32>, FeedError> {
        (**self).like(item_id, user_id).await
    }
    async fn unlike(&self, item_id: &ItemId, user_id: &str) -> Result<Option<u32>, FeedError> {
        (**self).unlike(item_id, user_id).await
    }
    async fn create(&self, draft: &PostDraft) -> Result<FeedItem, FeedError> {
        (**self).create(draft).await
    }
    async fn update(&self, item_id: &ItemId, draft: &PostDraft) -> Result<FeedItem, FeedError> {
        (**self).update(item_id, draft).await
    }
    async fn delete(&self, item_id: &ItemId) -> Result<(), FeedError> {
        (**self).delete(item_id).await
    }
    async fn add_comment(&self, item_id: &ItemId, body: &str) -> Result<Comment, FeedError> {
        (**self).add_comment(item_id, body).await
    }
    async fn remove_comment(&self, item_id: &ItemId, comment_id: &str) -> Result<(), FeedError> {
        (**self).remove_comment(item_id, comment_id).await
    }
}

/// Like fields of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: u32,
}

impl LikeState {
    fn of(item: &FeedItem) -> Self {
        Self {
            liked: item.liked_by_current_user,
            like_count: item.like_count,
        }
    }

    fn flipped(self) -> Self {
        let like_count = if self.liked {
            self.like_count.saturating_sub(1)
        } else {
            self.like_count.saturating_add(1)
        };
        Self {
            liked: !self.liked,
            like_count,
        }
    }

    fn patch(self) -> ItemPatch {
        ItemPatch::likes(self.like_count, self.liked)
    }
}

/// Like toggles in flight for one item.
#[derive(Debug)]
struct PendingLike {
    /// Last state the server agreed to, or the state before the first toggle.
    confirmed: LikeState,
    /// Ticket of the toggle that produced `confirmed`; 0 for the initial state.
    confirmed_by: u64,
    /// Ticket of the newest toggle.
    latest: u64,
    outstanding: u32,
}

/// One outstanding like call. Settles its ticket on drop, so a cancelled
/// toggle counts as a failed one.
struct LikeTicket<'a> {
    coord: &'a MutationCoordinator,
    item_id: &'a ItemId,
    ticket: u64,
    outcome: Option<LikeState>,
}

impl Drop for LikeTicket<'_> {
    fn drop(&mut self) {
        self.coord.settle_like(self.item_id, self.ticket, self.outcome);
    }
}

/// Runs mutations against a backend and folds the results into a store.
pub struct MutationCoordinator {
    store: Arc<FeedStore>,
    api: Arc<dyn FeedApi>,
    max_body_chars: Option<usize>,
    pending_likes: Mutex<HashMap<ItemId, PendingLike>>,
}

impl MutationCoordinator {
    /// Coordinator with the default 280-character body limit.
    pub fn new(store: Arc<FeedStore>, api: Arc<dyn FeedApi>) -> Self {
        Self {
            store,
            api,
            max_body_chars: Some(280),
            pending_likes: Mutex::new(HashMap::new()),
        }
    }

    /// Override the body limit; `None` disables it.
    pub fn with_max_body_chars(mut self, max: Option<usize>) -> Self {
        self.max_body_chars = max;
        self
    }

    pub fn store(&self) -> &Arc<FeedStore> {
        &self.store
    }

    fn pending_likes(&self) -> MutexGuard<'_, HashMap<ItemId, PendingLike>> {
        self.pending_likes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip the current user's like on `item_id`.
    ///
    /// The store shows the flipped state immediately. On success the like
    /// count is taken from the server's answer, or kept as flipped when the
    /// server does not report one. On failure the error is returned and the
    /// item goes back to the last state the server confirmed.
    ///
    /// Overlapping toggles on the same item each get a ticket. Only the
    /// newest ticket writes its outcome to the store while others are still
    /// in flight; once the last one finishes the store shows the newest
    /// confirmed state.
    pub async fn toggle_like(&self, item_id: &ItemId, user_id: &str) -> Result<LikeState, FeedError> {
        let (ticket, optimistic) = {
            let mut pending = self.pending_likes();
            let mut flip = None;
            self.store.modify_item(item_id, |item| {
                let prev = LikeState::of(item);
                let next = prev.flipped();
                flip = Some((prev, next));
                next.patch().apply_to(item)
            });
            let Some((prev, next)) = flip else {
                return Err(FeedError::UnknownItem(item_id.clone()));
            };
            let entry = pending.entry(item_id.clone()).or_insert(PendingLike {
                confirmed: prev,
                confirmed_by: 0,
                latest: 0,
                outstanding: 0,
            });
            entry.latest += 1;
            entry.outstanding += 1;
            (entry.latest, next)
        };

        let mut guard = LikeTicket {
            coord: self,
            item_id,
            ticket,
            outcome: None,
        };
        let result = if optimistic.liked {
            self.api.like(item_id, user_id).await
        } else {
            self.api.unlike(item_id, user_id).await
        };
        let result = result.map(|count| LikeState {
            liked: optimistic.liked,
            like_count: count.unwrap_or(optimistic.like_count),
        });
        guard.outcome = result.as_ref().ok().copied();
        drop(guard);

        match result {
            Ok(settled) => {
                debug!(%item_id, ticket, liked = settled.liked, likes = settled.like_count, "like settled");
                Ok(settled)
            }
            Err(err) => {
                warn!(%item_id, ticket, error = %err, "like toggle failed, rolling back");
                Err(err)
            }
        }
    }

    /// Close out `ticket` on `item_id`. `outcome` is the settled state, or
    /// `None` if the call failed or was dropped.
    fn settle_like(&self, item_id: &ItemId, ticket: u64, outcome: Option<LikeState>) {
        let mut pending = self.pending_likes();
        let shown = match pending.get_mut(item_id) {
            Some(entry) => {
                entry.outstanding = entry.outstanding.saturating_sub(1);
                if let Some(settled) = outcome {
                    if ticket > entry.confirmed_by {
                        entry.confirmed = settled;
                        entry.confirmed_by = ticket;
                    }
                }
                let newest = ticket == entry.latest;
                let done = entry.outstanding == 0;
                let confirmed = entry.confirmed;
                if done {
                    pending.remove(item_id);
                }
                (newest || done).then_some(confirmed)
            }
            None => outcome,
        };
        if let Some(state) = shown {
            self.store.modify_item(item_id, |item| state.patch().apply_to(item));
        }
    }

    /// Remove the post locally, then delete it on the server.
    ///
    /// A failed delete is returned as-is; the item is not put back.
    pub async fn delete_post(&self, item_id: &ItemId) -> Result<(), FeedError> {
        let removed = self.store.apply_remote_delete(item_id);
        match self.api.delete(item_id).await {
            Ok(()) => {
                info!(%item_id, "post deleted");
                Ok(())
            }
            Err(err) => {
                warn!(%item_id, removed, error = %err, "post delete failed");
                Err(err)
            }
        }
    }

    /// Shift `comment_count` by `delta`, clamped at zero. Returns the new
    /// count. Call only after the comment mutation itself succeeded.
    pub fn adjust_comment_count(&self, item_id: &ItemId, delta: i64) -> Result<u32, FeedError> {
        let mut count = 0;
        self.store
            .modify_item(item_id, |item| {
                let next = (i64::from(item.comment_count) + delta).clamp(0, i64::from(u32::MAX)) as u32;
                count = next;
                let changed = next != item.comment_count;
                item.comment_count = next;
                changed
            })
            .ok_or_else(|| FeedError::UnknownItem(item_id.clone()))?;
        Ok(count)
    }

    /// Publish a new post and insert the server's copy at the top.
    pub async fn create_post(&self, draft: PostDraft) -> Result<FeedItem, FeedError> {
        draft.validate(self.max_body_chars)?;
        let item = self.api.create(&draft).await.map_err(|err| {
            warn!(error = %err, "post create failed");
            err
        })?;
        self.store.apply_remote_create(item.clone());
        info!(item_id = %item.id, "post created");
        Ok(item)
    }

    /// Edit a post and patch the store with the server's copy.
    pub async fn update_post(&self, item_id: &ItemId, draft: PostDraft) -> Result<FeedItem, FeedError> {
        draft.validate(self.max_body_chars)?;
        let item = self.api.update(item_id, &draft).await.map_err(|err| {
            warn!(%item_id, error = %err, "post update failed");
            err
        })?;
        self.store.apply_remote_update(item_id, &ItemPatch::from(&item));
        info!(%item_id, "post updated");
        Ok(item)
    }

    /// Post a comment and bump the item's comment count.
    pub async fn add_comment(&self, item_id: &ItemId, body: &str) -> Result<Comment, FeedError> {
        if body.trim().is_empty() {
            return Err(FeedError::Validation("comment body is empty".into()));
        }
        let comment = self.api.add_comment(item_id, body).await?;
        if self.adjust_comment_count(item_id, 1).is_err() {
            debug!(%item_id, "commented item not in this feed");
        }
        Ok(comment)
    }

    /// Delete a comment and decrement the item's comment count.
    pub async fn remove_comment(&self, item_id: &ItemId, comment_id: &str) -> Result<(), FeedError> {
        self.api.remove_comment(item_id, comment_id).await?;
        if self.adjust_comment_count(item_id, -1).is_err() {
            debug!(%item_id, "commented item not in this feed");
        }
        Ok(())
    }
}
