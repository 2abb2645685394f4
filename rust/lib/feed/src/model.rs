//! Canonical feed types. Everything past the fetcher boundary uses these
//! shapes only; see [`crate::wire`] for the backend payload variants.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeedError;

// ── ItemId ──────────────────────────────────────────────────────────

/// Backend-assigned item identifier.
///
/// Backends send either integers or strings; both normalize to the
/// decimal/string form held here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

// ── FeedItem ────────────────────────────────────────────────────────

/// A single post as rendered in a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: ItemId,
    pub author_id: String,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: u32,
    pub liked_by_current_user: bool,
    pub comment_count: u32,
}

// ── FeedPage ────────────────────────────────────────────────────────

/// Aggregate counts some backends attach to a page. Informational only;
/// pagination never depends on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<u64>,
}

/// One fetch result, already normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    /// Items in server order (newest-first).
    pub items: Vec<FeedItem>,
    /// Total items available server-side for this query, if reported.
    pub total_count: Option<u64>,
    pub stats: FeedStats,
}

impl FeedPage {
    pub fn new(items: Vec<FeedItem>, total_count: Option<u64>) -> Self {
        Self {
            items,
            total_count,
            stats: FeedStats::default(),
        }
    }
}

// ── PaginationCursor ────────────────────────────────────────────────

/// Pagination bookkeeping for one feed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCursor {
    /// Last page successfully merged. 0 until the first page lands.
    pub current_page: u32,
    /// Last known server-side total. `None` when the backend omits it.
    pub total_count: Option<u64>,
    pub has_more: bool,
    pub in_flight: bool,
    /// Raw length of the last fetched page; the server owns page size.
    pub last_page_len: usize,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            current_page: 0,
            total_count: None,
            has_more: true,
            in_flight: false,
            last_page_len: 0,
        }
    }
}

// ── ItemPatch ───────────────────────────────────────────────────────

/// In-place field replacement for an existing item.
///
/// `id` and `created_at` are immutable and therefore absent. Double
/// `Option` fields distinguish "leave alone" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub author_name: Option<String>,
    pub author_avatar: Option<Option<String>>,
    pub body: Option<String>,
    pub media_ref: Option<Option<String>>,
    pub like_count: Option<u32>,
    pub liked_by_current_user: Option<bool>,
    pub comment_count: Option<u32>,
}

impl ItemPatch {
    /// Patch touching only the like fields.
    pub fn likes(like_count: u32, liked_by_current_user: bool) -> Self {
        Self {
            like_count: Some(like_count),
            liked_by_current_user: Some(liked_by_current_user),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to `item`. Returns true if any field actually changed.
    pub fn apply_to(&self, item: &mut FeedItem) -> bool {
        let before = item.clone();
        if let Some(ref v) = self.author_name {
            item.author_name = v.clone();
        }
        if let Some(ref v) = self.author_avatar {
            item.author_avatar = v.clone();
        }
        if let Some(ref v) = self.body {
            item.body = v.clone();
        }
        if let Some(ref v) = self.media_ref {
            item.media_ref = v.clone();
        }
        if let Some(v) = self.like_count {
            item.like_count = v;
        }
        if let Some(v) = self.liked_by_current_user {
            item.liked_by_current_user = v;
        }
        if let Some(v) = self.comment_count {
            item.comment_count = v;
        }
        *item != before
    }
}

/// Full patch of every mutable field, taken from a server-canonical item.
impl From<&FeedItem> for ItemPatch {
    fn from(item: &FeedItem) -> Self {
        Self {
            author_name: Some(item.author_name.clone()),
            author_avatar: Some(item.author_avatar.clone()),
            body: Some(item.body.clone()),
            media_ref: Some(item.media_ref.clone()),
            like_count: Some(item.like_count),
            liked_by_current_user: Some(item.liked_by_current_user),
            comment_count: Some(item.comment_count),
        }
    }
}

// ── PostDraft ───────────────────────────────────────────────────────

/// Locally drafted post content for create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
}

impl PostDraft {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            media_ref: None,
        }
    }

    pub fn with_media(mut self, media_ref: impl Into<String>) -> Self {
        self.media_ref = Some(media_ref.into());
        self
    }

    /// Reject drafts with neither text nor media, or with an over-long body.
    pub fn validate(&self, max_body_chars: Option<usize>) -> Result<(), FeedError> {
        let has_media = self.media_ref.as_deref().is_some_and(|m| !m.trim().is_empty());
        if self.body.trim().is_empty() && !has_media {
            return Err(FeedError::Validation(
                "post needs a body or attached media".into(),
            ));
        }
        if let Some(max) = max_body_chars {
            let len = self.body.chars().count();
            if len > max {
                return Err(FeedError::Validation(format!(
                    "post body is {} characters, limit is {}",
                    len, max
                )));
            }
        }
        Ok(())
    }
}

// ── Comment ─────────────────────────────────────────────────────────

/// A comment as returned by the comment endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub item_id: ItemId,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// ── FeedScope ───────────────────────────────────────────────────────

/// Which feed a store/fetcher is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedScope {
    /// The global/home feed.
    #[default]
    Global,
    /// One user's posts (profile screen).
    User(String),
}

impl FeedScope {
    /// Collection path relative to the API base URL.
    pub fn collection_path(&self) -> String {
        match self {
            FeedScope::Global => "items".to_string(),
            FeedScope::User(id) => format!("users/{}/items", id),
        }
    }
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedScope::Global => f.write_str("global"),
            FeedScope::User(id) => write!(f, "user:{}", id),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// Item `id` with deterministic fields; higher ids are newer.
    pub fn item(id: &str) -> FeedItem {
        let n: i64 = id.bytes().map(|b| b as i64).sum();
        FeedItem {
            id: ItemId::new(id),
            author_id: "u1".into(),
            author_name: "Alice".into(),
            author_avatar: None,
            body: format!("post {}", id),
            media_ref: None,
            created_at: Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap(),
            like_count: 0,
            liked_by_current_user: false,
            comment_count: 0,
        }
    }

    pub fn items(ids: &[&str]) -> Vec<FeedItem> {
        ids.iter().map(|id| item(id)).collect()
    }
}
