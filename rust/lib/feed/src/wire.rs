//! Backend payload normalization.
//!
//! Backends disagree on field names (`content` vs `body`, `userId` vs
//! `authorId`, flat author fields vs a nested `author`/`user` object) and
//! on id types. This module is the only place that knows about those
//! variants; it turns any of them into the canonical [`FeedItem`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::FeedError;
use crate::model::{Comment, FeedItem, FeedPage, FeedStats, ItemId};

/// Integer or string identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(i64),
    Str(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Int(n) => n.to_string(),
            WireId::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAuthor {
    #[serde(alias = "_id")]
    id: WireId,
    #[serde(default, alias = "username", alias = "displayName", alias = "display_name")]
    name: Option<String>,
    #[serde(default, alias = "avatarUrl", alias = "avatar_url", alias = "avatarRef")]
    avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    #[serde(alias = "_id")]
    id: WireId,

    #[serde(default, alias = "author_id", alias = "userId", alias = "user_id")]
    author_id: Option<WireId>,
    #[serde(default, alias = "author_name", alias = "userName", alias = "user_name", alias = "username")]
    author_name: Option<String>,
    #[serde(default, alias = "author_avatar", alias = "authorAvatarRef", alias = "avatar")]
    author_avatar: Option<String>,
    #[serde(default, alias = "user")]
    author: Option<WireAuthor>,

    #[serde(default, alias = "content", alias = "text")]
    body: Option<String>,
    #[serde(default, alias = "media_ref", alias = "media", alias = "image", alias = "imageUrl")]
    media_ref: Option<String>,

    #[serde(alias = "created_at", alias = "timestamp")]
    created_at: DateTime<Utc>,

    #[serde(default, alias = "like_count", alias = "likes", alias = "likesCount")]
    like_count: Option<u32>,
    #[serde(default, alias = "liked_by_current_user", alias = "liked", alias = "likedByMe", alias = "liked_by_me")]
    liked_by_current_user: Option<bool>,
    #[serde(default, alias = "comment_count", alias = "comments", alias = "commentsCount")]
    comment_count: Option<u32>,
}

impl WireItem {
    fn normalize(self) -> Result<FeedItem, FeedError> {
        let id = self.id.into_string();
        let (nested_id, nested_name, nested_avatar) = match self.author {
            Some(a) => (Some(a.id.into_string()), a.name, a.avatar),
            None => (None, None, None),
        };
        let author_id = self
            .author_id
            .map(WireId::into_string)
            .or(nested_id)
            .ok_or_else(|| FeedError::Decode(format!("item {}: missing author id", id)))?;
        let author_name = self
            .author_name
            .or(nested_name)
            .unwrap_or_else(|| author_id.clone());

        Ok(FeedItem {
            id: ItemId::new(id),
            author_id,
            author_name,
            author_avatar: self.author_avatar.or(nested_avatar),
            body: self.body.unwrap_or_default(),
            media_ref: self.media_ref.filter(|m| !m.is_empty()),
            created_at: self.created_at,
            like_count: self.like_count.unwrap_or(0),
            liked_by_current_user: self.liked_by_current_user.unwrap_or(false),
            comment_count: self.comment_count.unwrap_or(0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStats {
    #[serde(default, alias = "postCount", alias = "post_count")]
    posts: Option<u64>,
    #[serde(default, alias = "followerCount", alias = "follower_count")]
    followers: Option<u64>,
    #[serde(default, alias = "followingCount", alias = "following_count")]
    following: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePage {
    #[serde(alias = "data", alias = "posts")]
    items: Vec<WireItem>,
    #[serde(default, alias = "total", alias = "total_count")]
    total_count: Option<u64>,
    #[serde(default, alias = "stats")]
    meta: Option<WireStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireComment {
    #[serde(alias = "_id")]
    id: WireId,
    #[serde(default, alias = "item_id", alias = "postId", alias = "post_id")]
    item_id: Option<WireId>,
    #[serde(alias = "author_id", alias = "userId", alias = "user_id")]
    author_id: WireId,
    #[serde(alias = "content", alias = "text")]
    body: String,
    #[serde(alias = "created_at", alias = "timestamp")]
    created_at: DateTime<Utc>,
}

/// Parse one page response body.
pub fn parse_page(body: &[u8]) -> Result<FeedPage, FeedError> {
    let page: WirePage = serde_json::from_slice(body)
        .map_err(|e| FeedError::Decode(format!("page body: {}", e)))?;
    let items = page
        .items
        .into_iter()
        .map(WireItem::normalize)
        .collect::<Result<Vec<_>, _>>()?;
    let stats = page.meta.unwrap_or_default();
    Ok(FeedPage {
        items,
        total_count: page.total_count,
        stats: FeedStats {
            posts: stats.posts,
            followers: stats.followers,
            following: stats.following,
        },
    })
}

/// Parse a single-item response body (create/update endpoints).
///
/// Accepts the bare item or an `{"item": ...}` / `{"data": ...}` envelope.
pub fn parse_item(body: &[u8]) -> Result<FeedItem, FeedError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Envelope {
        Wrapped {
            #[serde(alias = "data")]
            item: WireItem,
        },
        Bare(WireItem),
    }

    let env: Envelope = serde_json::from_slice(body)
        .map_err(|e| FeedError::Decode(format!("item body: {}", e)))?;
    match env {
        Envelope::Wrapped { item } | Envelope::Bare(item) => item.normalize(),
    }
}

/// Like count from a like/unlike response body.
///
/// Backends answer with the updated item, an envelope around it, a bare
/// `{"likeCount": n}` or nothing at all. `None` means the server did not
/// report a count.
pub fn parse_like_count(body: &[u8]) -> Result<Option<u32>, FeedError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct WireLikes {
        #[serde(default, alias = "like_count", alias = "likes", alias = "likesCount")]
        like_count: Option<u32>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Envelope {
        Wrapped {
            #[serde(alias = "data")]
            item: WireLikes,
        },
        Bare(WireLikes),
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let env: Envelope = serde_json::from_slice(body)
        .map_err(|e| FeedError::Decode(format!("like body: {}", e)))?;
    match env {
        Envelope::Wrapped { item } | Envelope::Bare(item) => Ok(item.like_count),
    }
}

/// Parse a comment response body. `item_id` fills in when the backend
/// does not echo the parent id.
pub fn parse_comment(body: &[u8], item_id: &ItemId) -> Result<Comment, FeedError> {
    let c: WireComment = serde_json::from_slice(body)
        .map_err(|e| FeedError::Decode(format!("comment body: {}", e)))?;
    Ok(Comment {
        id: c.id.into_string(),
        item_id: c
            .item_id
            .map(|id| ItemId::new(id.into_string()))
            .unwrap_or_else(|| item_id.clone()),
        author_id: c.author_id.into_string(),
        body: c.body,
        created_at: c.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes(v: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn canonical_page() {
        let body = bytes(json!({
            "items": [{
                "id": "a1",
                "authorId": "u1",
                "authorName": "Alice",
                "body": "hello",
                "createdAt": "2024-05-01T10:00:00Z",
                "likeCount": 3,
                "likedByCurrentUser": true,
                "commentCount": 2
            }],
            "totalCount": 12,
            "meta": { "posts": 12, "followers": 4, "following": 9 }
        }));

        let page = parse_page(&body).unwrap();
        assert_eq!(page.total_count, Some(12));
        assert_eq!(page.stats.followers, Some(4));
        let item = &page.items[0];
        assert_eq!(item.id, ItemId::new("a1"));
        assert_eq!(item.author_name, "Alice");
        assert_eq!(item.like_count, 3);
        assert!(item.liked_by_current_user);
        assert_eq!(item.comment_count, 2);
    }

    #[test]
    fn legacy_field_names_normalize_to_same_item() {
        let body = bytes(json!({
            "data": [{
                "_id": 17,
                "user": { "_id": 5, "username": "bob", "avatarUrl": "av://5" },
                "content": "legacy",
                "image": "img://17",
                "created_at": "2024-05-01T10:00:00Z",
                "likes": 1,
                "liked": false,
                "comments": 0
            }],
            "total": 1
        }));

        let page = parse_page(&body).unwrap();
        let item = &page.items[0];
        assert_eq!(item.id, ItemId::new("17"));
        assert_eq!(item.author_id, "5");
        assert_eq!(item.author_name, "bob");
        assert_eq!(item.author_avatar.as_deref(), Some("av://5"));
        assert_eq!(item.body, "legacy");
        assert_eq!(item.media_ref.as_deref(), Some("img://17"));
        assert_eq!(page.total_count, Some(1));
    }

    #[test]
    fn missing_counts_default_to_zero() {
        let body = bytes(json!({
            "items": [{ "id": 1, "userId": 2, "createdAt": "2024-05-01T10:00:00Z" }]
        }));
        let page = parse_page(&body).unwrap();
        assert_eq!(page.total_count, None);
        let item = &page.items[0];
        assert_eq!(item.like_count, 0);
        assert_eq!(item.comment_count, 0);
        assert!(!item.liked_by_current_user);
        // Falls back to the id when no name is sent.
        assert_eq!(item.author_name, "2");
        assert_eq!(item.body, "");
    }

    #[test]
    fn missing_author_is_decode_error() {
        let body = bytes(json!({
            "items": [{ "id": 1, "createdAt": "2024-05-01T10:00:00Z" }]
        }));
        let err = parse_page(&body).unwrap_err();
        assert_eq!(err.kind(), "DECODE");
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert!(matches!(parse_page(b"<html>"), Err(FeedError::Decode(_))));
    }

    #[test]
    fn item_envelopes() {
        let bare = bytes(json!({ "id": 9, "authorId": "u", "createdAt": "2024-05-01T10:00:00Z" }));
        let wrapped = bytes(json!({ "item": { "id": 9, "authorId": "u", "createdAt": "2024-05-01T10:00:00Z" } }));
        assert_eq!(parse_item(&bare).unwrap(), parse_item(&wrapped).unwrap());
    }

    #[test]
    fn like_count_is_optional() {
        let item = bytes(json!({ "id": 9, "authorId": "u", "createdAt": "2024-05-01T10:00:00Z", "likes": 4 }));
        assert_eq!(parse_like_count(&item).unwrap(), Some(4));
        let wrapped = bytes(json!({ "data": { "likeCount": 2 } }));
        assert_eq!(parse_like_count(&wrapped).unwrap(), Some(2));

        // An ack without a count is not a count of zero.
        assert_eq!(parse_like_count(&bytes(json!({ "ok": true }))).unwrap(), None);
        assert_eq!(parse_like_count(b"").unwrap(), None);
        assert!(matches!(parse_like_count(b"<html>"), Err(FeedError::Decode(_))));
    }

    #[test]
    fn comment_without_parent_id_uses_request_item() {
        let body = bytes(json!({
            "id": 3, "userId": "u9", "text": "nice", "createdAt": "2024-05-01T10:00:00Z"
        }));
        let c = parse_comment(&body, &ItemId::new("42")).unwrap();
        assert_eq!(c.id, "3");
        assert_eq!(c.item_id, ItemId::new("42"));
        assert_eq!(c.author_id, "u9");
        assert_eq!(c.body, "nice");
    }
}
