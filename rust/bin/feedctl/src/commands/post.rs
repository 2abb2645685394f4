//! Write commands: like, post, edit, delete, comment.

use std::path::Path;

use anyhow::Result;
use openerp_feed::{FeedScope, FeedStore, ItemId, LoadOutcome, MutationCoordinator, PostDraft};

use super::{print_items, Session};

/// Pages scanned looking for an item before giving up.
const MAX_SCAN_PAGES: u32 = 20;

fn coordinator(session: &Session) -> MutationCoordinator {
    MutationCoordinator::new(session.store(), session.client.clone())
        .with_max_body_chars(session.max_body_chars)
}

fn draft(body: String, media: Option<String>) -> PostDraft {
    let draft = PostDraft::new(body);
    match media {
        Some(m) => draft.with_media(m),
        None => draft,
    }
}

/// Page through the global feed until `id` shows up.
async fn find(store: &FeedStore, id: &ItemId) -> Result<bool> {
    store.load_initial().await?;
    for _ in 0..MAX_SCAN_PAGES {
        if store.contains(id) {
            return Ok(true);
        }
        if let LoadOutcome::Skipped(_) = store.load_more().await? {
            break;
        }
    }
    Ok(store.contains(id))
}

/// Toggle the current user's like on a post.
pub async fn like(id: &str, client_config_path: &Path) -> Result<()> {
    let session = Session::open(client_config_path, FeedScope::Global)?;
    if session.ctx.user_id.is_empty() {
        anyhow::bail!(
            "No user id set for context \"{}\". Run `feedctl context set {} --user-id <id>`.",
            session.ctx.name,
            session.ctx.name
        );
    }
    let coord = coordinator(&session);
    let id = ItemId::new(id);
    if !find(coord.store(), &id).await? {
        anyhow::bail!("Post {} not found in the feed.", id);
    }

    let state = coord.toggle_like(&id, &session.ctx.user_id).await?;
    let verb = if state.liked { "Liked" } else { "Unliked" };
    println!("{} post {} ({} likes).", verb, id, state.like_count);
    Ok(())
}

pub async fn create(body: String, media: Option<String>, json: bool, client_config_path: &Path) -> Result<()> {
    let session = Session::open(client_config_path, FeedScope::Global)?;
    let item = coordinator(&session).create_post(draft(body, media)).await?;
    println!("Post created.");
    print_items(std::slice::from_ref(&item), None, json)
}

pub async fn edit(
    id: &str,
    body: String,
    media: Option<String>,
    json: bool,
    client_config_path: &Path,
) -> Result<()> {
    let session = Session::open(client_config_path, FeedScope::Global)?;
    let item = coordinator(&session)
        .update_post(&ItemId::new(id), draft(body, media))
        .await?;
    println!("Post {} updated.", id);
    print_items(std::slice::from_ref(&item), None, json)
}

pub async fn delete(id: &str, client_config_path: &Path) -> Result<()> {
    let session = Session::open(client_config_path, FeedScope::Global)?;
    coordinator(&session).delete_post(&ItemId::new(id)).await?;
    println!("Post {} deleted.", id);
    Ok(())
}

pub async fn comment(id: &str, body: &str, client_config_path: &Path) -> Result<()> {
    let session = Session::open(client_config_path, FeedScope::Global)?;
    let c = coordinator(&session).add_comment(&ItemId::new(id), body).await?;
    println!("Comment {} added to post {}.", c.id, c.item_id);
    Ok(())
}

pub async fn uncomment(id: &str, comment_id: &str, client_config_path: &Path) -> Result<()> {
    let session = Session::open(client_config_path, FeedScope::Global)?;
    coordinator(&session)
        .remove_comment(&ItemId::new(id), comment_id)
        .await?;
    println!("Comment {} removed from post {}.", comment_id, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_attaches_media_only_when_given() {
        assert_eq!(draft("hi".into(), None).media_ref, None);
        assert_eq!(
            draft("".into(), Some("img://1".into())).media_ref.as_deref(),
            Some("img://1")
        );
    }
}
