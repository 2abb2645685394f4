pub mod context;
pub mod feed;
pub mod post;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use openerp_feed::{FeedItem, FeedScope, FeedStore, HttpFeedClient, PaginationCursor};

use crate::config::{ClientConfig, Context};

/// Backend handle for the current context.
pub struct Session {
    pub ctx: Context,
    pub client: Arc<HttpFeedClient>,
    pub max_body_chars: Option<usize>,
}

impl Session {
    pub fn open(client_config_path: &Path, scope: FeedScope) -> Result<Self> {
        let config = ClientConfig::load(client_config_path)?;
        let ctx = config.require_current()?.clone();
        let feed_config = ctx.feed_config(scope)?;
        let client = HttpFeedClient::from_config(&feed_config, ctx.token_source())?;
        Ok(Self {
            ctx,
            client: Arc::new(client),
            max_body_chars: feed_config.max_body_chars,
        })
    }

    pub fn store(&self) -> Arc<FeedStore> {
        Arc::new(FeedStore::new(self.client.clone()))
    }
}

/// Print items as a table or a JSON document.
pub fn print_items(items: &[FeedItem], cursor: Option<&PaginationCursor>, json: bool) -> Result<()> {
    if json {
        let doc = serde_json::json!({ "items": items, "cursor": cursor });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No posts.");
    } else {
        println!(
            "{:12} {:16} {:>6} {:>5} {:20} {}",
            "ID", "AUTHOR", "LIKES", "CMTS", "CREATED", "BODY"
        );
        for item in items {
            let liked = if item.liked_by_current_user { "*" } else { "" };
            println!(
                "{:12} {:16} {:>6} {:>5} {:20} {}",
                item.id.as_str(),
                truncate(&item.author_name, 16),
                format!("{}{}", liked, item.like_count),
                item.comment_count,
                item.created_at.format("%Y-%m-%d %H:%M").to_string(),
                truncate(&item.body.replace('\n', " "), 60),
            );
        }
    }
    if let Some(c) = cursor {
        let total = c
            .total_count
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".into());
        println!(
            "\n{} shown, page {}, total {}{}",
            items.len(),
            c.current_page,
            total,
            if c.has_more { ", more available" } else { "" }
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }
}
