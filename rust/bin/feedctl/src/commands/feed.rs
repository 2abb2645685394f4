//! Read commands: `feedctl feed`, `feedctl refresh`.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use openerp_feed::{FeedChange, FeedScope, LoadOutcome};
use tracing::debug;

use super::{print_items, Session};

pub fn scope_for(user: Option<String>) -> FeedScope {
    match user {
        Some(id) => FeedScope::User(id),
        None => FeedScope::Global,
    }
}

/// Load up to `pages` pages and print them.
pub async fn show(user: Option<String>, pages: u32, json: bool, client_config_path: &Path) -> Result<()> {
    let session = Session::open(client_config_path, scope_for(user))?;
    let store = session.store();

    store.load_initial().await?;
    for _ in 1..pages.max(1) {
        if let LoadOutcome::Skipped(reason) = store.load_more().await? {
            debug!(?reason, "stopped paging");
            break;
        }
    }

    let cursor = store.cursor();
    print_items(&store.items(), Some(&cursor), json)
}

/// Load page 1, then poll with `refresh` and print posts as they arrive.
pub async fn follow(
    user: Option<String>,
    interval: Duration,
    rounds: u32,
    json: bool,
    client_config_path: &Path,
) -> Result<()> {
    let session = Session::open(client_config_path, scope_for(user))?;
    let store = session.store();
    store.subscribe(|change| {
        if change == FeedChange::Error {
            debug!("feed reported an error");
        }
    });

    store.load_initial().await?;
    print_items(&store.items(), None, json)?;

    for round in 0..rounds {
        tokio::time::sleep(interval).await;
        match store.refresh().await {
            Ok(LoadOutcome::Applied { added }) if added > 0 => {
                let fresh = store.items();
                print_items(&fresh[..added.min(fresh.len())], None, json)?;
            }
            Ok(outcome) => debug!(round, ?outcome, "nothing new"),
            // Keep polling through transient failures.
            Err(err) if err.is_retryable() => eprintln!("refresh failed: {}", err),
            Err(err) => return Err(err.into()),
        }
    }

    store.close();
    Ok(())
}
