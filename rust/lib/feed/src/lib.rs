//! Paginated social feed engine.
//!
//! Owns one feed query's in-memory list (newest-first), merges backend
//! pages into it without duplicates, and applies optimistic mutations that
//! are confirmed or rolled back against the server. Rendering lives on the
//! platform side; observers subscribe and re-read state on change.
//!
//! # Components
//!
//! - [`PageFetcher`]: fetches one page of a feed. [`HttpFeedClient`] is
//!   the HTTP implementation; payload normalization lives in [`wire`].
//! - [`FeedStore`]: the ordered list, known-id set and pagination cursor
//!   for one query (`load_initial`, `load_more`, `refresh`, `apply_remote_*`).
//! - [`MutationCoordinator`]: likes, posts, deletes and comment counts,
//!   applied optimistically where safe.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use openerp_feed::{FeedConfig, FeedScope, FeedStore, HttpFeedClient, MutationCoordinator, StaticToken};
//!
//! let config = FeedConfig::default();
//! let client = Arc::new(HttpFeedClient::from_config(&config, Arc::new(StaticToken::new("jwt")))?);
//!
//! // One store per screen/query.
//! let home = Arc::new(FeedStore::new(client.clone()));
//! home.subscribe(|change| println!("feed changed: {:?}", change));
//! home.load_initial().await?;
//! home.load_more().await?;
//!
//! let mutations = MutationCoordinator::new(home.clone(), client);
//! mutations.toggle_like(&"42".into(), "me").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod mutation;
pub mod notify;
pub mod store;
pub mod wire;

pub use client::{HttpFeedClient, NoAuth, StaticToken, TokenSource};
pub use config::FeedConfig;
pub use error::FeedError;
pub use fetcher::PageFetcher;
pub use model::{
    Comment, FeedItem, FeedPage, FeedScope, FeedStats, ItemId, ItemPatch, PaginationCursor,
    PostDraft,
};
pub use mutation::{FeedApi, LikeState, MutationCoordinator};
pub use notify::{ChangeHandler, FeedChange, SubscriptionId};
pub use store::{FeedStore, LoadOutcome, SkipReason};
