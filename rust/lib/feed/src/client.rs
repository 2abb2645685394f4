//! HTTP backend client.
//!
//! One [`HttpFeedClient`] serves both the paginated list endpoint (as a
//! [`PageFetcher`]) and the mutation endpoints (as a [`FeedApi`]).
//! Authentication is handled by a pluggable [`TokenSource`].
//!
//! Endpoints, relative to `base_url`:
//!
//! | Operation       | Request                                   |
//! |-----------------|-------------------------------------------|
//! | fetch page      | `GET {scope}?page=N`                      |
//! | like / unlike   | `POST` / `DELETE items/{id}/like`         |
//! | create          | `POST items`                              |
//! | update          | `PUT items/{id}`                          |
//! | delete          | `DELETE items/{id}`                       |
//! | add comment     | `POST items/{id}/comments`                |
//! | remove comment  | `DELETE items/{id}/comments/{comment_id}` |

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::fetcher::PageFetcher;
use crate::model::{Comment, FeedItem, FeedPage, FeedScope, ItemId, PostDraft};
use crate::mutation::FeedApi;
use crate::wire;

// ── TokenSource ─────────────────────────────────────────────────────

/// Pluggable bearer-token provider. Called before every request.
///
/// Returns `Ok(None)` to send the request without an Authorization header.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn token(&self) -> Result<Option<String>, FeedError>;
}

/// Anonymous requests.
pub struct NoAuth;

#[async_trait::async_trait]
impl TokenSource for NoAuth {
    async fn token(&self) -> Result<Option<String>, FeedError> {
        Ok(None)
    }
}

/// Bearer token obtained by the session layer.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>, FeedError> {
        Ok(Some(self.0.clone()))
    }
}

// ── HttpFeedClient ──────────────────────────────────────────────────

/// Feed backend over HTTP/JSON.
#[derive(Clone)]
pub struct HttpFeedClient {
    http: reqwest::Client,
    base_url: String,
    scope: FeedScope,
    token_source: Arc<dyn TokenSource>,
}

impl HttpFeedClient {
    /// Build a client with the config's base URL, scope and request timeout.
    pub fn from_config(
        config: &FeedConfig,
        token_source: Arc<dyn TokenSource>,
    ) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            scope: config.scope.clone(),
            token_source,
        })
    }

    /// Same backend and credentials, bound to another feed.
    pub fn with_scope(&self, scope: FeedScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn item_url(&self, id: &ItemId) -> String {
        self.url(&format!("items/{}", id))
    }

    /// Attach the bearer token, if any.
    async fn authed(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, FeedError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Send and return the body of a 2xx response.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Vec<u8>, FeedError> {
        let resp = self.authed(builder).await?.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn send_item(&self, builder: reqwest::RequestBuilder) -> Result<FeedItem, FeedError> {
        let body = self.send(builder).await?;
        wire::parse_item(&body)
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFeedClient {
    async fn fetch(&self, page: u32) -> Result<FeedPage, FeedError> {
        let url = self.url(&self.scope.collection_path());
        debug!(scope = %self.scope, page, "fetching feed page");
        let body = self
            .send(self.http.get(&url).query(&[("page", page)]))
            .await?;
        wire::parse_page(&body)
    }
}

#[async_trait::async_trait]
impl FeedApi for HttpFeedClient {
    async fn like(&self, item_id: &ItemId, user_id: &str) -> Result<Option<u32>, FeedError> {
        let url = format!("{}/like", self.item_url(item_id));
        let body = self
            .send(self.http.post(&url).json(&json!({ "userId": user_id })))
            .await?;
        wire::parse_like_count(&body)
    }

    async fn unlike(&self, item_id: &ItemId, user_id: &str) -> Result<Option<u32>, FeedError> {
        let url = format!("{}/like", self.item_url(item_id));
        let body = self
            .send(self.http.delete(&url).json(&json!({ "userId": user_id })))
            .await?;
        wire::parse_like_count(&body)
    }

    async fn create(&self, draft: &PostDraft) -> Result<FeedItem, FeedError> {
        self.send_item(self.http.post(self.url("items")).json(draft))
            .await
    }

    async fn update(&self, item_id: &ItemId, draft: &PostDraft) -> Result<FeedItem, FeedError> {
        self.send_item(self.http.put(self.item_url(item_id)).json(draft))
            .await
    }

    async fn delete(&self, item_id: &ItemId) -> Result<(), FeedError> {
        self.send(self.http.delete(self.item_url(item_id))).await?;
        Ok(())
    }

    async fn add_comment(&self, item_id: &ItemId, body: &str) -> Result<Comment, FeedError> {
        let url = format!("{}/comments", self.item_url(item_id));
        let resp = self
            .send(self.http.post(&url).json(&json!({ "body": body })))
            .await?;
        wire::parse_comment(&resp, item_id)
    }

    async fn remove_comment(&self, item_id: &ItemId, comment_id: &str) -> Result<(), FeedError> {
        let url = format!("{}/comments/{}", self.item_url(item_id), comment_id);
        self.send(self.http.delete(&url)).await?;
        Ok(())
    }
}
