//! Client-side context management.
//!
//! Reads/writes `~/.openerp/feed.toml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use openerp_feed::{FeedConfig, FeedScope, NoAuth, StaticToken, TokenSource};
use serde::{Deserialize, Serialize};

/// A single context: one feed backend plus the identity used against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Context name (e.g. "staging").
    pub name: String,

    /// API base URL (e.g. "http://localhost:8080/api").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Current user id, required for likes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,

    /// Request timeout override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Context {
    /// Library config for this context, paging through `scope`.
    pub fn feed_config(&self, scope: FeedScope) -> anyhow::Result<FeedConfig> {
        if self.server.is_empty() {
            anyhow::bail!(
                "No server URL set for context \"{}\". Run `feedctl context set {} --server <url>`.",
                self.name,
                self.name
            );
        }
        let mut config = FeedConfig {
            base_url: self.server.clone(),
            scope,
            ..Default::default()
        };
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        Ok(config)
    }

    pub fn token_source(&self) -> Arc<dyn TokenSource> {
        if self.token.is_empty() {
            Arc::new(NoAuth)
        } else {
            Arc::new(StaticToken::new(self.token.clone()))
        }
    }
}

/// Client configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the currently active context.
    #[serde(rename = "current-context", default)]
    pub current_context: String,

    /// List of configured contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,
}

impl ClientConfig {
    /// Default config file path: ~/.openerp/feed.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("feed.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the currently active context, if any.
    pub fn current(&self) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == self.current_context)
    }

    /// The active context, or an error telling the user how to pick one.
    pub fn require_current(&self) -> anyhow::Result<&Context> {
        self.current()
            .ok_or_else(|| anyhow::anyhow!("No current context. Run `feedctl context use <name>`."))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Get a context by name, creating an empty one if missing.
    pub fn entry(&mut self, name: &str) -> &mut Context {
        if let Some(i) = self.contexts.iter().position(|c| c.name == name) {
            return &mut self.contexts[i];
        }
        self.contexts.push(Context {
            name: name.to_string(),
            ..Default::default()
        });
        let last = self.contexts.len() - 1;
        &mut self.contexts[last]
    }

    /// Remove a context by name. Returns true if it was found.
    pub fn remove_context(&mut self, name: &str) -> bool {
        let len = self.contexts.len();
        self.contexts.retain(|c| c.name != name);
        if self.current_context == name {
            self.current_context = String::new();
        }
        self.contexts.len() < len
    }
}

/// Return the OpenERP config directory (~/.openerp).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".openerp")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClientConfig {
        ClientConfig {
            current_context: "dev".to_string(),
            contexts: vec![Context {
                name: "dev".to_string(),
                server: "http://localhost:8080".to_string(),
                token: "jwt".to_string(),
                user_id: "u1".to_string(),
                timeout_ms: Some(2_000),
            }],
        }
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert!(config.current_context.is_empty());
        assert!(config.contexts.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feed.toml");

        sample().save(&path).unwrap();
        let back = ClientConfig::load(&path).unwrap();

        assert_eq!(back.current_context, "dev");
        assert_eq!(back.contexts, sample().contexts);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("current-context = \"dev\""));
    }

    #[test]
    fn test_empty_fields_omitted() {
        let mut config = ClientConfig::default();
        config.entry("bare");
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("token"));
        assert!(!toml_str.contains("timeout_ms"));
    }

    #[test]
    fn test_entry_and_remove() {
        let mut config = sample();
        config.entry("dev").token = "new".into();
        config.entry("prod").server = "https://feed.example".into();
        assert_eq!(config.contexts.len(), 2);
        assert_eq!(config.current().unwrap().token, "new");

        assert!(config.remove_context("dev"));
        assert!(config.current_context.is_empty());
        assert!(config.require_current().is_err());
        assert!(!config.remove_context("dev"));
    }

    #[test]
    fn test_feed_config_from_context() {
        let ctx = sample().contexts.remove(0);
        let fc = ctx.feed_config(FeedScope::User("u9".into())).unwrap();
        assert_eq!(fc.base_url, "http://localhost:8080");
        assert_eq!(fc.timeout_ms, 2_000);
        assert_eq!(fc.scope, FeedScope::User("u9".into()));

        let empty = Context {
            name: "x".into(),
            ..Default::default()
        };
        assert!(empty.feed_config(FeedScope::Global).is_err());
    }
}
