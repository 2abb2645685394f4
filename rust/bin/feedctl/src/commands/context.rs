//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::ClientConfig;

/// Fields `context set` may change. `None` leaves a field alone.
#[derive(Debug, Default)]
pub struct ContextUpdate {
    pub server: Option<String>,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Create or update a context. The first context becomes current.
pub fn set(name: &str, update: ContextUpdate, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    apply(&mut config, name, update);
    config.save(client_config_path)?;
    println!("Context \"{}\" saved.", name);
    Ok(())
}

fn apply(config: &mut ClientConfig, name: &str, update: ContextUpdate) {
    let ctx = config.entry(name);
    if let Some(server) = update.server {
        ctx.server = server;
    }
    if let Some(token) = update.token {
        ctx.token = token;
    }
    if let Some(user_id) = update.user_id {
        ctx.user_id = user_id;
    }
    if update.timeout_ms.is_some() {
        ctx.timeout_ms = update.timeout_ms;
    }
    if config.current_context.is_empty() {
        config.current_context = name.to_string();
    }
}

/// List all contexts.
pub fn list(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!("Run: feedctl context set <name> --server <url>");
        return Ok(());
    }

    println!("{:2} {:16} {:40} {:12} {:6}", "", "NAME", "SERVER", "USER", "AUTH");
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { " " };
        let server = if ctx.server.is_empty() { "-" } else { &ctx.server };
        let user = if ctx.user_id.is_empty() { "-" } else { &ctx.user_id };
        let auth = if ctx.token.is_empty() { "none" } else { "token" };
        println!("{:2} {:16} {:40} {:12} {:6}", marker, ctx.name, server, user, auth);
    }

    Ok(())
}

/// Switch current context.
pub fn use_context(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    if !config.contexts.iter().any(|c| c.name == name) {
        anyhow::bail!(
            "Context \"{}\" not found. Run `feedctl context list` to see available contexts.",
            name
        );
    }

    config.current_context = name.to_string();
    config.save(client_config_path)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

/// Delete a context.
pub fn delete(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    if !config.remove_context(name) {
        anyhow::bail!("Context \"{}\" not found.", name);
    }
    config.save(client_config_path)?;
    println!("Context \"{}\" deleted.", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_creates_then_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.toml");

        set(
            "dev",
            ContextUpdate {
                server: Some("http://localhost:8080".into()),
                ..Default::default()
            },
            &path,
        )
        .unwrap();
        set(
            "dev",
            ContextUpdate {
                token: Some("jwt".into()),
                user_id: Some("u1".into()),
                ..Default::default()
            },
            &path,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        let ctx = config.require_current().unwrap();
        assert_eq!(ctx.name, "dev");
        assert_eq!(ctx.server, "http://localhost:8080");
        assert_eq!(ctx.token, "jwt");
        assert_eq!(ctx.user_id, "u1");
    }

    #[test]
    fn second_context_does_not_steal_current() {
        let mut config = ClientConfig::default();
        apply(&mut config, "a", ContextUpdate::default());
        apply(&mut config, "b", ContextUpdate::default());
        assert_eq!(config.current_context, "a");
    }

    #[test]
    fn use_unknown_context_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.toml");
        assert!(use_context("ghost", &path).is_err());

        set("real", ContextUpdate::default(), &path).unwrap();
        set("other", ContextUpdate::default(), &path).unwrap();
        use_context("other", &path).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap().current_context, "other");

        delete("other", &path).unwrap();
        assert!(ClientConfig::load(&path).unwrap().current_context.is_empty());
        assert!(delete("other", &path).is_err());
    }
}
