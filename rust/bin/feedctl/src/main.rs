//! `feedctl`: command-line client for the feed engine.
//!
//! Manages contexts and drives a `FeedStore` / `MutationCoordinator`
//! against the current context's backend.

mod commands;
mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use commands::context::ContextUpdate;

/// Feed CLI tool.
#[derive(Parser, Debug)]
#[command(name = "feedctl", about = "Feed client: browse, post, like")]
struct Cli {
    /// Path to client config file (default: ~/.openerp/feed.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts.
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// List the feed, or one user's posts.
    Feed {
        /// Show this user's posts instead of the home feed.
        #[arg(long)]
        user: Option<String>,
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Load the feed, then poll for new posts.
    Refresh {
        #[arg(long)]
        user: Option<String>,
        /// Seconds between polls.
        #[arg(long, default_value_t = 10)]
        interval: u64,
        /// Number of polls.
        #[arg(long, default_value_t = 1)]
        times: u32,
    },

    /// Toggle your like on a post.
    Like { id: String },

    /// Publish a post.
    Post {
        #[arg(long, default_value = "")]
        body: String,
        /// Attached media reference.
        #[arg(long)]
        media: Option<String>,
    },

    /// Edit a post.
    Edit {
        id: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        media: Option<String>,
    },

    /// Delete a post.
    Delete {
        id: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Comment on a post, or remove a comment with --remove.
    Comment {
        id: String,
        #[arg(long, required_unless_present = "remove")]
        body: Option<String>,
        /// Comment id to delete.
        #[arg(long, conflicts_with = "body")]
        remove: Option<String>,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create or update a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Switch the current context.
    Use { name: String },
    /// List all contexts.
    List,
    /// Delete a context.
    Delete { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json = cli.json;

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Set {
                name,
                server,
                token,
                user_id,
                timeout_ms,
            } => {
                let update = ContextUpdate {
                    server,
                    token,
                    user_id,
                    timeout_ms,
                };
                commands::context::set(&name, update, &config_path)?;
            }
            ContextAction::Use { name } => commands::context::use_context(&name, &config_path)?,
            ContextAction::List => commands::context::list(&config_path)?,
            ContextAction::Delete { name } => commands::context::delete(&name, &config_path)?,
        },

        Commands::Feed { user, pages } => {
            commands::feed::show(user, pages, json, &config_path).await?;
        }

        Commands::Refresh {
            user,
            interval,
            times,
        } => {
            commands::feed::follow(user, Duration::from_secs(interval), times, json, &config_path)
                .await?;
        }

        Commands::Like { id } => commands::post::like(&id, &config_path).await?,

        Commands::Post { body, media } => {
            commands::post::create(body, media, json, &config_path).await?;
        }

        Commands::Edit { id, body, media } => {
            commands::post::edit(&id, body, media, json, &config_path).await?;
        }

        Commands::Delete { id, yes } => {
            if !yes {
                eprint!("Delete post {}? [y/N]: ", id);
                let mut s = String::new();
                std::io::stdin().read_line(&mut s)?;
                if !s.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            commands::post::delete(&id, &config_path).await?;
        }

        Commands::Comment { id, body, remove } => match (body, remove) {
            (_, Some(comment_id)) => {
                commands::post::uncomment(&id, &comment_id, &config_path).await?;
            }
            (Some(body), None) => commands::post::comment(&id, &body, &config_path).await?,
            (None, None) => anyhow::bail!("--body or --remove is required"),
        },

        Commands::Version => {
            println!("feedctl v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
