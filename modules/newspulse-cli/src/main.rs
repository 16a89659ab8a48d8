//! Headless driver for the sync layer: one user intent per invocation,
//! results printed as JSON, notices drained to log lines. This is the
//! smallest possible presentation collaborator, useful against a local
//! backend and as a living example of the hub's contract.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use newspulse_common::{Category, Config, DeliveryMethod, Frequency, Preferences};
use newspulse_gateway::NewsApiClient;
use newspulse_sync::{CategoryFilter, FilterState, LoadState, Notice, PrefState, SyncHub};

#[derive(Parser)]
#[command(name = "newspulse", about = "News Pulse personalized news-alert client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the live feed, optionally narrowed to a category and query.
    Feed {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long, default_value = "")]
        query: String,
        /// Sign in to annotate each article with its bookmark flag.
        #[arg(long)]
        email: Option<String>,
    },
    /// Print the delivered-alert history.
    Alerts {
        #[arg(long)]
        email: String,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Toggle a feed bookmark and print the settled state.
    Bookmark {
        #[arg(long)]
        email: String,
        #[arg(long)]
        article_id: String,
    },
    /// Print stored preferences, or the first-time defaults.
    Prefs {
        #[arg(long)]
        email: String,
    },
    /// Create or overwrite the alert subscription.
    Subscribe {
        #[arg(long)]
        email: String,
        #[arg(long, value_delimiter = ',', required = true)]
        categories: Vec<Category>,
        #[arg(long, default_value = "immediate")]
        frequency: Frequency,
        #[arg(long, default_value = "email")]
        method: DeliveryMethod,
    },
}

fn view_filter(query: String, category: Option<Category>) -> FilterState {
    FilterState {
        query,
        category: category.map_or(CategoryFilter::All, CategoryFilter::Only),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newspulse=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!(api = %config.api_base_url, "Connecting to news backend");

    let gateway = Arc::new(NewsApiClient::from_config(&config));
    let (hub, mut notices) = SyncHub::new(gateway);

    match cli.command {
        Command::Feed {
            category,
            query,
            email,
        } => {
            if let Some(email) = email {
                hub.sign_in(&email).await?;
            }
            hub.set_feed_category(category).await?;
            let view = hub.feed_view(&view_filter(query, None));
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Alerts {
            email,
            category,
            query,
        } => {
            hub.sign_in(&email).await?;
            if hub.archive().load_state() != LoadState::Loaded {
                drain_notices(&mut notices);
                bail!("alert history could not be loaded");
            }
            let view = hub.alerts_view(&view_filter(query, category));
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Bookmark { email, article_id } => {
            hub.sign_in(&email).await?;
            let bookmarked = hub.toggle_bookmark(&article_id.as_str().into()).await?;
            info!(article_id, bookmarked, "Bookmark settled");
            println!(
                "{}",
                serde_json::json!({ "articleId": article_id, "bookmarked": bookmarked })
            );
        }
        Command::Prefs { email } => {
            hub.sign_in(&email).await?;
            match hub.preferences().state() {
                PrefState::Loaded(prefs) => {
                    println!("{}", serde_json::to_string_pretty(&prefs)?);
                }
                _ => {
                    drain_notices(&mut notices);
                    bail!("preferences could not be loaded");
                }
            }
        }
        Command::Subscribe {
            email,
            categories,
            frequency,
            method,
        } => {
            hub.sign_in(&email).await?;
            hub.save_preferences(Preferences {
                categories,
                frequency,
                delivery: method,
            })
            .await?;
            info!("Subscription saved");
        }
    }

    drain_notices(&mut notices);
    Ok(())
}

fn drain_notices(notices: &mut UnboundedReceiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        match &notice {
            Notice::FeedLoadFailed { error }
            | Notice::AlertsLoadFailed { error }
            | Notice::PreferencesLoadFailed { error }
            | Notice::PreferencesSaveFailed { error } => warn!(%error, ?notice, "Notice"),
            Notice::BookmarkFailed { error, .. } => warn!(%error, ?notice, "Notice"),
            _ => info!(?notice, "Notice"),
        }
    }
}
