use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use newsdesk::config::Config;
use newsdesk::feed::build_client;
use newsdesk::notify::LogNotifier;
use newsdesk::scheduler::{self, refresh_channel};
use newsdesk::storage::{Store, StoreError};

/// Get the config directory path (~/.config/newsdesk/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("newsdesk");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "newsdesk", about = "Headless news watcher with keyword alerts")]
struct Args {
    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll all sources on a schedule (default)
    Run,
    /// Poll all sources once and exit
    Once,
    /// Manage alert keywords
    Keyword {
        #[command(subcommand)]
        action: KeywordAction,
    },
    /// Show the keyword alert history, newest first
    History {
        /// Emit JSON instead of a text listing
        #[arg(long)]
        json: bool,
    },
    /// Show unread counter, badge, and per-source cursors
    Status {
        /// Emit JSON instead of a text listing
        #[arg(long)]
        json: bool,
    },
    /// Mark all stories as seen: zero the unread counter, clear the badge
    Seen,
    /// Toggle breaking-news notifications (keyword alerts always fire)
    Notify {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    /// Show or set the display theme used by external renderers
    Theme { value: Option<String> },
    /// Open a story link in the default browser
    Open { link: String },
}

#[derive(Subcommand, Debug)]
enum KeywordAction {
    /// Add a keyword (case preserved, duplicates ignored case-insensitively)
    Add { word: String },
    /// Remove a keyword by its stored spelling
    Remove { word: String },
    /// List keywords in match order
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    // User-only access on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config = Config::load(&config_dir.join("config.toml"))
        .context("Failed to load configuration")?;

    let db_path = config_dir.join("newsdesk.db");

    // Handle --reset-db flag
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    // Open database
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let store = match Store::open(db_path_str).await {
        Ok(store) => store,
        Err(StoreError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of newsdesk appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_scheduler(store, config).await,
        Command::Once => {
            let client = build_client();
            let notifier = LogNotifier::new();
            scheduler::poll_all(&store, &client, &notifier, &config.sources).await;
            Ok(())
        }
        Command::Keyword { action } => run_keyword(store, action).await,
        Command::History { json } => run_history(store, json).await,
        Command::Status { json } => run_status(store, &config, json).await,
        Command::Seen => {
            store.mark_viewed().await.context("Failed to mark seen")?;
            println!("Unread counter reset, badge cleared.");
            Ok(())
        }
        Command::Notify { state } => {
            let enabled = state == "on";
            store
                .set_notifications_enabled(enabled)
                .await
                .context("Failed to update notifications flag")?;
            println!(
                "Breaking-news notifications {}. Keyword alerts always notify.",
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        Command::Theme { value } => {
            match value {
                Some(theme) => {
                    store.set_theme(&theme).await.context("Failed to set theme")?;
                    println!("Theme set to {}", theme);
                }
                None => {
                    let theme = store.theme().await.context("Failed to read theme")?;
                    println!("{}", theme.as_deref().unwrap_or("(default)"));
                }
            }
            Ok(())
        }
        Command::Open { link } => run_open(&link),
    }
}

/// Run the polling scheduler until interrupted. SIGUSR1 requests an
/// out-of-band pass, the way a frontend "refresh" button would.
async fn run_scheduler(store: Store, config: Config) -> Result<()> {
    let client = build_client();
    let notifier = LogNotifier::new();
    let period = Duration::from_secs(config.poll_interval_minutes.max(1) * 60);
    let (handle, refresh_rx) = refresh_channel();

    #[cfg(unix)]
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            let mut usr1 = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::user_defined1(),
            ) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGUSR1 handler");
                    return;
                }
            };
            while usr1.recv().await.is_some() {
                tracing::info!("Manual refresh requested (SIGUSR1)");
                if handle.refresh().await.is_err() {
                    break;
                }
            }
        });
    }

    tracing::info!(
        sources = config.sources.len(),
        interval_minutes = config.poll_interval_minutes,
        "Starting scheduler"
    );
    scheduler::run(store, client, notifier, config.sources, period, refresh_rx).await;
    Ok(())
}

async fn run_keyword(store: Store, action: KeywordAction) -> Result<()> {
    match action {
        KeywordAction::Add { word } => {
            if store.add_keyword(&word).await.context("Failed to add keyword")? {
                println!("Added keyword: {}", word.trim());
            } else {
                println!("Keyword already present (or blank): {}", word.trim());
            }
        }
        KeywordAction::Remove { word } => {
            if store
                .remove_keyword(&word)
                .await
                .context("Failed to remove keyword")?
            {
                println!("Removed keyword: {}", word);
            } else {
                println!("No such keyword: {}", word);
            }
        }
        KeywordAction::List => {
            let keywords = store.keywords().await.context("Failed to list keywords")?;
            if keywords.is_empty() {
                println!("No keywords configured.");
            } else {
                for word in keywords {
                    println!("{}", word);
                }
            }
        }
    }
    Ok(())
}

async fn run_history(store: Store, json: bool) -> Result<()> {
    let history = store
        .alert_history()
        .await
        .context("Failed to read alert history")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&history).context("Failed to serialize history")?
        );
        return Ok(());
    }

    if history.is_empty() {
        println!("No keyword alerts recorded.");
        return Ok(());
    }
    for entry in history {
        let when = entry
            .published
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "----".to_string());
        println!("[{}] ({}) {}", when, entry.keyword, entry.title);
        println!("    {}", entry.link);
    }
    Ok(())
}

async fn run_status(store: Store, config: &Config, json: bool) -> Result<()> {
    #[derive(serde::Serialize)]
    struct SourceStatus {
        name: String,
        url: String,
        cursor: Option<String>,
        cached_stories: usize,
    }

    #[derive(serde::Serialize)]
    struct Status {
        unread: i64,
        badge: String,
        notifications_enabled: bool,
        theme: Option<String>,
        keywords: Vec<String>,
        sources: Vec<SourceStatus>,
    }

    let mut sources = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        sources.push(SourceStatus {
            name: source.name.clone(),
            url: source.url.clone(),
            cursor: store.cursor(&source.name).await?,
            cached_stories: store.cached_stories(&source.name).await?.len(),
        });
    }

    let status = Status {
        unread: store.unread_count().await?,
        badge: store.badge_text().await?,
        notifications_enabled: store.notifications_enabled().await?,
        theme: store.theme().await?,
        keywords: store.keywords().await?,
        sources,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?
        );
        return Ok(());
    }

    let badge = if status.badge.is_empty() {
        "-"
    } else {
        status.badge.as_str()
    };
    println!("Unread: {} (badge: {})", status.unread, badge);
    println!(
        "Notifications: {}",
        if status.notifications_enabled { "on" } else { "off" }
    );
    println!("Keywords: {}", status.keywords.join(", "));
    for source in &status.sources {
        println!(
            "  {} — {} cached, cursor {}",
            source.name,
            source.cached_stories,
            source.cursor.as_deref().unwrap_or("(none)")
        );
    }
    Ok(())
}

/// Open a story link; "#" marks an unresolvable link and is rejected.
fn run_open(link: &str) -> Result<()> {
    if link == "#" {
        anyhow::bail!("This story has no resolvable link");
    }
    let parsed = url::Url::parse(link).context("Invalid URL")?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("Refusing to open non-http(s) URL: {}", link);
    }
    open::that(link).with_context(|| format!("Failed to open {}", link))?;
    Ok(())
}
