//! Bookworm CLI
//!
//! Terminal front end for the book client: search the catalog, manage
//! favorites and recent searches, and schedule reading reminders.

use std::path::PathBuf;
use std::sync::Arc;

use bookworm::{
    AppContext,
    error::{AppError, Result},
    models::{Book, Config},
    query::{DataSource, QueryStatus},
    services::NotificationOutcome,
    storage::{KeyValueStore, LocalStorage, MemoryStorage},
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

/// Bookworm - Open Library book discovery
#[derive(Parser, Debug)]
#[command(name = "bookworm", version, about = "Book discovery client for Open Library")]
struct Cli {
    /// Path to storage directory holding config.toml and saved state
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep state in memory only; nothing is written to disk
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the catalog and remember the query
    Search { query: String },

    /// Show a work with its authors
    Details { work_id: String },

    /// List trending books
    Trending,

    /// List classic books
    Classics,

    /// List popular books on a subject
    Subject { subject: String },

    /// Show an author and their books
    Author {
        author_id: String,

        /// Maximum number of works to list
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Manage recent searches
    Recent {
        #[command(subcommand)]
        action: RecentAction,
    },

    /// Manage the daily reading reminder
    Reminder {
        #[command(subcommand)]
        action: ReminderAction,
    },

    /// Manage notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },

    /// Switch between light and dark theme
    Theme,

    /// Validate the configuration file
    Validate,

    /// Show storage and state info
    Info,
}

#[derive(Subcommand, Debug)]
enum FavoritesAction {
    List,
    /// Add a work by id (e.g. OL45804W)
    Add { work_id: String },
    /// Remove a favorite by catalog key or work id
    Remove { key: String },
    Toggle { work_id: String },
}

#[derive(Subcommand, Debug)]
enum RecentAction {
    List,
    Clear,
}

#[derive(Subcommand, Debug)]
enum ReminderAction {
    /// Schedule the daily reminder, replacing any active one
    Enable {
        /// Interval in seconds (default from config)
        #[arg(long)]
        interval: Option<u64>,
    },
    Disable,
    Status,
    /// Schedule the weekly reading goal reminder
    Goal,
}

#[derive(Subcommand, Debug)]
enum NotificationsAction {
    On,
    /// Turn notifications off and cancel everything scheduled
    Off,
    /// List scheduled notifications
    List,
    /// Forget tracked ids that are no longer scheduled
    Reconcile,
    /// Request permission and obtain a push token
    Init,
    /// Send a recommendation for a work now
    Recommend { work_id: String },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancel queries when the user presses Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling...");
            on_interrupt.cancel();
        }
    });
    token
}

/// Unwrap a query result, logging why there is none.
fn loaded<T>(status: QueryStatus<T>) -> Option<Arc<T>> {
    match status {
        QueryStatus::Idle => {
            log::warn!("Nothing to fetch for this input");
            None
        }
        QueryStatus::Cancelled => {
            log::warn!("Cancelled");
            None
        }
        QueryStatus::Success(result) => {
            if result.source == DataSource::Stale {
                log::debug!("Showing cached data from {}", result.updated_at);
            }
            Some(result.data)
        }
    }
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("No books found.");
        return;
    }
    for book in books {
        println!("{}", book.format("{title} ({year}) - {authors}  [{key}]"));
    }
}

fn report(outcome: &NotificationOutcome) {
    match outcome {
        NotificationOutcome::Scheduled(id) => log::info!("Scheduled notification {}", id),
        NotificationOutcome::Declined(reason) => {
            log::warn!("Notification not sent: {:?}", reason)
        }
    }
}

async fn favorite_book(ctx: &AppContext, work_id: &str, cancel: &CancellationToken) -> Result<Option<Book>> {
    let details = ctx.queries.book_details(work_id, cancel).await?;
    Ok(loaded(details).map(|details| details.book.clone()))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let config = if config_path.exists() {
        Config::load_or_default(&config_path)
    } else {
        Config::default()
    };
    init_logging(cli.verbose, &config.logging.level);

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        if !config_path.exists() {
            return Err(AppError::config(format!(
                "{} not found",
                config_path.display()
            )));
        }
        let config = Config::load(&config_path)?;
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!("✓ Config OK ({})", config_path.display());
        return Ok(());
    }

    let storage: Arc<dyn KeyValueStore> = if cli.ephemeral {
        log::info!("Using in-memory storage");
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(LocalStorage::new(&cli.storage_dir))
    };

    let ctx = AppContext::open(config, storage).await?;
    let cancel = cancel_on_interrupt();

    match cli.command {
        Command::Search { query } => {
            if let Some(response) = loaded(ctx.search(&query, &cancel).await?) {
                log::info!("{} results for '{}'", response.num_found, query.trim());
                print_books(&response.docs);
            }
        }

        Command::Details { work_id } => {
            if let Some(result) = loaded(ctx.queries.book_with_authors(&work_id, &cancel).await?) {
                let book = &result.book;
                println!("{}", book.book.title);
                if let Some(year) = book.book.first_publish_year {
                    println!("First published: {year}");
                }
                for author in &result.authors {
                    println!("By {}", author.name);
                }
                if result.is_partial() {
                    log::warn!("Could not load authors: {}", result.missing_authors.join(", "));
                }
                if let Some(description) = book.description_text() {
                    println!("\n{description}");
                }
                if let Some(subjects) = &book.subjects {
                    println!("\nSubjects: {}", subjects.join(", "));
                }
                let favorite = ctx.library.is_favorite(&book.book.key);
                println!("\nFavorite: {}", if favorite { "yes" } else { "no" });
            }
        }

        Command::Trending => {
            if let Some(response) = loaded(ctx.queries.trending(&cancel).await?) {
                print_books(&response.docs);
            }
        }

        Command::Classics => {
            if let Some(response) = loaded(ctx.queries.classics(&cancel).await?) {
                print_books(&response.docs);
            }
        }

        Command::Subject { subject } => {
            if let Some(response) = loaded(ctx.queries.subject_books(&subject, &cancel).await?) {
                print_books(&response.docs);
            }
        }

        Command::Author { author_id, limit } => {
            let (author, books) = match limit {
                Some(limit) => tokio::join!(
                    ctx.queries.author_details(&author_id, &cancel),
                    ctx.queries.author_books_limited(&author_id, limit, &cancel)
                ),
                None => tokio::join!(
                    ctx.queries.author_details(&author_id, &cancel),
                    ctx.queries.author_books(&author_id, &cancel)
                ),
            };
            if let Some(author) = loaded(author?) {
                println!("{}", author.name);
                match (&author.birth_date, &author.death_date) {
                    (Some(born), Some(died)) => println!("{born} - {died}"),
                    (Some(born), None) => println!("Born {born}"),
                    _ => {}
                }
                if let Some(bio) = author.bio_text() {
                    println!("\n{bio}\n");
                }
            }
            if let Some(books) = loaded(books?) {
                print_books(&books);
            }
        }

        Command::Favorites { action } => match action {
            FavoritesAction::List => print_books(&ctx.library.favorites()),
            FavoritesAction::Add { work_id } => {
                if let Some(book) = favorite_book(&ctx, &work_id, &cancel).await? {
                    let title = book.title.clone();
                    if ctx.favorites.add(book).await? {
                        log::info!("Added '{}' to favorites", title);
                    } else {
                        log::info!("'{}' is already a favorite", title);
                    }
                }
            }
            FavoritesAction::Remove { key } => {
                let key = if key.starts_with('/') {
                    key
                } else {
                    format!("/works/{key}")
                };
                if ctx.favorites.remove(&key).await? {
                    log::info!("Removed {} from favorites", key);
                } else {
                    log::info!("{} was not a favorite", key);
                }
            }
            FavoritesAction::Toggle { work_id } => {
                if let Some(book) = favorite_book(&ctx, &work_id, &cancel).await? {
                    let title = book.title.clone();
                    let toggled = ctx.favorites.toggle(book).await?;
                    log::info!("'{}': {:?}", title, toggled);
                }
            }
        },

        Command::Recent { action } => match action {
            RecentAction::List => {
                let searches = ctx.library.recent_searches();
                if searches.is_empty() {
                    println!("No recent searches.");
                }
                for query in searches {
                    println!("{query}");
                }
            }
            RecentAction::Clear => {
                ctx.library.clear_recent_searches().await?;
                log::info!("Recent searches cleared");
            }
        },

        Command::Reminder { action } => match action {
            ReminderAction::Enable { interval } => {
                let interval = interval.unwrap_or(ctx.config.notifications.daily_reminder_secs);
                report(&ctx.notifications.schedule_recurring(interval).await?);
            }
            ReminderAction::Disable => match ctx.preferences.daily_reminder().notification_id {
                Some(id) => {
                    ctx.notifications.cancel(&id).await?;
                    log::info!("Daily reminder disabled");
                }
                None => log::info!("No daily reminder is active"),
            },
            ReminderAction::Status => {
                let reminder = ctx.preferences.daily_reminder();
                println!(
                    "Daily reminder: {} (every {}s)",
                    if reminder.enabled { "on" } else { "off" },
                    reminder.interval_secs
                );
                if let Some(id) = reminder.notification_id {
                    println!("Notification id: {id}");
                }
            }
            ReminderAction::Goal => {
                report(&ctx.notifications.schedule_goal_reminder().await?);
            }
        },

        Command::Notifications { action } => match action {
            NotificationsAction::On => {
                ctx.notifications.set_notifications_enabled(true).await?;
                log::info!("Notifications enabled");
            }
            NotificationsAction::Off => {
                ctx.notifications.set_notifications_enabled(false).await?;
                log::info!("Notifications disabled");
            }
            NotificationsAction::List => {
                let scheduled = ctx.notifications.scheduled().await?;
                if scheduled.is_empty() {
                    println!("Nothing scheduled.");
                }
                for notification in scheduled {
                    println!(
                        "{}  {}  {:?}",
                        notification.id, notification.content.title, notification.trigger
                    );
                }
            }
            NotificationsAction::Reconcile => {
                let dropped = ctx.notifications.reconcile().await?;
                log::info!("Dropped {} stale id(s)", dropped);
            }
            NotificationsAction::Init => match ctx.notifications.initialize().await? {
                Some(token) => println!("{token}"),
                None => log::warn!("No push token available"),
            },
            NotificationsAction::Recommend { work_id } => {
                if let Some(book) = favorite_book(&ctx, &work_id, &cancel).await? {
                    report(&ctx.notifications.send_book_recommendation(&book).await?);
                }
            }
        },

        Command::Theme => {
            let theme = ctx.preferences.toggle_theme().await?;
            log::info!("Theme set to {:?}", theme);
        }

        // Handled before the context is opened
        Command::Validate => {}

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!(
                "Config: {}",
                if config_path.exists() {
                    "found"
                } else {
                    "not found, using defaults"
                }
            );
            let usage = ctx.storage.usage().await?;
            log::info!("Stored documents: {} ({} bytes)", usage.keys.len(), usage.used_bytes);
            log::info!("Favorites: {}", ctx.library.favorites().len());
            log::info!("Recent searches: {}", ctx.library.recent_searches().len());
            let preferences = ctx.preferences.snapshot();
            log::info!(
                "Theme: {:?}, notifications: {}",
                preferences.theme,
                if preferences.notifications_enabled { "on" } else { "off" }
            );
            log::info!("Tracked notifications: {}", ctx.notifications.tracked().await?.len());
        }
    }

    Ok(())
}
