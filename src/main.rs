use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use kindling::chat::log::MessageLog;
use kindling::config::Config;
use kindling::output::TopicBoard;
use kindling::topics::aggregator::WindowedTopicAggregator;

/// Kindling: a chat log with a live hot-topics summary.
///
/// Messages are annotated with entities as they're written, and the most
/// recent window is ranked into the topics everyone is talking about.
#[derive(Parser)]
#[command(name = "kindling", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Sign in under a display name
    Login {
        /// Name shown next to your messages
        #[arg(long)]
        name: String,

        /// Profile photo URL
        #[arg(long)]
        photo: Option<String>,
    },

    /// Sign out
    Logout,

    /// Send a text message
    Say {
        /// The message text
        text: String,
    },

    /// Share an image
    Image {
        /// Path to the image file
        path: PathBuf,
    },

    /// Show the ranked hot topics for the current window
    Topics,

    /// Show the most recent messages
    Tail {
        /// Keep watching for new messages
        #[arg(long)]
        follow: bool,
    },

    /// Extract entities for recent messages that have none
    Annotate {
        /// Max messages to annotate (default: 50)
        #[arg(long, default_value = "50")]
        limit: u32,
    },

    /// Register this device for push notifications
    RegisterDevice,

    /// Show system status (messages, session, hot topics)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kindling=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing Kindling database...");
            let db = kindling::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext: cargo run -- login --name <your name>");
        }

        Commands::Login { name, photo } => {
            let db = kindling::db::open_sqlite(&config.db_path)?;
            let user = kindling::auth::login(db.as_ref(), &name, photo).await?;
            println!("Signed in as {} ({})", user.display_name.bold(), user.uid);
        }

        Commands::Logout => {
            let db = kindling::db::open_sqlite(&config.db_path)?;
            if kindling::auth::logout(db.as_ref()).await? {
                println!("Signed out.");
            } else {
                println!("Nobody was signed in.");
            }
        }

        Commands::Say { text } => {
            let log = open_log(&config).await?;
            let user = kindling::auth::current_user(log.database().as_ref()).await?;
            let extractor = kindling::topics::entities::TfIdfEntityExtractor::default();

            match kindling::chat::compose::send_text(&log, user.as_ref(), &text, &extractor)
                .await?
            {
                Some(_) => show_topics_line(&log).await?,
                None => println!("Nothing to send."),
            }
        }

        Commands::Image { path } => {
            let log = open_log(&config).await?;
            let user = kindling::auth::current_user(log.database().as_ref()).await?;
            let store = kindling::chat::storage::LocalObjectStore::new(&config.storage_dir);

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("Uploading {}...", path.display()));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let result =
                kindling::chat::compose::send_image(&log, user.as_ref(), &store, &path).await;
            spinner.finish_and_clear();

            let key = result?;
            println!("Image shared (message {key}).");
        }

        Commands::Topics => {
            let log = open_log(&config).await?;
            let user = kindling::auth::current_user(log.database().as_ref()).await?;
            if user.is_none() {
                println!("Sign in to see hot topics: kindling login --name <name>");
                return Ok(());
            }
            let aggregator = WindowedTopicAggregator::new(config.window_size);
            let window = log.current();
            let result = aggregator.on_window_changed(window.entries());
            kindling::output::terminal::display_ranked_topics(&result, window.len());
        }

        Commands::Tail { follow } => {
            let log = open_log(&config).await?;
            if follow {
                follow_log(&log, config.poll_interval).await?;
            } else {
                let messages = log.recent_messages().await?;
                kindling::output::terminal::display_messages(&messages);
                println!();
                show_topics_line(&log).await?;
            }
        }

        Commands::Annotate { limit } => {
            let log = open_log(&config).await?;
            let extractor = kindling::topics::entities::TfIdfEntityExtractor::default();
            let annotated =
                kindling::chat::compose::annotate_backlog(&log, &extractor, limit).await?;
            println!("Annotated {annotated} messages.");
            show_topics_line(&log).await?;
        }

        Commands::RegisterDevice => {
            let db = kindling::db::open_sqlite(&config.db_path)?;
            let user = kindling::auth::current_user(db.as_ref()).await?;
            let user = kindling::auth::require_signed_in(user.as_ref())?;
            let messaging = kindling::push::local::LocalMessaging::new(
                &config.token_path,
                config.notifications_granted,
            );

            match kindling::push::register_device(&messaging, db.as_ref(), user).await? {
                kindling::push::Registration::Registered { token } => {
                    println!(
                        "Device registered for notifications ({}).",
                        kindling::output::truncate_chars(&token, 12).dimmed()
                    );
                }
                kindling::push::Registration::PermissionPending => {
                    println!("Permission requested; no device token yet. Try again shortly.");
                }
            }
        }

        Commands::Status => {
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `kindling init` to set up the database.");
                return Ok(());
            }
            let log = open_log(&config).await?;
            kindling::status::show(&log, &config.db_path).await?;
        }
    }

    Ok(())
}

/// Open the database and load the current message window.
async fn open_log(config: &Config) -> Result<MessageLog> {
    let db = kindling::db::open_sqlite(&config.db_path)?;
    MessageLog::open(db, config.window_size).await
}

/// Print the hot-topics line for the log's current window. Blank when
/// nobody is signed in.
async fn show_topics_line(log: &MessageLog) -> Result<()> {
    let user = kindling::auth::current_user(log.database().as_ref()).await?;
    let aggregator = WindowedTopicAggregator::new(log.window_size());
    let mut board = TopicBoard::default();
    board.apply_for(
        user.as_ref(),
        &aggregator.on_window_changed(log.current().entries()),
    );
    kindling::output::terminal::display_topics(board.line());
    Ok(())
}

/// Stream new messages and topic changes until Ctrl-C.
async fn follow_log(log: &MessageLog, poll_interval: Duration) -> Result<()> {
    let aggregator = WindowedTopicAggregator::new(log.window_size());
    let mut board = TopicBoard::default();
    let mut rx = log.subscribe();

    let messages = log.recent_messages().await?;
    kindling::output::terminal::display_messages(&messages);
    let mut last_key = messages.last().map(|m| m.key).unwrap_or(0);

    let user = kindling::auth::current_user(log.database().as_ref()).await?;
    let initial = aggregator.on_window_changed(rx.borrow_and_update().entries());
    board.apply_for(user.as_ref(), &initial);
    kindling::output::terminal::display_topics(board.line());

    println!("{}", "Watching for new messages (Ctrl-C to stop)...".dimmed());

    let poller = log.follow(poll_interval);
    tokio::pin!(poller);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = &mut poller => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let window = rx.borrow_and_update().clone();

                let messages = log.recent_messages().await?;
                for message in messages.iter().filter(|m| m.key > last_key) {
                    kindling::output::terminal::display_message(message);
                }
                if let Some(last) = messages.last() {
                    last_key = last_key.max(last.key);
                }

                let user = kindling::auth::current_user(log.database().as_ref()).await?;
                let result = aggregator.on_window_changed(window.entries());
                if board.apply_for(user.as_ref(), &result) {
                    kindling::output::terminal::display_topics(board.line());
                }
            }
        }
    }

    Ok(())
}
