use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::chat::storage::LocalObjectStore;
use crate::push::local::LocalMessaging;
use crate::topics::aggregator::DEFAULT_WINDOW_SIZE;

const DEFAULT_POLL_MS: u64 = 1000;

/// Polling faster than this just hammers the database.
const MIN_POLL_MS: u64 = 50;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// setting has a default, so a bare `kindling init` works out of the box.
pub struct Config {
    pub db_path: String,
    /// How many recent messages feed the hot-topics summary
    pub window_size: usize,
    /// Root directory for shared images
    pub storage_dir: PathBuf,
    /// File holding this device's push token
    pub token_path: PathBuf,
    /// Whether the user has allowed notifications on this device
    pub notifications_granted: bool,
    /// How often `tail --follow` checks for new messages
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let window_size = parse_window_size(env::var("KINDLING_WINDOW_SIZE").ok().as_deref())?;
        let poll_interval = parse_poll_interval(env::var("KINDLING_POLL_MS").ok().as_deref())?;

        Ok(Self {
            db_path: env::var("KINDLING_DB_PATH").unwrap_or_else(|_| "./kindling.db".to_string()),
            window_size,
            storage_dir: env::var("KINDLING_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| LocalObjectStore::default_root()),
            token_path: env::var("KINDLING_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| LocalMessaging::default_token_path()),
            // "granted" allows notifications; unset or anything else denies
            notifications_granted: matches!(
                env::var("KINDLING_NOTIFICATIONS").as_deref(),
                Ok("granted")
            ),
            poll_interval,
        })
    }
}

/// Parse KINDLING_WINDOW_SIZE. Unset means the default; zero is rejected.
fn parse_window_size(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_WINDOW_SIZE);
    };
    let window_size = raw
        .parse::<usize>()
        .with_context(|| format!("KINDLING_WINDOW_SIZE must be a number, got {raw:?}"))?;
    if window_size == 0 {
        anyhow::bail!("KINDLING_WINDOW_SIZE must be at least 1");
    }
    Ok(window_size)
}

/// Parse KINDLING_POLL_MS. Unset means 1000 ms; below the minimum is rejected.
fn parse_poll_interval(raw: Option<&str>) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(Duration::from_millis(DEFAULT_POLL_MS));
    };
    let poll_ms = raw
        .parse::<u64>()
        .with_context(|| format!("KINDLING_POLL_MS must be a number, got {raw:?}"))?;
    if poll_ms < MIN_POLL_MS {
        anyhow::bail!("KINDLING_POLL_MS must be at least {MIN_POLL_MS}, got {poll_ms}");
    }
    Ok(Duration::from_millis(poll_ms))
}
