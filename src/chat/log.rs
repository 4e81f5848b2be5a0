// MessageLog — the append-only log plus a live subscription to its most
// recent window.
//
// Every write re-reads the last N messages and publishes them on a watch
// channel. Subscribers always see a complete window, never a diff, and a
// slow subscriber simply skips to the latest one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::models::{Entity, LogEntry, MessageKey, NewMessage, StoredMessage, Window};
use crate::db::Database;

pub struct MessageLog {
    db: Arc<dyn Database>,
    window_size: usize,
    sender: watch::Sender<Window>,
}

impl MessageLog {
    /// Load the current window and start publishing from it.
    pub async fn open(db: Arc<dyn Database>, window_size: usize) -> Result<Self> {
        if window_size == 0 {
            anyhow::bail!("Window size must be at least 1");
        }
        let initial = load_window(db.as_ref(), window_size).await?;
        let (sender, _) = watch::channel(initial);
        Ok(Self {
            db,
            window_size,
            sender,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Receive the current window now and every replacement after it.
    pub fn subscribe(&self) -> watch::Receiver<Window> {
        self.sender.subscribe()
    }

    /// Snapshot of the window as last published.
    pub fn current(&self) -> Window {
        self.sender.borrow().clone()
    }

    /// Re-read the window and publish it if it changed.
    pub async fn refresh(&self) -> Result<bool> {
        let window = load_window(self.db.as_ref(), self.window_size).await?;
        let published = self.sender.send_if_modified(|current| {
            if *current == window {
                false
            } else {
                *current = window;
                true
            }
        });
        if published {
            debug!(entries = self.sender.borrow().len(), "Published new window");
        }
        Ok(published)
    }

    /// Append a message and publish the new window.
    pub async fn append(&self, message: &NewMessage) -> Result<MessageKey> {
        let key = self.db.insert_message(message).await?;
        self.refresh().await?;
        Ok(key)
    }

    pub async fn set_image_url(&self, key: MessageKey, image_url: &str) -> Result<()> {
        self.db.set_image_url(key, image_url).await?;
        self.refresh().await?;
        Ok(())
    }

    pub async fn set_entities(&self, key: MessageKey, entities: &[Entity]) -> Result<()> {
        self.db.set_entities(key, entities).await?;
        self.refresh().await?;
        Ok(())
    }

    /// The window with keys and timestamps, for display.
    pub async fn recent_messages(&self) -> Result<Vec<StoredMessage>> {
        self.db.recent_messages(window_limit(self.window_size)).await
    }

    /// Poll for writes made by other processes, publishing each change.
    ///
    /// Runs until the task is dropped. Read failures are logged and retried
    /// on the next tick.
    pub async fn follow(&self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Failed to refresh message window");
            }
        }
    }
}

async fn load_window(db: &dyn Database, window_size: usize) -> Result<Window> {
    let messages = db.recent_messages(window_limit(window_size)).await?;
    let entries: Vec<LogEntry> = messages.into_iter().map(|m| m.entry).collect();
    Ok(Window::from_recent(entries, window_size))
}

fn window_limit(window_size: usize) -> u32 {
    u32::try_from(window_size).unwrap_or(u32::MAX)
}
