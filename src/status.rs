// System status display — database stats, who is signed in, device
// registration, and the current hot topics.

use anyhow::Result;
use std::path::Path;

use crate::chat::log::MessageLog;
use crate::output::render_topic_line;
use crate::topics::aggregator::WindowedTopicAggregator;

/// Display system status to the terminal.
pub async fn show(log: &MessageLog, db_display_path: &str) -> Result<()> {
    let db = log.database();

    if Path::new(db_display_path).exists() {
        let file_size = std::fs::metadata(db_display_path)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        println!("Database: {} ({})", db_display_path, file_size);
    }

    println!("Messages: {}", db.message_count().await?);

    let session = db.get_session().await?;
    match &session {
        Some(user) => {
            let devices = db.device_token_count(&user.uid).await?;
            println!("Signed in as: {} ({})", user.display_name, user.uid);
            println!("Registered devices: {}", devices);
        }
        None => {
            println!("Signed in as: nobody");
            println!("  Run `kindling login --name <name>` to sign in");
        }
    }

    let window = log.current();
    let aggregator = WindowedTopicAggregator::new(log.window_size());
    let result = aggregator.on_window_changed(window.entries());
    println!(
        "Window: {} of {} most recent messages",
        window.len(),
        log.window_size()
    );
    if session.is_none() {
        println!("Hot topics: hidden (sign in to see them)");
    } else if result.has_entities {
        println!("Hot topics: {}", render_topic_line(&result));
    } else {
        println!("Hot topics: none (no annotated messages in the window)");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
