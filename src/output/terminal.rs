// Colored terminal output for the message list and the hot-topics line.
//
// main.rs delegates all chat display here.

use chrono::NaiveDateTime;
use colored::Colorize;

use crate::chat::models::{StoredMessage, LOADING_IMAGE_URL};
use crate::topics::aggregator::AggregationResult;

/// Display the message window, oldest first.
pub fn display_messages(messages: &[StoredMessage]) {
    if messages.is_empty() {
        println!("No messages yet. Say something with `kindling say \"hello\"`.");
        return;
    }

    for message in messages {
        display_message(message);
    }
}

/// Display a single message line.
pub fn display_message(message: &StoredMessage) {
    let entry = &message.entry;
    let body = match (&entry.text, &entry.image_url) {
        (Some(text), _) => super::truncate_chars(text, 200).normal(),
        (None, Some(url)) if url == LOADING_IMAGE_URL => "[uploading image...]".dimmed(),
        (None, Some(url)) => format!("[image] {url}").cyan(),
        (None, None) => "(empty)".dimmed(),
    };

    println!(
        "  {} {:<20} {}",
        short_time(&message.created_at).dimmed(),
        entry.author.bold(),
        body
    );
}

/// Display the hot-topics line. A blank line means no topics to show.
pub fn display_topics(line: &str) {
    if line.is_empty() {
        println!("{}", "Hot topics: none yet".dimmed());
    } else {
        println!("{} {}", "Hot topics:".bold(), line.bright_yellow());
    }
}

/// Display the ranked topics as a bar chart, scaled to the top score.
pub fn display_ranked_topics(result: &AggregationResult, window_len: usize) {
    println!(
        "\n{}",
        format!("=== Hot Topics (last {window_len} messages) ===").bold()
    );
    println!();

    if !result.has_entities {
        println!("  No topic data in the current window.");
        println!(
            "  {}",
            "Run `kindling annotate` to extract entities from older messages.".dimmed()
        );
        return;
    }

    let bar_width: usize = 20;
    let top = result
        .ranked_topics
        .first()
        .map(|t| t.score)
        .filter(|s| *s > 0.0)
        .unwrap_or(1.0);

    for (i, topic) in result.ranked_topics.iter().enumerate() {
        let share = (topic.score / top).clamp(0.0, 1.0);
        let filled = (share * bar_width as f64).round() as usize;
        let empty = bar_width.saturating_sub(filled);
        let bar = format!("[{}{}]", "=".repeat(filled), " ".repeat(empty));

        let colored_bar = if share >= 0.66 {
            bar.bright_green()
        } else if share >= 0.33 {
            bar.bright_yellow()
        } else {
            bar.bright_blue()
        };

        println!(
            "  {:>2}. {:<30} {} {:.2}",
            i + 1,
            topic.name.bold(),
            colored_bar,
            topic.score
        );
    }
}

/// "HH:MM" from SQLite's datetime('now') format, or the raw value if it
/// doesn't parse.
fn short_time(created_at: &str) -> String {
    NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}
