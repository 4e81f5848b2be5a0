// Data models — the log entries that flow from the database to the topic
// aggregator and the terminal renderer.
//
// These live apart from the database queries so the aggregator and tests can
// build entries without touching rusqlite.

use serde::{Deserialize, Deserializer, Serialize};

/// Shown in place of an image while the upload is still in flight.
pub const LOADING_IMAGE_URL: &str = "https://www.google.com/images/spin-32.gif";

/// Used when the author has no profile photo of their own.
pub const PROFILE_PLACEHOLDER_IMAGE_URL: &str = "/assets/images/profile_placeholder.png";

/// A named concept extracted from a message's text, with a relevance weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Relative importance within the entry (0.0 or more)
    #[serde(default, deserialize_with = "salience_or_zero")]
    pub salience: f64,
}

impl Entity {
    pub fn new(name: impl Into<String>, salience: f64) -> Self {
        Self {
            name: name.into(),
            salience,
        }
    }
}

/// JSON has no NaN or infinity; serde_json writes them as `null`, which
/// reads back as 0.0 so the entity itself survives.
fn salience_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// One message in the append-only log. Immutable once appended, except for
/// the image URL patch that replaces an upload placeholder.
///
/// Every field has a serde default so partially populated records load as
/// entries that simply contribute nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_photo_url: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl LogEntry {
    /// A text message with no entity metadata yet.
    pub fn text(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn is_image(&self) -> bool {
        self.image_url.is_some()
    }
}

/// Primary key of a stored message.
pub type MessageKey = i64;

/// A log entry as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub key: MessageKey,
    pub entry: LogEntry,
    pub created_at: String,
}

/// A message about to be appended. Entities are attached afterwards.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub author: String,
    pub author_photo_url: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
}

/// A named concept's total salience across the current window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScore {
    pub name: String,
    pub score: f64,
}

/// The most recent slice of the log, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Window {
    entries: Vec<LogEntry>,
}

impl Window {
    /// Keep only the last `n` entries, preserving append order.
    pub fn from_recent(mut entries: Vec<LogEntry>, n: usize) -> Self {
        if entries.len() > n {
            entries.drain(..entries.len() - n);
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_most_recent() {
        let entries: Vec<LogEntry> = (0..5).map(|i| LogEntry::text("a", i.to_string())).collect();
        let window = Window::from_recent(entries, 3);
        let texts: Vec<&str> = window
            .entries()
            .iter()
            .filter_map(|e| e.text.as_deref())
            .collect();
        assert_eq!(texts, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_null_salience_reads_as_zero() {
        let json = serde_json::to_string(&[Entity::new("odd", f64::NAN)]).unwrap();
        let entities: Vec<Entity> = serde_json::from_str(&json).unwrap();
        assert_eq!(entities, vec![Entity::new("odd", 0.0)]);
    }

    #[test]
    fn test_log_entry_missing_fields_deserialize() {
        let entry: LogEntry = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(entry.text.as_deref(), Some("hi"));
        assert!(entry.author.is_empty());
        assert!(entry.entities.is_empty());
    }
}
