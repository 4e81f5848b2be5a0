// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::warn;

use crate::auth::UserInfo;
use crate::chat::models::{Entity, LogEntry, MessageKey, NewMessage, StoredMessage};

// --- Messages ---

/// Append a message to the log and return its key.
pub fn insert_message(conn: &Connection, message: &NewMessage) -> Result<MessageKey> {
    conn.execute(
        "INSERT INTO messages (author, author_photo_url, text, image_url)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            message.author,
            message.author_photo_url,
            message.text,
            message.image_url,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Replace a message's image URL (used to swap out the upload placeholder).
pub fn set_image_url(conn: &Connection, key: MessageKey, image_url: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE messages SET image_url = ?1 WHERE id = ?2",
        params![image_url, key],
    )?;
    if updated == 0 {
        anyhow::bail!("Message {key} not found");
    }
    Ok(())
}

/// Attach entity metadata to a message (stored as a JSON array).
///
/// NaN, infinite, and negative saliences are stored as 0.0.
pub fn set_entities(conn: &Connection, key: MessageKey, entities: &[Entity]) -> Result<()> {
    let sanitized: Vec<Entity> = entities
        .iter()
        .map(|e| {
            let salience = if e.salience.is_finite() {
                e.salience.max(0.0)
            } else {
                0.0
            };
            Entity::new(e.name.clone(), salience)
        })
        .collect();
    let json = serde_json::to_string(&sanitized)?;
    let updated = conn.execute(
        "UPDATE messages SET entities = ?1 WHERE id = ?2",
        params![json, key],
    )?;
    if updated == 0 {
        anyhow::bail!("Message {key} not found");
    }
    Ok(())
}

/// The `limit` most recent messages, oldest first.
pub fn recent_messages(conn: &Connection, limit: u32) -> Result<Vec<StoredMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, author, author_photo_url, text, image_url, entities, created_at
         FROM (SELECT * FROM messages ORDER BY id DESC LIMIT ?1)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![limit], row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

/// Recent text messages that have never been annotated, oldest first.
pub fn unannotated_messages(conn: &Connection, limit: u32) -> Result<Vec<StoredMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, author, author_photo_url, text, image_url, entities, created_at
         FROM (SELECT * FROM messages
               WHERE text IS NOT NULL AND entities IS NULL
               ORDER BY id DESC LIMIT ?1)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![limit], row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

/// Total number of messages in the log.
pub fn message_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
    Ok(count)
}

/// Map a messages row into a StoredMessage.
///
/// Unparseable entity JSON is logged and treated as "no entities" — bad
/// metadata on one message shouldn't hide the rest of the log.
fn row_to_message(row: &Row) -> rusqlite::Result<StoredMessage> {
    let key: MessageKey = row.get(0)?;
    let entities_json: Option<String> = row.get(5)?;
    let entities = match entities_json {
        Some(json) => serde_json::from_str::<Vec<Entity>>(&json).unwrap_or_else(|e| {
            warn!(message = key, error = %e, "Ignoring malformed entity metadata");
            Vec::new()
        }),
        None => Vec::new(),
    };

    Ok(StoredMessage {
        key,
        entry: LogEntry {
            author: row.get(1)?,
            author_photo_url: row.get(2)?,
            text: row.get(3)?,
            image_url: row.get(4)?,
            entities,
        },
        created_at: row.get(6)?,
    })
}

// --- Session ---

/// Store the signed-in user (singleton — always id=1).
pub fn save_session(conn: &Connection, user: &UserInfo) -> Result<()> {
    conn.execute(
        "INSERT INTO session (id, uid, display_name, photo_url, signed_in_at)
         VALUES (1, ?1, ?2, ?3, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
            uid = ?1,
            display_name = ?2,
            photo_url = ?3,
            signed_in_at = datetime('now')",
        params![user.uid, user.display_name, user.photo_url],
    )?;
    Ok(())
}

/// Load the signed-in user, if any.
pub fn get_session(conn: &Connection) -> Result<Option<UserInfo>> {
    let mut stmt = conn.prepare("SELECT uid, display_name, photo_url FROM session WHERE id = 1")?;
    let result = stmt
        .query_row([], |row| {
            Ok(UserInfo {
                uid: row.get(0)?,
                display_name: row.get(1)?,
                photo_url: row.get(2)?,
            })
        })
        .optional()?;
    Ok(result)
}

/// Sign out. Returns whether anyone was signed in.
pub fn clear_session(conn: &Connection) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM session WHERE id = 1", [])?;
    Ok(deleted > 0)
}

// --- Device tokens ---

/// Record that `token` delivers notifications to `uid` (upsert).
pub fn save_device_token(conn: &Connection, token: &str, uid: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO device_tokens (token, uid, registered_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(token) DO UPDATE SET uid = ?2, registered_at = datetime('now')",
        params![token, uid],
    )?;
    Ok(())
}

/// How many device tokens are registered for a user.
pub fn device_token_count(conn: &Connection, uid: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM device_tokens WHERE uid = ?1",
        params![uid],
        |row| row.get(0),
    )?;
    Ok(count)
}
