// Database trait — backend-agnostic async interface for all DB operations.
//
// All methods are async so the synchronous rusqlite backend (behind a tokio
// Mutex) can be shared with the subscription and compose tasks.

use anyhow::Result;
use async_trait::async_trait;

use crate::auth::UserInfo;
use crate::chat::models::{Entity, MessageKey, NewMessage, StoredMessage};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Messages ---

    /// Append a message and return its key.
    async fn insert_message(&self, message: &NewMessage) -> Result<MessageKey>;

    /// Replace a message's image URL.
    async fn set_image_url(&self, key: MessageKey, image_url: &str) -> Result<()>;

    /// Attach entity metadata to a message.
    async fn set_entities(&self, key: MessageKey, entities: &[Entity]) -> Result<()>;

    /// The `limit` most recent messages, oldest first.
    async fn recent_messages(&self, limit: u32) -> Result<Vec<StoredMessage>>;

    /// Recent text messages without entity metadata, oldest first.
    async fn unannotated_messages(&self, limit: u32) -> Result<Vec<StoredMessage>>;

    /// Total number of messages.
    async fn message_count(&self) -> Result<i64>;

    // --- Session ---

    async fn save_session(&self, user: &UserInfo) -> Result<()>;

    async fn get_session(&self) -> Result<Option<UserInfo>>;

    /// Returns whether anyone was signed in.
    async fn clear_session(&self) -> Result<bool>;

    // --- Device tokens ---

    async fn save_device_token(&self, token: &str, uid: &str) -> Result<()>;

    async fn device_token_count(&self, uid: &str) -> Result<i64>;
}
