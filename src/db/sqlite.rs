// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::queries;
use super::traits::Database;
use crate::auth::UserInfo;
use crate::chat::models::{Entity, MessageKey, NewMessage, StoredMessage};

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<MessageKey> {
        let conn = self.conn.lock().await;
        queries::insert_message(&conn, message)
    }

    async fn set_image_url(&self, key: MessageKey, image_url: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::set_image_url(&conn, key, image_url)
    }

    async fn set_entities(&self, key: MessageKey, entities: &[Entity]) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::set_entities(&conn, key, entities)
    }

    async fn recent_messages(&self, limit: u32) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().await;
        queries::recent_messages(&conn, limit)
    }

    async fn unannotated_messages(&self, limit: u32) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().await;
        queries::unannotated_messages(&conn, limit)
    }

    async fn message_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::message_count(&conn)
    }

    async fn save_session(&self, user: &UserInfo) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::save_session(&conn, user)
    }

    async fn get_session(&self) -> Result<Option<UserInfo>> {
        let conn = self.conn.lock().await;
        queries::get_session(&conn)
    }

    async fn clear_session(&self) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::clear_session(&conn)
    }

    async fn save_device_token(&self, token: &str, uid: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::save_device_token(&conn, token, uid)
    }

    async fn device_token_count(&self, uid: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::device_token_count(&conn, uid)
    }
}
