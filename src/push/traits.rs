// Messaging trait — the device-side half of push notifications.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Messaging: Send + Sync {
    /// The device's current token, or `None` until permission is granted.
    async fn get_token(&self) -> Result<Option<String>>;

    /// Ask for permission to show notifications. Errors when denied.
    async fn request_permission(&self) -> Result<()>;
}
