// Push-device registration — get a messaging token for this device and
// record which user it belongs to.
//
// Delivery itself happens elsewhere. This module only sequences the
// handshake: fetch token → (if none) ask permission → fetch once more.

pub mod local;
pub mod traits;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::auth::UserInfo;
use crate::db::Database;
use self::traits::Messaging;

/// Outcome of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The token is stored against the user
    Registered { token: String },
    /// Permission was requested but no token is available yet
    PermissionPending,
}

/// Register this device for notifications to `user`.
pub async fn register_device(
    messaging: &dyn Messaging,
    db: &dyn Database,
    user: &UserInfo,
) -> Result<Registration> {
    if let Some(token) = fetch_token(messaging).await? {
        return save(db, user, token).await;
    }

    info!("Requesting notifications permission...");
    messaging
        .request_permission()
        .await
        .context("Unable to get permission to notify")?;

    match fetch_token(messaging).await? {
        Some(token) => save(db, user, token).await,
        None => {
            warn!("Permission granted but no messaging token available yet");
            Ok(Registration::PermissionPending)
        }
    }
}

async fn fetch_token(messaging: &dyn Messaging) -> Result<Option<String>> {
    messaging
        .get_token()
        .await
        .context("Unable to get messaging token")
}

async fn save(db: &dyn Database, user: &UserInfo, token: String) -> Result<Registration> {
    db.save_device_token(&token, &user.uid).await?;
    info!(uid = %user.uid, "Registered device for notifications");
    Ok(Registration::Registered { token })
}
