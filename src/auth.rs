// Sessions — who is signed in, and the guard that write paths call first.
//
// A session is a singleton row in the database. `login` mints a random uid
// the first time a display name signs in on this machine; the uid then
// namespaces that user's uploads and device tokens.

use anyhow::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chat::models::PROFILE_PLACEHOLDER_IMAGE_URL;
use crate::db::Database;

/// The signed-in user's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub uid: String,
    pub display_name: String,
    pub photo_url: Option<String>,
}

/// Sign in as `display_name`, replacing any existing session.
///
/// Signing in again under the same name keeps the existing uid.
pub async fn login(
    db: &dyn Database,
    display_name: &str,
    photo_url: Option<String>,
) -> Result<UserInfo> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        anyhow::bail!("A display name is required to sign in");
    }

    let uid = match db.get_session().await? {
        Some(existing) if existing.display_name == display_name => existing.uid,
        _ => new_uid(),
    };

    let user = UserInfo {
        uid,
        display_name: display_name.to_string(),
        photo_url,
    };
    db.save_session(&user).await?;
    info!(uid = %user.uid, name = %user.display_name, "Signed in");
    Ok(user)
}

/// Sign out. Returns whether anyone was signed in.
pub async fn logout(db: &dyn Database) -> Result<bool> {
    let was_signed_in = db.clear_session().await?;
    if was_signed_in {
        info!("Signed out");
    }
    Ok(was_signed_in)
}

pub async fn current_user(db: &dyn Database) -> Result<Option<UserInfo>> {
    db.get_session().await
}

/// Fail with a sign-in prompt unless someone is signed in.
pub fn require_signed_in(user: Option<&UserInfo>) -> Result<&UserInfo> {
    match user {
        Some(user) => Ok(user),
        None => anyhow::bail!("You must sign-in first. Run `kindling login --name <name>`."),
    }
}

/// The user's photo, or the placeholder image when they have none.
pub fn profile_picture(user: Option<&UserInfo>) -> &str {
    user.and_then(|u| u.photo_url.as_deref())
        .unwrap_or(PROFILE_PLACEHOLDER_IMAGE_URL)
}

fn new_uid() -> String {
    let mut bytes = [0u8; 14];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
