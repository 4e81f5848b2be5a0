// LocalMessaging — device tokens kept in a file on this machine.
//
// Permission comes from configuration (KINDLING_NOTIFICATIONS=granted).
// Granting mints a random token and persists it, so later runs reuse it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::RngCore;
use tracing::debug;

use super::traits::Messaging;

pub struct LocalMessaging {
    token_path: PathBuf,
    permission_granted: bool,
}

impl LocalMessaging {
    pub fn new(token_path: impl Into<PathBuf>, permission_granted: bool) -> Self {
        Self {
            token_path: token_path.into(),
            permission_granted,
        }
    }

    /// Returns the default token file location.
    /// Uses the platform data directory: ~/.local/share/kindling/device-token on Linux.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kindling")
            .join("device-token")
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }
}

#[async_trait]
impl Messaging for LocalMessaging {
    async fn get_token(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.token_path).await {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read {}", self.token_path.display())),
        }
    }

    async fn request_permission(&self) -> Result<()> {
        if !self.permission_granted {
            anyhow::bail!(
                "Notification permission denied. Set KINDLING_NOTIFICATIONS=granted to allow it."
            );
        }
        if self.get_token().await?.is_some() {
            return Ok(());
        }

        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        tokio::fs::write(&self.token_path, &token)
            .await
            .with_context(|| format!("Failed to write {}", self.token_path.display()))?;
        debug!(path = %self.token_path.display(), "Minted device token");
        Ok(())
    }
}
