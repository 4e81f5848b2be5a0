// Compose flows — the multi-step writes behind sending a message.
//
// Text:  append → annotate with entities.
// Image: append placeholder → upload → resolve URL → patch the placeholder.
//
// Each step publishes a fresh window, so subscribers see the loading
// placeholder before the real image arrives.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use super::log::MessageLog;
use super::models::{MessageKey, NewMessage, LOADING_IMAGE_URL};
use super::storage::ObjectStore;
use crate::auth::{profile_picture, require_signed_in, UserInfo};
use crate::topics::traits::EntityExtractor;

/// Append a text message and annotate it with entities.
///
/// Blank text is ignored (returns `None`). Annotation failures are logged
/// and leave the message without entities rather than failing the send.
pub async fn send_text(
    log: &MessageLog,
    user: Option<&UserInfo>,
    text: &str,
    extractor: &dyn EntityExtractor,
) -> Result<Option<MessageKey>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let user = require_signed_in(user)?;

    let message = NewMessage {
        author: user.display_name.clone(),
        author_photo_url: profile_picture(Some(user)).to_string(),
        text: Some(text.to_string()),
        image_url: None,
    };
    let key = log
        .append(&message)
        .await
        .context("Error writing new message to the database")?;
    info!(key, author = %user.display_name, "Saved text message");

    annotate_message(log, key, text, extractor).await;

    Ok(Some(key))
}

/// Share an image: a placeholder message first, then the upload, then the
/// real URL patched in.
///
/// If the upload fails the placeholder stays in the log.
pub async fn send_image(
    log: &MessageLog,
    user: Option<&UserInfo>,
    store: &dyn ObjectStore,
    file: &Path,
) -> Result<MessageKey> {
    if image_content_type(file).is_none() {
        anyhow::bail!("You can only share images");
    }
    let user = require_signed_in(user)?;

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Unusable file name: {}", file.display()))?;

    let placeholder = NewMessage {
        author: user.display_name.clone(),
        author_photo_url: profile_picture(Some(user)).to_string(),
        text: None,
        image_url: Some(LOADING_IMAGE_URL.to_string()),
    };
    let key = log
        .append(&placeholder)
        .await
        .context("Error writing new message to the database")?;

    let object_path = format!("{}/{}/{}", user.uid, key, file_name);
    match upload(log, store, key, file, &object_path).await {
        Ok(url) => {
            info!(key, url = %url, "Shared image");
            Ok(key)
        }
        Err(e) => {
            error!(key, error = %e, "Image upload failed, placeholder left in place");
            Err(e.context("There was an error uploading a file to storage"))
        }
    }
}

async fn upload(
    log: &MessageLog,
    store: &dyn ObjectStore,
    key: MessageKey,
    file: &Path,
    object_path: &str,
) -> Result<String> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    store.put(object_path, bytes).await?;
    let url = store.download_url(object_path).await?;
    log.set_image_url(key, &url).await?;
    Ok(url)
}

/// Back-fill entities for recent text messages that never got any.
/// Returns how many messages were annotated.
pub async fn annotate_backlog(
    log: &MessageLog,
    extractor: &dyn EntityExtractor,
    limit: u32,
) -> Result<usize> {
    let pending = log.database().unannotated_messages(limit).await?;
    let mut annotated = 0;
    for message in &pending {
        let Some(text) = message.entry.text.as_deref() else {
            continue;
        };
        if annotate_message(log, message.key, text, extractor).await {
            annotated += 1;
        }
    }
    info!(pending = pending.len(), annotated, "Annotated backlog");
    Ok(annotated)
}

/// Extract and store entities for one message. Returns whether it stuck.
async fn annotate_message(
    log: &MessageLog,
    key: MessageKey,
    text: &str,
    extractor: &dyn EntityExtractor,
) -> bool {
    let entities = match extractor.extract(text) {
        Ok(entities) => entities,
        Err(e) => {
            warn!(key, error = %e, "Entity extraction failed");
            return false;
        }
    };
    match log.set_entities(key, &entities).await {
        Ok(()) => true,
        Err(e) => {
            warn!(key, error = %e, "Failed to store entities");
            false
        }
    }
}

/// The image MIME type for a file, judged by its extension.
pub fn image_content_type(file: &Path) -> Option<&'static str> {
    let ext = file.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_content_type() {
        assert_eq!(image_content_type(Path::new("cat.PNG")), Some("image/png"));
        assert_eq!(image_content_type(Path::new("a/b.jpeg")), Some("image/jpeg"));
        assert_eq!(image_content_type(Path::new("notes.txt")), None);
        assert_eq!(image_content_type(Path::new("noext")), None);
    }
}
