// Object storage for shared images.
//
// Uploads are addressed by a slash-separated object path
// (`{uid}/{message key}/{file name}`). The local backend writes them under a
// root directory and hands back file:// URLs.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// Where uploaded images are kept.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `object_path`, replacing anything already there.
    async fn put(&self, object_path: &str, bytes: Vec<u8>) -> Result<()>;

    /// A URL that serves the object at `object_path`.
    async fn download_url(&self, object_path: &str) -> Result<String>;
}

/// Filesystem-backed object store.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the default upload directory.
    /// Uses the platform data directory: ~/.local/share/kindling/uploads/ on Linux.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kindling")
            .join("uploads")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path under the root, refusing anything that would
    /// escape it.
    fn resolve(&self, object_path: &str) -> Result<PathBuf> {
        let relative = Path::new(object_path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || object_path.is_empty() {
            anyhow::bail!("Invalid object path: {object_path}");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, object_path: &str, bytes: Vec<u8>) -> Result<()> {
        let dest = self.resolve(object_path)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let size = bytes.len();
        tokio::fs::write(&dest, bytes)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        debug!(path = %dest.display(), bytes = size, "Stored object");
        Ok(())
    }

    async fn download_url(&self, object_path: &str) -> Result<String> {
        let path = self.resolve(object_path)?;
        let absolute = tokio::fs::canonicalize(&path)
            .await
            .with_context(|| format!("Object not found: {object_path}"))?;
        Ok(format!("file://{}", absolute.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put("u1/7/cat.png", vec![1, 2, 3]).await.unwrap();
        let url = store.download_url("u1/7/cat.png").await.unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("cat.png"));
        assert_eq!(
            std::fs::read(dir.path().join("u1/7/cat.png")).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.put("../evil.png", vec![0]).await.is_err());
        assert!(store.put("/etc/evil.png", vec![0]).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_object_has_no_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.download_url("u1/1/missing.png").await.is_err());
    }
}
