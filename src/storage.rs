use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// Uploaded files (profile pictures, announcement attachments) live behind this
/// trait so tests can substitute an in-memory store.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete_object(&self, key: &str) -> Result<()>;
}

/// Disk-backed store rooted at the configured upload directory. Keys are
/// slash-separated relative paths such as `profile/<uuid>-avatar.png`.
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = sanitize_key(key)?;
        Ok(self.root.join(relative))
    }
}

/// Rejects empty, absolute and parent-traversing keys before they touch the
/// filesystem.
pub fn sanitize_key(key: &str) -> Result<PathBuf> {
    if key.is_empty() {
        bail!("storage key must not be empty");
    }
    let path = Path::new(key);
    if path.is_absolute() {
        bail!("storage key must be relative");
    }
    for component in path.components() {
        match component {
            std::path::Component::Normal(_) => {}
            _ => bail!("storage key must not contain '.' or '..' components"),
        }
    }
    Ok(path.to_path_buf())
}

#[async_trait]
impl ObjectStorage for DiskStorage {
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(bytes)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to delete {}", path.display())),
        }
    }
}
