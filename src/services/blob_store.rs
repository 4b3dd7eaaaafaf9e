use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Creates or overwrites `name`.
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Fails when new blobs could not be written right now.
    async fn check_writable(&self) -> Result<()> {
        Ok(())
    }
}

/// Stores blobs as plain files directly under `root`.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.root.join(name);
        // Write beside the target and rename so readers never see a half-written file
        let staging = self
            .root
            .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&staging, data).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e).with_context(|| format!("Failed to write {}", staging.display()));
        }

        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e).with_context(|| format!("Failed to move blob into {}", path.display()));
        }

        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn check_writable(&self) -> Result<()> {
        let marker = self
            .root
            .join(format!(".health.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&marker, b"")
            .await
            .with_context(|| format!("{} is not writable", self.root.display()))?;
        tokio::fs::remove_file(&marker)
            .await
            .with_context(|| format!("Failed to remove {}", marker.display()))
    }
}
