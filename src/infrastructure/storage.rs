use crate::services::blob_store::LocalBlobStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(root: &Path) -> anyhow::Result<Arc<LocalBlobStore>> {
    info!("🗂️  Image storage: {}", root.display());

    tokio::fs::create_dir_all(root).await?;

    Ok(Arc::new(LocalBlobStore::new(root)))
}
