//! Profile image ingestion: sniff, validate, normalize, hash and store.
//!
//! Every step before the blob store write is side-effect free, so a failed
//! ingest never leaves a partial file behind.

mod hasher;
mod sniffer;
mod transformer;

pub use hasher::Sha1Hasher;
pub use sniffer::InferSniffer;
pub use transformer::ImageCrateTransformer;

use crate::services::blob_store::BlobStore;
use anyhow::anyhow;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Extensions accepted for profile images, as reported by the sniffer.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedType {
    pub extension: String,
    pub mime_type: String,
}

/// Infers a file type from content signatures.
pub trait FileTypeSniffer: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> Option<DetectedType>;
}

/// Decodes, reorients, width-caps and re-encodes an image.
pub trait ImageTransformer: Send + Sync {
    fn normalize(&self, bytes: &[u8], extension: &str, max_width: u32) -> anyhow::Result<Vec<u8>>;
}

pub trait ContentHasher: Send + Sync {
    fn digest_hex(&self, bytes: &[u8]) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImageRef {
    pub file_name: String,
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No image found")]
    NoFile,

    #[error("Wrong file format")]
    UnsupportedFormat,

    #[error("Image transformation failed: {0}")]
    TransformFailed(#[source] anyhow::Error),

    #[error("Failed to store image: {0}")]
    StoreFailed(#[source] anyhow::Error),
}

impl IngestError {
    /// Whether the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::NoFile | IngestError::UnsupportedFormat)
    }
}

pub struct ImageIngestService {
    sniffer: Arc<dyn FileTypeSniffer>,
    transformer: Arc<dyn ImageTransformer>,
    hasher: Arc<dyn ContentHasher>,
    store: Arc<dyn BlobStore>,
    max_width: u32,
}

impl ImageIngestService {
    /// Service backed by `infer`, the `image` crate and SHA-1.
    pub fn new(store: Arc<dyn BlobStore>, max_width: u32) -> Self {
        Self::with_collaborators(
            Arc::new(InferSniffer),
            Arc::new(ImageCrateTransformer::default()),
            Arc::new(Sha1Hasher),
            store,
            max_width,
        )
    }

    pub fn with_collaborators(
        sniffer: Arc<dyn FileTypeSniffer>,
        transformer: Arc<dyn ImageTransformer>,
        hasher: Arc<dyn ContentHasher>,
        store: Arc<dyn BlobStore>,
        max_width: u32,
    ) -> Self {
        Self {
            sniffer,
            transformer,
            hasher,
            store,
            max_width,
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub async fn ingest(&self, upload: Option<Bytes>) -> Result<StoredImageRef, IngestError> {
        let original = upload.ok_or(IngestError::NoFile)?;

        let detected = self
            .sniffer
            .detect(&original)
            .ok_or(IngestError::UnsupportedFormat)?;
        if !ALLOWED_EXTENSIONS.contains(&detected.extension.as_str()) {
            debug!("Rejected upload sniffed as {}", detected.mime_type);
            return Err(IngestError::UnsupportedFormat);
        }

        // Decoding and resampling are CPU bound
        let transformer = self.transformer.clone();
        let extension = detected.extension.clone();
        let max_width = self.max_width;
        let normalized = tokio::task::spawn_blocking(move || {
            transformer.normalize(&original, &extension, max_width)
        })
        .await
        .map_err(|e| IngestError::TransformFailed(anyhow!("Transform task failed: {}", e)))?
        .map_err(IngestError::TransformFailed)?;

        let file_name = format!(
            "{}.{}",
            self.hasher.digest_hex(&normalized),
            detected.extension
        );

        self.store
            .write(&file_name, &normalized)
            .await
            .map_err(IngestError::StoreFailed)?;

        info!(
            "🖼️  Stored profile image {} ({} bytes)",
            file_name,
            normalized.len()
        );

        Ok(StoredImageRef { file_name })
    }
}
