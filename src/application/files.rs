//! File storage port used for book cover images.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::uploads::ImageUpload;

#[derive(Debug, Error)]
#[error("file storage failed: {message}")]
pub struct FileStoreError {
    message: String,
}

impl FileStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Stores binary blobs under a namespace and hands back an opaque reference.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, namespace: &str, upload: &ImageUpload) -> Result<String, FileStoreError>;

    /// Remove a stored blob. Unknown references are not an error.
    async fn delete(&self, reference: &str) -> Result<(), FileStoreError>;
}
