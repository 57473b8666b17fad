//! Storage abstraction trait
//!
//! This module defines the Storage trait that attachment storage backends implement.

use async_trait::async_trait;
use attach_core::AttachError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for AttachError {
    fn from(err: StorageError) -> Self {
        AttachError::Storage(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// **Key format:** see [`crate::keys`]. A single upload occupies the key
/// `{usage_id}`; a multi-file upload occupies `{usage_id}/1`..`{usage_id}/N`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `storage_key` and return its public URL
    async fn put(&self, storage_key: &str, content_type: &str, data: Vec<u8>)
        -> StorageResult<String>;

    /// Read an object
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a single object. Missing objects are not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Delete the object at `storage_key` and every object grouped under it.
    ///
    /// Returns the number of objects removed.
    async fn delete_tree(&self, storage_key: &str) -> StorageResult<usize>;

    /// Whether an object, or a group of objects, exists at `storage_key`
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
