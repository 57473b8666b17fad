//! Storage-backed uploader
//!
//! Moves the bytes of each queued file into a [`Storage`] backend under the
//! key derived from its destination name.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use attach_core::models::{CandidateFile, FileId, TransferReceipt, UploadRestrictions};
use attach_core::{TransportError, Uploader, UploaderFactory};

use crate::keys::generate_storage_key;
use crate::traits::Storage;

/// Where the bytes of a queued file come from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn read(&self, file: &CandidateFile) -> std::io::Result<Vec<u8>>;
}

/// Content source reading files from local paths.
#[derive(Default)]
pub struct PathSource {
    paths: RwLock<HashMap<FileId, PathBuf>>,
}

impl PathSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: FileId, path: impl Into<PathBuf>) {
        // the map stays consistent even if a writer panicked
        self.paths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, path.into());
    }
}

#[async_trait]
impl ContentSource for PathSource {
    async fn read(&self, file: &CandidateFile) -> std::io::Result<Vec<u8>> {
        let path = self
            .paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&file.id)
            .cloned()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no source registered for {}", file.name),
                )
            })?;
        tokio::fs::read(path).await
    }
}

/// Uploader for one session, writing into a storage backend.
pub struct StorageUploader {
    storage: Arc<dyn Storage>,
    source: Arc<dyn ContentSource>,
    usage_id: String,
    key_prefix: Option<String>,
}

#[async_trait]
impl Uploader for StorageUploader {
    async fn transfer(
        &self,
        file: &CandidateFile,
        destination: &str,
    ) -> Result<TransferReceipt, TransportError> {
        let data = self
            .source
            .read(file)
            .await
            .map_err(|e| TransportError::new(&file.name, format!("Failed to read file: {}", e)))?;

        if data.len() as u64 != file.size_bytes {
            tracing::warn!(
                file = %file.name,
                declared = file.size_bytes,
                actual = data.len(),
                "File size changed since it was queued"
            );
        }

        let storage_key =
            generate_storage_key(self.key_prefix.as_deref(), &self.usage_id, destination);

        let url = self
            .storage
            .put(&storage_key, &file.mime_type, data)
            .await
            .map_err(|e| TransportError::new(&file.name, e.to_string()))?;

        tracing::debug!(
            usage_id = %self.usage_id,
            file = %file.name,
            storage_key = %storage_key,
            "Transfer finished"
        );

        Ok(TransferReceipt {
            destination: destination.to_string(),
            storage_key,
            url,
        })
    }
}

/// Builds a [`StorageUploader`] per session.
pub struct StorageUploaderFactory {
    storage: Arc<dyn Storage>,
    source: Arc<dyn ContentSource>,
    key_prefix: Option<String>,
}

impl StorageUploaderFactory {
    pub fn new(
        storage: Arc<dyn Storage>,
        source: Arc<dyn ContentSource>,
        key_prefix: Option<String>,
    ) -> Self {
        Self {
            storage,
            source,
            key_prefix,
        }
    }
}

impl UploaderFactory for StorageUploaderFactory {
    fn create(&self, usage_id: &str, restrictions: &UploadRestrictions) -> Box<dyn Uploader> {
        tracing::debug!(
            usage_id = %usage_id,
            max_file_count = restrictions.max_file_count,
            allowed_types = ?restrictions.allowed_types,
            "Creating storage uploader"
        );
        Box::new(StorageUploader {
            storage: self.storage.clone(),
            source: self.source.clone(),
            usage_id: usage_id.to_string(),
            key_prefix: self.key_prefix.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_path_is_read_after_lock_poisoning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        tokio::fs::write(&path, b"png").await.unwrap();

        let source = Arc::new(PathSource::new());
        let poisoner = source.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.paths.write().unwrap();
            panic!("writer panicked");
        })
        .join();
        assert!(source.paths.is_poisoned());

        let file = CandidateFile::new("scan.png", 3, "image/png");
        source.register(file.id, &path);

        assert_eq!(source.read(&file).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn unregistered_file_is_not_found() {
        let source = PathSource::new();
        let file = CandidateFile::new("missing.png", 3, "image/png");

        let err = source.read(&file).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
