use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for attachments (e.g., "/var/lib/attach")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:8000/attachments")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys with path traversal sequences that could escape the base
    /// storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Count regular files below `dir`
    async fn count_files(dir: &Path) -> StorageResult<usize> {
        let mut count = 0;
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        storage_key: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(storage_key);

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(url)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(key = %storage_key, "Local storage delete successful");
        Ok(())
    }

    async fn delete_tree(&self, storage_key: &str) -> StorageResult<usize> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let removed = if metadata.is_dir() {
            let count = Self::count_files(&path).await?;
            fs::remove_dir_all(&path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
            count
        } else {
            fs::remove_file(&path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            1
        };

        tracing::info!(
            key = %storage_key,
            removed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage tree delete successful"
        );

        Ok(removed)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://files.test/".to_string())
            .await
            .unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn put_then_get_returns_url_and_bytes() {
        let (_dir, storage) = storage().await;
        let url = storage.put("block/1", "image/png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(url, "http://files.test/block/1");
        assert_eq!(storage.get("block/1").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn delete_tree_removes_group_and_counts_objects() {
        let (_dir, storage) = storage().await;
        storage.put("block/1", "image/png", vec![1]).await.unwrap();
        storage.put("block/2", "image/png", vec![2]).await.unwrap();

        assert_eq!(storage.delete_tree("block").await.unwrap(), 2);
        assert!(!storage.exists("block").await.unwrap());
        assert_eq!(storage.delete_tree("block").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_tree_removes_single_object() {
        let (_dir, storage) = storage().await;
        storage.put("block", "image/png", vec![1]).await.unwrap();
        assert_eq!(storage.delete_tree("block").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejects_traversal_keys() {
        let (_dir, storage) = storage().await;
        assert!(matches!(
            storage.put("../escape", "text/plain", vec![]).await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.exists("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let (_dir, storage) = storage().await;
        assert!(matches!(
            storage.get("nothing").await,
            Err(StorageError::NotFound(_))
        ));
        storage.delete("nothing").await.unwrap();
    }
}
