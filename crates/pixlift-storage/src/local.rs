use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
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
    /// * `base_path` - Root directory for artifacts (e.g., "uploads")
    /// * `base_url` - Public prefix for artifact URLs (e.g., "/uploads")
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

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation.
    ///
    /// Keys are single path components: separators and `..` are rejected so a key can
    /// never resolve outside the storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('/')
            || storage_key.contains('\\')
            || storage_key.contains('\0')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(storage_key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();
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

        let url = self.public_url(storage_key);

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(url)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            "Local storage download successful"
        );

        Ok(Bytes::from(data))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixlift_core::AppError;
    use tempfile::TempDir;

    async fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(dir.path().join("uploads"), "/uploads".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_download_delete() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        let url = storage
            .upload_with_key("removed_a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "/uploads/removed_a.png");
        assert!(storage.base_path().join("removed_a.png").exists());
        assert_eq!(
            storage.download("removed_a.png").await.unwrap(),
            Bytes::from_static(b"png")
        );

        storage.delete("removed_a.png").await.unwrap();
        assert!(!storage.base_path().join("removed_a.png").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        assert!(storage.delete("never_written.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_download_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let err = storage.download("missing.png").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(matches!(AppError::from(err), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        for key in ["../secret", "/etc/passwd", "nested/file.png", "..", ""] {
            let err = storage.download(key).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "key {key:?}");
        }

        let err = storage
            .upload_with_key("../escape.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_public_url_trims_trailing_slash() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:3000/uploads/".to_string())
            .await
            .unwrap();
        assert_eq!(
            storage.public_url("removed_b.png"),
            "http://localhost:3000/uploads/removed_b.png"
        );
    }
}
