//! Named blob storage.
//!
//! Blobs live in a single container and are addressed by a flat name.
//! [`LocalBlobStorage`] keeps the container in a directory on disk;
//! [`MemoryBlobStorage`] is for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;

/// Longest accepted blob name
pub const MAX_BLOB_NAME_LENGTH: usize = 255;

/// Blob storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob name: {0}")]
    InvalidName(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for blob storage backends
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `name`, replacing any existing blob
    async fn upload(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// # Errors
    ///
    /// * `StorageError::NotFound` - No blob under this name
    async fn download(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// # Errors
    ///
    /// * `StorageError::NotFound` - No blob under this name
    async fn delete(&self, name: &str) -> StorageResult<()>;

    async fn exists(&self, name: &str) -> StorageResult<bool>;
}

/// Reject names that could escape the container
pub fn validate_blob_name(name: &str) -> StorageResult<()> {
    let invalid = name.is_empty()
        || name.len() > MAX_BLOB_NAME_LENGTH
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Blob container backed by a local directory
pub struct LocalBlobStorage {
    container: PathBuf,
}

impl LocalBlobStorage {
    /// `container` is created on first upload if it does not exist
    pub fn new(container: impl Into<PathBuf>) -> Self {
        Self {
            container: container.into(),
        }
    }

    fn blob_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_blob_name(name)?;
        Ok(self.container.join(name))
    }
}

fn not_found_as(name: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.blob_path(name)?;
        tokio::fs::create_dir_all(&self.container).await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn download(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.blob_path(name)?;
        tokio::fs::read(path).await.map_err(not_found_as(name))
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.blob_path(name)?;
        tokio::fs::remove_file(path).await.map_err(not_found_as(name))
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.blob_path(name)?;
        Ok(tokio::fs::try_exists(path).await?)
    }
}

/// Blob container held in memory
#[derive(Default)]
pub struct MemoryBlobStorage {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_blob_name(name)?;
        self.blobs
            .write()
            .await
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn download(&self, name: &str) -> StorageResult<Vec<u8>> {
        validate_blob_name(name)?;
        self.blobs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        validate_blob_name(name)?;
        self.blobs
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        validate_blob_name(name)?;
        Ok(self.blobs.read().await.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_names() {
        assert!(validate_blob_name("results-2024.pdf").is_ok());
        assert!(validate_blob_name("").is_err());
        assert!(validate_blob_name("..").is_err());
        assert!(validate_blob_name("../etc/passwd").is_err());
        assert!(validate_blob_name("a\\b").is_err());
        assert!(validate_blob_name(&"a".repeat(256)).is_err());
    }

    #[tokio::test]
    async fn test_local_storage_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path().join("container"));

        assert!(!storage.exists("repartition.csv").await.unwrap());
        storage.upload("repartition.csv", b"room,seat").await.unwrap();
        assert!(storage.exists("repartition.csv").await.unwrap());
        assert_eq!(storage.download("repartition.csv").await.unwrap(), b"room,seat");

        storage.upload("repartition.csv", b"replaced").await.unwrap();
        assert_eq!(storage.download("repartition.csv").await.unwrap(), b"replaced");

        storage.delete("repartition.csv").await.unwrap();
        assert!(matches!(
            storage.download("repartition.csv").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.delete("repartition.csv").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        assert!(matches!(
            storage.upload("../escape", b"x").await,
            Err(StorageError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_storage_lifecycle() {
        let storage = MemoryBlobStorage::new();
        storage.upload("a.txt", b"hello").await.unwrap();
        assert!(storage.exists("a.txt").await.unwrap());
        assert_eq!(storage.download("a.txt").await.unwrap(), b"hello");
        storage.delete("a.txt").await.unwrap();
        assert!(!storage.exists("a.txt").await.unwrap());
    }
}
