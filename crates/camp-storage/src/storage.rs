//! Storage backends
//!
//! `LocalStorage` writes under a root directory; `MemoryStorage` keeps
//! everything in a map and is what tests and throwaway dev servers use.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use camp_core::config::StorageConfig;
use camp_core::CampError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for CampError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => CampError::not_found("Document", key),
            StorageError::InvalidKey(key) => {
                CampError::bad_request(format!("invalid document name: {key}"))
            }
            StorageError::Io(e) => CampError::Internal(format!("storage: {e}")),
        }
    }
}

/// What a backend knows about a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub size: u64,
    pub content_type: String,
    /// Lowercase hex SHA-256 of the content
    pub sha256: String,
    pub stored_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata>;

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    async fn metadata(&self, key: &str) -> StorageResult<FileMetadata>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Reject keys that are empty, absolute, contain `..` or use backslashes
pub fn validate_key(key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key.contains("..")
        || key.contains('\\')
        || key.starts_with('/')
        || key.contains('\0')
        || Path::new(key)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if invalid {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn metadata_for(key: &str, data: &[u8], stored_at: Option<DateTime<Utc>>) -> FileMetadata {
    FileMetadata {
        size: data.len() as u64,
        content_type: content_type_for(key),
        sha256: sha256_hex(data),
        stored_at,
    }
}

/// Filesystem storage rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    async fn read(&self, key: &str, path: &Path) -> StorageResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, data), fields(storage = "local", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        debug!(path = ?path, "document stored");
        Ok(metadata_for(key, &data, Some(Utc::now())))
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.path_for(key)?;
        self.read(key, &path).await.map(Bytes::from)
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, "document deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn metadata(&self, key: &str) -> StorageResult<FileMetadata> {
        let path = self.path_for(key)?;
        let data = self.read(key, &path).await?;
        let modified = fs::metadata(&path)
            .await?
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(metadata_for(key, &data, modified))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, (Bytes, FileMetadata)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
        validate_key(key)?;
        let meta = metadata_for(key, &data, Some(Utc::now()));
        self.files
            .write()
            .insert(key.to_string(), (data, meta.clone()));
        Ok(meta)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        self.files
            .read()
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.files.write().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.files.read().contains_key(key))
    }

    async fn metadata(&self, key: &str) -> StorageResult<FileMetadata> {
        validate_key(key)?;
        self.files
            .read()
            .get(key)
            .map(|(_, meta)| meta.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend for the configured storage section
pub fn storage_from_config(config: &StorageConfig) -> Arc<dyn Storage> {
    Arc::new(LocalStorage::new(&config.local_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("camphq-storage-{}-{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("contracts/1/2/abc-lease.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("contracts/../../secret").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("contracts\\1\\lease.pdf").is_err());
        assert!(validate_key("./lease.pdf").is_err());
    }

    #[test]
    fn test_content_type_and_digest() {
        assert_eq!(content_type_for("lease.pdf"), "application/pdf");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        let meta = storage
            .put("contracts/1/9/x-lease.pdf", Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(meta.size, 8);
        assert_eq!(meta.content_type, "application/pdf");

        assert!(storage.exists("contracts/1/9/x-lease.pdf").await.unwrap());
        assert_eq!(
            storage.get("contracts/1/9/x-lease.pdf").await.unwrap(),
            Bytes::from_static(b"%PDF-1.4")
        );
        assert_eq!(
            storage.metadata("contracts/1/9/x-lease.pdf").await.unwrap(),
            meta
        );

        storage.delete("contracts/1/9/x-lease.pdf").await.unwrap();
        assert!(storage.is_empty());
        assert!(matches!(
            storage.get("contracts/1/9/x-lease.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let root = temp_root("roundtrip");
        let storage = LocalStorage::new(&root);

        let meta = storage
            .put("contracts/3/4/doc.txt", Bytes::from_static(b"signed"))
            .await
            .unwrap();
        assert_eq!(meta.sha256, sha256_hex(b"signed"));
        assert!(root.join("contracts/3/4/doc.txt").exists());

        let read_back = storage.metadata("contracts/3/4/doc.txt").await.unwrap();
        assert_eq!(read_back.size, 6);
        assert_eq!(read_back.sha256, meta.sha256);

        storage.delete("contracts/3/4/doc.txt").await.unwrap();
        storage.delete("contracts/3/4/doc.txt").await.unwrap();
        assert!(!storage.exists("contracts/3/4/doc.txt").await.unwrap());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let storage = LocalStorage::new(temp_root("traversal"));
        assert!(matches!(
            storage.get("../../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.get("missing.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
