//! Storage backends
//!
//! A backend is a flat async key-value store of byte blobs. The store decides
//! the key layout and the encoding.

use crate::error::PersistenceError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const FILE_EXTENSION: &str = "json";

/// Key-value persistence used by [`crate::StateStore`]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a value; `None` when absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replace a value in full
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError>;

    /// Remove a value; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<(), PersistenceError>;

    /// Keys starting with `prefix`, sorted
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError>;
}

/// In-process backend for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// One JSON file per key under a directory
///
/// File names are the hex-encoded key, so any key is a safe file name.
/// Writes land in a temp file in the same directory and are renamed over the
/// target, so readers see either the old record or the new one.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a storage directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "file backend opened");
        Ok(Self { dir })
    }

    /// Directory holding the record files
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{FILE_EXTENSION}", hex::encode(key)))
    }

    fn key_for(file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(FILE_EXTENSION)?.strip_suffix('.')?;
        String::from_utf8(hex::decode(stem).ok()?).ok()
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError> {
        let dir = self.dir.clone();
        let target = self.path_for(key);
        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            let mut file = NamedTempFile::new_in(&dir)?;
            file.write_all(&value)?;
            file.as_file().sync_all()?;
            file.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| PersistenceError::Task(e.to_string()))?
    }

    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            // temp files and foreign files do not decode
            if let Some(key) = name.to_str().and_then(Self::key_for) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        backend.put("vas:current", b"{}".to_vec()).await.unwrap();
        backend.put("vas:archive:b", b"2".to_vec()).await.unwrap();
        backend.put("vas:archive:a", b"1".to_vec()).await.unwrap();

        assert_eq!(backend.get("vas:current").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(
            backend.keys("vas:archive:").await.unwrap(),
            vec!["vas:archive:a", "vas:archive:b"]
        );

        backend.delete("vas:current").await.unwrap();
        backend.delete("vas:current").await.unwrap();
        assert_eq!(backend.get("vas:current").await.unwrap(), None);
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn file_names_decode_back_to_keys() {
        let name = format!("{}.json", hex::encode("vas:archive:01J"));
        assert_eq!(FileBackend::key_for(&name).as_deref(), Some("vas:archive:01J"));
        assert_eq!(FileBackend::key_for(".tmpA1b2C3"), None);
        assert_eq!(FileBackend::key_for("notes.txt"), None);
    }
}
