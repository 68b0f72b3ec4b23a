//! Filesystem storage for generated certificates and uploaded documents.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_web::web;
use futures_util::TryStreamExt;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

/// Multipart field that carries an uploaded document.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("multipart payload error: {0}")]
    Multipart(String),
    #[error("no file was uploaded")]
    MissingUpload,
    #[error("blocking task was cancelled")]
    Cancelled,
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<actix_web::error::BlockingError> for StorageError {
    fn from(_: actix_web::error::BlockingError) -> Self {
        StorageError::Cancelled
    }
}

/// Longest file name most filesystems accept, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// `<type without whitespace>certificate<application id>.pdf`.
///
/// `None` when the name would need sanitizing or is too long, since either
/// would let two distinct keys share one file.
pub fn artifact_file_name(certificate_type: &str, application_id: &str) -> Option<String> {
    let compact: String = certificate_type
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let name = format!("{compact}certificate{application_id}.pdf");
    if name.len() > MAX_FILE_NAME_LEN || sanitize_filename::sanitize(&name) != name {
        return None;
    }
    Some(name)
}

/// Directory holding one PDF per (certificate type, application id).
#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    root: PathBuf,
}

impl ArtifactStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, certificate_type: &str, application_id: &str) -> Option<PathBuf> {
        artifact_file_name(certificate_type, application_id).map(|name| self.root.join(name))
    }

    /// Replace `path` with `bytes` via a temp file in the storage root, so a
    /// concurrent reader sees either the old file or the new one.
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        let mut temp = NamedTempFile::new_in(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        temp.write_all(bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| StorageError::io(temp.path(), e))?;
        temp.persist(path)
            .map_err(|e| StorageError::io(path, e.error))?;
        Ok(())
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Async mutexes keyed by string, created on demand and dropped once no task
/// holds or awaits them.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A document received through a multipart upload.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Save the `file` field of a multipart upload into `dir` under its
/// sanitized client file name. Other fields are skipped.
pub async fn save_upload(
    mut payload: actix_multipart::Multipart,
    dir: &Path,
) -> Result<SavedUpload, StorageError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| StorageError::Multipart(e.to_string()))?
    {
        let (field_name, original_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(str::to_string),
                cd.get_filename().map(str::to_string),
            ),
            None => (None, None),
        };
        if field_name.as_deref() != Some(UPLOAD_FIELD) {
            continue;
        }

        let mut file_name = sanitize_filename::sanitize(original_name.unwrap_or_default());
        if file_name.is_empty() {
            file_name = format!("{}.pdf", uuid::Uuid::new_v4());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| StorageError::Multipart(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
        }

        let path = dir.join(&file_name);
        let (dir, target, data) = (dir.to_path_buf(), path.clone(), bytes.clone());
        web::block(move || {
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
            fs::write(&target, &data).map_err(|e| StorageError::io(&target, e))
        })
        .await??;

        log::debug!("Saved upload {} ({} bytes)", path.display(), bytes.len());
        return Ok(SavedUpload {
            file_name,
            path,
            bytes,
        });
    }

    Err(StorageError::MissingUpload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_file_name_strips_whitespace() {
        assert_eq!(
            artifact_file_name("Birth Certificate", "1024").as_deref(),
            Some("BirthCertificatecertificate1024.pdf")
        );
        assert_eq!(
            artifact_file_name(" Land\tCertificate ", "7").as_deref(),
            Some("LandCertificatecertificate7.pdf")
        );
    }

    #[test]
    fn test_artifact_file_name_rejects_unsafe_keys() {
        assert_eq!(artifact_file_name("Birth Certificate", "../../etc/passwd"), None);
        assert_eq!(artifact_file_name("Birth Certificate", "1/2"), None);
        assert_eq!(artifact_file_name("Birth Certificate", "1\\2"), None);
        assert_eq!(artifact_file_name("Income/../Certificate", "1"), None);
        assert_eq!(artifact_file_name("Death Certificate", "a:b"), None);
        assert_eq!(artifact_file_name("Death Certificate", "tab\u{7}"), None);

        let storage = ArtifactStorage::new("/srv/generated");
        assert_eq!(storage.artifact_path("Birth Certificate", "1/2"), None);
        let path = storage.artifact_path("Birth Certificate", "12").unwrap();
        assert_eq!(path.parent(), Some(Path::new("/srv/generated")));
    }

    #[test]
    fn test_artifact_file_name_length_limit() {
        // "BirthCertificatecertificate" + id + ".pdf"
        let fits = "7".repeat(MAX_FILE_NAME_LEN - 31);
        let name = artifact_file_name("Birth Certificate", &fits).unwrap();
        assert_eq!(name.len(), MAX_FILE_NAME_LEN);
        assert!(name.ends_with(".pdf"));

        let too_long = "7".repeat(MAX_FILE_NAME_LEN - 30);
        assert_eq!(artifact_file_name("Birth Certificate", &too_long), None);
    }

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let storage = ArtifactStorage::new(dir.path().join("nested"));
        let path = storage.artifact_path("Death Certificate", "5").unwrap();

        assert!(!storage.exists(&path));
        storage.write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        storage.write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        // no temp files left behind
        let entries = fs::read_dir(storage.root()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_keyed_locks_serialize_same_key() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock("a").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("a").await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // other keys are independent
        let _other = locks.lock("b").await;

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_keyed_locks_prune_released_keys() {
        let locks = KeyedLocks::new();
        drop(locks.lock("a").await);
        drop(locks.lock("b").await);
        let _held = locks.lock("c").await;
        assert_eq!(locks.len(), 1);
    }
}
