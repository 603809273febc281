//! Local-directory photo evidence storage.
//!
//! Photos are written under `<directory>/<record_id>/<uuid>.<ext>` and
//! referenced by a `file://` URL.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::PhotoConfig;
use crate::domain::ports::PhotoStorage;

const URL_SCHEME: &str = "file://";

#[derive(Debug, Clone)]
pub struct LocalPhotoStorage {
    directory: PathBuf,
    max_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl LocalPhotoStorage {
    pub fn new(config: &PhotoConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            max_bytes: config.max_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn extension_of(&self, file_name: &str) -> DomainResult<String> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| {
                DomainError::PhotoStorage(format!("'{file_name}' has no file extension"))
            })?;

        if !self.allowed_extensions.iter().any(|a| a == &ext) {
            return Err(DomainError::PhotoStorage(format!(
                "'{ext}' is not an accepted image type (expected one of: {})",
                self.allowed_extensions.join(", ")
            )));
        }
        Ok(ext)
    }

    /// Map a URL produced by [`upload`](PhotoStorage::upload) back to a path
    /// inside the storage directory.
    fn path_for_url(&self, url: &str) -> DomainResult<PathBuf> {
        let raw = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| DomainError::PhotoStorage(format!("unsupported photo URL: {url}")))?;
        let path = PathBuf::from(raw);

        let escapes = path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes || !path.starts_with(&self.directory) {
            return Err(DomainError::PhotoStorage(format!(
                "photo URL is outside the storage directory: {url}"
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn upload(&self, record_id: Uuid, file_name: &str, bytes: &[u8]) -> DomainResult<String> {
        let ext = self.extension_of(file_name)?;

        if bytes.is_empty() {
            return Err(DomainError::PhotoStorage("photo is empty".to_string()));
        }
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(DomainError::PhotoStorage(format!(
                "photo is {size} bytes, the limit is {} bytes",
                self.max_bytes
            )));
        }

        let dir = self.directory.join(record_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DomainError::PhotoStorage(format!("cannot create {}: {e}", dir.display())))?;

        let path = dir.join(format!("{}.{ext}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::PhotoStorage(format!("cannot write {}: {e}", path.display())))?;

        debug!(%record_id, path = %path.display(), size, "stored photo");
        Ok(format!("{URL_SCHEME}{}", path.display()))
    }

    async fn delete(&self, url: &str) -> DomainResult<()> {
        let path = self.path_for_url(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted photo");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "photo already gone");
                Ok(())
            }
            Err(e) => Err(DomainError::PhotoStorage(format!(
                "cannot delete {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_in(dir: &Path) -> LocalPhotoStorage {
        LocalPhotoStorage::new(&PhotoConfig {
            directory: dir.to_path_buf(),
            max_bytes: 16,
            ..PhotoConfig::default()
        })
    }

    #[tokio::test]
    async fn test_upload_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());
        let record_id = Uuid::new_v4();

        let url = storage.upload(record_id, "sol.JPG", b"jpegbytes").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with(".jpg"));

        let path = storage.path_for_url(&url).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"jpegbytes");

        storage.delete(&url).await.unwrap();
        assert!(!path.exists());
        // Deleting twice is harmless.
        storage.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_non_images_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());
        let id = Uuid::new_v4();

        assert!(matches!(
            storage.upload(id, "notes.pdf", b"x").await,
            Err(DomainError::PhotoStorage(_))
        ));
        assert!(storage.upload(id, "noext", b"x").await.is_err());
        assert!(storage.upload(id, "big.png", &[0u8; 17]).await.is_err());
        assert!(storage.upload(id, "empty.png", b"").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_refuses_foreign_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());

        assert!(storage.delete("https://example.com/a.jpg").await.is_err());
        assert!(storage.delete("file:///etc/passwd").await.is_err());
        let sneaky = format!("file://{}/../outside.jpg", dir.path().display());
        assert!(storage.delete(&sneaky).await.is_err());
    }
}
