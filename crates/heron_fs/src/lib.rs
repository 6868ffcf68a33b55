//! # Heron FileSystem Storage
//! [![Crates.io](https://img.shields.io/crates/v/heron_fs.svg)](https://crates.io/crates/heron_fs)
//! [![Docs](https://docs.rs/heron_fs/badge.svg)](https://docs.rs/heron_fs/)
//!
//! A local filesystem staging backend for Heron.
//!
//! This crate implements the [`StorageBackend`] trait, storing staged payloads
//! under a root directory. Point the root at a volume the remote executor also
//! mounts (e.g. an NFS share or a Docker bind mount).
//!
//! ## Features
//!
//! * **Atomic Writes**: Uses temporary files and rename operations so the executor never reads a partial payload,
//!   and a scrub never leaves a half-overwritten one.
//!
//! ## Usage
//!
//! ```no_run
//! use heron_fs::FileSystemStorage;
//!
//! let storage = FileSystemStorage::new("./heron_staging");
//! ```

use heron_core::prelude::*;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

async fn atomic_write(path: &Path, data: Bytes) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(StorageError::Io)?;
    }

    let tmp_path = path.with_extension("tmp");

    fs::write(&tmp_path, data).await.map_err(StorageError::Io)?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(StorageError::Io)?;

    Ok(())
}

#[derive(Clone, Debug)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { root: path.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn get_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || path.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl StorageBackend for FileSystemStorage {
    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), StorageError> {
        let path = self.get_path(path)?;
        atomic_write(&path, data).await
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, StorageError> {
        let path = self.get_path(path)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string_lossy().to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let path = self.get_path(path)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let path = storage.get_staging_path("images", "abc");

        storage.write_file(&path, Bytes::from_static(b"payload")).await.unwrap();
        storage
            .write_file(&path, Bytes::from_static(DELETED_IMAGE_DATA_NOTIFICATION.as_bytes()))
            .await
            .unwrap();

        let data = storage.read_file(&path).await.unwrap();
        assert_eq!(data.as_ref(), DELETED_IMAGE_DATA_NOTIFICATION.as_bytes());
        assert!(!dir.path().join("images/abc/imagedata.tmp").exists());
    }

    #[tokio::test]
    async fn staging_paths_stay_below_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        for folder in ["", "/", "/images/"] {
            let path = storage.get_staging_path(folder, "abc");
            assert!(!path.starts_with('/'), "{path}");
            storage.write_file(&path, Bytes::from_static(b"payload")).await.unwrap();
        }
        assert!(dir.path().join("abc/imagedata.zip").exists());
        assert!(dir.path().join("images/abc/imagedata.zip").exists());
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        assert!(!storage.exists("images/nope/imagedata.zip").await.unwrap());
        let err = storage.read_file("images/nope/imagedata.zip").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_paths_outside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path().join("root"));

        for path in ["../escape", "/etc/passwd", "a/../../b", ""] {
            let err = storage
                .write_file(path, Bytes::from_static(b"x"))
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidPath(_)), "{path}");
        }
    }
}
