//! # Heron OpenDAL Storage
//! [![Crates.io](https://img.shields.io/crates/v/heron_opendal.svg)](https://crates.io/crates/heron_opendal)
//! [![Docs](https://docs.rs/heron_opendal/badge.svg)](https://docs.rs/heron_opendal/)
//!
//! A staging backend powered by [Apache OpenDAL](https://opendal.apache.org/).
//!
//! Allows payloads to be staged in any storage service supported by OpenDAL, including
//! the file system, AWS S3, GCS, Azure Blob Storage and more. Only reads and writes are
//! used, so the payloads can live in stores without delete permissions.
//!
//! ## Usage
//!
//! ```no_run
//! # use heron_opendal::OpendalStorage;
//! # use opendal::{Operator, services::Azblob};
//! # fn run() {
//! let builder = Azblob::default()
//!     .container("image-staging")
//!     .endpoint("https://myaccount.blob.core.windows.net");
//!
//! let op = Operator::new(builder).unwrap().finish();
//! let storage = OpendalStorage::new(op);
//! # }
//! ```

use bytes::Bytes;
use heron_core::prelude::*;
use opendal::{Operator, Scheme};
use std::str::FromStr;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct OpendalStorage {
    op: Operator,
}

impl OpendalStorage {
    /// Create a new storage from an OpenDAL Operator.
    /// The Operator can be configured for any supported backend e.g., s3, fs, gcs, azblob etc.
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    /// Builds the operator from a scheme name (e.g. `s3`) and its options.
    pub fn from_options(
        scheme: &str,
        options: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, StorageError> {
        let scheme = Scheme::from_str(scheme)
            .map_err(|e| StorageError::System(format!("Unknown OpenDAL scheme '{scheme}': {e}")))?;
        let op = Operator::via_iter(scheme, options)
            .map_err(|e| StorageError::System(format!("OpenDAL init error: {e}")))?;
        Ok(Self::new(op))
    }
}

impl StorageBackend for OpendalStorage {
    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), StorageError> {
        debug!("Writing {} bytes to {path}", data.len());

        self.op
            .write(path, data)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::System(format!("OpenDAL Write Error: {e}")))
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, StorageError> {
        match self.op.read(path).await {
            Ok(buffer) => Ok(buffer.to_bytes()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::System(e.to_string())),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.op
            .exists(path)
            .await
            .map_err(|e| StorageError::System(e.to_string()))
    }
}
