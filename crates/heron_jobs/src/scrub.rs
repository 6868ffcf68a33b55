//! Destroying staged payloads once a run is done with them.
//!
//! The staging store has no delete, so the payload is overwritten in place with
//! [`DELETED_IMAGE_DATA_NOTIFICATION`].

use bytes::Bytes;
use futures::FutureExt;
use heron_core::prelude::*;
use std::panic::AssertUnwindSafe;
use tracing::{error, info};

/// Overwrites the staged payload at `path` with the sentinel text.
pub async fn scrub<S: StorageBackend>(storage: &S, path: &str) -> Result<(), StorageError> {
    storage
        .write_file(
            path,
            Bytes::from_static(DELETED_IMAGE_DATA_NOTIFICATION.as_bytes()),
        )
        .await?;
    info!("Scrubbed staged payload {path}");
    Ok(())
}

/// Whether the payload at `path` has been replaced by the sentinel.
pub async fn is_scrubbed<S: StorageBackend>(storage: &S, path: &str) -> Result<bool, StorageError> {
    let data = storage.read_file(path).await?;
    Ok(data.as_ref() == DELETED_IMAGE_DATA_NOTIFICATION.as_bytes())
}

/// Runs `work`, then scrubs `path` no matter how `work` ended.
///
/// A panic inside `work` is resumed after the scrub was attempted. When `work`
/// completes but the scrub fails, the scrub error is returned.
pub async fn run_then_scrub<S, F, T>(storage: &S, path: &str, work: F) -> Result<T, StorageError>
where
    S: StorageBackend,
    F: Future<Output = T>,
{
    let outcome = AssertUnwindSafe(work).catch_unwind().await;
    let scrubbed = scrub(storage, path).await;

    match outcome {
        Ok(value) => scrubbed.map(|_| value),
        Err(panic) => {
            if let Err(e) = scrubbed {
                error!("Failed to scrub {path} after a panic: {e}");
            }
            std::panic::resume_unwind(panic)
        }
    }
}
