use crate::error::*;
use crate::job::*;

use bytes::Bytes;

/// A trait for injecting staging storage into the gateway.
///
/// There is intentionally no delete: staged payloads are destroyed by
/// overwriting them with [`DELETED_IMAGE_DATA_NOTIFICATION`](crate::constants::DELETED_IMAGE_DATA_NOTIFICATION).
pub trait StorageBackend: Send + Sync + 'static + Clone {
    /// Writes (or overwrites) a file in the storage backend.
    fn write_file(
        &self,
        path: &str,
        data: Bytes,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Reads a file from the storage backend.
    fn read_file(&self, path: &str) -> impl Future<Output = Result<Bytes, StorageError>> + Send;

    /// Checks if a file exists in the storage backend.
    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Returns the staging path for one submission, always relative to the store's root.
    fn get_staging_path(&self, folder: &str, id: &str) -> String {
        let file = crate::constants::names::IMAGE_DATA_FILE;
        match folder.trim_matches('/') {
            "" => format!("{id}/{file}"),
            folder => format!("{folder}/{id}/{file}"),
        }
    }
}

/// A view over one submitted remote job.
pub trait RunHandle: Send + Sync {
    fn id(&self) -> &str;

    /// Queries the platform for the run's current status.
    fn current_status(&self) -> impl Future<Output = Result<RawStatus, ComputeError>> + Send;

    /// Returns all log files whose path starts with `prefix`.
    fn fetch_logs(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<RunLog>, ComputeError>> + Send;

    /// Downloads an output file of the run.
    fn download_file(&self, name: &str)
    -> impl Future<Output = Result<Bytes, ComputeError>> + Send;
}

/// A trait for injecting the remote executor into the gateway.
pub trait ComputeBackend: Send + Sync + 'static + Clone {
    type Run: RunHandle;

    /// Checks that the backend is reachable.
    fn init(&self) -> impl Future<Output = Result<(), ComputeError>> + Send {
        async { Ok(()) }
    }

    /// Submits a run and returns its job id once the platform acknowledged it.
    fn submit(
        &self,
        req: ExecutionRequest,
    ) -> impl Future<Output = Result<String, ComputeError>> + Send;

    /// Looks up a run. Unknown ids must fail with [`ComputeError::NotFound`].
    fn get_run(&self, job_id: &str) -> impl Future<Output = Result<Self::Run, ComputeError>> + Send;
}

/// A trait for resolving model ids.
pub trait ModelRegistry: Send + Sync + 'static + Clone {
    /// Unknown ids must fail with [`RegistryError::NotFound`].
    fn resolve(&self, model_id: &str) -> impl Future<Output = Result<Model, RegistryError>> + Send;
}

/// A trait for injecting authentication logic into the server.
pub trait AuthProvider: Send + Sync + 'static + Clone {
    /// Verifies the credential taken from the request.
    ///
    /// `None` means the request carried no credential at all.
    fn verify(&self, credential: Option<&str>) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// Everything the server needs, bundled behind one type.
pub trait HeronServices: Send + Sync + 'static + Clone {
    type Storage: StorageBackend;
    type Compute: ComputeBackend;
    type Registry: ModelRegistry;
    type Auth: AuthProvider;

    fn storage(&self) -> &Self::Storage;
    fn compute(&self) -> &Self::Compute;
    fn registry(&self) -> &Self::Registry;
    fn auth(&self) -> &Self::Auth;
}
