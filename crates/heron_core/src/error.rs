use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Low-level I/O error.
    /// Maps to **HTTP 500 Internal Server Error**.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested path was not found.
    /// Maps to **HTTP 500**, a missing staged payload is never the client's fault.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The path was rejected by the backend (e.g., escapes the storage root).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Generic system or backend-specific failure (e.g., OpenDAL error).
    /// Maps to **HTTP 500 Internal Server Error**.
    #[error("Storage system failure: {0}")]
    System(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// The secret header is absent.
    /// Maps to **HTTP 401 Unauthorized**.
    #[error("Unauthorized: Credentials missing")]
    Missing,

    /// The secret header is present but does not match.
    /// Maps to **HTTP 403 Forbidden**.
    #[error("Forbidden: Credentials invalid")]
    Invalid,

    /// Generic provider failure.
    /// Maps to **HTTP 500 Internal Server Error**.
    #[error("Auth system failure: {0}")]
    System(String),
}

#[derive(Debug, Error)]
pub enum ComputeError {
    /// The backend rejected the execution request (e.g., unknown image).
    /// Maps to **HTTP 500**, the request is built by the gateway, not the client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested job or file was not found.
    /// Maps to **HTTP 404 Not Found** when it is the job itself.
    #[error("Job {0} not found")]
    NotFound(String),

    /// Internal infrastructure or provider failure (e.g., Docker daemon error).
    /// Maps to **HTTP 500 Internal Server Error**.
    #[error("Compute system failure: {0}")]
    System(String),

    /// The backend does not support this feature.
    #[error("Feature not supported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No model is registered under this id.
    /// Maps to **HTTP 404 Not Found**.
    #[error("Model {0} not found")]
    NotFound(String),

    /// The registry itself failed (unreadable file, remote error).
    #[error("Model registry failure: {0}")]
    System(String),
}
