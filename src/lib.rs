//! # Heron
//![![License](https://img.shields.io/badge/license-MIT%2FApache-blue.svg)](https://github.com/heron-gateway/heron?tab=readme-ov-file#license)
//![![Crates.io](https://img.shields.io/crates/v/heron.svg)](https://crates.io/crates/heron)
//![![Docs](https://docs.rs/heron/badge.svg)](https://docs.rs/heron/)
//!
//! A gateway that accepts a zipped image series over HTTP, runs it as an asynchronous
//! remote inference job against a named model, and lets the caller poll for the result
//! archive. Uploaded payloads are destroyed once the job is done with them, whether it
//! succeeded or not.
//!
//! This crate serves as an entry point, re-exporting the core logic and
//! optionally including server, client, staging and compute implementations via feature flags.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **`server`** | Includes the Axum-based gateway (`heron_server`). |
//! | **`client`** | Includes the HTTP client (`heron_client`) for tooling. |
//! | **`fs`** | Staging backend for the local filesystem (`heron_fs`). |
//! | **`opendal`** | Staging backend for OpenDAL (`heron_opendal`). |
//! | **`docker`** | Compute backend running jobs as Docker containers (`heron_compute_docker`). |
//! | **`mock`** | In-memory compute backend for development and testing (`heron_compute_mock`). |
//!
//! ## Example: Custom Server
//!
//! ```toml
//! [dependencies]
//! heron = { version = "0.3", features = ["server", "fs", "mock"] }
//! ```
//!
//! ```rust,no_run
//! use heron::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = FileSystemStorage::new("./staging");
//!     let services = CoreServices {
//!         compute: MockComputeBackend::new(storage.clone()),
//!         storage,
//!         registry: StaticModelRegistry::load("models.json").await.unwrap(),
//!         auth: SharedSecretAuth::new("my-secret"),
//!     };
//!
//!     // Build
//!     let app = HeronServer::default().build(services);
//!
//!     // Serve
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub use heron_core::*;

pub mod jobs {
    pub use heron_jobs::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use heron_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use heron_client::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    pub use heron_fs::*;
}

#[cfg(feature = "opendal")]
pub mod opendal {
    pub use heron_opendal::*;
}

#[cfg(feature = "docker")]
pub mod docker {
    pub use heron_compute_docker::*;
}

#[cfg(feature = "mock")]
pub mod mock {
    pub use heron_compute_mock::*;
}

pub mod prelude {
    pub use heron_core::prelude::*;
    pub use heron_jobs::prelude::*;

    #[cfg(feature = "server")]
    pub use heron_server::prelude::*;

    #[cfg(feature = "client")]
    pub use heron_client::{HeronClient, JobPoll};

    #[cfg(feature = "fs")]
    pub use heron_fs::FileSystemStorage;

    #[cfg(feature = "opendal")]
    pub use heron_opendal::OpendalStorage;

    #[cfg(feature = "docker")]
    pub use heron_compute_docker::{DockerComputeBackend, DockerConfig};

    #[cfg(feature = "mock")]
    pub use heron_compute_mock::MockComputeBackend;
}
