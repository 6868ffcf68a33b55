//! # Heron Server
//! [![Crates.io](https://img.shields.io/crates/v/heron_server.svg)](https://crates.io/crates/heron_server)
//! [![Docs](https://docs.rs/heron_server/badge.svg)](https://docs.rs/heron_server/)
//!
//! An Axum-based gateway that turns synchronous HTTP uploads into asynchronous remote
//! inference jobs.
//!
//! Provides the [`HeronServer`] builder, which ties together a staging backend, a compute
//! backend, a model registry and an authentication provider.
//!
//! ## Endpoints
//!
//! * **`GET /v1/ping`**: checks the shared secret.
//! * **`POST /v1/model/start/{model_id}`**: stages the request body and starts a run, returns the job id.
//! * **`GET /v1/model/results/{job_id}`**: `202` while the run is in progress, the result archive once it completed.
//!
//! Every `/v1` endpoint requires the shared-secret header. Failures are answered with a
//! JSON [`ErrorEnvelope`](heron_core::envelope::ErrorEnvelope).
//!
//! ## Example
//!
//! ```no_run
//! use heron_server::prelude::*;
//! use heron_fs::FileSystemStorage;
//! use heron_compute_mock::MockComputeBackend;
//! use heron_jobs::registry::StaticModelRegistry;
//!
//! # async fn run() {
//! let storage = FileSystemStorage::new("./staging");
//! let services = CoreServices {
//!     compute: MockComputeBackend::new(storage.clone()),
//!     storage,
//!     registry: StaticModelRegistry::load("models.json").await.unwrap(),
//!     auth: SharedSecretAuth::new("my-secret"),
//! };
//!
//! let app = HeronServer::default().build(services);
//! # }
//! ```

mod api;
mod server;

pub mod auth;
pub mod services;
pub mod state;

pub use api::ApiError;
pub use server::{HeronServer, HeronServerConfig};

pub mod prelude {
    pub use crate::auth::*;
    pub use crate::services::*;
    pub use crate::state::*;
    pub use crate::{ApiError, HeronServer, HeronServerConfig};
}
