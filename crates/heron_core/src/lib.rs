//! # Heron Core
//! [![Crates.io](https://img.shields.io/crates/v/heron_core.svg)](https://crates.io/crates/heron_core)
//! [![Docs](https://docs.rs/heron_core/badge.svg)](https://docs.rs/heron_core/)
//!
//! Types and traits for the ecosystem.
//!
//! Defines the protocol used by clients, the gateway and its backends.
//!
//! - **[`RunOutcome`](job::RunOutcome)**: What a poll of a submitted job resolves to.
//! - **[`ErrorEnvelope`](envelope::ErrorEnvelope)**: The stable JSON error body.
//! - **[`StorageBackend`](traits::StorageBackend)**: Trait for staging payloads where the remote executor can read them.
//! - **[`ComputeBackend`](traits::ComputeBackend)** / **[`RunHandle`](traits::RunHandle)**: Traits for submitting and observing remote runs.
//! - **[`ModelRegistry`](traits::ModelRegistry)**: Trait for resolving model ids.
//! - **[`AuthProvider`](traits::AuthProvider)**: Trait for implementing request verification.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod job;
pub mod traits;

pub mod prelude {
    pub use super::constants::*;
    pub use super::envelope::*;
    pub use super::error::*;
    pub use super::job::*;
    pub use super::traits::*;
}
