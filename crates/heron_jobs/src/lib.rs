//! # Heron Jobs
//! [![Crates.io](https://img.shields.io/crates/v/heron_jobs.svg)](https://crates.io/crates/heron_jobs)
//! [![Docs](https://docs.rs/heron_jobs/badge.svg)](https://docs.rs/heron_jobs/)
//!
//! The job lifecycle behind the gateway, written only against the traits in `heron_core`.
//!
//! - **[`Submitter`](submit::Submitter)**: resolves the model, stages the payload and submits the run.
//! - **[`ResultFetcher`](results::ResultFetcher)**: looks a run up and classifies it.
//! - **[`StatusClassifier`](classify::StatusClassifier)**: raw status plus driver log scan to [`RunOutcome`](heron_core::job::RunOutcome).
//! - **[`run_then_scrub`](scrub::run_then_scrub)**: guaranteed destruction of a staged payload for the remote side.
//! - **[`StaticModelRegistry`](registry::StaticModelRegistry)**: a file based [`ModelRegistry`](heron_core::traits::ModelRegistry).

pub mod classify;
pub mod registry;
pub mod results;
pub mod scrub;
pub mod submit;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use super::classify::*;
    pub use super::registry::*;
    pub use super::results::*;
    pub use super::scrub::*;
    pub use super::submit::*;
}
