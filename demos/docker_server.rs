//! # Docker Server Example
//!
//! Showcases a server running every job as a container with the [`DockerComputeBackend`],
//! staging payloads with [`OpendalStorage`] (configured for fs).
//!
//! The staging root is bind-mounted into each job container at the same path, so the
//! container's `heron run-scoring` can read and scrub the payload.
//!
//! ## Requirements
//!
//! - A running Docker daemon.
//! - A `models.json` registry whose models carry a `python_environment_name` tag naming
//!   an image that has `heron` and the model's scoring script installed.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --example docker_server --features "server opendal docker"
//! ```

use heron::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Config
    let staging_root = env::var("HERON_STAGING_ROOT").unwrap_or_else(|_| "/tmp/heron_staging".to_string());
    let outputs_root = env::var("HERON_OUTPUTS_ROOT").unwrap_or_else(|_| "/tmp/heron_outputs".to_string());
    let registry_path = env::var("HERON_MODEL_REGISTRY").unwrap_or_else(|_| "models.json".to_string());

    // Providers & Services
    let storage = OpendalStorage::from_options("fs", [("root".to_string(), staging_root.clone())])?;

    let compute = DockerComputeBackend::connect_local(DockerConfig {
        outputs_root: outputs_root.into(),
        binds: vec![format!("{staging_root}:{staging_root}")],
        env: vec![("HERON_STAGING_ROOT".to_string(), staging_root)],
        command_prefix: vec!["heron".to_string()],
        gpu: env::var("HERON_GPU_DRIVER").ok(),
    })?;
    compute.init().await?;

    let registry = StaticModelRegistry::load(registry_path).await?;
    let auth = SharedSecretAuth::new(env::var("HERON_API_AUTH_SECRET")?);

    let services = CoreServices {
        storage,
        compute,
        registry,
        auth,
    };

    // Build
    let app = HeronServer::default().build(services);

    // Serve
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
