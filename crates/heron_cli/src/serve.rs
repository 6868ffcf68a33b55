//! `heron serve`: wires the configured backends into the gateway.

use crate::staging::{Staging, StagingArgs};

use anyhow::{Context, bail};
use clap::{Args, ValueEnum};
use heron_compute_docker::{DockerComputeBackend, DockerConfig};
use heron_compute_mock::MockComputeBackend;
use heron_core::prelude::{markers::*, names::*, *};
use heron_jobs::prelude::*;
use heron_server::prelude::*;
use std::path::PathBuf;
use tokio::{net::TcpListener, signal};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ComputeKind {
    /// Run every job as a container on the local Docker daemon
    Docker,
    /// Simulate runs in-process with a pass-through scorer
    Mock,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Where the HTTP API will listen
    #[arg(long, env = "HERON_BIND", default_value = "0.0.0.0:5000")]
    pub bind: String,

    /// Header carrying the shared secret
    #[arg(long, env = "HERON_AUTH_HEADER", default_value = DEFAULT_AUTH_HEADER)]
    pub auth_header: String,

    /// The shared secret
    #[arg(long, env = "HERON_API_AUTH_SECRET", hide_env_values = true)]
    pub api_auth_secret: String,

    #[arg(long, env = "HERON_EXPERIMENT_NAME", default_value = DEFAULT_EXPERIMENT)]
    pub experiment_name: String,

    /// Staging folder that receives one sub folder per submission
    #[arg(long, env = "HERON_IMAGE_DATA_FOLDER", default_value = DEFAULT_IMAGE_DATA_FOLDER)]
    pub image_data_folder: String,

    /// JSON file mapping model ids to their tags
    #[arg(long, env = "HERON_MODEL_REGISTRY", default_value = "models.json")]
    pub model_registry: PathBuf,

    /// Driver log text that marks an input which is not a zip archive
    #[arg(long, env = "HERON_INVALID_ARCHIVE_MARKER", default_value = BAD_ZIP_FILE)]
    pub invalid_archive_marker: String,

    #[arg(long, value_enum, env = "HERON_COMPUTE", default_value_t = ComputeKind::Docker)]
    pub compute: ComputeKind,

    /// Host directory for the per-job outputs of Docker runs
    #[arg(long, env = "HERON_OUTPUTS_ROOT", default_value = "./heron_outputs")]
    pub outputs_root: PathBuf,

    /// Command the entry operation is appended to inside job containers
    #[arg(long, env = "HERON_DOCKER_COMMAND", default_value = "heron", value_delimiter = ' ')]
    pub docker_command: Vec<String>,

    /// GPU driver requested for job containers, e.g. `nvidia`
    #[arg(long, env = "HERON_GPU_DRIVER")]
    pub gpu_driver: Option<String>,

    #[command(flatten)]
    pub staging: StagingArgs,
}

impl ServeArgs {
    pub fn server_config(&self) -> HeronServerConfig {
        HeronServerConfig {
            auth_header: self.auth_header.clone(),
            experiment_name: self.experiment_name.clone(),
            invalid_archive_marker: self.invalid_archive_marker.clone(),
            submit: SubmitConfig {
                image_data_folder: self.image_data_folder.clone(),
                ..Default::default()
            },
            classifier: ClassifierConfig::default(),
        }
    }

    /// Job containers see the staging store under the same settings as the gateway.
    pub fn docker_config(&self) -> anyhow::Result<DockerConfig> {
        let mut binds = Vec::new();
        let mut env = Vec::new();

        match &self.staging.staging_scheme {
            None => {
                let root = std::path::absolute(&self.staging.staging_root)?;
                binds.push(format!("{0}:{0}", root.display()));
                env.push(("HERON_STAGING_ROOT".to_string(), root.display().to_string()));
            }
            Some(scheme) => {
                let options = self
                    .staging
                    .staging_options
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(",");
                env.push(("HERON_STAGING_SCHEME".to_string(), scheme.clone()));
                env.push(("HERON_STAGING_OPTION".to_string(), options));
            }
        }

        Ok(DockerConfig {
            outputs_root: std::path::absolute(&self.outputs_root)?,
            binds,
            env,
            command_prefix: self.docker_command.clone(),
            gpu: self.gpu_driver.clone(),
        })
    }
}

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    if args.api_auth_secret.is_empty() {
        bail!("The shared secret must not be empty");
    }

    let storage = args.staging.open()?;

    match args.compute {
        ComputeKind::Docker => {
            let compute = DockerComputeBackend::connect_local(args.docker_config()?)?;
            compute.init().await?;
            serve(args, storage, compute).await
        }
        ComputeKind::Mock => {
            let compute = MockComputeBackend::new(storage.clone());
            serve(args, storage, compute).await
        }
    }
}

async fn serve<C: ComputeBackend>(args: ServeArgs, storage: Staging, compute: C) -> anyhow::Result<()> {
    let registry = StaticModelRegistry::load(&args.model_registry)
        .await
        .with_context(|| format!("Failed to load {}", args.model_registry.display()))?;
    info!("Loaded {} models", registry.len());

    let services = CoreServices {
        storage,
        compute,
        registry,
        auth: SharedSecretAuth::new(&args.api_auth_secret),
    };

    let app = HeronServer::new(args.server_config()).build(services);

    let listener = TcpListener::bind(&args.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown requested");
}
