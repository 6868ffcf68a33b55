//! # Heron Docker Compute
//!
//! Runs each job as a container on the local Docker daemon.
//!
//! The model's environment tag is used as the image, the remote entry operation's
//! arguments as the command. Every job gets its own host directory, mounted at
//! [`OUTPUTS_MOUNT`], from which result files are served. The container's combined
//! stdout/stderr is exposed as the run's driver log.

use bollard::Docker;
use bollard::config::ContainerCreateBody;
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerState, ContainerStateStatusEnum, DeviceRequest, HostConfig};
use bollard::query_parameters::{CreateContainerOptions, InspectContainerOptions, LogsOptions};
use bytes::Bytes;
use futures::TryStreamExt;
use heron_core::prelude::{names::*, *};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where a job container finds its outputs directory.
pub const OUTPUTS_MOUNT: &str = "/outputs";

const MANAGED_LABEL: &str = "heron.managed";
const EXPERIMENT_LABEL: &str = "heron.experiment";
const MODEL_LABEL: &str = "heron.model";

#[derive(Clone, Debug, Default)]
pub struct DockerConfig {
    /// Host directory that receives one outputs folder per job.
    pub outputs_root: PathBuf,
    /// Extra `host:container` bind mounts, e.g. the staging volume.
    pub binds: Vec<String>,
    /// Environment variables set in every job container.
    pub env: Vec<(String, String)>,
    /// Prepended to the entry operation's arguments, e.g. `["heron"]` when the
    /// image has no matching `ENTRYPOINT`.
    pub command_prefix: Vec<String>,
    /// GPU driver to request. If [`None`], no gpu is attached.
    pub gpu: Option<String>,
}

#[derive(Clone)]
pub struct DockerComputeBackend {
    client: Docker,
    config: Arc<DockerConfig>,
}

impl DockerComputeBackend {
    /// Connects to the local Docker socket (defaults to /var/run/docker.sock on Linux)
    pub fn connect_local(config: DockerConfig) -> Result<Self, ComputeError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| ComputeError::System(format!("Failed to connect to Docker: {}", e)))?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn outputs_dir(&self, job_id: &str) -> PathBuf {
        self.config.outputs_root.join(job_id)
    }
}

impl ComputeBackend for DockerComputeBackend {
    type Run = DockerRun;

    async fn init(&self) -> Result<(), ComputeError> {
        self.client
            .version()
            .await
            .map_err(|e| ComputeError::System(format!("Docker unavailable: {}", e)))?;

        Ok(())
    }

    async fn submit(&self, req: ExecutionRequest) -> Result<String, ComputeError> {
        let job_id = format!("heron-job-{}", uuid::Uuid::new_v4());
        let outputs = self.outputs_dir(&job_id);
        tokio::fs::create_dir_all(&outputs).await.map_err(|e| {
            ComputeError::System(format!("Failed to create {}: {e}", outputs.display()))
        })?;

        let mut binds = vec![format!("{}:{OUTPUTS_MOUNT}", outputs.display())];
        binds.extend(self.config.binds.iter().cloned());

        let device_requests = self.config.gpu.clone().map(|driver| {
            vec![DeviceRequest {
                driver: Some(driver),
                count: Some(-1),
                capabilities: Some(vec![vec!["gpu".to_string()]]),
                ..Default::default()
            }]
        });

        let mut env: Vec<String> = self
            .config
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        env.push(format!("HERON_OUTPUT_DIR={OUTPUTS_MOUNT}"));

        let cmd: Vec<String> = self
            .config
            .command_prefix
            .iter()
            .cloned()
            .chain(req.args())
            .collect();

        let labels = HashMap::from([
            (MANAGED_LABEL.to_string(), "true".to_string()),
            (EXPERIMENT_LABEL.to_string(), req.experiment_name.clone()),
            (MODEL_LABEL.to_string(), req.model_id.clone()),
        ]);

        let options = CreateContainerOptions {
            name: job_id.clone().into(),
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(req.environment.clone()),
            cmd: Some(cmd),
            env: Some(env),
            labels: Some(labels),
            host_config: Some(HostConfig {
                binds: Some(binds),
                device_requests,
                auto_remove: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        self.client
            .create_container(Some(options), body)
            .await
            .map_err(|e| ComputeError::InvalidRequest(e.to_string()))?;

        self.client
            .start_container(job_id.as_str(), None)
            .await
            .map_err(|e| ComputeError::InvalidRequest(format!("Failed to start: {}", e)))?;

        info!(
            "Started container {job_id} from {} in experiment {}",
            req.environment, req.experiment_name
        );

        Ok(job_id)
    }

    async fn get_run(&self, job_id: &str) -> Result<DockerRun, ComputeError> {
        let run = DockerRun {
            client: self.client.clone(),
            id: job_id.to_string(),
            outputs: self.outputs_dir(job_id),
        };

        // Only containers started by us are runs.
        let managed = run
            .inspect()
            .await?
            .config
            .and_then(|c| c.labels)
            .is_some_and(|labels| labels.contains_key(MANAGED_LABEL));

        if !managed {
            return Err(ComputeError::NotFound(job_id.to_string()));
        }
        Ok(run)
    }
}

pub struct DockerRun {
    client: Docker,
    id: String,
    outputs: PathBuf,
}

impl DockerRun {
    async fn inspect(&self) -> Result<bollard::models::ContainerInspectResponse, ComputeError> {
        self.client
            .inspect_container(&self.id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| match e {
                DockerError::DockerResponseServerError {
                    status_code: 404, ..
                } => ComputeError::NotFound(self.id.clone()),
                e => ComputeError::System(e.to_string()),
            })
    }
}

impl RunHandle for DockerRun {
    fn id(&self) -> &str {
        &self.id
    }

    async fn current_status(&self) -> Result<RawStatus, ComputeError> {
        let state = self.inspect().await?.state.unwrap_or_default();
        Ok(raw_status(&state))
    }

    async fn fetch_logs(&self, prefix: &str) -> Result<Vec<RunLog>, ComputeError> {
        let options = LogsOptions {
            follow: false,
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        let chunks: Vec<_> = self
            .client
            .logs(&self.id, Some(options))
            .try_collect()
            .await
            .map_err(|e| ComputeError::System(e.to_string()))?;

        let content = chunks
            .into_iter()
            .map(|chunk| String::from_utf8_lossy(&chunk.into_bytes()).into_owned())
            .collect::<String>();

        debug!("Fetched {} bytes of logs for {}", content.len(), self.id);

        Ok(vec![RunLog {
            path: format!("{}/{DRIVER_LOG}", prefix.trim_end_matches('/')),
            content,
        }])
    }

    async fn download_file(&self, name: &str) -> Result<Bytes, ComputeError> {
        read_output(&self.outputs, name).await
    }
}

/// Maps a container's state onto the platform status vocabulary.
pub fn raw_status(state: &ContainerState) -> RawStatus {
    match state.status {
        Some(ContainerStateStatusEnum::CREATED) => RawStatus::NotStarted,
        Some(ContainerStateStatusEnum::PAUSED) => RawStatus::Queued,
        Some(ContainerStateStatusEnum::RUNNING | ContainerStateStatusEnum::RESTARTING) => {
            RawStatus::Running
        }
        Some(ContainerStateStatusEnum::REMOVING) => {
            RawStatus::PostProcessing(PostProcessingPhase::Finalizing)
        }
        Some(ContainerStateStatusEnum::EXITED) => {
            let oom = state.oom_killed.unwrap_or(false);
            match state.exit_code {
                Some(0) => RawStatus::Completed,
                // Killed by SIGKILL/SIGTERM from outside, e.g. `docker stop`.
                Some(137 | 143) if !oom => RawStatus::Canceled,
                _ => RawStatus::Failed,
            }
        }
        Some(ContainerStateStatusEnum::DEAD) => RawStatus::Failed,
        other => RawStatus::Unrecognized(format!("{other:?}")),
    }
}

async fn read_output(outputs: &Path, name: &str) -> Result<Bytes, ComputeError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
        return Err(ComputeError::InvalidRequest(format!("Invalid output name {name}")));
    }

    match tokio::fs::read(outputs.join(name)).await {
        Ok(data) => Ok(Bytes::from(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ComputeError::NotFound(name.to_string()))
        }
        Err(e) => Err(ComputeError::System(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: ContainerStateStatusEnum, exit_code: Option<i64>) -> ContainerState {
        ContainerState {
            status: Some(status),
            exit_code,
            ..Default::default()
        }
    }

    #[test]
    fn exit_codes_decide_terminal_status() {
        use ContainerStateStatusEnum::*;

        assert_eq!(raw_status(&state(EXITED, Some(0))), RawStatus::Completed);
        assert_eq!(raw_status(&state(EXITED, Some(1))), RawStatus::Failed);
        assert_eq!(raw_status(&state(EXITED, Some(143))), RawStatus::Canceled);
        assert_eq!(raw_status(&state(DEAD, None)), RawStatus::Failed);

        let mut oom = state(EXITED, Some(137));
        oom.oom_killed = Some(true);
        assert_eq!(raw_status(&oom), RawStatus::Failed);
    }

    #[test]
    fn live_containers_are_in_progress() {
        use ContainerStateStatusEnum::*;

        for s in [CREATED, RUNNING, RESTARTING, PAUSED, REMOVING] {
            assert!(raw_status(&state(s, None)).is_in_progress(), "{s:?}");
        }
        assert!(!raw_status(&ContainerState::default()).is_in_progress());
    }

    #[tokio::test]
    async fn outputs_are_read_by_plain_name_only() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(RESULT_ARCHIVE), b"PK").await.unwrap();

        let data = read_output(dir.path(), RESULT_ARCHIVE).await.unwrap();
        assert_eq!(data.as_ref(), b"PK");

        assert!(matches!(
            read_output(dir.path(), "missing.zip").await,
            Err(ComputeError::NotFound(_))
        ));
        assert!(matches!(
            read_output(dir.path(), "../etc/passwd").await,
            Err(ComputeError::InvalidRequest(_))
        ));
    }
}
