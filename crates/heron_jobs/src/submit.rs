use crate::scrub::scrub;

use chrono::Utc;
use heron_core::prelude::{names::*, *};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Maps to **HTTP 404** with `InvalidModelId`.
    #[error("Model {0} not found")]
    ModelNotFound(String),

    /// The model was registered without the metadata needed to run it.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model registry failure: {0}")]
    Registry(#[source] RegistryError),

    #[error("Failed to stage payload: {0}")]
    Staging(#[from] StorageError),

    #[error("Failed to submit run: {0}")]
    Compute(#[from] ComputeError),
}

impl From<RegistryError> for SubmitError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => SubmitError::ModelNotFound(id),
            other => SubmitError::Registry(other),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SubmitConfig {
    /// Folder in the staging store that holds per-submission payloads.
    pub image_data_folder: String,
    /// Remote entry operation each run starts with.
    pub entry_point: String,
    /// Scoring script inside the model that the entry operation invokes.
    pub score_script: String,
    /// Model tag that names the execution environment.
    pub environment_tag: String,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            image_data_folder: DEFAULT_IMAGE_DATA_FOLDER.to_string(),
            entry_point: ENTRY_POINT.to_string(),
            score_script: SCORE_SCRIPT.to_string(),
            environment_tag: ENVIRONMENT_TAG.to_string(),
        }
    }
}

/// Stages payloads and submits runs. Never waits for a run to finish.
#[derive(Clone)]
pub struct Submitter<S, C, R> {
    storage: S,
    compute: C,
    registry: R,
    config: SubmitConfig,
}

impl<S, C, R> Submitter<S, C, R>
where
    S: StorageBackend,
    C: ComputeBackend,
    R: ModelRegistry,
{
    pub fn new(storage: S, compute: C, registry: R, config: SubmitConfig) -> Self {
        Self {
            storage,
            compute,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &SubmitConfig {
        &self.config
    }

    pub async fn submit(&self, req: JobRequest) -> Result<(JobHandle, StagedPayload), SubmitError> {
        info!("Identifying model {}", req.model_id);
        let model = self.registry.resolve(&req.model_id).await?;

        let environment = model
            .tag(&self.config.environment_tag)
            .ok_or_else(|| {
                SubmitError::Configuration(format!(
                    "Model {} has no '{}' tag",
                    model.id, self.config.environment_tag
                ))
            })?
            .to_string();

        let staged = self.stage(&req).await?;

        let exec = ExecutionRequest {
            experiment_name: req.experiment_name,
            environment,
            model_id: model.id,
            staged_path: staged.storage_path.clone(),
            entry_point: self.config.entry_point.clone(),
            score_script: self.config.score_script.clone(),
        };

        let job_id = match self.compute.submit(exec).await {
            Ok(id) => id,
            Err(e) => {
                // Nothing will ever read the payload now.
                if let Err(scrub_err) = scrub(&self.storage, &staged.storage_path).await {
                    error!(
                        "Failed to scrub {} after rejected submission: {scrub_err}",
                        staged.storage_path
                    );
                }
                return Err(e.into());
            }
        };

        info!(
            "Submitted run {job_id} for model {} with payload {}",
            req.model_id, staged.storage_path
        );

        let handle = JobHandle {
            job_id,
            staged_path: staged.storage_path.clone(),
            submitted_at: Utc::now(),
        };

        Ok((handle, staged))
    }

    async fn stage(&self, req: &JobRequest) -> Result<StagedPayload, StorageError> {
        let id = Uuid::new_v4().to_string();
        let storage_path = self
            .storage
            .get_staging_path(&self.config.image_data_folder, &id);

        self.storage
            .write_file(&storage_path, req.payload.clone())
            .await?;

        Ok(StagedPayload {
            storage_path,
            size_bytes: req.payload.len() as u64,
        })
    }
}
