use crate::constants::names::*;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A request to run inference for one uploaded payload.
///
/// Built by the gateway for a single HTTP request and consumed once by the
/// submission orchestrator. It is never persisted.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Id of a registered model, e.g. `PassThroughModel:1729`.
    pub model_id: String,
    /// Raw bytes of the uploaded image bundle.
    pub payload: Bytes,
    /// Logical grouping label the run is submitted under.
    pub experiment_name: String,
}

/// A payload written to storage that the remote executor can read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedPayload {
    /// Unique per submission, contains a fresh UUID.
    pub storage_path: String,
    pub size_bytes: u64,
}

/// Identifies one submitted remote execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    /// Opaque id issued by the [`ComputeBackend`](crate::traits::ComputeBackend).
    pub job_id: String,
    /// Where the payload was staged. Only needed to verify the scrub afterwards.
    pub staged_path: String,
    pub submitted_at: DateTime<Utc>,
}

/// What the gateway asks a [`ComputeBackend`](crate::traits::ComputeBackend) to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub experiment_name: String,
    /// Execution environment recorded against the model (e.g. a container image).
    pub environment: String,
    pub model_id: String,
    pub staged_path: String,
    /// Name of the remote entry operation, see [`ENTRY_POINT`].
    pub entry_point: String,
    /// Scoring script inside the model that the entry operation hands over to.
    pub score_script: String,
}

impl ExecutionRequest {
    /// Command line for the remote entry operation.
    pub fn args(&self) -> Vec<String> {
        vec![
            self.entry_point.clone(),
            "--model-id".to_string(),
            self.model_id.clone(),
            "--script-name".to_string(),
            self.score_script.clone(),
            "--staged-path".to_string(),
            self.staged_path.clone(),
        ]
    }
}

/// A registered model as seen by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Model {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The execution environment this model must run in, if it was registered with one.
    pub fn environment(&self) -> Option<&str> {
        self.tag(ENVIRONMENT_TAG)
    }
}

/// Sub-phases a run passes through after its main work is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostProcessingPhase {
    Finalizing,
    CancelRequested,
}

/// Status of a run as reported by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawStatus {
    NotStarted,
    Queued,
    Preparing,
    Running,
    PostProcessing(PostProcessingPhase),
    Completed,
    Failed,
    Canceled,
    /// Anything the platform reports that we have no name for.
    Unrecognized(String),
}

impl RawStatus {
    /// Whether the run has not reached a terminal state yet.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            RawStatus::NotStarted
                | RawStatus::Queued
                | RawStatus::Preparing
                | RawStatus::Running
                | RawStatus::PostProcessing(_)
        )
    }
}

impl FromStr for RawStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "NotStarted" => RawStatus::NotStarted,
            "Queued" => RawStatus::Queued,
            "Preparing" | "Provisioning" | "Starting" => RawStatus::Preparing,
            "Running" => RawStatus::Running,
            "Finalizing" => RawStatus::PostProcessing(PostProcessingPhase::Finalizing),
            "CancelRequested" => RawStatus::PostProcessing(PostProcessingPhase::CancelRequested),
            "Completed" => RawStatus::Completed,
            "Failed" => RawStatus::Failed,
            "Canceled" | "Cancelled" => RawStatus::Canceled,
            other => RawStatus::Unrecognized(other.to_string()),
        };
        Ok(status)
    }
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawStatus::NotStarted => f.write_str("NotStarted"),
            RawStatus::Queued => f.write_str("Queued"),
            RawStatus::Preparing => f.write_str("Preparing"),
            RawStatus::Running => f.write_str("Running"),
            RawStatus::PostProcessing(PostProcessingPhase::Finalizing) => f.write_str("Finalizing"),
            RawStatus::PostProcessing(PostProcessingPhase::CancelRequested) => {
                f.write_str("CancelRequested")
            }
            RawStatus::Completed => f.write_str("Completed"),
            RawStatus::Failed => f.write_str("Failed"),
            RawStatus::Canceled => f.write_str("Canceled"),
            RawStatus::Unrecognized(s) => write!(f, "Unrecognized({s})"),
        }
    }
}

/// Why a run failed, as far as the client is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The uploaded payload was not a valid archive.
    InvalidInputArchive,
    Unknown,
}

/// The classified result of polling a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Pending,
    Succeeded(Bytes),
    Failed(FailureReason),
    Cancelled,
}

impl RunOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunOutcome::Pending)
    }
}

/// A log file captured for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    /// Path relative to the run, e.g. `azureml-logs/70_driver_log.txt`.
    pub path: String,
    pub content: String,
}

impl RunLog {
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_vocabulary_parses_into_phases() {
        let parse = |s: &str| s.parse::<RawStatus>().unwrap();

        assert_eq!(parse("Starting"), RawStatus::Preparing);
        assert_eq!(parse("Provisioning"), RawStatus::Preparing);
        assert_eq!(
            parse("CancelRequested"),
            RawStatus::PostProcessing(PostProcessingPhase::CancelRequested)
        );
        assert_eq!(parse("Exploded"), RawStatus::Unrecognized("Exploded".into()));
    }

    #[test]
    fn only_non_terminal_statuses_are_in_progress() {
        assert!(RawStatus::NotStarted.is_in_progress());
        assert!(RawStatus::PostProcessing(PostProcessingPhase::Finalizing).is_in_progress());
        assert!(!RawStatus::Completed.is_in_progress());
        assert!(!RawStatus::Canceled.is_in_progress());
        assert!(!RawStatus::Unrecognized("x".into()).is_in_progress());
    }

    #[test]
    fn empty_environment_tag_counts_as_missing() {
        let mut model = Model {
            id: "m:1".into(),
            ..Default::default()
        };
        assert_eq!(model.environment(), None);

        model.tags.insert(ENVIRONMENT_TAG.into(), String::new());
        assert_eq!(model.environment(), None);

        model.tags.insert(ENVIRONMENT_TAG.into(), "heron/passthrough:1".into());
        assert_eq!(model.environment(), Some("heron/passthrough:1"));
    }

    #[test]
    fn execution_args_carry_model_and_staged_path() {
        let req = ExecutionRequest {
            experiment_name: "exp".into(),
            environment: "env".into(),
            model_id: "m:1".into(),
            staged_path: "folder/abc/imagedata.zip".into(),
            entry_point: ENTRY_POINT.into(),
            score_script: SCORE_SCRIPT.into(),
        };

        let args = req.args();
        assert_eq!(args[0], ENTRY_POINT);
        assert!(args.windows(2).any(|w| w == ["--model-id", "m:1"]));
        assert!(
            args.windows(2)
                .any(|w| w == ["--staged-path", "folder/abc/imagedata.zip"])
        );
    }

    #[test]
    fn log_file_name_ignores_prefix() {
        let log = RunLog {
            path: format!("{LOG_PREFIX}/{DRIVER_LOG}"),
            content: String::new(),
        };
        assert_eq!(log.file_name(), DRIVER_LOG);
    }
}
