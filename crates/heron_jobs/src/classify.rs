//! Maps a run's raw status onto the [`RunOutcome`] clients see.
//!
//! Status comes first. Logs are only downloaded when the run failed, and then
//! only the driver log is scanned, by a list of [`LogRule`]s.

use heron_core::prelude::{markers::*, names::*, *};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Failed to query status of run {job_id}: {source}")]
    Status {
        job_id: String,
        #[source]
        source: ComputeError,
    },

    /// The run completed but its result could not be fetched. Never a client error.
    #[error("Run {job_id} completed but {file} could not be downloaded: {source}")]
    ResultDownload {
        job_id: String,
        file: String,
        #[source]
        source: ComputeError,
    },
}

/// A heuristic that recognises a failure cause in a run's driver log.
pub trait LogRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn matches(&self, driver_log: &str) -> Option<FailureReason>;
}

/// Matches when the driver log contains a fixed marker.
///
/// Depends on the exact wording the scorer prints, so keep markers configurable.
#[derive(Debug, Clone)]
pub struct SubstringRule {
    name: String,
    marker: String,
    reason: FailureReason,
}

impl SubstringRule {
    pub fn new(name: impl Into<String>, marker: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            name: name.into(),
            marker: marker.into(),
            reason,
        }
    }

    /// Rule for payloads that turned out not to be a zip archive.
    pub fn invalid_archive(marker: impl Into<String>) -> Self {
        Self::new("invalid-archive", marker, FailureReason::InvalidInputArchive)
    }
}

impl LogRule for SubstringRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, driver_log: &str) -> Option<FailureReason> {
        driver_log.contains(&self.marker).then_some(self.reason)
    }
}

/// Well-known names the classifier looks for on a run.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub result_archive: String,
    pub log_prefix: String,
    pub driver_log: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            result_archive: RESULT_ARCHIVE.to_string(),
            log_prefix: LOG_PREFIX.to_string(),
            driver_log: DRIVER_LOG.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct StatusClassifier {
    config: ClassifierConfig,
    rules: Vec<Arc<dyn LogRule>>,
}

impl Default for StatusClassifier {
    /// The default names plus the `zipfile.BadZipFile` marker rule.
    fn default() -> Self {
        Self::new(ClassifierConfig::default()).with_rule(SubstringRule::invalid_archive(BAD_ZIP_FILE))
    }
}

impl StatusClassifier {
    /// A classifier without any log rules; every failure is [`FailureReason::Unknown`].
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            rules: Vec::new(),
        }
    }

    /// Adds a rule. Rules are tried in insertion order.
    pub fn with_rule(mut self, rule: impl LogRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub async fn classify<R: RunHandle>(&self, run: &R) -> Result<RunOutcome, ClassifyError> {
        let status = run
            .current_status()
            .await
            .map_err(|source| ClassifyError::Status {
                job_id: run.id().to_string(),
                source,
            })?;

        debug!("Run {} has status {}", run.id(), status);

        let outcome = match status {
            s if s.is_in_progress() => RunOutcome::Pending,
            RawStatus::Completed => {
                let data = run
                    .download_file(&self.config.result_archive)
                    .await
                    .map_err(|source| ClassifyError::ResultDownload {
                        job_id: run.id().to_string(),
                        file: self.config.result_archive.clone(),
                        source,
                    })?;
                RunOutcome::Succeeded(data)
            }
            RawStatus::Failed => RunOutcome::Failed(self.classify_failure(run).await),
            RawStatus::Canceled => RunOutcome::Cancelled,
            other => {
                warn!("Run {} reported unrecognized status {}", run.id(), other);
                RunOutcome::Failed(FailureReason::Unknown)
            }
        };

        Ok(outcome)
    }

    async fn classify_failure<R: RunHandle>(&self, run: &R) -> FailureReason {
        let logs = match run.fetch_logs(&self.config.log_prefix).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!("Could not fetch logs of failed run {}: {e}", run.id());
                return FailureReason::Unknown;
            }
        };

        logs.iter()
            .find(|log| log.file_name() == self.config.driver_log)
            .map(|log| self.scan_driver_log(&log.content))
            .unwrap_or(FailureReason::Unknown)
    }

    /// Runs the rules over a driver log; the first match wins.
    pub fn scan_driver_log(&self, driver_log: &str) -> FailureReason {
        self.rules
            .iter()
            .find_map(|rule| {
                rule.matches(driver_log).inspect(|reason| {
                    debug!("Log rule '{}' classified failure as {:?}", rule.name(), reason);
                })
            })
            .unwrap_or(FailureReason::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRun;

    fn driver_log(content: &str) -> RunLog {
        RunLog {
            path: format!("{LOG_PREFIX}/{DRIVER_LOG}"),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn running_phases_are_pending_without_touching_logs_or_files() {
        let classifier = StatusClassifier::default();
        for status in ["NotStarted", "Queued", "Starting", "Running", "Finalizing", "CancelRequested"] {
            let run = FakeRun::new("run", status.parse().unwrap());
            assert_eq!(classifier.classify(&run).await.unwrap(), RunOutcome::Pending);
            assert_eq!(run.log_fetches(), 0);
            assert_eq!(run.downloads(), 0);
        }
    }

    #[tokio::test]
    async fn completed_run_returns_result_archive() {
        let run = FakeRun::new("run", RawStatus::Completed).with_file(RESULT_ARCHIVE, b"PK-result");
        let outcome = StatusClassifier::default().classify(&run).await.unwrap();

        assert_eq!(outcome, RunOutcome::Succeeded(bytes::Bytes::from_static(b"PK-result")));
        assert_eq!(run.log_fetches(), 0);
    }

    #[tokio::test]
    async fn missing_result_archive_is_a_download_error() {
        let run = FakeRun::new("run", RawStatus::Completed);
        let err = StatusClassifier::default().classify(&run).await.unwrap_err();
        assert!(matches!(err, ClassifyError::ResultDownload { .. }));
    }

    #[tokio::test]
    async fn bad_zip_marker_in_driver_log_means_invalid_archive() {
        let run = FakeRun::new("run", RawStatus::Failed).with_log(driver_log(
            "Traceback (most recent call last):\nzipfile.BadZipFile: File is not a zip file",
        ));
        let outcome = StatusClassifier::default().classify(&run).await.unwrap();
        assert_eq!(outcome, RunOutcome::Failed(FailureReason::InvalidInputArchive));
    }

    #[tokio::test]
    async fn marker_in_other_log_files_is_ignored() {
        let run = FakeRun::new("run", RawStatus::Failed).with_log(RunLog {
            path: format!("{LOG_PREFIX}/55_azureml-execution.txt"),
            content: BAD_ZIP_FILE.to_string(),
        });
        let outcome = StatusClassifier::default().classify(&run).await.unwrap();
        assert_eq!(outcome, RunOutcome::Failed(FailureReason::Unknown));
    }

    #[tokio::test]
    async fn log_fetch_failure_degrades_to_unknown() {
        let run = FakeRun::new("run", RawStatus::Failed).failing_logs();
        let outcome = StatusClassifier::default().classify(&run).await.unwrap();
        assert_eq!(outcome, RunOutcome::Failed(FailureReason::Unknown));
    }

    #[tokio::test]
    async fn canceled_and_unrecognized_statuses() {
        let classifier = StatusClassifier::default();

        let run = FakeRun::new("run", RawStatus::Canceled);
        assert_eq!(classifier.classify(&run).await.unwrap(), RunOutcome::Cancelled);

        let run = FakeRun::new("run", RawStatus::Unrecognized("Paused".into()));
        assert_eq!(
            classifier.classify(&run).await.unwrap(),
            RunOutcome::Failed(FailureReason::Unknown)
        );
    }

    #[tokio::test]
    async fn custom_marker_replaces_the_default() {
        let classifier = StatusClassifier::new(ClassifierConfig::default())
            .with_rule(SubstringRule::invalid_archive("not a valid archive"));

        let run = FakeRun::new("run", RawStatus::Failed)
            .with_log(driver_log("error: not a valid archive (crc mismatch)"));
        assert_eq!(
            classifier.classify(&run).await.unwrap(),
            RunOutcome::Failed(FailureReason::InvalidInputArchive)
        );

        let run = FakeRun::new("run", RawStatus::Failed).with_log(driver_log(BAD_ZIP_FILE));
        assert_eq!(
            classifier.classify(&run).await.unwrap(),
            RunOutcome::Failed(FailureReason::Unknown)
        );
    }

    #[test]
    fn without_rules_every_failure_is_unknown() {
        let classifier = StatusClassifier::new(ClassifierConfig::default());
        assert_eq!(classifier.scan_driver_log(BAD_ZIP_FILE), FailureReason::Unknown);
    }
}
