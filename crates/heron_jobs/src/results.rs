use crate::classify::{ClassifyError, StatusClassifier};

use heron_core::prelude::*;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Maps to **HTTP 404** with `InvalidRunId`.
    #[error("Run {0} not found")]
    JobNotFound(String),

    #[error("Failed to look up run {job_id}: {source}")]
    Lookup {
        job_id: String,
        #[source]
        source: ComputeError,
    },

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

/// Resolves job ids to their current [`RunOutcome`].
///
/// Holds no job state of its own, any instance can answer for any job id.
#[derive(Clone)]
pub struct ResultFetcher<C> {
    compute: C,
    classifier: StatusClassifier,
}

impl<C: ComputeBackend> ResultFetcher<C> {
    pub fn new(compute: C, classifier: StatusClassifier) -> Self {
        Self {
            compute,
            classifier,
        }
    }

    pub fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    pub async fn fetch_result(&self, job_id: &str) -> Result<RunOutcome, FetchError> {
        info!("Checking run {job_id}");

        let run = self.compute.get_run(job_id).await.map_err(|e| match e {
            ComputeError::NotFound(_) => FetchError::JobNotFound(job_id.to_string()),
            source => FetchError::Lookup {
                job_id: job_id.to_string(),
                source,
            },
        })?;

        match self.classifier.classify(&run).await {
            Ok(outcome) => {
                if outcome.is_terminal() {
                    info!("Run {job_id} has finished: {}", describe(&outcome));
                }
                Ok(outcome)
            }
            Err(ClassifyError::Status {
                source: ComputeError::NotFound(_),
                ..
            }) => Err(FetchError::JobNotFound(job_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

fn describe(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Pending => "pending".to_string(),
        RunOutcome::Succeeded(data) => format!("succeeded with {} byte result", data.len()),
        RunOutcome::Failed(reason) => format!("failed ({reason:?})"),
        RunOutcome::Cancelled => "cancelled".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCompute, FakeRun};
    use heron_core::constants::names::RESULT_ARCHIVE;

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let fetcher = ResultFetcher::new(FakeCompute::default(), StatusClassifier::default());

        let err = fetcher.fetch_result("invalid_run_id").await.unwrap_err();
        assert!(matches!(err, FetchError::JobNotFound(id) if id == "invalid_run_id"));
    }

    #[tokio::test]
    async fn completed_job_is_byte_identical_across_polls() {
        let compute = FakeCompute::default();
        compute
            .insert(FakeRun::new("done", RawStatus::Completed).with_file(RESULT_ARCHIVE, b"PK\x05\x06zip"))
            .await;
        let fetcher = ResultFetcher::new(compute, StatusClassifier::default());

        let first = fetcher.fetch_result("done").await.unwrap();
        let second = fetcher.fetch_result("done").await.unwrap();

        assert!(matches!(first, RunOutcome::Succeeded(_)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn download_failure_stays_distinct_from_not_found() {
        let compute = FakeCompute::default();
        compute.insert(FakeRun::new("broken", RawStatus::Completed)).await;
        let fetcher = ResultFetcher::new(compute, StatusClassifier::default());

        let err = fetcher.fetch_result("broken").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Classify(ClassifyError::ResultDownload { .. })
        ));
    }
}
