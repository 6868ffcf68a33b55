//! # Heron Compute Mock
//! [![Crates.io](https://img.shields.io/crates/v/heron_compute_mock.svg)](https://crates.io/crates/heron_compute_mock)
//! [![Docs](https://docs.rs/heron_compute_mock/badge.svg)](https://docs.rs/heron_compute_mock/)
//!
//! An in-process compute backend for development and testing.
//!
//! Submitted runs are executed by a pass-through scorer on a background task: the
//! staged payload is read back from storage, its first image is returned as
//! `segmentation.dcm` inside the result archive, and the staged payload is scrubbed
//! once the scorer is done. Payloads that are not zip archives fail the run with a
//! `zipfile.BadZipFile` driver log, the same way the real scoring environment does.
//!
//! Runs can also be scripted with [`MockComputeBackend::insert_run`] and
//! [`MockComputeBackend::set_status`].
//!
//! **DO NOT use this in production!!!**
//!
//! ## Usage
//!
//! ```no_run
//! # use heron_compute_mock::MockComputeBackend;
//! # use heron_fs::FileSystemStorage;
//! # fn main() {
//! let storage = FileSystemStorage::new("./heron_staging");
//! let compute = MockComputeBackend::new(storage);
//! # }
//! ```

use bytes::Bytes;
use heron_core::prelude::{markers::*, names::*, *};
use heron_jobs::scrub::run_then_scrub;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the single entry inside the result archive.
pub const SEGMENTATION_FILE: &str = "segmentation.dcm";

#[derive(Clone, Debug)]
struct MockRunState {
    status: RawStatus,
    request: Option<ExecutionRequest>,
    logs: Vec<RunLog>,
    files: HashMap<String, Bytes>,
}

impl MockRunState {
    fn new(status: RawStatus, request: Option<ExecutionRequest>) -> Self {
        Self {
            status,
            request,
            logs: Vec::new(),
            files: HashMap::new(),
        }
    }
}

type Runs = Arc<RwLock<HashMap<String, MockRunState>>>;

#[derive(Clone)]
pub struct MockComputeBackend<S> {
    storage: S,
    runs: Runs,
    delay: Duration,
}

impl<S: StorageBackend> MockComputeBackend<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            runs: Arc::default(),
            delay: Duration::ZERO,
        }
    }

    /// How long a submitted run stays queued before the scorer starts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Adds a run that is not backed by the scorer.
    pub async fn insert_run(&self, job_id: &str, status: RawStatus) {
        self.runs
            .write()
            .await
            .insert(job_id.to_string(), MockRunState::new(status, None));
    }

    /// Returns `false` if the run does not exist.
    pub async fn set_status(&self, job_id: &str, status: RawStatus) -> bool {
        match self.runs.write().await.get_mut(job_id) {
            Some(run) => {
                run.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn add_log(&self, job_id: &str, log: RunLog) -> bool {
        match self.runs.write().await.get_mut(job_id) {
            Some(run) => {
                run.logs.push(log);
                true
            }
            None => false,
        }
    }

    pub async fn add_file(&self, job_id: &str, name: &str, data: Bytes) -> bool {
        match self.runs.write().await.get_mut(job_id) {
            Some(run) => {
                run.files.insert(name.to_string(), data);
                true
            }
            None => false,
        }
    }

    /// The request a run was submitted with.
    pub async fn request(&self, job_id: &str) -> Option<ExecutionRequest> {
        self.runs
            .read()
            .await
            .get(job_id)
            .and_then(|run| run.request.clone())
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

impl<S: StorageBackend> ComputeBackend for MockComputeBackend<S> {
    type Run = MockRun;

    async fn submit(&self, req: ExecutionRequest) -> Result<String, ComputeError> {
        if req.environment.is_empty() {
            return Err(ComputeError::InvalidRequest("No environment given".into()));
        }

        let job_id = format!("mock-run-{}", uuid::Uuid::new_v4());
        self.runs.write().await.insert(
            job_id.clone(),
            MockRunState::new(RawStatus::Queued, Some(req.clone())),
        );

        let runs = self.runs.clone();
        let storage = self.storage.clone();
        let delay = self.delay;
        let id = job_id.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            execute(runs, storage, id, req).await;
        });

        info!("Queued mock run {job_id}");
        Ok(job_id)
    }

    async fn get_run(&self, job_id: &str) -> Result<MockRun, ComputeError> {
        if !self.runs.read().await.contains_key(job_id) {
            return Err(ComputeError::NotFound(job_id.to_string()));
        }
        Ok(MockRun {
            id: job_id.to_string(),
            runs: self.runs.clone(),
        })
    }
}

/// Plays the remote side of one run.
async fn execute<S: StorageBackend>(runs: Runs, storage: S, job_id: String, req: ExecutionRequest) {
    if !update(&runs, &job_id, |run| run.status = RawStatus::Running).await {
        // Replaced by a scripted run in the meantime.
        return;
    }

    let path = req.staged_path.as_str();
    let scored = run_then_scrub(&storage, path, async {
        let payload = storage
            .read_file(path)
            .await
            .map_err(|e| format!("FileNotFoundError: {e}"))?;
        score(&payload)
    })
    .await;

    let outcome = match scored {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Failed to scrub {path} for {job_id}: {e}");
            Err(format!("PermissionError: {e}"))
        }
    };

    update(&runs, &job_id, |run| match outcome {
        Ok(archive) => {
            run.files.insert(RESULT_ARCHIVE.to_string(), archive);
            run.status = RawStatus::Completed;
        }
        Err(trace) => {
            run.logs.push(RunLog {
                path: format!("{LOG_PREFIX}/{DRIVER_LOG}"),
                content: format!(
                    "Traceback (most recent call last):\n  File \"{}\", line 1, in <module>\n{trace}\n",
                    req.score_script
                ),
            });
            run.status = RawStatus::Failed;
        }
    })
    .await;

    info!("Mock run {job_id} finished");
}

async fn update(runs: &Runs, job_id: &str, f: impl FnOnce(&mut MockRunState)) -> bool {
    match runs.write().await.get_mut(job_id) {
        Some(run) if run.request.is_some() => {
            f(run);
            true
        }
        _ => false,
    }
}

/// The pass-through scorer: the first file of the input archive becomes the segmentation.
///
/// Errors are returned as the last line of the scorer's traceback.
fn score(payload: &[u8]) -> Result<Bytes, String> {
    let mut input = ZipArchive::new(Cursor::new(payload))
        .map_err(|_| format!("{BAD_ZIP_FILE}: File is not a zip file"))?;

    let index = (0..input.len())
        .find(|&i| input.by_index(i).is_ok_and(|f| f.is_file()))
        .ok_or_else(|| "ValueError: No image files in the input archive".to_string())?;

    let mut image = Vec::new();
    input
        .by_index(index)
        .map_err(|e| format!("{BAD_ZIP_FILE}: {e}"))?
        .read_to_end(&mut image)
        .map_err(|e| format!("{BAD_ZIP_FILE}: {e}"))?;

    let mut output = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    output
        .start_file(SEGMENTATION_FILE, options)
        .map_err(|e| format!("OSError: {e}"))?;
    output
        .write_all(&image)
        .map_err(|e| format!("OSError: {e}"))?;

    let cursor = output.finish().map_err(|e| format!("OSError: {e}"))?;
    Ok(Bytes::from(cursor.into_inner()))
}

pub struct MockRun {
    id: String,
    runs: Runs,
}

impl MockRun {
    async fn state(&self) -> Result<MockRunState, ComputeError> {
        self.runs
            .read()
            .await
            .get(&self.id)
            .cloned()
            .ok_or_else(|| ComputeError::NotFound(self.id.clone()))
    }
}

impl RunHandle for MockRun {
    fn id(&self) -> &str {
        &self.id
    }

    async fn current_status(&self) -> Result<RawStatus, ComputeError> {
        Ok(self.state().await?.status)
    }

    async fn fetch_logs(&self, prefix: &str) -> Result<Vec<RunLog>, ComputeError> {
        Ok(self
            .state()
            .await?
            .logs
            .into_iter()
            .filter(|log| log.path.starts_with(prefix))
            .collect())
    }

    async fn download_file(&self, name: &str) -> Result<Bytes, ComputeError> {
        self.state()
            .await?
            .files
            .remove(name)
            .ok_or_else(|| ComputeError::NotFound(format!("{}/{name}", self.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_fs::FileSystemStorage;
    use heron_jobs::scrub::is_scrubbed;

    fn zip_with(name: &str, data: &[u8]) -> Bytes {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
        Bytes::from(zip.finish().unwrap().into_inner())
    }

    fn request(staged_path: &str) -> ExecutionRequest {
        ExecutionRequest {
            experiment_name: "tests".into(),
            environment: "heron-env:1".into(),
            model_id: "PassThroughModel:1729".into(),
            staged_path: staged_path.into(),
            entry_point: ENTRY_POINT.into(),
            score_script: SCORE_SCRIPT.into(),
        }
    }

    async fn wait_terminal(compute: &MockComputeBackend<FileSystemStorage>, id: &str) -> RawStatus {
        for _ in 0..200 {
            let status = compute.get_run(id).await.unwrap().current_status().await.unwrap();
            if !status.is_in_progress() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {id} did not finish");
    }

    #[test]
    fn scorer_passes_the_first_image_through() {
        let result = score(&zip_with("image.dcm", b"DICM")).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(result)).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), SEGMENTATION_FILE);
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"DICM");
    }

    #[test]
    fn scorer_rejects_non_zip_payloads() {
        let err = score(&[7u8; 1024]).unwrap_err();
        assert!(err.starts_with(BAD_ZIP_FILE), "{err}");
    }

    #[tokio::test]
    async fn submitted_run_completes_and_scrubs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let path = storage.get_staging_path(DEFAULT_IMAGE_DATA_FOLDER, "a");
        storage.write_file(&path, zip_with("image.dcm", b"DICM")).await.unwrap();

        let compute = MockComputeBackend::new(storage.clone());
        let id = compute.submit(request(&path)).await.unwrap();

        assert_eq!(wait_terminal(&compute, &id).await, RawStatus::Completed);
        let run = compute.get_run(&id).await.unwrap();
        assert!(run.download_file(RESULT_ARCHIVE).await.is_ok());
        assert!(is_scrubbed(&storage, &path).await.unwrap());
        assert_eq!(compute.request(&id).await.unwrap().model_id, "PassThroughModel:1729");
    }

    #[tokio::test]
    async fn bad_payload_fails_with_driver_log() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let path = storage.get_staging_path(DEFAULT_IMAGE_DATA_FOLDER, "b");
        storage.write_file(&path, Bytes::from(vec![1u8; 1024])).await.unwrap();

        let compute = MockComputeBackend::new(storage.clone());
        let id = compute.submit(request(&path)).await.unwrap();

        assert_eq!(wait_terminal(&compute, &id).await, RawStatus::Failed);
        let logs = compute.get_run(&id).await.unwrap().fetch_logs(LOG_PREFIX).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].file_name(), DRIVER_LOG);
        assert!(logs[0].content.contains("zipfile.BadZipFile: File is not a zip file"));
        assert!(is_scrubbed(&storage, &path).await.unwrap());
    }

    #[tokio::test]
    async fn scripted_runs() {
        let dir = tempfile::tempdir().unwrap();
        let compute = MockComputeBackend::new(FileSystemStorage::new(dir.path()));

        assert!(matches!(
            compute.get_run("missing").await,
            Err(ComputeError::NotFound(_))
        ));
        assert!(!compute.set_status("missing", RawStatus::Canceled).await);

        compute.insert_run("scripted", RawStatus::Running).await;
        assert!(compute.set_status("scripted", RawStatus::Canceled).await);

        let run = compute.get_run("scripted").await.unwrap();
        assert_eq!(run.current_status().await.unwrap(), RawStatus::Canceled);
        assert!(compute.request("scripted").await.is_none());
    }
}
