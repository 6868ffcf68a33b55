use bytes::Bytes;
use heron_core::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// A run whose status, logs and files are fixed up front.
#[derive(Clone)]
pub struct FakeRun {
    id: String,
    status: RawStatus,
    logs: Vec<RunLog>,
    files: HashMap<String, Bytes>,
    fail_logs: bool,
    log_fetches: Arc<AtomicUsize>,
    downloads: Arc<AtomicUsize>,
}

impl FakeRun {
    pub fn new(id: &str, status: RawStatus) -> Self {
        Self {
            id: id.to_string(),
            status,
            logs: Vec::new(),
            files: HashMap::new(),
            fail_logs: false,
            log_fetches: Arc::default(),
            downloads: Arc::default(),
        }
    }

    pub fn with_log(mut self, log: RunLog) -> Self {
        self.logs.push(log);
        self
    }

    pub fn with_file(mut self, name: &str, data: &'static [u8]) -> Self {
        self.files.insert(name.to_string(), Bytes::from_static(data));
        self
    }

    pub fn failing_logs(mut self) -> Self {
        self.fail_logs = true;
        self
    }

    pub fn log_fetches(&self) -> usize {
        self.log_fetches.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl RunHandle for FakeRun {
    fn id(&self) -> &str {
        &self.id
    }

    async fn current_status(&self) -> Result<RawStatus, ComputeError> {
        Ok(self.status.clone())
    }

    async fn fetch_logs(&self, prefix: &str) -> Result<Vec<RunLog>, ComputeError> {
        self.log_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_logs {
            return Err(ComputeError::System("log service unavailable".into()));
        }
        Ok(self
            .logs
            .iter()
            .filter(|l| l.path.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn download_file(&self, name: &str) -> Result<Bytes, ComputeError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| ComputeError::NotFound(name.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub async fn get(&self, path: &str) -> Option<Bytes> {
        self.files.lock().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.files.lock().await.keys().cloned().collect()
    }
}

impl StorageBackend for MemoryStorage {
    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), StorageError> {
        self.files.lock().await.insert(path.to_string(), data);
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, StorageError> {
        self.get(path)
            .await
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.files.lock().await.contains_key(path))
    }
}

/// Records submissions and hands out runs registered with [`FakeCompute::insert`].
#[derive(Clone, Default)]
pub struct FakeCompute {
    submitted: Arc<Mutex<Vec<ExecutionRequest>>>,
    runs: Arc<Mutex<HashMap<String, FakeRun>>>,
    reject: bool,
}

impl FakeCompute {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub async fn submitted(&self) -> Vec<ExecutionRequest> {
        self.submitted.lock().await.clone()
    }

    pub async fn insert(&self, run: FakeRun) {
        self.runs.lock().await.insert(run.id.clone(), run);
    }
}

impl ComputeBackend for FakeCompute {
    type Run = FakeRun;

    async fn submit(&self, req: ExecutionRequest) -> Result<String, ComputeError> {
        if self.reject {
            return Err(ComputeError::System("quota exceeded".into()));
        }
        let mut submitted = self.submitted.lock().await;
        submitted.push(req);
        Ok(format!("run-{}", submitted.len()))
    }

    async fn get_run(&self, job_id: &str) -> Result<FakeRun, ComputeError> {
        self.runs
            .lock()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| ComputeError::NotFound(job_id.to_string()))
    }
}
