/// Header carrying the shared secret, unless overridden in the server config.
pub const DEFAULT_AUTH_HEADER: &str = "API_AUTH_SECRET";

/// Text written over a staged payload once the remote job is done with it.
pub const DELETED_IMAGE_DATA_NOTIFICATION: &str = "image data deleted";

pub mod names {
    /// File name of the staged payload inside its per-submission folder.
    pub const IMAGE_DATA_FILE: &str = "imagedata.zip";
    /// Result archive produced by a successful run.
    pub const RESULT_ARCHIVE: &str = "segmentation.dcm.zip";
    /// Prefix under which a run's captured logs live.
    pub const LOG_PREFIX: &str = "azureml-logs";
    /// The driver log, i.e. the run's captured stdout/stderr.
    pub const DRIVER_LOG: &str = "70_driver_log.txt";
    /// Model tag naming the execution environment the model was trained with.
    pub const ENVIRONMENT_TAG: &str = "python_environment_name";
    /// Remote entry operation and the scoring script it invokes.
    pub const ENTRY_POINT: &str = "run-scoring";
    pub const SCORE_SCRIPT: &str = "score.py";
    pub const DEFAULT_EXPERIMENT: &str = "heron-inference";
    pub const DEFAULT_IMAGE_DATA_FOLDER: &str = "temp-image-store";
}

pub mod markers {
    /// Emitted by the scorer when the uploaded payload is not a zip archive.
    pub const BAD_ZIP_FILE: &str = "zipfile.BadZipFile";
}

pub mod routes {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";

    pub const PING: &str = "/v1/ping";
    pub const MODEL_START: &str = "/v1/model/start/{model_id}";
    pub const MODEL_RESULTS: &str = "/v1/model/results/{job_id}";
}
