//! # Heron Client
//! [![Crates.io](https://img.shields.io/crates/v/heron_client.svg)](https://crates.io/crates/heron_client)
//! [![Docs](https://docs.rs/heron_client/badge.svg)](https://docs.rs/heron_client/)
//!
//! An async HTTP client for a Heron gateway.
//!
//! Submits zipped image series to a model and polls for the result archive.
//! Failures the gateway reports come back as [`HeronClientError::Api`] carrying the
//! parsed [`ErrorEnvelope`].
//!
//! ## Example
//!
//! ```no_run
//! use heron_client::HeronClient;
//! use std::time::Duration;
//!
//! async fn run() -> Result<(), heron_client::HeronClientError> {
//!     let client = HeronClient::new("http://localhost:5000", Some("my-secret".into()));
//!
//!     let job_id = client
//!         .start_file("PassThroughModel:1729", "series.zip".as_ref())
//!         .await?;
//!
//!     let result = client
//!         .wait_for_result(&job_id, Duration::from_secs(1), Duration::from_secs(600))
//!         .await?;
//!     tokio::fs::write("segmentation.dcm.zip", result).await?;
//!     Ok(())
//! }
//! ```

use bytes::Bytes;
use heron_core::prelude::{routes::*, *};
use reqwest::{Client, Response, StatusCode, Url};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HeronClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Base URL cannot carry a path: {0}")]
    InvalidBaseUrl(String),

    /// The gateway answered with its error envelope.
    #[error("Server returned error {}: {} ({})", .0.status, .0.title, .0.detail)]
    Api(ErrorEnvelope),

    /// Any other non-success answer.
    #[error("Server returned error {0}: {1}")]
    ServerError(StatusCode, String),

    #[error("Timed out waiting for job {0}")]
    Timeout(String),
}

impl HeronClientError {
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            HeronClientError::Api(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn extra_details(&self) -> Option<ExtraDetails> {
        self.envelope().and_then(|e| e.extra_details)
    }
}

pub type Result<T> = std::result::Result<T, HeronClientError>;

/// The answer to one poll of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPoll {
    Pending,
    Done(Bytes),
}

#[derive(Clone)]
pub struct HeronClient {
    base_url: String,
    client: Client,
    auth_header: String,
    secret: Option<String>,
}

impl HeronClient {
    pub fn new(base_url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            secret,
        }
    }

    /// Overrides the header the secret is sent in.
    pub fn with_auth_header(mut self, name: impl Into<String>) -> Self {
        self.auth_header = name.into();
        self
    }

    fn auth_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(secret) = &self.secret {
            builder.header(self.auth_header.as_str(), secret)
        } else {
            builder
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fills the trailing `{..}` placeholder of `route` with `id` as one encoded segment.
    fn id_url(&self, route: &str, id: &str) -> Result<Url> {
        let prefix = route.rsplit_once('/').map_or(route, |(prefix, _)| prefix);
        let mut url = Url::parse(&self.url(prefix))?;
        url.path_segments_mut()
            .map_err(|_| HeronClientError::InvalidBaseUrl(self.base_url.clone()))?
            .push(id);
        Ok(url)
    }

    /// Checks that the gateway is up and accepts our secret.
    pub async fn ping(&self) -> Result<()> {
        let response = self.auth_request(self.client.get(self.url(PING))).send().await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(())
    }

    /// Submits a payload to a model and returns the job id.
    pub async fn start(&self, model_id: &str, payload: impl Into<Bytes>) -> Result<String> {
        let url = self.id_url(MODEL_START, model_id)?;
        let response = self
            .auth_request(self.client.post(url))
            .body(payload.into())
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(error_from(response).await);
        }

        let job_id = response.text().await?;
        debug!("Started job {job_id} on {model_id}");
        Ok(job_id)
    }

    pub async fn start_file(&self, model_id: &str, path: &Path) -> Result<String> {
        let payload = tokio::fs::read(path).await?;
        self.start(model_id, payload).await
    }

    /// Polls a job once.
    pub async fn results(&self, job_id: &str) -> Result<JobPoll> {
        let url = self.id_url(MODEL_RESULTS, job_id)?;
        let response = self.auth_request(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::ACCEPTED => Ok(JobPoll::Pending),
            StatusCode::OK => Ok(JobPoll::Done(response.bytes().await?)),
            _ => Err(error_from(response).await),
        }
    }

    /// Polls every `interval` until the job is done, failed, or `timeout` passed.
    pub async fn wait_for_result(
        &self,
        job_id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Bytes> {
        let deadline = Instant::now() + timeout;
        loop {
            if let JobPoll::Done(data) = self.results(job_id).await? {
                return Ok(data);
            }
            if Instant::now() + interval > deadline {
                return Err(HeronClientError::Timeout(job_id.to_string()));
            }
            tokio::time::sleep(interval).await;
        }
    }
}

async fn error_from(response: Response) -> HeronClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => HeronClientError::Api(envelope),
        Err(_) => HeronClientError::ServerError(status, text),
    }
}
