use crate::prelude::*;

use heron_core::prelude::*;
use heron_jobs::prelude::*;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info, warn};

pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// A run that reached a terminal state other than success.
#[derive(Debug, Error)]
enum RunError {
    #[error("Run {0} failed on an invalid input archive")]
    InvalidInput(String),
    #[error("Run {0} failed")]
    Failed(String),
    #[error("Run {0} was cancelled")]
    Cancelled(String),
}

fn envelope(kind: ErrorKind) -> ErrorEnvelope {
    ErrorEnvelope::new(kind, DEFAULT_AUTH_HEADER)
}

impl ApiError {
    fn envelope(&self) -> ErrorEnvelope {
        if let Some(err) = self.0.downcast_ref::<AuthRejection>() {
            return match err.source {
                AuthError::Missing => {
                    warn!("Rejected request: {err}");
                    ErrorEnvelope::new(ErrorKind::Unauthorized, &err.header)
                }
                AuthError::Invalid => {
                    warn!("Rejected request: {err}");
                    ErrorEnvelope::new(ErrorKind::Forbidden, &err.header)
                }
                AuthError::System(_) => {
                    error!("Internal Auth Provider Error: {:?}", self.0);
                    envelope(ErrorKind::InternalError)
                }
            };
        }

        if let Some(err) = self.0.downcast_ref::<SubmitError>() {
            return match err {
                SubmitError::ModelNotFound(_) => {
                    warn!("{err}");
                    envelope(ErrorKind::NotFound).with_extra_details(ExtraDetails::InvalidModelId)
                }
                _ => {
                    error!("Internal Server SubmitError: {:?}", self.0);
                    envelope(ErrorKind::InternalError)
                }
            };
        }

        if let Some(err) = self.0.downcast_ref::<FetchError>() {
            return match err {
                FetchError::JobNotFound(_) => {
                    warn!("{err}");
                    envelope(ErrorKind::NotFound).with_extra_details(ExtraDetails::InvalidRunId)
                }
                _ => {
                    error!("Internal Server FetchError: {:?}", self.0);
                    envelope(ErrorKind::InternalError)
                }
            };
        }

        if let Some(err) = self.0.downcast_ref::<RunError>() {
            return match err {
                RunError::InvalidInput(_) => {
                    warn!("{err}");
                    envelope(ErrorKind::BadRequest).with_extra_details(ExtraDetails::InvalidZipFile)
                }
                RunError::Cancelled(_) => {
                    warn!("{err}");
                    envelope(ErrorKind::InternalError)
                        .with_extra_details(ExtraDetails::RunCancelled)
                }
                RunError::Failed(_) => {
                    error!("{err}");
                    envelope(ErrorKind::InternalError)
                }
            };
        }

        error!("Internal Server Error: {:?}", self.0);
        envelope(ErrorKind::InternalError)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = self.envelope();
        let status =
            StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(envelope)).into_response()
    }
}

/// GET /v1/ping
pub async fn ping(_: Authenticated) -> StatusCode {
    StatusCode::OK
}

/// POST /v1/model/start/{model_id}
/// Stages the raw body and starts a run. Returns the job id.
pub async fn start_model<S: HeronServices>(
    State(state): State<AppState<S>>,
    _: Authenticated,
    Path(model_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req = JobRequest {
        model_id,
        payload: body,
        experiment_name: state.config.experiment_name.clone(),
    };

    let (handle, staged) = state.submitter.submit(req).await?;
    info!(
        "Job {} staged {} bytes at {}",
        handle.job_id, staged.size_bytes, staged.storage_path
    );

    Ok((StatusCode::CREATED, handle.job_id))
}

/// GET /v1/model/results/{job_id}
pub async fn model_results<S: HeronServices>(
    State(state): State<AppState<S>>,
    _: Authenticated,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let res = match state.fetcher.fetch_result(&job_id).await? {
        RunOutcome::Pending => StatusCode::ACCEPTED.into_response(),
        RunOutcome::Succeeded(data) => {
            ([(header::CONTENT_TYPE, "application/zip")], data).into_response()
        }
        RunOutcome::Failed(FailureReason::InvalidInputArchive) => {
            return Err(RunError::InvalidInput(job_id).into());
        }
        RunOutcome::Failed(FailureReason::Unknown) => return Err(RunError::Failed(job_id).into()),
        RunOutcome::Cancelled => return Err(RunError::Cancelled(job_id).into()),
    };

    Ok(res)
}
