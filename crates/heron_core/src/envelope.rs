//! The JSON error body returned by every failing gateway endpoint.
//!
//! This is the only part of the wire contract clients parse, so the field set is stable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad error category, one per HTTP status the gateway can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalError,
}

impl ErrorKind {
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::InternalError => 500,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InternalError => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "InvalidInput",
            ErrorKind::Unauthorized => "NoAuthenticationInformation",
            ErrorKind::Forbidden => "AuthenticationFailed",
            ErrorKind::NotFound => "ResourceNotFound",
            ErrorKind::InternalError => "InternalError",
        }
    }

    /// Human readable detail. `auth_header` is named in the auth failures.
    pub fn detail(self, auth_header: &str) -> String {
        match self {
            ErrorKind::BadRequest => "Input file is not in correct format.".to_string(),
            ErrorKind::Unauthorized => format!(
                "Server failed to authenticate the request. Make sure the value of the {auth_header} header is populated."
            ),
            ErrorKind::Forbidden => format!(
                "Server failed to authenticate the request. Make sure the value of the {auth_header} header is correct."
            ),
            ErrorKind::NotFound => "The specified resource does not exist.".to_string(),
            ErrorKind::InternalError => {
                "The server encountered an internal error. Please retry the request.".to_string()
            }
        }
    }
}

/// Fine-grained reason attached to a few specific failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraDetails {
    InvalidModelId,
    InvalidZipFile,
    RunCancelled,
    InvalidRunId,
}

impl fmt::Display for ExtraDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtraDetails::InvalidModelId => "InvalidModelId",
            ExtraDetails::InvalidZipFile => "InvalidZipFile",
            ExtraDetails::RunCancelled => "RunCancelled",
            ExtraDetails::InvalidRunId => "InvalidRunId",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub title: String,
    pub detail: String,
    pub status: u16,
    #[serde(
        rename = "extraDetails",
        alias = "extra_details",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extra_details: Option<ExtraDetails>,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, auth_header: &str) -> Self {
        Self {
            code: kind.code().to_string(),
            title: kind.title().to_string(),
            detail: kind.detail(auth_header),
            status: kind.status(),
            extra_details: None,
        }
    }

    pub fn with_extra_details(mut self, extra: ExtraDetails) -> Self {
        self.extra_details = Some(extra);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_AUTH_HEADER;

    #[test]
    fn extra_details_are_omitted_unless_set() {
        let plain = ErrorEnvelope::new(ErrorKind::InternalError, DEFAULT_AUTH_HEADER);
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("extraDetails").is_none());
        assert_eq!(json["status"], 500);
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");

        let cancelled = plain.with_extra_details(ExtraDetails::RunCancelled);
        let json = serde_json::to_value(&cancelled).unwrap();
        assert_eq!(json["extraDetails"], "RunCancelled");
    }

    #[test]
    fn auth_details_name_the_header() {
        let env = ErrorEnvelope::new(ErrorKind::Forbidden, "X_SECRET");
        assert!(env.detail.contains("X_SECRET"));
        assert_eq!(env.title, "AuthenticationFailed");
    }

    #[test]
    fn accepts_snake_case_extra_details() {
        let raw = r#"{"code":"NOT_FOUND","title":"ResourceNotFound","detail":"d","status":404,"extra_details":"InvalidRunId"}"#;
        let env: ErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.extra_details, Some(ExtraDetails::InvalidRunId));
    }
}
