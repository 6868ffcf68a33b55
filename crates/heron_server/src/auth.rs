use crate::api::ApiError;
use crate::state::AppState;

use heron_core::prelude::*;
use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A marker indicating the request carried the right shared secret.
#[derive(Clone, Copy, Debug)]
pub struct Authenticated;

/// An [`AuthError`] together with the header that was checked.
#[derive(Debug, Error)]
#[error("{source} ({header})")]
pub struct AuthRejection {
    pub header: String,
    #[source]
    pub source: AuthError,
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
    S: HeronServices,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let header = state.config.auth_header.as_str();

        let result = match parts.headers.get(header) {
            None => state.auth().verify(None).await,
            Some(value) => match value.to_str() {
                Ok(credential) => state.auth().verify(Some(credential)).await,
                Err(_) => Err(AuthError::Invalid),
            },
        };

        result.map(|_| Authenticated).map_err(|source| {
            ApiError::from(AuthRejection {
                header: header.to_string(),
                source,
            })
        })
    }
}

/// Accepts requests carrying one static secret.
///
/// Only the SHA-256 digest of the secret is kept. Credentials are compared by digest.
#[derive(Clone)]
pub struct SharedSecretAuth {
    digest: [u8; 32],
}

impl SharedSecretAuth {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            digest: Sha256::digest(secret.as_ref()).into(),
        }
    }
}

impl AuthProvider for SharedSecretAuth {
    async fn verify(&self, credential: Option<&str>) -> Result<(), AuthError> {
        let credential = credential.ok_or(AuthError::Missing)?;
        let digest: [u8; 32] = Sha256::digest(credential.as_bytes()).into();

        if digest == self.digest {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}
