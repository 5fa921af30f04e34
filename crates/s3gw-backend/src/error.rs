//! Errors surfaced while resolving or talking to a backend bucket.

use s3gw_common::error::Error as CommonError;

/// Errors raised while resolving or building a backend client.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("no endpoint configured for backend {0}")]
    UnknownBackend(String),

    #[error("backend credentials not configured")]
    MissingCredentials,

    #[error("failed to build backend client: {0}")]
    ClientBuildFailed(String),

    #[error("backend request failed: {0}")]
    RequestFailed(#[from] object_store::Error),
}

impl From<BackendError> for CommonError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::UnknownBackend(_) | BackendError::MissingCredentials => {
                CommonError::Misconfigured(err.to_string())
            }
            BackendError::ClientBuildFailed(_) => CommonError::Misconfigured(err.to_string()),
            BackendError::RequestFailed(object_store::Error::NotFound { .. }) => {
                CommonError::NotFound(err.to_string())
            }
            BackendError::RequestFailed(_) => CommonError::BackendFailure(err.to_string()),
        }
    }
}
