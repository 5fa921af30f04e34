//! SigV4-specific error variants, convertible into the shared taxonomy.

use s3gw_common::Error as CommonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingAuthHeader,

    #[error("invalid Authorization header")]
    InvalidAuthHeader,

    #[error("unsupported signature version")]
    InvalidSignatureVersion,

    #[error("missing date header")]
    MissingDateHeader,

    #[error("invalid date format")]
    InvalidDateFormat,

    #[error("request has expired")]
    RequestExpired,

    #[error("missing signed header: {0}")]
    MissingSignedHeader(String),

    #[error("unknown access key: {0}")]
    UnknownAccessKey(String),

    #[error("signature mismatch")]
    SignatureMismatch,
}

impl From<AuthError> for CommonError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownAccessKey(key) => CommonError::UnknownPrincipal(key),
            AuthError::SignatureMismatch => CommonError::SignatureMismatch,
            other => {
                tracing::debug!("auth failure: {other}");
                CommonError::Unauthenticated
            }
        }
    }
}
