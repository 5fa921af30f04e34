//! Error taxonomy shared by the gateway and replicator binaries.

use thiserror::Error;

/// Common result type for s3gw operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the S3 proxy.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing or invalid Authorization header")]
    Unauthenticated,

    #[error("unknown access key: {0}")]
    UnknownPrincipal(String),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("misconfigured: {0}")]
    Misconfigured(String),

    #[error("backend failure: {0}")]
    BackendFailure(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient error: {0}")]
    Transient(String),
}

impl Error {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::BackendFailure(_))
    }

    /// HTTP status code for the admin (JSON) surface.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::UnknownPrincipal(_) | Self::SignatureMismatch => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Misconfigured(_) => 500,
            Self::BackendFailure(_) | Self::Transient(_) => 502,
        }
    }

    /// S3-style error code for the data-plane (XML) surface.
    #[must_use]
    pub fn s3_error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "AccessDenied",
            Self::UnknownPrincipal(_) => "InvalidAccessKeyId",
            Self::SignatureMismatch => "SignatureDoesNotMatch",
            Self::NotFound(_) => "NoSuchKey",
            Self::Conflict(_) => "BucketAlreadyExists",
            Self::Misconfigured(_) => "InternalError",
            Self::BackendFailure(_) | Self::Transient(_) => "ServiceUnavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_maps_to_401() {
        assert_eq!(Error::Unauthenticated.http_status_code(), 401);
        assert_eq!(Error::Unauthenticated.s3_error_code(), "AccessDenied");
    }

    #[test]
    fn signature_mismatch_maps_to_403() {
        assert_eq!(Error::SignatureMismatch.http_status_code(), 403);
    }

    #[test]
    fn backend_failure_is_retryable() {
        assert!(Error::BackendFailure("timeout".into()).is_retryable());
        assert!(!Error::NotFound("x".into()).is_retryable());
    }
}
