//! Error-to-response mapping for both the admin (JSON) and data-plane
//! (XML) surfaces.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use s3gw_common::error::Error as CommonError;

/// Wraps `s3gw_common::Error` and selects the JSON rendering used by the
/// `/proxy/*` admin surface.
pub struct AdminError(pub CommonError);

impl From<CommonError> for AdminError {
    fn from(err: CommonError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({ "detail": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Wraps `s3gw_common::Error` and selects the S3-style XML rendering used
/// by the `/s3/*` data-plane surface.
pub struct S3Error(pub CommonError);

impl From<CommonError> for S3Error {
    fn from(err: CommonError) -> Self {
        Self(err)
    }
}

impl IntoResponse for S3Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
</Error>"#,
            self.0.s3_error_code(),
            self.0
        );

        Response::builder()
            .status(status)
            .header("Content-Type", "application/xml")
            .body(Body::from(xml))
            .unwrap_or_else(|_| {
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::empty())
                    .unwrap()
            })
    }
}
