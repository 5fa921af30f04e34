//! SigV4 authentication middleware for the `/s3/*` data-plane routes.

use crate::error::S3Error;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use s3gw_auth::{parse_authorization_header, verify};
use s3gw_common::error::Error as CommonError;
use std::sync::Arc;
use tracing::debug;

/// Verifies the `Authorization` header against the tenant's stored secret
/// and attaches the resolved tenant id to the request for downstream
/// handlers.
pub async fn auth_layer(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, S3Error> {
    let auth_header = request
        .headers()
        .get("authorization")
        .ok_or(CommonError::Unauthenticated)?
        .to_str()
        .map_err(|_| CommonError::Unauthenticated)?
        .to_string();

    let parsed = parse_authorization_header(&auth_header).map_err(|e| {
        debug!(error = %e, "rejecting request: bad authorization header");
        CommonError::Unauthenticated
    })?;

    let (_credential, secret_key) = state
        .meta
        .fetch_tenant_by_access_key(&parsed.access_key_id)
        .map_err(S3Error::from)?
        .ok_or_else(|| CommonError::UnknownPrincipal(parsed.access_key_id.clone()))?;

    verify(&request, &parsed, &secret_key).map_err(|e| match e {
        s3gw_auth::AuthError::SignatureMismatch => CommonError::SignatureMismatch,
        other => {
            debug!(error = %other, "rejecting request: signature verification failed");
            CommonError::Unauthenticated
        }
    })?;

    let mut request = request;
    request
        .extensions_mut()
        .insert(crate::s3::TenantIdentity {
            customer_id: _credential.customer_id,
            access_key: parsed.access_key_id,
        });

    Ok(next.run(request).await)
}

/// Gates the `/proxy/*` admin surface behind a static operator key.
pub async fn admin_layer(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, crate::error::AdminError> {
    let configured = state
        .admin_api_key
        .as_deref()
        .ok_or_else(|| CommonError::Misconfigured("ADMIN_API_KEY must be set".to_string()))?;

    let provided = request
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok());

    if provided != Some(configured) {
        return Err(CommonError::Unauthenticated.into());
    }

    Ok(next.run(request).await)
}
