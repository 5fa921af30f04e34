//! S3 data-plane router: GET/PUT/DELETE/HEAD on a single object key.

use crate::error::S3Error;
use crate::state::AppState;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, PutOptions, PutPayload};
use s3gw_common::error::Error as CommonError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Resolved tenant identity, attached to the request by [`crate::auth::auth_layer`].
#[derive(Clone, Debug)]
pub struct TenantIdentity {
    pub customer_id: String,
    pub access_key: String,
}

#[derive(Debug, Deserialize)]
pub struct BackendQuery {
    pub backend_id: Option<String>,
}

fn resolve_backend_id(state: &AppState, query: &BackendQuery) -> String {
    query
        .backend_id
        .clone()
        .unwrap_or_else(|| state.backends.default_backend_id().to_string())
}

pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantIdentity>,
    Path((logical_name, object_path)): Path<(String, String)>,
    Query(query): Query<BackendQuery>,
) -> Result<Response, S3Error> {
    let backend_id = resolve_backend_id(&state, &query);
    let mapping = state
        .meta
        .fetch_bucket_mapping(&tenant.customer_id, &logical_name, &backend_id)
        .map_err(S3Error::from)?
        .ok_or_else(|| CommonError::NotFound("Bucket mapping not found for backend".to_string()))?;

    let client = state
        .backends
        .client_for(&backend_id, &mapping.backend_bucket)
        .await
        .map_err(CommonError::from)?;

    let result = client
        .get(&ObjectPath::from(object_path.as_str()))
        .await
        .map_err(|e| CommonError::from(s3gw_backend::BackendError::from(e)))?;

    let content_type = result
        .attributes
        .get(&Attribute::ContentType)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let etag = result.meta.e_tag.clone().unwrap_or_default();
    let bytes = result
        .bytes()
        .await
        .map_err(|e| CommonError::BackendFailure(e.to_string()))?;

    info!(tenant = %tenant.customer_id, logical_name, backend_id, "get_object");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type), (header::ETAG, etag)],
        bytes,
    )
        .into_response())
}

pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantIdentity>,
    Path((logical_name, object_path)): Path<(String, String)>,
    Query(query): Query<BackendQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, S3Error> {
    let backend_id = resolve_backend_id(&state, &query);
    let mapping = state
        .meta
        .fetch_bucket_mapping(&tenant.customer_id, &logical_name, &backend_id)
        .map_err(S3Error::from)?
        .ok_or_else(|| CommonError::NotFound("Bucket mapping not found for backend".to_string()))?;

    let client = state
        .backends
        .client_for(&backend_id, &mapping.backend_bucket)
        .await
        .map_err(CommonError::from)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, content_type.into());

    client
        .put_opts(
            &ObjectPath::from(object_path.as_str()),
            PutPayload::from(body),
            PutOptions {
                attributes,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| CommonError::from(s3gw_backend::BackendError::from(e)))?;

    info!(tenant = %tenant.customer_id, logical_name, backend_id, "put_object");

    Ok((
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "uploaded", "backend": backend_id })),
    )
        .into_response())
}

pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantIdentity>,
    Path((logical_name, object_path)): Path<(String, String)>,
    Query(query): Query<BackendQuery>,
) -> Result<Response, S3Error> {
    let backend_id = resolve_backend_id(&state, &query);
    let mapping = state
        .meta
        .fetch_bucket_mapping(&tenant.customer_id, &logical_name, &backend_id)
        .map_err(S3Error::from)?
        .ok_or_else(|| CommonError::NotFound("Bucket mapping not found for backend".to_string()))?;

    let client = state
        .backends
        .client_for(&backend_id, &mapping.backend_bucket)
        .await
        .map_err(CommonError::from)?;

    client
        .delete(&ObjectPath::from(object_path.as_str()))
        .await
        .map_err(|e| CommonError::from(s3gw_backend::BackendError::from(e)))?;

    info!(tenant = %tenant.customer_id, logical_name, backend_id, "delete_object");

    Ok((
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "deleted", "backend": backend_id })),
    )
        .into_response())
}

pub async fn head_object(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantIdentity>,
    Path((logical_name, object_path)): Path<(String, String)>,
    Query(query): Query<BackendQuery>,
) -> Result<Response, S3Error> {
    let backend_id = resolve_backend_id(&state, &query);
    let mapping = state
        .meta
        .fetch_bucket_mapping(&tenant.customer_id, &logical_name, &backend_id)
        .map_err(S3Error::from)?
        .ok_or_else(|| CommonError::NotFound("Bucket mapping not found for backend".to_string()))?;

    let client = state
        .backends
        .client_for(&backend_id, &mapping.backend_bucket)
        .await
        .map_err(CommonError::from)?;

    let meta = client
        .head(&ObjectPath::from(object_path.as_str()))
        .await
        .map_err(|e| CommonError::from(s3gw_backend::BackendError::from(e)))?;

    Ok((
        StatusCode::OK,
        [(header::ETAG, meta.e_tag.unwrap_or_default())],
        Body::empty(),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3gw_backend::BackendConfig;
    use s3gw_meta::MetaStore;
    use std::collections::HashMap;

    fn state_with_default_backend(default_backend_id: &str) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::sync::Arc::new(MetaStore::open(dir.path().join("meta.redb")).unwrap());
        let backends = std::sync::Arc::new(s3gw_backend::BackendRegistry::new(BackendConfig {
            default_backend_id: default_backend_id.to_string(),
            endpoints: HashMap::new(),
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
        }));
        AppState {
            meta,
            backends,
            admin_api_key: None,
        }
    }

    #[test]
    fn explicit_backend_query_wins_over_default() {
        let state = state_with_default_backend("primary");
        let query = BackendQuery {
            backend_id: Some("secondary".to_string()),
        };
        assert_eq!(resolve_backend_id(&state, &query), "secondary");
    }

    #[test]
    fn missing_backend_query_falls_back_to_default() {
        let state = state_with_default_backend("primary");
        let query = BackendQuery { backend_id: None };
        assert_eq!(resolve_backend_id(&state, &query), "primary");
    }
}
