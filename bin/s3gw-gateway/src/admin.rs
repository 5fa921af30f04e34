//! `/proxy/*` admin API: tenant credentials, bucket mappings, object
//! metadata, and replication jobs.

use crate::error::AdminError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use s3gw_common::error::Error as CommonError;
use s3gw_meta::JobStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
    pub customer_id: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub customer_id: String,
    pub access_key: String,
    pub created_at: u64,
}

pub async fn create_credential(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCredentialRequest>,
) -> Result<impl IntoResponse, AdminError> {
    state
        .meta
        .upsert_tenant_credential(&payload.customer_id, &payload.access_key, &payload.secret_key)?;
    let (row, _secret) = state
        .meta
        .fetch_tenant_by_access_key(&payload.access_key)?
        .ok_or_else(|| CommonError::NotFound("credential not found after insert".to_string()))?;
    Ok(Json(CredentialResponse {
        customer_id: row.customer_id,
        access_key: row.access_key,
        created_at: row.created_at,
    }))
}

pub async fn get_credential(
    State(state): State<Arc<AppState>>,
    Path(access_key): Path<String>,
) -> Result<impl IntoResponse, AdminError> {
    let (row, _secret) = state
        .meta
        .fetch_tenant_by_access_key(&access_key)?
        .ok_or_else(|| CommonError::NotFound("credential not found".to_string()))?;
    Ok(Json(CredentialResponse {
        customer_id: row.customer_id,
        access_key: row.access_key,
        created_at: row.created_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateBucketMappingRequest {
    pub customer_id: String,
    pub region_id: String,
    pub logical_name: String,
    pub backend_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BucketMappingResponse {
    pub customer_id: String,
    pub region_id: String,
    pub logical_name: String,
    pub backend_mapping: HashMap<String, String>,
}

pub async fn create_bucket_mapping(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBucketMappingRequest>,
) -> Result<impl IntoResponse, AdminError> {
    let backend_mapping = state.meta.create_bucket_mapping(
        &payload.customer_id,
        &payload.region_id,
        &payload.logical_name,
        &payload.backend_ids,
    )?;
    Ok(Json(BucketMappingResponse {
        customer_id: payload.customer_id,
        region_id: payload.region_id,
        logical_name: payload.logical_name,
        backend_mapping,
    }))
}

pub async fn get_bucket_mapping(
    State(state): State<Arc<AppState>>,
    Path((customer_id, logical_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, AdminError> {
    let rows = state.meta.get_bucket_mapping(&customer_id, &logical_name)?;
    if rows.is_empty() {
        return Err(CommonError::NotFound("Bucket mapping not found".to_string()).into());
    }
    let region_id = rows[0].region_id.clone();
    let backend_mapping = rows
        .into_iter()
        .map(|row| (row.backend_id, row.backend_bucket))
        .collect();
    Ok(Json(BucketMappingResponse {
        customer_id,
        region_id,
        logical_name,
        backend_mapping,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateObjectMetadataRequest {
    pub customer_id: String,
    pub logical_name: String,
    pub backend_id: String,
    pub object_key: String,
    pub size: u64,
    pub etag: String,
    pub encrypted_key: Option<String>,
    pub residency: Option<String>,
    pub replica_count: Option<u32>,
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ObjectMetadataResponse {
    pub id: u64,
    pub customer_id: String,
    pub logical_name: String,
    pub backend_id: String,
    pub backend_bucket: String,
    pub object_key: String,
    pub size: u64,
    pub etag: String,
    pub encrypted_key: Option<String>,
    pub residency: Option<String>,
    pub replica_count: Option<u32>,
    pub created_at: u64,
    pub jobs_created: Vec<ReplicationJobResponse>,
}

pub async fn create_object_metadata(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateObjectMetadataRequest>,
) -> Result<impl IntoResponse, AdminError> {
    let mapping = state
        .meta
        .fetch_bucket_mapping(&payload.customer_id, &payload.logical_name, &payload.backend_id)?
        .ok_or_else(|| CommonError::NotFound("Bucket mapping not found".to_string()))?;

    let object = state.meta.create_object_metadata(
        &payload.customer_id,
        &payload.logical_name,
        &payload.backend_id,
        &payload.object_key,
        payload.size,
        &payload.etag,
        payload.encrypted_key.clone(),
        payload.residency.clone(),
        payload.replica_count,
    )?;

    let mut jobs_created = Vec::new();
    for target in &payload.targets {
        let job = state.meta.insert_replication_job(object.id, target)?;
        jobs_created.push(ReplicationJobResponse::from_job(
            job,
            payload.customer_id.clone(),
            payload.logical_name.clone(),
        ));
    }

    Ok(Json(ObjectMetadataResponse {
        id: object.id,
        customer_id: payload.customer_id,
        logical_name: payload.logical_name,
        backend_id: payload.backend_id,
        backend_bucket: mapping.backend_bucket,
        object_key: object.object_key,
        size: object.size,
        etag: object.etag,
        encrypted_key: object.encrypted_key,
        residency: object.residency,
        replica_count: object.replica_count,
        created_at: object.created_at,
        jobs_created,
    }))
}

#[derive(Debug, Serialize)]
pub struct ObjectListResponse {
    pub customer_id: String,
    pub logical_name: String,
    pub objects: Vec<ObjectMetadataResponse>,
}

pub async fn list_object_metadata(
    State(state): State<Arc<AppState>>,
    Path((customer_id, logical_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, AdminError> {
    let rows = state.meta.list_object_metadata(&customer_id, &logical_name)?;
    let mappings = state.meta.get_bucket_mapping(&customer_id, &logical_name)?;

    let objects = rows
        .into_iter()
        .filter_map(|row| {
            let mapping = mappings.iter().find(|m| m.id == row.bucket_mapping_id)?;
            Some(ObjectMetadataResponse {
                id: row.id,
                customer_id: customer_id.clone(),
                logical_name: logical_name.clone(),
                backend_id: mapping.backend_id.clone(),
                backend_bucket: mapping.backend_bucket.clone(),
                object_key: row.object_key,
                size: row.size,
                etag: row.etag,
                encrypted_key: row.encrypted_key,
                residency: row.residency,
                replica_count: row.replica_count,
                created_at: row.created_at,
                jobs_created: Vec::new(),
            })
        })
        .collect();

    Ok(Json(ObjectListResponse {
        customer_id,
        logical_name,
        objects,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateReplicationJobRequest {
    pub object_id: u64,
    pub target_backend: String,
}

#[derive(Debug, Serialize)]
pub struct ReplicationJobResponse {
    pub id: u64,
    pub object_id: u64,
    pub source_backend: String,
    pub target_backend: String,
    pub status: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub customer_id: String,
    pub logical_name: String,
    pub created_at: u64,
}

impl ReplicationJobResponse {
    fn from_job(job: s3gw_meta::StoredReplicationJob, customer_id: String, logical_name: String) -> Self {
        Self {
            id: job.id,
            object_id: job.object_metadata_id,
            source_backend: job.source_backend_id,
            target_backend: job.target_backend,
            status: job.status.as_str().to_string(),
            attempts: job.attempts,
            last_error: job.last_error,
            customer_id,
            logical_name,
            created_at: job.created_at,
        }
    }
}

pub async fn create_replication_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateReplicationJobRequest>,
) -> Result<impl IntoResponse, AdminError> {
    let job = state
        .meta
        .insert_replication_job(payload.object_id, &payload.target_backend)?;
    let context = state.meta.job_context(job.id)?;
    Ok(Json(ReplicationJobResponse::from_job(
        job,
        context.customer_id,
        context.logical_name,
    )))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplicationJobListResponse {
    pub jobs: Vec<ReplicationJobResponse>,
}

pub async fn list_replication_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, AdminError> {
    let status = match query.status.as_deref() {
        Some("pending") => Some(JobStatus::Pending),
        Some("claimed") => Some(JobStatus::Claimed),
        Some("completed") => Some(JobStatus::Completed),
        Some("failed") => Some(JobStatus::Failed),
        Some(other) => {
            return Err(CommonError::Misconfigured(format!("unknown job status: {other}")).into())
        }
        None => None,
    };

    let jobs = state.meta.list_replication_jobs(status)?;
    let jobs = jobs
        .into_iter()
        .map(|job| {
            let context = state.meta.job_context(job.id);
            let (customer_id, logical_name) = match context {
                Ok(ctx) => (ctx.customer_id, ctx.logical_name),
                Err(_) => (String::new(), String::new()),
            };
            ReplicationJobResponse::from_job(job, customer_id, logical_name)
        })
        .collect();

    Ok(Json(ReplicationJobListResponse { jobs }))
}

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}
