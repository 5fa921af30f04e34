//! Redb-backed metadata store for the proxy: tenant credentials, bucket
//! mappings, object metadata, replication jobs, and provider capabilities.

use crate::tables::{
    BUCKET_MAPPINGS, BUCKET_MAPPINGS_BY_ID, COUNTERS, JOBS_BY_STATUS, OBJECT_METADATA,
    OBJECTS_BY_TENANT_BUCKET, PROVIDER_CAPABILITIES, REPLICATION_JOBS, TENANT_CREDENTIALS,
};
use crate::types::{
    JobStatus, StoredBucketMapping, StoredObjectMetadata, StoredProviderCapability,
    StoredReplicationJob, StoredTenantCredential,
};
use redb::{Database, ReadableTable};
use s3gw_common::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn bucket_mapping_key(customer_id: &str, logical_name: &str, backend_id: &str) -> String {
    format!("{customer_id}\x00{logical_name}\x00{backend_id}")
}

fn object_index_key(customer_id: &str, logical_name: &str, id: u64) -> String {
    format!("{customer_id}\x00{logical_name}\x00{id:020}")
}

fn job_status_key(status: JobStatus, id: u64) -> String {
    format!("{}\x00{id:020}", status.as_str())
}

fn provider_key(provider: &str, zone_code: &str) -> String {
    format!("{provider}\x00{zone_code}")
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Misconfigured(format!("encode failed: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| Error::Misconfigured(format!("decode failed: {e}")))
}

/// Full detail needed to execute one replication job: the source object's
/// bytes location plus the resolved target bucket.
#[derive(Clone, Debug)]
pub struct ReplicationJobContext {
    pub job: StoredReplicationJob,
    pub customer_id: String,
    pub logical_name: String,
    pub source_backend_bucket: String,
    pub target_backend_bucket: String,
    pub object_key: String,
}

/// Persistent metadata store, shared via `Arc` across the gateway and
/// replicator binaries.
pub struct MetaStore {
    db: Arc<Database>,
}

impl MetaStore {
    /// Open (or create) the store at `path`, ensuring every table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path)
            .map_err(|e| Error::Misconfigured(format!("failed to open metadata db: {e}")))?;

        let wtx = db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(TENANT_CREDENTIALS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(BUCKET_MAPPINGS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(BUCKET_MAPPINGS_BY_ID)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(OBJECT_METADATA)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(OBJECTS_BY_TENANT_BUCKET)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(REPLICATION_JOBS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(JOBS_BY_STATUS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(PROVIDER_CAPABILITIES)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(COUNTERS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn next_id(&self, counter: &str) -> Result<u64> {
        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let next = {
            let mut table = wtx
                .open_table(COUNTERS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            let current = table
                .get(counter)
                .map_err(|e| Error::Misconfigured(e.to_string()))?
                .map(|v| v.value())
                .unwrap_or(0);
            let next = current + 1;
            table
                .insert(counter, next)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            next
        };
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;
        Ok(next)
    }

    // ---- Tenant credentials ----

    /// Create or replace a tenant's SigV4 credential. The secret is
    /// encrypted before it touches disk.
    pub fn upsert_tenant_credential(
        &self,
        customer_id: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<()> {
        let encrypted_secret = s3gw_common::crypto::encrypt_secret(secret_key)?;
        let row = StoredTenantCredential {
            customer_id: customer_id.to_string(),
            access_key: access_key.to_string(),
            encrypted_secret,
            created_at: now_secs(),
        };
        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(TENANT_CREDENTIALS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .insert(access_key, encode(&row)?.as_slice())
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;
        Ok(())
    }

    /// Look up a tenant credential, returning the secret already decrypted.
    pub fn fetch_tenant_by_access_key(
        &self,
        access_key: &str,
    ) -> Result<Option<(StoredTenantCredential, String)>> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let table = rtx
            .open_table(TENANT_CREDENTIALS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let Some(bytes) = table
            .get(access_key)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
        else {
            return Ok(None);
        };
        let row: StoredTenantCredential = decode(bytes.value())?;
        let secret = s3gw_common::crypto::decrypt_secret(&row.encrypted_secret)?;
        Ok(Some((row, secret)))
    }

    // ---- Bucket mappings ----

    /// Create or update bucket mappings for every requested backend id.
    pub fn create_bucket_mapping(
        &self,
        customer_id: &str,
        region_id: &str,
        logical_name: &str,
        backend_ids: &[String],
    ) -> Result<HashMap<String, String>> {
        let mapping = s3gw_common::naming::map_backends(customer_id, region_id, logical_name, backend_ids);

        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        {
            let mut by_key = wtx
                .open_table(BUCKET_MAPPINGS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            let mut by_id = wtx
                .open_table(BUCKET_MAPPINGS_BY_ID)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            let mut counters = wtx
                .open_table(COUNTERS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;

            for (backend_id, backend_bucket) in &mapping {
                let key = bucket_mapping_key(customer_id, logical_name, backend_id);
                let existing_id = match by_key
                    .get(key.as_str())
                    .map_err(|e| Error::Misconfigured(e.to_string()))?
                {
                    Some(existing) => Some(decode::<StoredBucketMapping>(existing.value())?.id),
                    None => None,
                };
                let id = match existing_id {
                    Some(id) => id,
                    None => {
                        let current = counters
                            .get("bucket_mappings")
                            .map_err(|e| Error::Misconfigured(e.to_string()))?
                            .map(|v| v.value())
                            .unwrap_or(0);
                        let next = current + 1;
                        counters
                            .insert("bucket_mappings", next)
                            .map_err(|e| Error::Misconfigured(e.to_string()))?;
                        next
                    }
                };

                let row = StoredBucketMapping {
                    id,
                    customer_id: customer_id.to_string(),
                    region_id: region_id.to_string(),
                    logical_name: logical_name.to_string(),
                    backend_id: backend_id.clone(),
                    backend_bucket: backend_bucket.clone(),
                };
                let encoded = encode(&row)?;
                by_key
                    .insert(key.as_str(), encoded.as_slice())
                    .map_err(|e| Error::Misconfigured(e.to_string()))?;
                by_id
                    .insert(id, encoded.as_slice())
                    .map_err(|e| Error::Misconfigured(e.to_string()))?;
            }
        }
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;
        Ok(mapping)
    }

    /// Fetch every backend mapping for one tenant/logical-name pair.
    pub fn get_bucket_mapping(
        &self,
        customer_id: &str,
        logical_name: &str,
    ) -> Result<Vec<StoredBucketMapping>> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let table = rtx
            .open_table(BUCKET_MAPPINGS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let prefix = format!("{customer_id}\x00{logical_name}\x00");
        let mut rows = Vec::new();
        for entry in table
            .range(prefix.as_str()..)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
        {
            let (key, value) = entry.map_err(|e| Error::Misconfigured(e.to_string()))?;
            if !key.value().starts_with(prefix.as_str()) {
                break;
            }
            rows.push(decode(value.value())?);
        }
        Ok(rows)
    }

    /// Fetch one tenant/backend bucket mapping.
    pub fn fetch_bucket_mapping(
        &self,
        customer_id: &str,
        logical_name: &str,
        backend_id: &str,
    ) -> Result<Option<StoredBucketMapping>> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let table = rtx
            .open_table(BUCKET_MAPPINGS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let key = bucket_mapping_key(customer_id, logical_name, backend_id);
        Ok(match table
            .get(key.as_str())
            .map_err(|e| Error::Misconfigured(e.to_string()))?
        {
            Some(bytes) => Some(decode(bytes.value())?),
            None => None,
        })
    }

    fn fetch_bucket_mapping_by_id(&self, id: u64) -> Result<StoredBucketMapping> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let table = rtx
            .open_table(BUCKET_MAPPINGS_BY_ID)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let bytes = table
            .get(id)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("bucket mapping {id}")))?;
        decode(bytes.value())
    }

    // ---- Object metadata ----

    /// Record metadata for an object already stored under a bucket mapping.
    #[allow(clippy::too_many_arguments)]
    pub fn create_object_metadata(
        &self,
        customer_id: &str,
        logical_name: &str,
        backend_id: &str,
        object_key: &str,
        size: u64,
        etag: &str,
        encrypted_key: Option<String>,
        residency: Option<String>,
        replica_count: Option<u32>,
    ) -> Result<StoredObjectMetadata> {
        let mapping = self
            .fetch_bucket_mapping(customer_id, logical_name, backend_id)?
            .ok_or_else(|| Error::NotFound("bucket mapping not found".to_string()))?;

        let id = self.next_id("object_metadata")?;
        let row = StoredObjectMetadata {
            id,
            bucket_mapping_id: mapping.id,
            object_key: object_key.to_string(),
            size,
            etag: etag.to_string(),
            encrypted_key,
            residency,
            replica_count,
            created_at: now_secs(),
        };

        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(OBJECT_METADATA)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .insert(id, encode(&row)?.as_slice())
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(OBJECTS_BY_TENANT_BUCKET)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .insert(object_index_key(customer_id, logical_name, id).as_str(), id)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;

        Ok(row)
    }

    /// List every object recorded for one tenant/logical-name pair.
    pub fn list_object_metadata(
        &self,
        customer_id: &str,
        logical_name: &str,
    ) -> Result<Vec<StoredObjectMetadata>> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let index = rtx
            .open_table(OBJECTS_BY_TENANT_BUCKET)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let objects = rtx
            .open_table(OBJECT_METADATA)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;

        let prefix = format!("{customer_id}\x00{logical_name}\x00");
        let mut rows = Vec::new();
        for entry in index
            .range(prefix.as_str()..)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
        {
            let (key, id) = entry.map_err(|e| Error::Misconfigured(e.to_string()))?;
            if !key.value().starts_with(prefix.as_str()) {
                break;
            }
            if let Some(bytes) = objects
                .get(id.value())
                .map_err(|e| Error::Misconfigured(e.to_string()))?
            {
                rows.push(decode(bytes.value())?);
            }
        }
        Ok(rows)
    }

    fn fetch_object_metadata(&self, id: u64) -> Result<StoredObjectMetadata> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let table = rtx
            .open_table(OBJECT_METADATA)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let bytes = table
            .get(id)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("object metadata {id}")))?;
        decode(bytes.value())
    }

    // ---- Replication jobs ----

    /// Queue a replication job copying `object_id` to `target_backend`.
    pub fn insert_replication_job(
        &self,
        object_id: u64,
        target_backend: &str,
    ) -> Result<StoredReplicationJob> {
        let object = self.fetch_object_metadata(object_id)?;
        let source_mapping = self.fetch_bucket_mapping_by_id(object.bucket_mapping_id)?;

        let id = self.next_id("replication_jobs")?;
        let now = now_secs();
        let row = StoredReplicationJob {
            id,
            bucket_mapping_id: source_mapping.id,
            object_metadata_id: object_id,
            source_backend_id: source_mapping.backend_id.clone(),
            target_backend: target_backend.to_string(),
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        };

        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(REPLICATION_JOBS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .insert(id, encode(&row)?.as_slice())
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.open_table(JOBS_BY_STATUS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .insert(job_status_key(JobStatus::Pending, id).as_str(), id)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;

        Ok(row)
    }

    /// List jobs, optionally filtered by status.
    pub fn list_replication_jobs(&self, status: Option<JobStatus>) -> Result<Vec<StoredReplicationJob>> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let jobs = rtx
            .open_table(REPLICATION_JOBS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;

        let mut rows = Vec::new();
        if let Some(status) = status {
            let index = rtx
                .open_table(JOBS_BY_STATUS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            let prefix = format!("{}\x00", status.as_str());
            for entry in index
                .range(prefix.as_str()..)
                .map_err(|e| Error::Misconfigured(e.to_string()))?
            {
                let (key, id) = entry.map_err(|e| Error::Misconfigured(e.to_string()))?;
                if !key.value().starts_with(prefix.as_str()) {
                    break;
                }
                if let Some(bytes) = jobs
                    .get(id.value())
                    .map_err(|e| Error::Misconfigured(e.to_string()))?
                {
                    rows.push(decode(bytes.value())?);
                }
            }
        } else {
            for entry in jobs.iter().map_err(|e| Error::Misconfigured(e.to_string()))? {
                let (_, value) = entry.map_err(|e| Error::Misconfigured(e.to_string()))?;
                rows.push(decode(value.value())?);
            }
        }
        rows.sort_by_key(|j: &StoredReplicationJob| j.created_at);
        Ok(rows)
    }

    /// Atomically claim up to `limit` pending jobs, transitioning them to
    /// `claimed` so concurrent workers never process the same job twice.
    ///
    /// Returns the claimed job ids only — resolving each id's full context
    /// (via [`Self::job_context`]) is left to the caller so that one job
    /// with a missing target mapping can be routed to
    /// [`Self::mark_job_failure`] without poisoning the whole batch.
    pub fn claim_pending_jobs(&self, limit: usize) -> Result<Vec<u64>> {
        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;

        let claimed_ids: Vec<u64> = {
            let mut jobs = wtx
                .open_table(REPLICATION_JOBS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            let mut by_status = wtx
                .open_table(JOBS_BY_STATUS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;

            let prefix = format!("{}\x00", JobStatus::Pending.as_str());
            let pending_keys: Vec<(String, u64)> = by_status
                .range(prefix.as_str()..)
                .map_err(|e| Error::Misconfigured(e.to_string()))?
                .map_while(|entry| {
                    let (key, id) = entry.ok()?;
                    let key = key.value();
                    if key.starts_with(prefix.as_str()) {
                        Some((key.to_string(), id.value()))
                    } else {
                        None
                    }
                })
                .take(limit)
                .collect();

            let mut ids = Vec::with_capacity(pending_keys.len());
            for (old_key, id) in pending_keys {
                let Some(bytes) = jobs.get(id).map_err(|e| Error::Misconfigured(e.to_string()))?
                else {
                    continue;
                };
                let mut job: StoredReplicationJob = decode(bytes.value())?;
                job.status = JobStatus::Claimed;
                job.updated_at = now_secs();

                by_status
                    .remove(old_key.as_str())
                    .map_err(|e| Error::Misconfigured(e.to_string()))?;
                by_status
                    .insert(job_status_key(JobStatus::Claimed, id).as_str(), id)
                    .map_err(|e| Error::Misconfigured(e.to_string()))?;
                jobs.insert(id, encode(&job)?.as_slice())
                    .map_err(|e| Error::Misconfigured(e.to_string()))?;
                ids.push(id);
            }
            ids
        };
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;

        Ok(claimed_ids)
    }

    /// Build the full context a replicator needs to execute one job.
    pub fn job_context(&self, job_id: u64) -> Result<ReplicationJobContext> {
        let rtx = self
            .db
            .begin_read()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let jobs = rtx
            .open_table(REPLICATION_JOBS)
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        let bytes = jobs
            .get(job_id)
            .map_err(|e| Error::Misconfigured(e.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("replication job {job_id}")))?;
        let job: StoredReplicationJob = decode(bytes.value())?;
        drop(jobs);
        drop(rtx);

        let source_mapping = self.fetch_bucket_mapping_by_id(job.bucket_mapping_id)?;
        let object = self.fetch_object_metadata(job.object_metadata_id)?;
        let target_mapping = self
            .fetch_bucket_mapping(
                &source_mapping.customer_id,
                &source_mapping.logical_name,
                &job.target_backend,
            )?
            .ok_or_else(|| Error::NotFound(format!("no bucket mapping for {}", job.target_backend)))?;

        Ok(ReplicationJobContext {
            job,
            customer_id: source_mapping.customer_id,
            logical_name: source_mapping.logical_name,
            source_backend_bucket: source_mapping.backend_bucket,
            target_backend_bucket: target_mapping.backend_bucket,
            object_key: object.object_key,
        })
    }

    /// Mark a job completed.
    pub fn mark_job_success(&self, job_id: u64) -> Result<()> {
        self.transition_job(job_id, JobStatus::Completed, None)
    }

    /// Mark a job failed, recording the error and incrementing attempts.
    pub fn mark_job_failure(&self, job_id: u64, error: &str) -> Result<()> {
        self.transition_job(job_id, JobStatus::Failed, Some(error.to_string()))
    }

    fn transition_job(&self, job_id: u64, status: JobStatus, error: Option<String>) -> Result<()> {
        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        {
            let mut jobs = wtx
                .open_table(REPLICATION_JOBS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            let mut by_status = wtx
                .open_table(JOBS_BY_STATUS)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;

            let bytes = jobs
                .get(job_id)
                .map_err(|e| Error::Misconfigured(e.to_string()))?
                .ok_or_else(|| Error::NotFound(format!("replication job {job_id}")))?;
            let mut job: StoredReplicationJob = decode(bytes.value())?;
            drop(bytes);

            let old_key = job_status_key(job.status, job_id);
            job.status = status;
            job.updated_at = now_secs();
            if status == JobStatus::Failed {
                job.attempts += 1;
                job.last_error = error;
            }

            by_status
                .remove(old_key.as_str())
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            by_status
                .insert(job_status_key(status, job_id).as_str(), job_id)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            jobs.insert(job_id, encode(&job)?.as_slice())
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
        }
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;
        Ok(())
    }

    // ---- Provider capabilities ----

    /// Idempotently insert a provider capability row (no-op if present).
    pub fn seed_provider_capability(&self, row: StoredProviderCapability) -> Result<()> {
        let key = provider_key(&row.provider, &row.zone_code);
        let wtx = self
            .db
            .begin_write()
            .map_err(|e| Error::Misconfigured(e.to_string()))?;
        {
            let mut table = wtx
                .open_table(PROVIDER_CAPABILITIES)
                .map_err(|e| Error::Misconfigured(e.to_string()))?;
            if table
                .get(key.as_str())
                .map_err(|e| Error::Misconfigured(e.to_string()))?
                .is_none()
            {
                table
                    .insert(key.as_str(), encode(&row)?.as_slice())
                    .map_err(|e| Error::Misconfigured(e.to_string()))?;
            }
        }
        wtx.commit().map_err(|e| Error::Misconfigured(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_passphrase<F: FnOnce()>(f: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(s3gw_common::crypto::PASSPHRASE_ENV, "test-passphrase");
        f();
        std::env::remove_var(s3gw_common::crypto::PASSPHRASE_ENV);
    }

    fn temp_store() -> (tempfile::TempDir, MetaStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("test.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn bucket_mapping_round_trips() {
        let (_dir, store) = temp_store();
        let ids = vec!["primary".to_string(), "secondary".to_string()];
        let mapping = store
            .create_bucket_mapping("tenant-1", "us-east", "docs", &ids)
            .unwrap();
        assert_eq!(mapping.len(), 2);

        let rows = store.get_bucket_mapping("tenant-1", "docs").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn tenant_credential_round_trips() {
        with_passphrase(|| {
            let (_dir, store) = temp_store();
            store
                .upsert_tenant_credential("tenant-1", "AKIA123", "secret-value")
                .unwrap();
            let (row, secret) = store.fetch_tenant_by_access_key("AKIA123").unwrap().unwrap();
            assert_eq!(row.customer_id, "tenant-1");
            assert_eq!(secret, "secret-value");
        });
    }

    #[test]
    fn unknown_access_key_returns_none() {
        let (_dir, store) = temp_store();
        assert!(store.fetch_tenant_by_access_key("nope").unwrap().is_none());
    }

    #[test]
    fn object_metadata_requires_existing_mapping() {
        let (_dir, store) = temp_store();
        let err = store
            .create_object_metadata("tenant-1", "docs", "primary", "report.txt", 10, "etag", None, None, None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn replication_job_lifecycle() {
        let (_dir, store) = temp_store();
        let ids = vec!["primary".to_string(), "secondary".to_string()];
        store
            .create_bucket_mapping("tenant-1", "us-east", "docs", &ids)
            .unwrap();
        let object = store
            .create_object_metadata(
                "tenant-1", "docs", "primary", "report.txt", 10, "etag", None, None, None,
            )
            .unwrap();
        let job = store.insert_replication_job(object.id, "secondary").unwrap();
        assert_eq!(job.status, JobStatus::Pending);

        let claimed = store.claim_pending_jobs(10).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0], job.id);

        let context = store.job_context(job.id).unwrap();
        assert_eq!(context.job.id, job.id);

        store.mark_job_success(job.id).unwrap();
        let jobs = store.list_replication_jobs(Some(JobStatus::Completed)).unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn replication_job_fails_without_target_mapping() {
        let (_dir, store) = temp_store();
        let ids = vec!["primary".to_string()];
        store
            .create_bucket_mapping("tenant-1", "us-east", "docs", &ids)
            .unwrap();
        let object = store
            .create_object_metadata(
                "tenant-1", "docs", "primary", "report.txt", 10, "etag", None, None, None,
            )
            .unwrap();
        let job = store.insert_replication_job(object.id, "missing-backend").unwrap();
        let err = store.job_context(job.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn claiming_a_batch_survives_one_job_with_a_missing_target_mapping() {
        let (_dir, store) = temp_store();
        let ids = vec!["primary".to_string(), "secondary".to_string()];
        store
            .create_bucket_mapping("tenant-1", "us-east", "docs", &ids)
            .unwrap();
        let object = store
            .create_object_metadata(
                "tenant-1", "docs", "primary", "report.txt", 10, "etag", None, None, None,
            )
            .unwrap();
        let good_job = store.insert_replication_job(object.id, "secondary").unwrap();
        let broken_job = store.insert_replication_job(object.id, "missing-backend").unwrap();

        // Both jobs claim cleanly even though resolving the broken one's
        // context will fail later — the claim itself never inspects the
        // target mapping.
        let claimed = store.claim_pending_jobs(10).unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed.contains(&good_job.id));
        assert!(claimed.contains(&broken_job.id));

        assert!(store.job_context(good_job.id).is_ok());
        assert!(matches!(
            store.job_context(broken_job.id).unwrap_err(),
            Error::NotFound(_)
        ));

        // The caller (the replication worker) is expected to route that
        // failure into mark_job_failure rather than leaving it claimed.
        store
            .mark_job_failure(broken_job.id, "no bucket mapping for missing-backend")
            .unwrap();
        let failed = store.list_replication_jobs(Some(JobStatus::Failed)).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, broken_job.id);
    }
}
