//! Replication loop: claims pending jobs and copies object bytes between
//! backends, one job at a time.

use object_store::path::Path as ObjectPath;
use s3gw_backend::BackendRegistry;
use s3gw_meta::MetaStore;
use std::sync::Arc;
use tracing::{info, warn};

/// An object is rejected for replication above this size rather than
/// buffered fully into memory.
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 512 * 1024 * 1024;

pub struct Worker {
    meta: Arc<MetaStore>,
    backends: Arc<BackendRegistry>,
    max_object_bytes: u64,
}

impl Worker {
    #[must_use]
    pub fn new(meta: Arc<MetaStore>, backends: Arc<BackendRegistry>, max_object_bytes: u64) -> Self {
        Self {
            meta,
            backends,
            max_object_bytes,
        }
    }

    /// Claim up to `limit` pending jobs and process each one. Returns the
    /// number of jobs processed (successes and failures both count).
    ///
    /// Each claimed id's context (source/target bucket mappings, object
    /// key) is resolved one job at a time so that a single job with a
    /// missing target mapping is marked `failed` instead of aborting the
    /// rest of the batch.
    pub async fn run_once(&self, limit: usize) -> s3gw_common::error::Result<usize> {
        let job_ids = self.meta.claim_pending_jobs(limit)?;
        let processed = job_ids.len();

        for job_id in job_ids {
            let context = match self.meta.job_context(job_id) {
                Ok(context) => context,
                Err(err) => {
                    warn!(job_id, error = %err, "replication failed: could not resolve job context");
                    self.meta.mark_job_failure(job_id, &err.to_string())?;
                    continue;
                }
            };

            match self.replicate(&context).await {
                Ok(()) => {
                    info!(job_id, "replication succeeded");
                    self.meta.mark_job_success(job_id)?;
                }
                Err(err) => {
                    warn!(job_id, error = %err, "replication failed");
                    self.meta.mark_job_failure(job_id, &err.to_string())?;
                }
            }
        }

        Ok(processed)
    }

    async fn replicate(&self, context: &s3gw_meta::ReplicationJobContext) -> anyhow::Result<()> {
        let source_client = self
            .backends
            .client_for(&context.job.source_backend_id, &context.source_backend_bucket)
            .await?;
        let target_client = self
            .backends
            .client_for(&context.job.target_backend, &context.target_backend_bucket)
            .await?;

        let path = ObjectPath::from(context.object_key.as_str());

        let result = source_client.get(&path).await?;
        if result.meta.size > self.max_object_bytes {
            anyhow::bail!(
                "ObjectTooLargeForReplication: {} bytes exceeds cap of {} bytes",
                result.meta.size,
                self.max_object_bytes
            );
        }

        let attributes = result.attributes.clone();
        let bytes = result.bytes().await?;

        target_client
            .put_opts(
                &path,
                bytes.into(),
                object_store::PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3gw_backend::BackendConfig;
    use std::collections::HashMap;

    fn worker() -> (tempfile::TempDir, Worker) {
        let dir = tempfile::tempdir().unwrap();
        let meta = Arc::new(MetaStore::open(dir.path().join("meta.redb")).unwrap());
        let backends = Arc::new(BackendRegistry::new(BackendConfig {
            default_backend_id: "primary".to_string(),
            endpoints: HashMap::new(),
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
        }));
        (dir, Worker::new(meta, backends, DEFAULT_MAX_OBJECT_BYTES))
    }

    #[tokio::test]
    async fn run_once_is_a_no_op_with_no_pending_jobs() {
        let (_dir, worker) = worker();
        let processed = worker.run_once(10).await.unwrap();
        assert_eq!(processed, 0);
    }

    #[tokio::test]
    async fn a_job_with_a_missing_target_mapping_ends_up_failed_not_stuck() {
        let (_dir, worker) = worker();

        worker
            .meta
            .create_bucket_mapping("tenant-1", "us-east", "docs", &["primary".to_string()])
            .unwrap();
        let object = worker
            .meta
            .create_object_metadata(
                "tenant-1", "docs", "primary", "report.txt", 10, "etag", None, None, None,
            )
            .unwrap();
        let job = worker
            .meta
            .insert_replication_job(object.id, "missing-backend")
            .unwrap();

        let processed = worker.run_once(10).await.unwrap();
        assert_eq!(processed, 1);

        let failed = worker
            .meta
            .list_replication_jobs(Some(s3gw_meta::JobStatus::Failed))
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, job.id);
        assert!(failed[0]
            .last_error
            .as_deref()
            .unwrap_or_default()
            .contains("missing-backend"));

        let claimed = worker
            .meta
            .list_replication_jobs(Some(s3gw_meta::JobStatus::Claimed))
            .unwrap();
        assert!(claimed.is_empty());
    }
}
