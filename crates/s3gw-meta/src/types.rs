//! Row types persisted to redb via bincode.

use serde::{Deserialize, Serialize};

/// A tenant's SigV4 credential. `secret_key` is stored already encrypted
/// by `s3gw_common::crypto`; callers never see the plaintext except
/// through `MetaStore::fetch_tenant_secret`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredTenantCredential {
    pub customer_id: String,
    pub access_key: String,
    pub encrypted_secret: String,
    pub created_at: u64,
}

/// A logical-name-to-backend-bucket mapping for one tenant/backend pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredBucketMapping {
    pub id: u64,
    pub customer_id: String,
    pub region_id: String,
    pub logical_name: String,
    pub backend_id: String,
    pub backend_bucket: String,
}

/// Metadata recorded for an object already written to a backend bucket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredObjectMetadata {
    pub id: u64,
    pub bucket_mapping_id: u64,
    pub object_key: String,
    pub size: u64,
    pub etag: String,
    pub encrypted_key: Option<String>,
    pub residency: Option<String>,
    pub replica_count: Option<u32>,
    pub created_at: u64,
}

/// Status of a replication job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Claimed,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A queued (or resolved) replication job copying one object from its
/// source backend to a target backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredReplicationJob {
    pub id: u64,
    pub bucket_mapping_id: u64,
    pub object_metadata_id: u64,
    pub source_backend_id: String,
    pub target_backend: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// A provider's capability row, seeded from the bundled CSV catalogue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredProviderCapability {
    pub country: String,
    pub region_city: String,
    pub zone_code: String,
    pub provider: String,
    pub s3_compatible: Option<String>,
    pub object_lock: Option<String>,
    pub versioning: Option<String>,
    pub iso27001: Option<String>,
    pub veeam_ready: Option<String>,
    pub notes: Option<String>,
}
