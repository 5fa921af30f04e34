//! Redb table definitions for persistent proxy metadata.

use redb::TableDefinition;

/// access_key -> bincode(StoredTenantCredential)
pub const TENANT_CREDENTIALS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("tenant_credentials");

/// "{customer_id}\x00{logical_name}\x00{backend_id}" -> bincode(StoredBucketMapping)
pub const BUCKET_MAPPINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("bucket_mappings");

/// id -> bincode(StoredBucketMapping), a by-id mirror of BUCKET_MAPPINGS
/// used to resolve joins from object_metadata/replication_jobs.
pub const BUCKET_MAPPINGS_BY_ID: TableDefinition<u64, &[u8]> =
    TableDefinition::new("bucket_mappings_by_id");

/// id -> bincode(StoredObjectMetadata)
pub const OBJECT_METADATA: TableDefinition<u64, &[u8]> = TableDefinition::new("object_metadata");

/// "{customer_id}\x00{logical_name}\x00{id:020}" -> id, for prefix-range listing.
pub const OBJECTS_BY_TENANT_BUCKET: TableDefinition<&str, u64> =
    TableDefinition::new("objects_by_tenant_bucket");

/// id -> bincode(StoredReplicationJob)
pub const REPLICATION_JOBS: TableDefinition<u64, &[u8]> = TableDefinition::new("replication_jobs");

/// "{status}\x00{id:020}" -> id, for status-filtered listing and claiming.
pub const JOBS_BY_STATUS: TableDefinition<&str, u64> = TableDefinition::new("jobs_by_status");

/// "{provider}\x00{zone_code}" -> bincode(StoredProviderCapability)
pub const PROVIDER_CAPABILITIES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("provider_capabilities");

/// counter name -> next unused id
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");
