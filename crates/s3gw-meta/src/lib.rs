//! Persistent metadata store for the proxy: tenant credentials, bucket
//! mappings, object metadata, replication jobs, and the provider catalogue.

pub mod bootstrap;
pub mod store;
pub mod tables;
pub mod types;

pub use bootstrap::seed_provider_capabilities;
pub use store::{MetaStore, ReplicationJobContext};
pub use types::{
    JobStatus, StoredBucketMapping, StoredObjectMetadata, StoredProviderCapability,
    StoredReplicationJob, StoredTenantCredential,
};
