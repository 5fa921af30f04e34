//! Deterministic mapping from logical bucket names to backend-specific
//! physical bucket names.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub const DEFAULT_PREFIX: &str = "s3gw";
pub const DEFAULT_HASH_LENGTH: usize = 16;

/// Inputs that determine a backend bucket name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BucketHashInput {
    pub customer_id: String,
    pub region_id: String,
    pub logical_name: String,
    pub backend_id: String,
    pub collision_counter: u32,
}

impl BucketHashInput {
    #[must_use]
    pub fn new(
        customer_id: impl Into<String>,
        region_id: impl Into<String>,
        logical_name: impl Into<String>,
        backend_id: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            region_id: region_id.into(),
            logical_name: logical_name.into(),
            backend_id: backend_id.into(),
            collision_counter: 0,
        }
    }
}

/// Produce a deterministic, S3-compliant bucket name for the given inputs.
#[must_use]
pub fn generate_backend_bucket_name(input: &BucketHashInput) -> String {
    generate_backend_bucket_name_with(input, DEFAULT_PREFIX, DEFAULT_HASH_LENGTH)
}

fn generate_backend_bucket_name_with(
    input: &BucketHashInput,
    prefix: &str,
    hash_length: usize,
) -> String {
    let hash_input = format!(
        "{}:{}:{}:{}:{}",
        input.customer_id,
        input.region_id,
        input.logical_name,
        input.backend_id,
        input.collision_counter
    );
    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    let digest = hex::encode(hasher.finalize());
    let hash_part = &digest[..hash_length.min(digest.len())];

    let backend_suffix_full = input.backend_id.to_lowercase().replace('_', "-");
    let backend_suffix = if backend_suffix_full.is_empty() {
        "backend".to_string()
    } else {
        backend_suffix_full.chars().take(8).collect::<String>()
    };

    let mut bucket_name = format!("{prefix}-{hash_part}-{backend_suffix}").to_lowercase();

    if bucket_name.len() > 63 {
        let short_suffix: String = backend_suffix.chars().take(8).collect();
        bucket_name = format!("{prefix}-{}-{short_suffix}", &digest[..20]).to_lowercase();
    }
    bucket_name
}

/// Create a mapping of `backend_id -> backend_bucket_name`.
#[must_use]
pub fn map_backends(
    customer_id: &str,
    region_id: &str,
    logical_name: &str,
    backend_ids: &[String],
) -> HashMap<String, String> {
    backend_ids
        .iter()
        .map(|backend_id| {
            let input = BucketHashInput::new(customer_id, region_id, logical_name, backend_id);
            (backend_id.clone(), generate_backend_bucket_name(&input))
        })
        .collect()
}
