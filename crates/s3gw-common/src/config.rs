//! Shared, env-driven settings used by both binaries.

use serde::{Deserialize, Serialize};

/// Settings resolved from environment variables, shared by the gateway
/// and the replicator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedConfig {
    /// AWS region used for SigV4 credential-scope verification.
    pub region: String,
    /// Default backend id used when a request omits `?backend_id=`.
    pub default_backend_id: String,
    /// Admin API key required on the `X-Admin-Key` header.
    pub admin_api_key: Option<String>,
    /// Path to the redb metadata database file.
    pub metadata_db_path: std::path::PathBuf,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            default_backend_id: "primary".to_string(),
            admin_api_key: None,
            metadata_db_path: std::path::PathBuf::from("s3gw-metadata.redb"),
        }
    }
}

impl SharedConfig {
    /// Resolve settings from the process environment, falling back to
    /// defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(region) = std::env::var("S3_BACKEND_REGION") {
            config.region = region;
        }
        if let Ok(id) = std::env::var("S3_BACKEND_DEFAULT_ID") {
            config.default_backend_id = id;
        }
        config.admin_api_key = std::env::var("ADMIN_API_KEY").ok();
        if let Ok(path) = std::env::var("PROXY_METADATA_DB_PATH") {
            config.metadata_db_path = std::path::PathBuf::from(path);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_region_is_us_east_1() {
        assert_eq!(SharedConfig::default().region, "us-east-1");
    }
}
