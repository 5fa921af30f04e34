//! Memoized pool of per-backend S3-compatible clients.

use crate::config::BackendConfig;
use crate::error::BackendError;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Lazily builds and caches one `object_store` client per backend id.
pub struct BackendRegistry {
    config: BackendConfig,
    clients: RwLock<HashMap<String, Arc<AmazonS3>>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn default_backend_id(&self) -> &str {
        &self.config.default_backend_id
    }

    /// Get (or build) the client for `backend_id`, keyed to `bucket`.
    pub async fn client_for(
        &self,
        backend_id: &str,
        bucket: &str,
    ) -> Result<Arc<AmazonS3>, BackendError> {
        let cache_key = format!("{backend_id}\x00{bucket}");

        if let Some(client) = self.clients.read().await.get(&cache_key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&cache_key) {
            return Ok(client.clone());
        }

        let endpoint = self
            .config
            .endpoint_for(backend_id)
            .ok_or_else(|| BackendError::UnknownBackend(backend_id.to_string()))?;
        let access_key = self
            .config
            .access_key
            .as_deref()
            .ok_or(BackendError::MissingCredentials)?;
        let secret_key = self
            .config
            .secret_key
            .as_deref()
            .ok_or(BackendError::MissingCredentials)?;

        info!(backend_id, bucket, endpoint, "building backend client");

        let built = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.config.region)
            .with_endpoint(endpoint)
            .with_access_key_id(access_key)
            .with_secret_access_key(secret_key)
            .with_allow_http(true)
            .build()
            .map_err(|e| BackendError::ClientBuildFailed(e.to_string()))?;

        let client = Arc::new(built);
        clients.insert(cache_key, client.clone());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let registry = BackendRegistry::new(BackendConfig {
            default_backend_id: "primary".to_string(),
            endpoints: HashMap::new(),
            region: "us-east-1".to_string(),
            access_key: Some("ak".to_string()),
            secret_key: Some("sk".to_string()),
        });

        let err = registry.client_for("primary", "bucket").await.unwrap_err();
        assert!(matches!(err, BackendError::UnknownBackend(_)));
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        let mut endpoints = HashMap::new();
        endpoints.insert("primary".to_string(), "https://backend.example".to_string());
        let registry = BackendRegistry::new(BackendConfig {
            default_backend_id: "primary".to_string(),
            endpoints,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
        });

        let err = registry.client_for("primary", "bucket").await.unwrap_err();
        assert!(matches!(err, BackendError::MissingCredentials));
    }

    #[tokio::test]
    async fn builds_and_caches_client() {
        let mut endpoints = HashMap::new();
        endpoints.insert("primary".to_string(), "https://backend.example".to_string());
        let registry = BackendRegistry::new(BackendConfig {
            default_backend_id: "primary".to_string(),
            endpoints,
            region: "us-east-1".to_string(),
            access_key: Some("ak".to_string()),
            secret_key: Some("sk".to_string()),
        });

        let first = registry.client_for("primary", "bucket").await.unwrap();
        let second = registry.client_for("primary", "bucket").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
