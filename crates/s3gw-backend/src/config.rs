//! Environment-driven configuration of backend endpoints and credentials.
//!
//! Mirrors the legacy `PROXY_ROUTER_*` variable names as fallbacks so
//! existing deployments keep working under the `S3_BACKEND_*` names.

use std::collections::HashMap;
use std::env;

fn env_first(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| env::var(name).ok())
}

/// Parse a `"id=endpoint,id2=endpoint2"` mapping string.
pub fn parse_mapping(value: Option<&str>) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    let Some(value) = value else {
        return mapping;
    };
    for part in value.split(',') {
        if let Some((key, endpoint)) = part.split_once('=') {
            mapping.insert(key.trim().to_string(), endpoint.trim().to_string());
        }
    }
    mapping
}

/// Resolved backend fleet configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub default_backend_id: String,
    pub endpoints: HashMap<String, String>,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl BackendConfig {
    /// Load configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let default_backend_id =
            env_first(&["S3_BACKEND_DEFAULT_ID", "PROXY_ROUTER_DEFAULT_BACKEND_ID"])
                .unwrap_or_else(|| "primary".to_string());

        let mut endpoints = parse_mapping(
            env_first(&["S3_BACKEND_ENDPOINTS", "PROXY_ROUTER_ENDPOINTS"]).as_deref(),
        );
        if endpoints.is_empty() {
            if let Some(endpoint) = env_first(&["S3_BACKEND_ENDPOINT", "PROXY_ROUTER_ENDPOINT"]) {
                endpoints.insert(default_backend_id.clone(), endpoint);
            }
        }

        let region = env_first(&["S3_BACKEND_REGION", "PROXY_ROUTER_REGION"])
            .unwrap_or_else(|| "us-east-1".to_string());
        let access_key = env_first(&["S3_BACKEND_ACCESS_KEY", "PROXY_ROUTER_ACCESS_KEY"]);
        let secret_key = env_first(&["S3_BACKEND_SECRET_KEY", "PROXY_ROUTER_SECRET_KEY"]);

        Self {
            default_backend_id,
            endpoints,
            region,
            access_key,
            secret_key,
        }
    }

    pub fn endpoint_for(&self, backend_id: &str) -> Option<&str> {
        self.endpoints.get(backend_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_mapping() {
        let mapping = parse_mapping(Some("primary=https://a.example,secondary=https://b.example"));
        assert_eq!(mapping.get("primary").unwrap(), "https://a.example");
        assert_eq!(mapping.get("secondary").unwrap(), "https://b.example");
    }

    #[test]
    fn empty_mapping_string_yields_empty_map() {
        assert!(parse_mapping(None).is_empty());
        assert!(parse_mapping(Some("")).is_empty());
    }
}
