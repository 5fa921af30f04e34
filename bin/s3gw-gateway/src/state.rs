//! Shared application state for the gateway's axum handlers.

use s3gw_backend::BackendRegistry;
use s3gw_meta::MetaStore;
use std::sync::Arc;

pub struct AppState {
    pub meta: Arc<MetaStore>,
    pub backends: Arc<BackendRegistry>,
    pub admin_api_key: Option<String>,
}
