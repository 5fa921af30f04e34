//! S3 Gateway - multi-tenant S3-compatible storage proxy.
//!
//! The binary entry point lives in `main.rs`; this library exposes the
//! router construction so integration tests can exercise it without a
//! bound TCP listener.

pub mod admin;
pub mod auth;
pub mod error;
pub mod s3;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, head, post, put};
use axum::{middleware, Router};
use state::AppState;
use std::sync::Arc;

/// Builds the combined `/health` + `/s3/*` + `/proxy/*` router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(100 * 1024 * 1024);

    let s3_routes = Router::new()
        .route("/s3/{logical_name}/{*object_path}", get(s3::get_object))
        .route("/s3/{logical_name}/{*object_path}", put(s3::put_object))
        .route("/s3/{logical_name}/{*object_path}", delete(s3::delete_object))
        .route("/s3/{logical_name}/{*object_path}", head(s3::head_object))
        .layer(body_limit)
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer));

    let admin_routes = Router::new()
        .route("/proxy/credentials", post(admin::create_credential))
        .route("/proxy/credentials/{access_key}", get(admin::get_credential))
        .route("/proxy/buckets", post(admin::create_bucket_mapping))
        .route(
            "/proxy/buckets/{customer_id}/{logical_name}",
            get(admin::get_bucket_mapping),
        )
        .route("/proxy/objects", post(admin::create_object_metadata))
        .route(
            "/proxy/objects/{customer_id}/{logical_name}",
            get(admin::list_object_metadata),
        )
        .route("/proxy/jobs", post(admin::create_replication_job))
        .route("/proxy/jobs", get(admin::list_replication_jobs))
        .layer(middleware::from_fn_with_state(state.clone(), auth::admin_layer));

    Router::new()
        .route("/health", get(admin::health_check))
        .merge(s3_routes)
        .merge(admin_routes)
        .with_state(state)
}
