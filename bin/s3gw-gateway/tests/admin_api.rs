//! Integration tests for the `/proxy/*` admin API and `/health`, driven
//! through the real axum router against a scratch redb store.

use axum_test::TestServer;
use s3gw_backend::{BackendConfig, BackendRegistry};
use s3gw_gateway::state::AppState;
use s3gw_meta::MetaStore;
use std::collections::HashMap;
use std::sync::Arc;

const ADMIN_KEY: &str = "test-admin-key";

fn harness() -> (tempfile::TempDir, TestServer) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("proxy_metadata.redb");
    let meta = Arc::new(MetaStore::open(&db_path).unwrap());
    let backends = Arc::new(BackendRegistry::new(BackendConfig {
        default_backend_id: "primary".to_string(),
        endpoints: HashMap::new(),
        region: "us-east-1".to_string(),
        access_key: None,
        secret_key: None,
    }));
    let state = Arc::new(AppState {
        meta,
        backends,
        admin_api_key: Some(ADMIN_KEY.to_string()),
    });
    let app = s3gw_gateway::build_router(state);
    (dir, TestServer::new(app).unwrap())
}

#[tokio::test]
async fn health_check_requires_no_auth() {
    let (_dir, server) = harness();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn admin_routes_reject_missing_key() {
    let (_dir, server) = harness();
    let response = server
        .post("/proxy/credentials")
        .json(&serde_json::json!({
            "customer_id": "acme",
            "access_key": "AKIAEXAMPLE",
            "secret_key": "supersecret",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_wrong_key() {
    let (_dir, server) = harness();
    let response = server
        .get("/proxy/credentials/AKIAEXAMPLE")
        .add_header("x-admin-key".parse().unwrap(), "wrong".parse().unwrap())
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn credential_round_trips_through_the_admin_api() {
    let (_dir, server) = harness();

    let create = server
        .post("/proxy/credentials")
        .add_header("x-admin-key".parse().unwrap(), ADMIN_KEY.parse().unwrap())
        .json(&serde_json::json!({
            "customer_id": "acme",
            "access_key": "AKIAEXAMPLE",
            "secret_key": "supersecret",
        }))
        .await;
    create.assert_status_ok();
    let body: serde_json::Value = create.json();
    assert_eq!(body["customer_id"], "acme");
    assert_eq!(body["access_key"], "AKIAEXAMPLE");

    let fetch = server
        .get("/proxy/credentials/AKIAEXAMPLE")
        .add_header("x-admin-key".parse().unwrap(), ADMIN_KEY.parse().unwrap())
        .await;
    fetch.assert_status_ok();
    let body: serde_json::Value = fetch.json();
    assert_eq!(body["customer_id"], "acme");
}

#[tokio::test]
async fn unknown_credential_returns_404() {
    let (_dir, server) = harness();
    let response = server
        .get("/proxy/credentials/does-not-exist")
        .add_header("x-admin-key".parse().unwrap(), ADMIN_KEY.parse().unwrap())
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bucket_mapping_round_trips_and_lists_objects() {
    let (_dir, server) = harness();
    let admin_header = ("x-admin-key", ADMIN_KEY);

    let mapping = server
        .post("/proxy/buckets")
        .add_header(admin_header.0.parse().unwrap(), admin_header.1.parse().unwrap())
        .json(&serde_json::json!({
            "customer_id": "acme",
            "region_id": "us-east",
            "logical_name": "invoices",
            "backend_ids": ["primary"],
        }))
        .await;
    mapping.assert_status_ok();
    let mapping_body: serde_json::Value = mapping.json();
    assert!(mapping_body["backend_mapping"]["primary"].is_string());

    let fetch = server
        .get("/proxy/buckets/acme/invoices")
        .add_header(admin_header.0.parse().unwrap(), admin_header.1.parse().unwrap())
        .await;
    fetch.assert_status_ok();

    let object = server
        .post("/proxy/objects")
        .add_header(admin_header.0.parse().unwrap(), admin_header.1.parse().unwrap())
        .json(&serde_json::json!({
            "customer_id": "acme",
            "logical_name": "invoices",
            "backend_id": "primary",
            "object_key": "2026/invoice-1.pdf",
            "size": 1024,
            "etag": "\"abc123\"",
        }))
        .await;
    object.assert_status_ok();

    let listed = server
        .get("/proxy/objects/acme/invoices")
        .add_header(admin_header.0.parse().unwrap(), admin_header.1.parse().unwrap())
        .await;
    listed.assert_status_ok();
    let listed_body: serde_json::Value = listed.json();
    assert_eq!(listed_body["objects"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn listing_jobs_with_an_unknown_status_is_rejected() {
    let (_dir, server) = harness();
    let response = server
        .get("/proxy/jobs?status=bogus")
        .add_header("x-admin-key".parse().unwrap(), ADMIN_KEY.parse().unwrap())
        .await;
    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
}
