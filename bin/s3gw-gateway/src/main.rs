//! S3 Gateway - multi-tenant S3-compatible storage proxy.

use anyhow::Result;
use clap::Parser;
use s3gw_backend::{BackendConfig, BackendRegistry};
use s3gw_gateway::state::AppState;
use s3gw_meta::MetaStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "s3gw-gateway")]
#[command(about = "Multi-tenant S3-compatible storage proxy")]
#[command(version)]
struct Args {
    /// Listen address for the combined S3 + admin API.
    #[arg(long, env = "S3GW_LISTEN_ADDR", default_value = "0.0.0.0:9000")]
    listen: String,

    /// Path to the embedded metadata store.
    #[arg(long, env = "PROXY_METADATA_DB_PATH", default_value = "proxy_metadata.redb")]
    metadata_db_path: String,

    /// Operator key required on every `/proxy/*` admin request.
    #[arg(long, env = "ADMIN_API_KEY")]
    admin_api_key: Option<String>,

    /// Path to the provider capability CSV, seeded idempotently at startup.
    #[arg(long, env = "PROVIDER_CATALOGUE_CSV")]
    provider_catalogue_csv: Option<String>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting s3gw-gateway");

    let meta = Arc::new(MetaStore::open(&args.metadata_db_path)?);

    if let Some(csv_path) = &args.provider_catalogue_csv {
        let seeded = s3gw_meta::seed_provider_capabilities(&meta, csv_path)?;
        info!(seeded, csv_path, "seeded provider capability catalogue");
    }

    let backends = Arc::new(BackendRegistry::new(BackendConfig::from_env()));

    let state = Arc::new(AppState {
        meta,
        backends,
        admin_api_key: args.admin_api_key.clone(),
    });

    if state.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY is not set; admin endpoints will reject every request");
    }

    let app = s3gw_gateway::build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = args
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen address {}: {}", args.listen, e))?;

    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    Ok(())
}
