//! s3gw-replicator - drains the replication job queue.

mod worker;

use anyhow::Result;
use clap::Parser;
use s3gw_backend::{BackendConfig, BackendRegistry};
use s3gw_meta::MetaStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worker::{Worker, DEFAULT_MAX_OBJECT_BYTES};

#[derive(Parser, Debug)]
#[command(name = "s3gw-replicator")]
#[command(about = "Replication worker for the S3 gateway proxy")]
#[command(version)]
struct Args {
    /// Path to the embedded metadata store (shared with the gateway).
    #[arg(long, env = "PROXY_METADATA_DB_PATH", default_value = "proxy_metadata.redb")]
    metadata_db_path: String,

    /// Maximum number of jobs claimed per poll.
    #[arg(long, env = "S3GW_REPLICATION_LIMIT", default_value_t = 10)]
    limit: usize,

    /// Seconds to sleep after an empty poll.
    #[arg(long, env = "REPLICATION_WORKER_INTERVAL", default_value_t = 2)]
    interval_secs: u64,

    /// Per-object byte cap enforced before buffering a replication copy.
    #[arg(long, env = "S3GW_MAX_REPLICATION_OBJECT_BYTES", default_value_t = DEFAULT_MAX_OBJECT_BYTES)]
    max_object_bytes: u64,

    /// Run a single poll and exit instead of looping forever.
    #[arg(long, default_value_t = false)]
    once: bool,

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

    info!("Starting s3gw-replicator");

    let meta = Arc::new(MetaStore::open(&args.metadata_db_path)?);
    let backends = Arc::new(BackendRegistry::new(BackendConfig::from_env()));
    let worker = Worker::new(meta, backends, args.max_object_bytes);

    if args.once {
        let processed = worker.run_once(args.limit).await?;
        info!(processed, "single poll complete");
        return Ok(());
    }

    loop {
        let processed = worker.run_once(args.limit).await?;
        if processed == 0 {
            tokio::time::sleep(Duration::from_secs(args.interval_secs)).await;
        }
    }
}
