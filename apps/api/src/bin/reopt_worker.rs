//! Standalone re-optimization worker. Reads the same filesystem queue as the
//! API process and invokes the regeneration pipeline one job at a time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wxresume_api::config::Config;
use wxresume_api::queue::worker::{CommandPipeline, ReoptWorker};
use wxresume_api::queue::ReoptQueue;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = config
        .regen_command
        .clone()
        .context("WXRESUME_REGEN_COMMAND must be set for the worker")?;
    let pipeline = CommandPipeline::from_command_line(
        &command,
        Duration::from_secs(config.regen_timeout_secs),
    )?;
    let queue = ReoptQueue::new(&config.storage_root);

    info!("reopt worker watching {}", queue.pending_dir().display());

    ReoptWorker::new(
        queue,
        Arc::new(pipeline),
        Duration::from_secs(config.worker_poll_secs),
    )
    .run()
    .await
}
