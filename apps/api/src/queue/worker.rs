//! Polling consumer for the re-optimization queue.
//!
//! Jobs move `pending → processing → done`; every transition is a rename.
//! A failed or unreadable job stays in `processing/` for the rest of this
//! process's lifetime and is re-queued by startup recovery, so a crash
//! mid-job is detected instead of silently forgotten.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

use super::{ReoptJob, ReoptQueue};

/// The external regeneration pipeline. Behind a trait so tests can swap in
/// a mock; reprocessing after a worker restart must be safe on its side.
#[async_trait]
pub trait ReoptPipeline: Send + Sync {
    async fn regenerate(&self, job: &ReoptJob) -> Result<()>;
}

/// Production pipeline: shells out to a configured command line with
/// `--openid <openid>` appended, bounded by a timeout.
pub struct CommandPipeline {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPipeline {
    /// Splits the configured command line on whitespace (no shell quoting).
    pub fn from_command_line(command: &str, timeout: Duration) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .context("regeneration command is empty")?
            .to_string();
        Ok(CommandPipeline {
            program,
            args: parts.map(str::to_string).collect(),
            timeout,
        })
    }
}

#[async_trait]
impl ReoptPipeline for CommandPipeline {
    async fn regenerate(&self, job: &ReoptJob) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--openid")
            .arg(&job.openid)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                anyhow::anyhow!("regeneration timed out after {}s", self.timeout.as_secs())
            })?
            .with_context(|| format!("failed to launch '{}'", self.program))?;

        if !output.status.success() {
            bail!(
                "regeneration exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

pub struct ReoptWorker {
    queue: ReoptQueue,
    pipeline: Arc<dyn ReoptPipeline>,
    poll_interval: Duration,
}

impl ReoptWorker {
    pub fn new(queue: ReoptQueue, pipeline: Arc<dyn ReoptPipeline>, poll_interval: Duration) -> Self {
        ReoptWorker {
            queue,
            pipeline,
            poll_interval,
        }
    }

    /// Recovers jobs stranded by a previous run, then polls forever.
    pub async fn run(self) -> Result<()> {
        let recovered = self
            .queue
            .recover()
            .context("failed to recover in-flight jobs")?;
        if recovered > 0 {
            warn!(recovered, "re-queued jobs left in processing by a previous run");
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.pass().await {
                error!("queue scan failed: {err:#}");
            }
        }
    }

    /// One scan over the pending directory, strictly in name order, one job
    /// at a time. Returns how many jobs reached `done/`. A single job's
    /// failure never aborts the pass.
    pub async fn pass(&self) -> Result<usize> {
        let mut completed = 0;
        for pending in self.queue.scan_pending().context("failed to scan queue")? {
            let claimed = match self.queue.claim(&pending) {
                Ok(path) => path,
                // Someone renamed it first; skip and move on.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err).context("failed to claim pending job"),
            };
            if self.process(&claimed).await {
                completed += 1;
            }
        }
        Ok(completed)
    }

    /// Returns true when the job reached `done/`. Failed or unreadable jobs
    /// stay in `processing/` until the next restart re-queues them.
    async fn process(&self, claimed: &Path) -> bool {
        let job = match self.queue.load(claimed) {
            Ok(job) => job,
            Err(err) => {
                error!(path = %claimed.display(), "unreadable job file: {err}");
                return false;
            }
        };

        info!(event_id = %job.event_id, openid = %job.openid, "processing re-optimization job");
        match self.pipeline.regenerate(&job).await {
            Ok(()) => match self.queue.complete(claimed) {
                Ok(()) => {
                    info!(event_id = %job.event_id, "re-optimization done");
                    true
                }
                Err(err) => {
                    error!(event_id = %job.event_id, "failed to commit finished job: {err}");
                    false
                }
            },
            Err(err) => {
                error!(event_id = %job.event_id, "regeneration failed: {err:#}");
                false
            }
        }
    }
}
