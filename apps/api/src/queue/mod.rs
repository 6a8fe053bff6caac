//! Durable filesystem queue for re-optimization requests.
//!
//! A job is one JSON file. Pending jobs live at the queue root, claimed
//! jobs in `processing/`, finished jobs in `done/`; same-filesystem renames
//! between those directories are the only synchronization primitive shared
//! by the producer (the API) and the consumer (the worker binary).

pub mod worker;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::results::store::StoredResult;

/// Subdirectory of the storage root holding the queue.
pub const QUEUE_DIR: &str = "reopt_queue";

/// A queued request to regenerate one artifact. The file name
/// (`{event_id}.json`) is the job's identity; there is no separate index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReoptJob {
    pub event_id: String,
    pub result_id: String,
    pub openid: String,
    pub filename: String,
    pub source_pdf: PathBuf,
    pub created_at: DateTime<Utc>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReoptQueue {
    pending: PathBuf,
    processing: PathBuf,
    done: PathBuf,
}

impl ReoptQueue {
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        let root = storage_root.as_ref().join(QUEUE_DIR);
        ReoptQueue {
            processing: root.join("processing"),
            done: root.join("done"),
            pending: root,
        }
    }

    pub fn pending_dir(&self) -> &Path {
        &self.pending
    }

    pub fn processing_dir(&self) -> &Path {
        &self.processing
    }

    pub fn done_dir(&self) -> &Path {
        &self.done
    }

    /// Durably writes a job file into the pending directory and returns the
    /// event id as a fire-and-forget receipt.
    ///
    /// Event ids are `{millis}_{uuid}`: roughly chronological under name
    /// ordering, collision-free under concurrent producers. The file appears
    /// under its final name only once fully written (tmp write + rename), so
    /// a polling consumer can never observe a partial job.
    pub fn enqueue(&self, result_id: &str, record: &StoredResult) -> Result<String, AppError> {
        let event_id = format!("{}_{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple());
        let job = ReoptJob {
            event_id: event_id.clone(),
            result_id: result_id.to_string(),
            openid: record.openid.clone(),
            filename: record.filename.clone(),
            source_pdf: record.path.clone(),
            created_at: record.created_at,
            requested_at: Utc::now(),
        };
        self.write_job(&job).map_err(AppError::QueueWrite)?;
        Ok(event_id)
    }

    fn write_job(&self, job: &ReoptJob) -> io::Result<()> {
        fs::create_dir_all(&self.pending)?;
        let payload = serde_json::to_vec(job).map_err(io::Error::other)?;
        let tmp = self.pending.join(format!("{}.json.tmp", job.event_id));
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, self.pending.join(format!("{}.json", job.event_id)))
    }

    // ────────────────────────────────────────────────────────────────────
    // Consumer side
    // ────────────────────────────────────────────────────────────────────

    /// Pending job files in name order (event ids sort roughly
    /// chronologically). A missing queue directory is an empty queue.
    pub fn scan_pending(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.pending) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    /// Claims a pending job by renaming it into `processing/`. The rename is
    /// atomic on the same filesystem, so each job is claimed at most once.
    pub fn claim(&self, pending_path: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.processing)?;
        let name = job_file_name(pending_path)?;
        let claimed = self.processing.join(name);
        fs::rename(pending_path, &claimed)?;
        Ok(claimed)
    }

    /// The commit point: moves a processed job into `done/`. A crash before
    /// this rename leaves the job in `processing/` for recovery; a crash
    /// after means it will never run again.
    pub fn complete(&self, processing_path: &Path) -> io::Result<()> {
        fs::create_dir_all(&self.done)?;
        let name = job_file_name(processing_path)?;
        fs::rename(processing_path, self.done.join(name))
    }

    /// Returns jobs stranded in `processing/` by a crash or a failed run to
    /// the pending directory. Called once at worker startup; the count is
    /// reported for the log.
    pub fn recover(&self) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.processing) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };
        let mut recovered = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let name = job_file_name(&path)?;
            fs::rename(&path, self.pending.join(name))?;
            recovered += 1;
        }
        Ok(recovered)
    }

    pub fn load(&self, path: &Path) -> io::Result<ReoptJob> {
        let raw = fs::read(path)?;
        serde_json::from_slice(&raw).map_err(io::Error::other)
    }
}

fn job_file_name(path: &Path) -> io::Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| io::Error::other("job path has no file name"))
}
