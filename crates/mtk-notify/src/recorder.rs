//! Job status recorders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mtk_models::{JobId, StatusEvent};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{NotifyError, NotifyResult};

/// Append-only sink for job lifecycle events.
#[async_trait]
pub trait StatusRecorder: Send + Sync {
    /// Append one event for `event.job_id`.
    async fn record(&self, event: &StatusEvent) -> NotifyResult<()>;

    /// Most recent event recorded for a job.
    async fn latest(&self, job_id: &JobId) -> NotifyResult<Option<StatusEvent>>;
}

/// Job ids end up in file names; only UUID-like tokens are accepted.
fn validate_job_id(job_id: &JobId) -> NotifyResult<()> {
    let id = job_id.as_str();
    let valid = !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(NotifyError::InvalidJobId(id.to_string()))
    }
}

/// Writes one JSON line per event to `{root}/jobs/{job_id}.jsonl`.
pub struct FileStatusRecorder {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStatusRecorder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join("jobs"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, job_id: &JobId) -> NotifyResult<PathBuf> {
        validate_job_id(job_id)?;
        Ok(self.dir.join(format!("{}.jsonl", job_id)))
    }
}

#[async_trait]
impl StatusRecorder for FileStatusRecorder {
    async fn record(&self, event: &StatusEvent) -> NotifyResult<()> {
        let path = self.path_for(&event.job_id)?;
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(
            job_id = %event.job_id,
            status = %event.job_status,
            "Recorded job status"
        );
        Ok(())
    }

    async fn latest(&self, job_id: &JobId) -> NotifyResult<Option<StatusEvent>> {
        let path = self.path_for(job_id)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match contents.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(line) => Ok(Some(serde_json::from_str(line)?)),
            None => Ok(None),
        }
    }
}

/// In-process recorder keeping every event; used by tests and local runs.
#[derive(Default)]
pub struct MemoryStatusRecorder {
    events: RwLock<HashMap<JobId, Vec<StatusEvent>>>,
}

impl MemoryStatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded for a job, oldest first.
    pub async fn events(&self, job_id: &JobId) -> Vec<StatusEvent> {
        self.events
            .read()
            .await
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn job_ids(&self) -> Vec<JobId> {
        self.events.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl StatusRecorder for MemoryStatusRecorder {
    async fn record(&self, event: &StatusEvent) -> NotifyResult<()> {
        self.events
            .write()
            .await
            .entry(event.job_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn latest(&self, job_id: &JobId) -> NotifyResult<Option<StatusEvent>> {
        Ok(self
            .events
            .read()
            .await
            .get(job_id)
            .and_then(|events| events.last().cloned()))
    }
}
