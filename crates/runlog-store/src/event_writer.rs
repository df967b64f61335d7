//! Append-only JSONL event sink for one run.
//!
//! The file is held open under an exclusive advisory lock for the lifetime
//! of the writer. `close` consumes the writer after appending `run_finish`,
//! so nothing can follow it.

use anyhow::Context;
use fs2::FileExt;
use runlog_core::run_id::now_ms;
use runlog_core::{EventPayload, EventRecord};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventWriter {
    path: PathBuf,
    run_id: String,
    file: File,
    written: usize,
}

impl EventWriter {
    /// Open (creating if needed) `path` for appending and lock it.
    pub fn create(path: &Path, run_id: &str) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open event log {}", path.display()))?;
        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!("event log {} is locked by another run", path.display())
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of events appended so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Append one event stamped with the current time.
    pub fn emit(&mut self, payload: EventPayload) -> anyhow::Result<()> {
        if matches!(payload, EventPayload::RunFinish { .. }) {
            anyhow::bail!("run_finish must be written through EventWriter::close");
        }
        self.append(payload)
    }

    /// Append `run_finish` and release the log.
    pub fn close(mut self, exit_code: i32, artifact_dir: &Path) -> anyhow::Result<()> {
        self.append(EventPayload::RunFinish {
            exit_code,
            artifact_dir: artifact_dir.display().to_string(),
        })?;
        self.file.sync_all()?;
        tracing::debug!(events = self.written, path = %self.path.display(), "event log closed");
        Ok(())
    }

    fn append(&mut self, payload: EventPayload) -> anyhow::Result<()> {
        let event_type = payload.type_name();
        let record = EventRecord {
            ts_ms: now_ms(),
            run_id: self.run_id.clone(),
            payload,
        };
        let line = serde_json::to_string(&record)?;
        writeln!(self.file, "{line}")
            .with_context(|| format!("cannot append {event_type} to {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
