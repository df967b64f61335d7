pub mod event_writer;
pub mod jsonl;
pub mod layout;

pub use event_writer::EventWriter;
pub use jsonl::{read_jsonl, write_jsonl, JsonlError};
pub use layout::ArtifactLayout;

use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// Pretty-printed JSON plus trailing newline, written atomically.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}
