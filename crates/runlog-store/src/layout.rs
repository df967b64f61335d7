use std::path::{Path, PathBuf};

/// Artifact root relative to the captured command's working directory.
pub const DEFAULT_ARTIFACTS_SUBDIR: &str = "artifacts/capture_run";

/// All well-known paths of one run's artifact bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub run_dir: PathBuf,
    pub env_json: PathBuf,
    pub events_jsonl: PathBuf,
    pub hashes_json: PathBuf,
    pub stdout_tail: PathBuf,
    pub stderr_tail: PathBuf,
    pub stdout_full: PathBuf,
    pub stderr_full: PathBuf,
    pub redaction_report: PathBuf,
    pub repo_before: PathBuf,
    pub repo_after: PathBuf,
    pub repo_diff: PathBuf,
    pub repo_status_before: PathBuf,
    pub repo_status_after: PathBuf,
    pub run_path: PathBuf,
    pub episodes_dir: PathBuf,
    pub episodes_jsonl: PathBuf,
    pub patterns_dir: PathBuf,
    pub patterns_json: PathBuf,
    pub patterns_core_json: PathBuf,
}

impl ArtifactLayout {
    /// Derive all paths from an existing run directory. Pure computation, no I/O.
    pub fn discover(run_dir: impl Into<PathBuf>) -> Self {
        let run_dir = run_dir.into();
        let episodes_dir = run_dir.join("episodes");
        let patterns_dir = run_dir.join("patterns");
        Self {
            env_json: run_dir.join("env.json"),
            events_jsonl: run_dir.join("events.jsonl"),
            hashes_json: run_dir.join("hashes.json"),
            stdout_tail: run_dir.join("stdout_tail.txt"),
            stderr_tail: run_dir.join("stderr_tail.txt"),
            stdout_full: run_dir.join("stdout_full.txt"),
            stderr_full: run_dir.join("stderr_full.txt"),
            redaction_report: run_dir.join("redaction_report.json"),
            repo_before: run_dir.join("repo_before.json"),
            repo_after: run_dir.join("repo_after.json"),
            repo_diff: run_dir.join("repo_diff.patch"),
            repo_status_before: run_dir.join("repo_status_before.txt"),
            repo_status_after: run_dir.join("repo_status_after.txt"),
            run_path: run_dir.join("run_path.txt"),
            episodes_jsonl: episodes_dir.join("episodes.jsonl"),
            patterns_json: patterns_dir.join("patterns.json"),
            patterns_core_json: patterns_dir.join("patterns_core.json"),
            episodes_dir,
            patterns_dir,
            run_dir,
        }
    }

    /// Layout for `run_id` under `artifacts_dir`, creating the run directory.
    pub fn create(artifacts_dir: &Path, run_id: &str) -> anyhow::Result<Self> {
        let layout = Self::discover(artifacts_dir.join(run_id));
        std::fs::create_dir_all(&layout.run_dir).map_err(|e| {
            anyhow::anyhow!("cannot create run dir {}: {e}", layout.run_dir.display())
        })?;
        Ok(layout)
    }

    /// `<cwd>/artifacts/capture_run`
    pub fn default_artifacts_dir(cwd: &Path) -> PathBuf {
        cwd.join(DEFAULT_ARTIFACTS_SUBDIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let l = ArtifactLayout::discover("/tmp/run");
        assert_eq!(l.events_jsonl, PathBuf::from("/tmp/run/events.jsonl"));
        assert_eq!(l.repo_diff, PathBuf::from("/tmp/run/repo_diff.patch"));
        assert_eq!(
            l.repo_status_after,
            PathBuf::from("/tmp/run/repo_status_after.txt")
        );
        assert_eq!(
            l.episodes_jsonl,
            PathBuf::from("/tmp/run/episodes/episodes.jsonl")
        );
        assert_eq!(
            l.patterns_core_json,
            PathBuf::from("/tmp/run/patterns/patterns_core.json")
        );
        assert_eq!(l.run_path, PathBuf::from("/tmp/run/run_path.txt"));
    }

    #[test]
    fn create_makes_run_dir_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = ArtifactLayout::default_artifacts_dir(tmp.path());
        let l = ArtifactLayout::create(&root, "2026-01-01T00-00-00-000Z_00000000").unwrap();
        assert!(l.run_dir.is_dir());
        assert!(l.run_dir.starts_with(tmp.path().join("artifacts").join("capture_run")));
        assert!(!l.episodes_dir.exists());
        assert!(!l.events_jsonl.exists());
    }
}
