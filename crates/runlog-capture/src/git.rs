use anyhow::Context;
use runlog_core::hash::sha256_hex;
use runlog_core::{GitSnapshot, SkipReason, SnapshotData, StatusSummary};
use std::path::Path;
use tokio::process::Command;

/// Files a snapshot should persist its raw status/diff text to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotOutputs<'a> {
    pub status_path: Option<&'a Path>,
    pub diff_path: Option<&'a Path>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitState {
    pub snapshot: GitSnapshot,
    pub status_text: String,
    pub diff_text: String,
    pub diff_hash: String,
}

/// Result of probing a directory. Not being a repository is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCapture {
    NotGit { reason: SkipReason },
    Git(Box<GitState>),
}

impl GitCapture {
    pub fn is_git(&self) -> bool {
        matches!(self, Self::Git(_))
    }

    pub fn diff_hash(&self) -> Option<&str> {
        match self {
            Self::Git(state) => Some(&state.diff_hash),
            Self::NotGit { .. } => None,
        }
    }

    /// Event payload for `repo_snapshot_before` / `repo_snapshot_after`.
    pub fn snapshot_data(&self) -> SnapshotData {
        match self {
            Self::Git(state) => SnapshotData::Captured(state.snapshot.clone()),
            Self::NotGit { reason } => SnapshotData::Skipped { reason: *reason },
        }
    }
}

/// Run `git <args>` in `cwd`. `None` if git is missing or exits non-zero;
/// stdout is right-trimmed.
async fn run_git(cwd: &Path, args: &[&str]) -> Option<String> {
    match Command::new("git").args(args).current_dir(cwd).output().await {
        Ok(output) if output.status.success() => Some(
            String::from_utf8_lossy(&output.stdout)
                .trim_end()
                .to_string(),
        ),
        Ok(output) => {
            tracing::debug!(
                ?args,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git command failed"
            );
            None
        }
        Err(e) => {
            tracing::debug!(?args, "git not available: {e}");
            None
        }
    }
}

pub async fn is_git_repo(cwd: &Path) -> bool {
    run_git(cwd, &["rev-parse", "--is-inside-work-tree"])
        .await
        .is_some_and(|out| out == "true")
}

/// Best-effort snapshot of HEAD, branch, porcelain status and working-tree diff.
///
/// Errors only when persisting to `outputs` fails. Sub-commands that fail
/// inside a repository (e.g. `HEAD` before the first commit) yield empty text.
pub async fn capture_git_snapshot(
    cwd: &Path,
    outputs: SnapshotOutputs<'_>,
) -> anyhow::Result<GitCapture> {
    if !is_git_repo(cwd).await {
        return Ok(GitCapture::NotGit {
            reason: SkipReason::NotAGitRepo,
        });
    }

    let head = run_git(cwd, &["rev-parse", "HEAD"]).await.unwrap_or_default();
    let branch = run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])
        .await
        .unwrap_or_default();
    let status_text = run_git(cwd, &["status", "--porcelain"])
        .await
        .unwrap_or_default();
    let diff_text = run_git(cwd, &["diff"]).await.unwrap_or_default();
    let diff_hash = sha256_hex(&diff_text);

    if let Some(path) = outputs.status_path {
        let mut body = status_text.clone();
        if !body.is_empty() {
            body.push('\n');
        }
        runlog_store::write_atomic(path, body.as_bytes())
            .with_context(|| format!("cannot write status to {}", path.display()))?;
    }
    if let Some(path) = outputs.diff_path {
        runlog_store::write_atomic(path, diff_text.as_bytes())
            .with_context(|| format!("cannot write diff to {}", path.display()))?;
    }

    Ok(GitCapture::Git(Box::new(GitState {
        snapshot: GitSnapshot {
            head,
            branch,
            status_summary: StatusSummary::from_porcelain(&status_text),
            diff_hash: diff_hash.clone(),
        },
        status_text,
        diff_text,
        diff_hash,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn git(dir: &Path, args: &[&str]) {
        let _ = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .await;
    }

    async fn init_repo(dir: &Path) {
        git(dir, &["init"]).await;
        git(dir, &["config", "user.email", "test@test.com"]).await;
        git(dir, &["config", "user.name", "Test"]).await;
        std::fs::write(dir.join("README"), "hi\n").unwrap();
        git(dir, &["add", "."]).await;
        git(dir, &["commit", "-m", "init"]).await;
    }

    #[tokio::test]
    async fn not_a_repo() {
        let dir = tempfile::tempdir().unwrap();
        let status = dir.path().join("status.txt");
        let out = capture_git_snapshot(
            dir.path(),
            SnapshotOutputs {
                status_path: Some(&status),
                diff_path: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            out,
            GitCapture::NotGit {
                reason: SkipReason::NotAGitRepo
            }
        );
        assert!(out.diff_hash().is_none());
        assert!(!status.exists());
        assert_eq!(
            serde_json::to_value(out.snapshot_data()).unwrap(),
            serde_json::json!({"reason": "NOT_A_GIT_REPO"})
        );
    }

    #[tokio::test]
    async fn dirty_repo_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path()).await;
        std::fs::write(dir.path().join("README"), "hi\nthere\n").unwrap();
        std::fs::write(dir.path().join("scratch.txt"), "x").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let status_path = out_dir.path().join("status.txt");
        let diff_path = out_dir.path().join("diff.patch");
        let out = capture_git_snapshot(
            dir.path(),
            SnapshotOutputs {
                status_path: Some(&status_path),
                diff_path: Some(&diff_path),
            },
        )
        .await
        .unwrap();

        let GitCapture::Git(state) = out else {
            panic!("expected a git snapshot");
        };
        assert_eq!(state.snapshot.head.len(), 40);
        assert!(!state.snapshot.branch.is_empty());
        assert_eq!(state.snapshot.status_summary.changed_files, 2);
        assert_eq!(state.snapshot.status_summary.modified, 1);
        assert_eq!(state.snapshot.status_summary.untracked, 1);
        assert!(state.diff_text.contains("+there"));

        let diff_on_disk = std::fs::read_to_string(&diff_path).unwrap();
        assert_eq!(diff_on_disk, state.diff_text);
        assert_eq!(sha256_hex(&diff_on_disk), state.snapshot.diff_hash);
        let status_on_disk = std::fs::read_to_string(&status_path).unwrap();
        assert_eq!(status_on_disk, format!("{}\n", state.status_text));
    }

    #[tokio::test]
    async fn clean_repo_has_empty_diff() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path()).await;
        let out = capture_git_snapshot(dir.path(), SnapshotOutputs::default())
            .await
            .unwrap();
        assert!(out.is_git());
        assert_eq!(out.diff_hash(), Some(sha256_hex("").as_str()));
    }
}
