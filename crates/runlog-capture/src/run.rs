//! The capture orchestrator: spawn one shell command and build its bundle.
//!
//! Steps run strictly in sequence. The only concurrency is the two stream
//! readers, each owning its own tail buffer; both are joined after the child
//! exits and before anything derived from the output is written.

use anyhow::Context;
use runlog_core::canon::stable_stringify;
use runlog_core::hash::sha256_hex;
use runlog_core::redact::{redact, RedactionReport};
use runlog_core::run_id::{generate_run_id, now_ms};
use runlog_core::tail::TailBuffer;
use runlog_core::{EventPayload, HashManifest, SnapshotData};
use runlog_store::{write_atomic, write_json_pretty, ArtifactLayout, EventWriter};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::config::CaptureOptions;
use crate::git::{capture_git_snapshot, GitCapture, SnapshotOutputs};
use crate::host::{EnvDescriptor, HostInfo, ToolVersions};

// Below the default tail limit, so one read never evicts the whole tail.
const READ_CHUNK: usize = 1024;

/// What a finished capture produced.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub run_id: String,
    pub layout: ArtifactLayout,
    /// The child's exit code; `capture_run` binaries exit with it.
    pub exit_code: i32,
    pub manifest: HashManifest,
    pub redactions: usize,
}

/// Output of one child stream after it hit EOF.
struct StreamCapture {
    tail: TailBuffer,
    full: Option<Vec<u8>>,
}

async fn drain<R>(mut reader: R, mut tail: TailBuffer, keep_full: bool) -> std::io::Result<StreamCapture>
where
    R: AsyncRead + Unpin,
{
    let mut full = keep_full.then(Vec::new);
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        tail.add(&buf[..n]);
        if let Some(full) = full.as_mut() {
            full.extend_from_slice(&buf[..n]);
        }
    }
    Ok(StreamCapture { tail, full })
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

fn spawn_shell(cmd: &str, cwd: &Path) -> anyhow::Result<Child> {
    shell_command(cmd)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to spawn command shell")
}

/// Snapshot the repository and persist the `repo_*.json` file when it is one.
async fn snapshot(
    cwd: &Path,
    status_path: &Path,
    diff_path: &Path,
    json_path: &Path,
) -> anyhow::Result<GitCapture> {
    let capture = capture_git_snapshot(
        cwd,
        SnapshotOutputs {
            status_path: Some(status_path),
            diff_path: Some(diff_path),
        },
    )
    .await?;
    if let GitCapture::Git(state) = &capture {
        write_json_pretty(json_path, &state.snapshot)?;
    }
    tracing::debug!(git = capture.is_git(), path = %json_path.display(), "repo snapshot");
    Ok(capture)
}

fn resolve_cwd(cwd: &Path) -> anyhow::Result<PathBuf> {
    let abs = std::path::absolute(cwd)
        .with_context(|| format!("cannot resolve working directory {}", cwd.display()))?;
    if !abs.is_dir() {
        anyhow::bail!("working directory does not exist: {}", abs.display());
    }
    Ok(abs)
}

/// Drive one supervised run end to end.
///
/// A non-zero child exit is a normal outcome reported in
/// [`CaptureOutcome::exit_code`]; `Err` means the bundle could not be built.
pub async fn capture_run(opts: &CaptureOptions) -> anyhow::Result<CaptureOutcome> {
    if opts.cmd.is_empty() {
        anyhow::bail!("missing command to capture");
    }
    let cwd = resolve_cwd(&opts.cwd)?;
    let run_id = generate_run_id();
    let artifacts_dir = opts
        .artifacts_dir
        .clone()
        .unwrap_or_else(|| ArtifactLayout::default_artifacts_dir(&cwd));
    let layout = ArtifactLayout::create(&artifacts_dir, &run_id)?;

    let mut report = RedactionReport::new();
    let cmd_redacted = redact(&opts.cmd, "cmd", &mut report);
    tracing::info!(%run_id, cmd = %cmd_redacted, cwd = %cwd.display(), "capture started");

    let mut events = EventWriter::create(&layout.events_jsonl, &run_id)?;
    let started_at_ms = now_ms();
    events.emit(EventPayload::RunStart {
        cwd: cwd.display().to_string(),
        cmd_redacted: cmd_redacted.clone(),
        git_enabled: opts.git,
    })?;

    let before = if opts.git {
        let capture = snapshot(
            &cwd,
            &layout.repo_status_before,
            &layout.repo_diff,
            &layout.repo_before,
        )
        .await?;
        events.emit(EventPayload::RepoSnapshotBefore(capture.snapshot_data()))?;
        Some(capture)
    } else {
        None
    };

    let mut child = spawn_shell(&opts.cmd, &cwd)?;
    let pid = child.id();
    events.emit(EventPayload::CommandStarted { pid })?;
    tracing::debug!(?pid, "command started");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("failed to capture stderr"))?;
    let stdout_reader = tokio::spawn(drain(
        stdout,
        TailBuffer::new(opts.stdout_bytes),
        opts.allow_raw_logs,
    ));
    let stderr_reader = tokio::spawn(drain(
        stderr,
        TailBuffer::new(opts.stderr_bytes),
        opts.allow_raw_logs,
    ));

    let status = child.wait().await.context("failed waiting for command")?;
    let stdout = stdout_reader.await?.context("failed reading stdout")?;
    let stderr = stderr_reader.await?.context("failed reading stderr")?;
    // Killed by a signal: no code to propagate.
    let exit_code = status.code().unwrap_or(0);
    tracing::info!(exit_code, "command finished");

    let stdout_tail = redact(&stdout.tail.to_string_lossy(), "stdout_tail", &mut report);
    let stderr_tail = redact(&stderr.tail.to_string_lossy(), "stderr_tail", &mut report);
    write_atomic(&layout.stdout_tail, stdout_tail.as_bytes())?;
    write_atomic(&layout.stderr_tail, stderr_tail.as_bytes())?;

    if let (Some(out_full), Some(err_full)) = (stdout.full, stderr.full) {
        let out_full = redact(&String::from_utf8_lossy(&out_full), "stdout_full", &mut report);
        let err_full = redact(&String::from_utf8_lossy(&err_full), "stderr_full", &mut report);
        write_atomic(&layout.stdout_full, out_full.as_bytes())?;
        write_atomic(&layout.stderr_full, err_full.as_bytes())?;
    }

    let stdout_tail_hash = sha256_hex(&stdout_tail);
    let stderr_tail_hash = sha256_hex(&stderr_tail);
    events.emit(EventPayload::CommandFinished {
        exit_code,
        stdout_tail_hash: stdout_tail_hash.clone(),
        stderr_tail_hash: stderr_tail_hash.clone(),
    })?;

    // Only re-probe when the directory was a repository before the run.
    let after = match &before {
        Some(GitCapture::Git(_)) => {
            let capture = snapshot(
                &cwd,
                &layout.repo_status_after,
                &layout.repo_diff,
                &layout.repo_after,
            )
            .await?;
            events.emit(EventPayload::RepoSnapshotAfter(capture.snapshot_data()))?;
            Some(capture)
        }
        Some(GitCapture::NotGit { reason }) => {
            events.emit(EventPayload::RepoSnapshotAfter(SnapshotData::Skipped {
                reason: *reason,
            }))?;
            None
        }
        None => None,
    };

    let env = EnvDescriptor {
        run_id: run_id.clone(),
        started_at_ms,
        finished_at_ms: now_ms(),
        cwd: cwd.display().to_string(),
        cmd: cmd_redacted,
        exit_code,
        git_enabled: opts.git,
        host: HostInfo::detect().await,
        tool_versions: ToolVersions::detect(&cwd).await,
    };
    write_json_pretty(&layout.env_json, &env)?;
    let env_hash = sha256_hex(stable_stringify(&env)?);

    let repo_diff_hash = after
        .as_ref()
        .and_then(GitCapture::diff_hash)
        .or_else(|| before.as_ref().and_then(GitCapture::diff_hash))
        .map(str::to_string);
    let manifest = HashManifest {
        stdout_tail_hash,
        stderr_tail_hash,
        env_hash,
        repo_diff_hash,
    };
    write_json_pretty(&layout.hashes_json, &manifest)?;

    if !report.is_empty() {
        write_json_pretty(&layout.redaction_report, &report)?;
        tracing::info!(redactions = report.total(), "secrets redacted");
    }

    events.close(exit_code, &layout.run_dir)?;
    write_atomic(
        &layout.run_path,
        format!("{}\n", layout.run_dir.display()).as_bytes(),
    )?;
    tracing::info!(run_dir = %layout.run_dir.display(), "capture complete");

    Ok(CaptureOutcome {
        run_id,
        exit_code,
        manifest,
        redactions: report.total(),
        layout,
    })
}
