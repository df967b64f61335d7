use anyhow::Context;
use runlog_core::hash::sha256_hex;
use runlog_core::{
    Episode, EpisodeHashes, EpisodeKind, EpisodeOutcome, EpisodeRefs, GitOutcome, RawEvent,
};
use runlog_store::{read_jsonl, write_jsonl, ArtifactLayout};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

use crate::error::StageError;

/// Bundle-relative reference carried by `EP.REPO_DIFF` episodes.
pub const PATCH_REF: &str = "repo_diff.patch";

// ── Raw event views ──

#[derive(Debug, Default, Deserialize)]
struct SnapshotView {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FinishedView {
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    stdout_tail_hash: Option<String>,
    #[serde(default)]
    stderr_tail_hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RunFinishView {
    #[serde(default)]
    exit_code: Option<i32>,
}

/// The raw event types the mapper understands, resolved once per line.
#[derive(Debug)]
enum KnownEvent {
    RunStart,
    SnapshotBefore(SnapshotView),
    SnapshotAfter(SnapshotView),
    CommandFinished(FinishedView),
    RunFinish(RunFinishView),
}

fn view<T: DeserializeOwned + Default>(data: &Value) -> T {
    T::deserialize(data).unwrap_or_default()
}

impl KnownEvent {
    /// `None` for types without an episode (e.g. `command_started`) and for
    /// types this version does not know.
    fn resolve(event: &RawEvent) -> Option<Self> {
        Some(match event.event_type.as_str() {
            "run_start" => Self::RunStart,
            "repo_snapshot_before" => Self::SnapshotBefore(view(&event.data)),
            "repo_snapshot_after" => Self::SnapshotAfter(view(&event.data)),
            "command_finished" => Self::CommandFinished(view(&event.data)),
            "run_finish" => Self::RunFinish(view(&event.data)),
            _ => return None,
        })
    }
}

// ── Mapping ──

fn snapshot_episode(kind: EpisodeKind, snap: &SnapshotView) -> (EpisodeKind, EpisodeOutcome) {
    if snap.reason.is_some() {
        let outcome = EpisodeOutcome {
            git: Some(GitOutcome::Skip),
            ..Default::default()
        };
        (EpisodeKind::GitSkip, outcome)
    } else {
        let outcome = EpisodeOutcome {
            git: Some(GitOutcome::Ok),
            ..Default::default()
        };
        (kind, outcome)
    }
}

/// Map raw events to episodes. Pure: the same inputs always give the same
/// output.
///
/// `run_id` labels the synthetic diff episode; mapped episodes keep their
/// event's own run id. When `diff_hash` is set, every `command_finished`
/// is followed by an `EP.REPO_DIFF` episode anchored at the same index.
pub fn map_events(
    events: &[RawEvent],
    run_id: &str,
    run_dir: &str,
    diff_hash: Option<&str>,
) -> Vec<Episode> {
    let mut episodes = Vec::new();
    for (index, event) in events.iter().enumerate() {
        let Some(known) = KnownEvent::resolve(event) else {
            continue;
        };
        let mut hashes = EpisodeHashes::default();
        let (kind, outcome) = match &known {
            KnownEvent::RunStart => (EpisodeKind::RunStart, EpisodeOutcome::default()),
            KnownEvent::SnapshotBefore(snap) => {
                snapshot_episode(EpisodeKind::RepoSnapshotBefore, snap)
            }
            KnownEvent::SnapshotAfter(snap) => {
                snapshot_episode(EpisodeKind::RepoSnapshotAfter, snap)
            }
            KnownEvent::CommandFinished(fin) => {
                hashes.stdout_tail_hash = fin.stdout_tail_hash.clone();
                hashes.stderr_tail_hash = fin.stderr_tail_hash.clone();
                let outcome = EpisodeOutcome {
                    exit_code: fin.exit_code,
                    ..Default::default()
                };
                (EpisodeKind::CmdFinished, outcome)
            }
            KnownEvent::RunFinish(fin) => {
                let outcome = EpisodeOutcome {
                    exit_code: fin.exit_code,
                    ..Default::default()
                };
                (EpisodeKind::RunFinish, outcome)
            }
        };

        episodes.push(Episode {
            episode_id: format!("{}_{:04}", event.run_id, index + 1),
            run_id: event.run_id.clone(),
            ts_ms: event.ts_ms,
            kind,
            refs: EpisodeRefs {
                event_index: index,
                run_dir: run_dir.to_string(),
                patch_ref: None,
            },
            hashes,
            outcome,
        });

        if let (KnownEvent::CommandFinished(_), Some(diff_hash)) = (&known, diff_hash) {
            episodes.push(Episode {
                episode_id: format!("{run_id}_PATCH_{:04}", index + 1),
                run_id: run_id.to_string(),
                ts_ms: event.ts_ms,
                kind: EpisodeKind::RepoDiff,
                refs: EpisodeRefs {
                    event_index: index,
                    run_dir: run_dir.to_string(),
                    patch_ref: Some(PATCH_REF.to_string()),
                },
                hashes: EpisodeHashes {
                    repo_diff_hash: Some(diff_hash.to_string()),
                    ..Default::default()
                },
                outcome: EpisodeOutcome::default(),
            });
        }
    }
    episodes
}

/// `run_dir` expressed relative to `base`; `.` when they are the same.
/// Falls back to `run_dir` itself when the two share no root.
pub fn relative_run_dir(run_dir: &Path, base: &Path) -> String {
    let target: Vec<Component> = run_dir.components().collect();
    let from: Vec<Component> = base.components().collect();
    let common = target
        .iter()
        .zip(&from)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return run_dir.display().to_string();
    }
    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for c in &target[common..] {
        rel.push(c);
    }
    if rel.as_os_str().is_empty() {
        ".".to_string()
    } else {
        rel.display().to_string()
    }
}

fn dir_name(run_dir: &Path) -> String {
    run_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Result of mapping one bundle.
#[derive(Debug, Clone)]
pub struct EpisodeLog {
    pub path: PathBuf,
    pub episodes: Vec<Episode>,
}

/// Read `<run_dir>/events.jsonl` (and `repo_diff.patch` if present) and write
/// `<run_dir>/episodes/episodes.jsonl`.
///
/// `cwd` is the base for `refs.run_dir`. An empty event log yields an empty
/// (0-byte) episodes file.
pub fn map_run_to_episodes(run_dir: &Path, cwd: &Path) -> anyhow::Result<EpisodeLog> {
    let run_dir = std::path::absolute(run_dir)
        .with_context(|| format!("cannot resolve run dir {}", run_dir.display()))?;
    let layout = ArtifactLayout::discover(&run_dir);
    if !layout.events_jsonl.is_file() {
        return Err(StageError::EventsNotFound(layout.events_jsonl).into());
    }

    let events: Vec<RawEvent> = read_jsonl(&layout.events_jsonl)?;
    let run_id = events
        .first()
        .map(|e| e.run_id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| dir_name(&run_dir));

    let diff_hash = if layout.repo_diff.is_file() {
        let diff = std::fs::read(&layout.repo_diff)
            .with_context(|| format!("cannot read {}", layout.repo_diff.display()))?;
        Some(sha256_hex(&diff))
    } else {
        None
    };

    let rel_dir = relative_run_dir(&run_dir, cwd);
    let episodes = map_events(&events, &run_id, &rel_dir, diff_hash.as_deref());
    write_jsonl(&layout.episodes_jsonl, &episodes)?;
    tracing::info!(
        %run_id,
        events = events.len(),
        episodes = episodes.len(),
        "episodes written"
    );

    Ok(EpisodeLog {
        path: layout.episodes_jsonl,
        episodes,
    })
}
