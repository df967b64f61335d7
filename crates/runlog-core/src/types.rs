use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Raw events ──

/// Reason recorded in place of a repository snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    NotAGitRepo,
}

/// Porcelain status counts. A single line may count toward several
/// categories (e.g. `AM` is both added and modified).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub changed_files: usize,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub untracked: usize,
}

impl StatusSummary {
    /// Classify each line of `git status --porcelain` by its two-character code.
    pub fn from_porcelain(status: &str) -> Self {
        let mut summary = Self::default();
        for line in status.lines().filter(|l| !l.trim_end_matches('\r').is_empty()) {
            summary.changed_files += 1;
            let code: String = line.chars().take(2).collect();
            if code.contains('A') {
                summary.added += 1;
            }
            if code.contains('M') {
                summary.modified += 1;
            }
            if code.contains('D') {
                summary.deleted += 1;
            }
            if code.contains('R') {
                summary.renamed += 1;
            }
            if code == "??" {
                summary.untracked += 1;
            }
        }
        summary
    }
}

/// Repository state at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSnapshot {
    pub head: String,
    pub branch: String,
    pub status_summary: StatusSummary,
    pub diff_hash: String,
}

/// Payload of a `repo_snapshot_*` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotData {
    Captured(GitSnapshot),
    Skipped { reason: SkipReason },
}

/// Everything a capture run writes to `events.jsonl`, tagged as
/// `"type": "run_start"`, `"data": {..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    RunStart {
        cwd: String,
        cmd_redacted: String,
        git_enabled: bool,
    },
    RepoSnapshotBefore(SnapshotData),
    CommandStarted {
        pid: Option<u32>,
    },
    CommandFinished {
        exit_code: i32,
        stdout_tail_hash: String,
        stderr_tail_hash: String,
    },
    RepoSnapshotAfter(SnapshotData),
    RunFinish {
        exit_code: i32,
        artifact_dir: String,
    },
}

impl EventPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run_start",
            Self::RepoSnapshotBefore(_) => "repo_snapshot_before",
            Self::CommandStarted { .. } => "command_started",
            Self::CommandFinished { .. } => "command_finished",
            Self::RepoSnapshotAfter(_) => "repo_snapshot_after",
            Self::RunFinish { .. } => "run_finish",
        }
    }
}

/// One line of `events.jsonl` as written.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub ts_ms: u64,
    pub run_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// One line of `events.jsonl` as read back. `data` stays untyped so that
/// unknown event types survive parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub ts_ms: u64,
    #[serde(default)]
    pub run_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Consolidated digest manifest (`hashes.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashManifest {
    pub stdout_tail_hash: String,
    pub stderr_tail_hash: String,
    pub env_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_diff_hash: Option<String>,
}

// ── Episodes ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodeKind {
    #[serde(rename = "EP.RUN_START")]
    RunStart,
    #[serde(rename = "EP.REPO_SNAPSHOT_BEFORE")]
    RepoSnapshotBefore,
    #[serde(rename = "EP.REPO_SNAPSHOT_AFTER")]
    RepoSnapshotAfter,
    #[serde(rename = "EP.GIT_SKIP")]
    GitSkip,
    #[serde(rename = "EP.CMD_FINISHED")]
    CmdFinished,
    #[serde(rename = "EP.REPO_DIFF")]
    RepoDiff,
    #[serde(rename = "EP.RUN_FINISH")]
    RunFinish,
}

impl EpisodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RunStart => "EP.RUN_START",
            Self::RepoSnapshotBefore => "EP.REPO_SNAPSHOT_BEFORE",
            Self::RepoSnapshotAfter => "EP.REPO_SNAPSHOT_AFTER",
            Self::GitSkip => "EP.GIT_SKIP",
            Self::CmdFinished => "EP.CMD_FINISHED",
            Self::RepoDiff => "EP.REPO_DIFF",
            Self::RunFinish => "EP.RUN_FINISH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitOutcome {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "SKIP")]
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRefs {
    pub event_index: usize,
    pub run_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeHashes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_tail_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_tail_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_diff_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// One normalized step of a run's timeline (`episodes/episodes.jsonl`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: String,
    pub run_id: String,
    pub ts_ms: u64,
    pub kind: EpisodeKind,
    pub refs: EpisodeRefs,
    pub hashes: EpisodeHashes,
    pub outcome: EpisodeOutcome,
}

// ── Patterns ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    #[serde(rename = "PATTERN.SEQUENCE")]
    Sequence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCounts {
    pub seen: usize,
    pub cmd_fail: usize,
    pub repo_diff: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    pub confidence: f64,
    pub stability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub pattern_id: String,
    pub kind: PatternKind,
    /// Ordered episode kinds, e.g. `["EP.RUN_START", "EP.CMD_FINISHED"]`.
    pub signature: Vec<String>,
    pub counts: PatternCounts,
    pub score: PatternScore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn porcelain_classification() {
        let status = " M src/lib.rs\nA  new.rs\nAM both.rs\n D gone.rs\nR  old.rs -> new.rs\n?? scratch.txt\n";
        let s = StatusSummary::from_porcelain(status);
        assert_eq!(
            s,
            StatusSummary {
                changed_files: 6,
                added: 2,
                modified: 2,
                deleted: 1,
                renamed: 1,
                untracked: 1,
            }
        );
    }

    #[test]
    fn empty_status_is_all_zero() {
        assert_eq!(StatusSummary::from_porcelain(""), StatusSummary::default());
        assert_eq!(StatusSummary::from_porcelain("\n\n"), StatusSummary::default());
    }

    #[test]
    fn event_record_wire_shape() {
        let rec = EventRecord {
            ts_ms: 42,
            run_id: "r1".into(),
            payload: EventPayload::CommandFinished {
                exit_code: 7,
                stdout_tail_hash: "a".into(),
                stderr_tail_hash: "b".into(),
            },
        };
        let line = serde_json::to_string(&rec).unwrap();
        assert_eq!(
            line,
            r#"{"ts_ms":42,"run_id":"r1","type":"command_finished","data":{"exit_code":7,"stdout_tail_hash":"a","stderr_tail_hash":"b"}}"#
        );
    }

    #[test]
    fn skipped_snapshot_serializes_reason_only() {
        let payload = EventPayload::RepoSnapshotBefore(SnapshotData::Skipped {
            reason: SkipReason::NotAGitRepo,
        });
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v, json!({"type": "repo_snapshot_before", "data": {"reason": "NOT_A_GIT_REPO"}}));
        assert_eq!(payload.type_name(), "repo_snapshot_before");
    }

    #[test]
    fn raw_event_keeps_unknown_types() {
        let raw: RawEvent =
            serde_json::from_str(r#"{"ts_ms":1,"run_id":"r","type":"future_thing","data":{"x":1}}"#)
                .unwrap();
        assert_eq!(raw.event_type, "future_thing");
        assert_eq!(raw.data["x"], 1);
    }

    #[test]
    fn episode_kind_names_match_serde() {
        for kind in [
            EpisodeKind::RunStart,
            EpisodeKind::RepoSnapshotBefore,
            EpisodeKind::RepoSnapshotAfter,
            EpisodeKind::GitSkip,
            EpisodeKind::CmdFinished,
            EpisodeKind::RepoDiff,
            EpisodeKind::RunFinish,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn empty_episode_sections_serialize_as_empty_objects() {
        let ep = Episode {
            episode_id: "r_0001".into(),
            run_id: "r".into(),
            ts_ms: 1,
            kind: EpisodeKind::RunStart,
            refs: EpisodeRefs {
                event_index: 0,
                run_dir: ".".into(),
                patch_ref: None,
            },
            hashes: EpisodeHashes::default(),
            outcome: EpisodeOutcome::default(),
        };
        let line = serde_json::to_string(&ep).unwrap();
        assert_eq!(
            line,
            r#"{"episode_id":"r_0001","run_id":"r","ts_ms":1,"kind":"EP.RUN_START","refs":{"event_index":0,"run_dir":"."},"hashes":{},"outcome":{}}"#
        );
    }

    #[test]
    fn manifest_omits_missing_diff_hash() {
        let m = HashManifest {
            stdout_tail_hash: "a".into(),
            stderr_tail_hash: "b".into(),
            env_hash: "c".into(),
            repo_diff_hash: None,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert!(v.get("repo_diff_hash").is_none());
    }
}
