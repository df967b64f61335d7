use anyhow::Context;
use runlog_core::canon::stable_stringify;
use runlog_core::run_id::now_ms;
use runlog_core::{EpisodeKind, PatternCounts, PatternKind, PatternRecord, PatternScore};
use runlog_store::{read_jsonl, write_atomic, write_json_pretty, ArtifactLayout};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::StageError;

const STATIC_SCORE: PatternScore = PatternScore {
    confidence: 0.7,
    stability: 0.6,
};

/// A named ordered list of episode kinds to look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureSpec {
    pub pattern_id: String,
    pub signature: Vec<String>,
    /// Always emit a record, with `seen` of at least 1, even when the run
    /// never completed the sequence.
    #[serde(default)]
    pub required: bool,
}

/// The canonical run shape: start, command finished, finish.
pub fn basic_catalog() -> Vec<SignatureSpec> {
    vec![SignatureSpec {
        pattern_id: "p1".to_string(),
        signature: [
            EpisodeKind::RunStart,
            EpisodeKind::CmdFinished,
            EpisodeKind::RunFinish,
        ]
        .iter()
        .map(|k| k.as_str().to_string())
        .collect(),
        required: true,
    }]
}

/// Load a YAML list of signatures. Ids must be unique and signatures non-empty.
pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<SignatureSpec>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read catalog {}", path.display()))?;
    let catalog: Vec<SignatureSpec> = serde_yaml::from_str(&text)
        .with_context(|| format!("invalid catalog {}", path.display()))?;
    let mut ids = HashSet::new();
    for spec in &catalog {
        if spec.signature.is_empty() {
            anyhow::bail!("pattern '{}' has an empty signature", spec.pattern_id);
        }
        if !ids.insert(spec.pattern_id.as_str()) {
            anyhow::bail!("duplicate pattern id '{}'", spec.pattern_id);
        }
    }
    Ok(catalog)
}

/// Non-overlapping occurrences of `signature` as an ordered subsequence of
/// `kinds`.
pub fn count_occurrences(kinds: &[&str], signature: &[String]) -> usize {
    if signature.is_empty() {
        return 0;
    }
    let mut seen = 0;
    let mut next = 0;
    for kind in kinds {
        if *kind == signature[next] {
            next += 1;
            if next == signature.len() {
                seen += 1;
                next = 0;
            }
        }
    }
    seen
}

// Only the fields the extractor reads; anything else in a line is ignored.
#[derive(Debug, Default, Deserialize)]
struct OutcomeView {
    #[serde(default)]
    exit_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EpisodeView {
    #[serde(default)]
    run_id: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    outcome: OutcomeView,
}

/// One record per catalog signature found in `kinds` (plus every `required`
/// signature), sorted by `pattern_id`.
///
/// `cmd_fail` and `repo_diff` describe the whole run, so every record
/// carries the same values for them.
pub fn extract_patterns(
    kinds: &[&str],
    cmd_fail: bool,
    catalog: &[SignatureSpec],
) -> Vec<PatternRecord> {
    let has_diff = kinds.contains(&EpisodeKind::RepoDiff.as_str());
    let mut records: Vec<PatternRecord> = catalog
        .iter()
        .filter_map(|spec| {
            let mut seen = count_occurrences(kinds, &spec.signature);
            if spec.required {
                seen = seen.max(1);
            }
            (seen > 0).then(|| PatternRecord {
                pattern_id: spec.pattern_id.clone(),
                kind: PatternKind::Sequence,
                signature: spec.signature.clone(),
                counts: PatternCounts {
                    seen,
                    cmd_fail: usize::from(cmd_fail),
                    repo_diff: usize::from(has_diff),
                },
                score: STATIC_SCORE,
            })
        })
        .collect();
    records.sort_by(|a, b| a.pattern_id.cmp(&b.pattern_id));
    records
}

/// `patterns.json`: the records plus a generation timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub run_id: String,
    pub generated_at_ms: u64,
    pub patterns: Vec<PatternRecord>,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(skip)]
    pub core_path: PathBuf,
}

/// Timestamp-free form written to `patterns_core.json`.
#[derive(Serialize)]
struct PatternCore<'a> {
    run_id: &'a str,
    patterns: &'a [PatternRecord],
}

/// Read `<run_dir>/episodes/episodes.jsonl`, match `catalog`, and write
/// `patterns/patterns.json` plus the stable `patterns/patterns_core.json`.
pub fn analyze_patterns(run_dir: &Path, catalog: &[SignatureSpec]) -> anyhow::Result<PatternReport> {
    let run_dir = std::path::absolute(run_dir)
        .with_context(|| format!("cannot resolve run dir {}", run_dir.display()))?;
    let layout = ArtifactLayout::discover(&run_dir);
    if !layout.episodes_jsonl.is_file() {
        return Err(StageError::EpisodesNotFound(layout.episodes_jsonl).into());
    }

    let episodes: Vec<EpisodeView> = read_jsonl(&layout.episodes_jsonl)?;
    let run_id = episodes
        .first()
        .map(|e| e.run_id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| {
            run_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    let kinds: Vec<&str> = episodes.iter().filter_map(|e| e.kind.as_deref()).collect();
    // A finished command without a recorded exit code counts as failed.
    let cmd_fail = episodes.iter().any(|e| {
        e.kind.as_deref() == Some(EpisodeKind::CmdFinished.as_str())
            && e.outcome.exit_code != Some(0)
    });
    let patterns = extract_patterns(&kinds, cmd_fail, catalog);

    let mut core = stable_stringify(&PatternCore {
        run_id: &run_id,
        patterns: &patterns,
    })?;
    core.push('\n');
    write_atomic(&layout.patterns_core_json, core.as_bytes())?;

    let report = PatternReport {
        run_id,
        generated_at_ms: now_ms(),
        patterns,
        path: layout.patterns_json,
        core_path: layout.patterns_core_json,
    };
    write_json_pretty(&report.path, &report)?;
    tracing::info!(run_id = %report.run_id, patterns = report.patterns.len(), "patterns written");
    Ok(report)
}
