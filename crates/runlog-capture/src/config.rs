use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TAIL_BYTES: usize = 4000;

/// Accepts `true|1|yes|y` and `false|0|no|n`, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Optional YAML defaults for `capture_run --config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    pub git: Option<bool>,
    pub allow_raw_logs: Option<bool>,
    pub stdout_bytes: Option<usize>,
    pub stderr_bytes: Option<usize>,
    pub artifacts_dir: Option<PathBuf>,
}

impl CaptureConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Everything one capture needs, passed explicitly to [`crate::capture_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Shell command line, spawned unredacted.
    pub cmd: String,
    pub cwd: PathBuf,
    pub git: bool,
    pub allow_raw_logs: bool,
    pub stdout_bytes: usize,
    pub stderr_bytes: usize,
    /// Parent of run directories; `<cwd>/artifacts/capture_run` when unset.
    pub artifacts_dir: Option<PathBuf>,
}

impl CaptureOptions {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
            git: true,
            allow_raw_logs: false,
            stdout_bytes: DEFAULT_TAIL_BYTES,
            stderr_bytes: DEFAULT_TAIL_BYTES,
            artifacts_dir: None,
        }
    }

    /// Overlay values set in `config`. A relative `artifacts_dir` is taken
    /// relative to `cwd`.
    pub fn with_config(mut self, config: &CaptureConfig) -> Self {
        if let Some(git) = config.git {
            self.git = git;
        }
        if let Some(raw) = config.allow_raw_logs {
            self.allow_raw_logs = raw;
        }
        if let Some(n) = config.stdout_bytes {
            self.stdout_bytes = n;
        }
        if let Some(n) = config.stderr_bytes {
            self.stderr_bytes = n;
        }
        if let Some(dir) = &config.artifacts_dir {
            self.artifacts_dir = Some(self.cwd.join(dir));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        for s in ["true", "TRUE", "1", "yes", "Y"] {
            assert_eq!(parse_bool(s), Some(true), "{s}");
        }
        for s in ["false", "0", "No", "n"] {
            assert_eq!(parse_bool(s), Some(false), "{s}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn defaults() {
        let o = CaptureOptions::new("ls", "/w");
        assert!(o.git);
        assert!(!o.allow_raw_logs);
        assert_eq!(o.stdout_bytes, 4000);
        assert_eq!(o.stderr_bytes, 4000);
        assert_eq!(o.artifacts_dir, None);
    }

    #[test]
    fn config_overlays_only_set_fields() {
        let cfg = CaptureConfig::parse("git: false\nstdout_bytes: 10\nartifacts_dir: out\n").unwrap();
        let o = CaptureOptions::new("ls", "/w").with_config(&cfg);
        assert!(!o.git);
        assert_eq!(o.stdout_bytes, 10);
        assert_eq!(o.stderr_bytes, 4000);
        assert_eq!(o.artifacts_dir, Some(PathBuf::from("/w/out")));
    }

    #[test]
    fn empty_and_unknown_config() {
        assert_eq!(CaptureConfig::parse("  \n").unwrap(), CaptureConfig::default());
        assert!(CaptureConfig::parse("colour: blue\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.yaml");
        std::fs::write(&path, "allow_raw_logs: true\n").unwrap();
        let cfg = CaptureConfig::load(&path).unwrap();
        assert_eq!(cfg.allow_raw_logs, Some(true));
        assert!(CaptureConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
