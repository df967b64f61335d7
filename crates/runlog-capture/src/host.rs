use serde::Serialize;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub platform: String,
    pub release: String,
    pub arch: String,
}

impl HostInfo {
    /// Platform and arch from the build target; kernel release from
    /// `uname -r` where available, `unknown` otherwise.
    pub async fn detect() -> Self {
        let release = if cfg!(unix) {
            command_stdout(Command::new("uname").arg("-r")).await
        } else {
            None
        };
        Self {
            platform: std::env::consts::OS.to_string(),
            release: release.unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolVersions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
}

impl ToolVersions {
    pub async fn detect(cwd: &Path) -> Self {
        Self {
            git: command_stdout(Command::new("git").arg("--version").current_dir(cwd)).await,
        }
    }
}

/// Contents of `env.json`.
#[derive(Debug, Clone, Serialize)]
pub struct EnvDescriptor {
    pub run_id: String,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub cwd: String,
    /// Redacted command line.
    pub cmd: String,
    pub exit_code: i32,
    pub git_enabled: bool,
    pub host: HostInfo,
    pub tool_versions: ToolVersions,
}

async fn command_stdout(cmd: &mut Command) -> Option<String> {
    let output = cmd.output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
