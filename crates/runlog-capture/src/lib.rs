pub mod config;
pub mod git;
pub mod host;
pub mod run;

pub use config::{parse_bool, CaptureConfig, CaptureOptions};
pub use git::{capture_git_snapshot, GitCapture, GitState, SnapshotOutputs};
pub use host::{EnvDescriptor, HostInfo, ToolVersions};
pub use run::{capture_run, CaptureOutcome};
