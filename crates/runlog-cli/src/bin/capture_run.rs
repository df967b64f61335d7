use clap::Parser;
use runlog_capture::{capture_run, CaptureConfig, CaptureOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "capture_run", version, about = "Run a shell command and record an artifact bundle")]
struct Cli {
    /// Command line passed to the shell
    #[arg(long)]
    cmd: String,
    /// Working directory (default: current)
    #[arg(long)]
    cwd: Option<PathBuf>,
    /// Take git snapshots before and after the command
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = runlog_cli::bool_arg)]
    git: Option<bool>,
    /// Keep full unredacted stdout/stderr next to the tails
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = runlog_cli::bool_arg)]
    allow_raw_logs: Option<bool>,
    /// Bytes of stdout kept in the tail
    #[arg(long)]
    stdout_bytes: Option<usize>,
    /// Bytes of stderr kept in the tail
    #[arg(long)]
    stderr_bytes: Option<usize>,
    /// YAML file with defaults for the options above
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> anyhow::Result<CaptureOptions> {
        let cwd = match &self.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let mut opts = CaptureOptions::new(self.cmd.clone(), cwd);
        if let Some(path) = &self.config {
            opts = opts.with_config(&CaptureConfig::load(path)?);
        }
        if let Some(git) = self.git {
            opts.git = git;
        }
        if let Some(raw) = self.allow_raw_logs {
            opts.allow_raw_logs = raw;
        }
        if let Some(n) = self.stdout_bytes {
            opts.stdout_bytes = n;
        }
        if let Some(n) = self.stderr_bytes {
            opts.stderr_bytes = n;
        }
        Ok(opts)
    }
}

#[tokio::main]
async fn main() {
    runlog_cli::init_tracing();
    let cli = Cli::parse();
    let opts = cli.options().unwrap_or_else(|e| runlog_cli::fail(e));
    // `cmd` may hold secrets; capture_run logs only its redacted form.
    tracing::debug!(
        cwd = %opts.cwd.display(),
        git = opts.git,
        allow_raw_logs = opts.allow_raw_logs,
        stdout_bytes = opts.stdout_bytes,
        stderr_bytes = opts.stderr_bytes,
        "capture options resolved"
    );
    match capture_run(&opts).await {
        Ok(outcome) => {
            println!("{}", outcome.layout.run_dir.display());
            std::process::exit(outcome.exit_code);
        }
        Err(e) => runlog_cli::fail(e),
    }
}
