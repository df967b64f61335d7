use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "capture_run_to_episodes", version, about = "Map a run's events into episodes")]
struct Cli {
    /// Artifact bundle directory printed by capture_run
    #[arg(long)]
    run_dir: PathBuf,
}

fn main() {
    runlog_cli::init_tracing();
    let cli = Cli::parse();
    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| runlog_derive::map_run_to_episodes(&cli.run_dir, &cwd));
    match result {
        Ok(log) => println!("{}", log.path.display()),
        Err(e) => runlog_cli::fail(e),
    }
}
