use clap::Parser;
use runlog_derive::{analyze_patterns, basic_catalog, load_catalog};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "analyze_patterns_basic", version, about = "Count known episode sequences in a run")]
struct Cli {
    /// Artifact bundle directory with episodes/episodes.jsonl
    #[arg(long)]
    run_dir: PathBuf,
    /// YAML list of {pattern_id, signature} (default: the p1 run shape)
    #[arg(long)]
    catalog: Option<PathBuf>,
}

fn run(cli: &Cli) -> anyhow::Result<PathBuf> {
    let catalog = match &cli.catalog {
        Some(path) => load_catalog(path)?,
        None => basic_catalog(),
    };
    tracing::debug!(signatures = catalog.len(), run_dir = %cli.run_dir.display(), "catalog loaded");
    Ok(analyze_patterns(&cli.run_dir, &catalog)?.path)
}

fn main() {
    runlog_cli::init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => runlog_cli::fail(e),
    }
}
