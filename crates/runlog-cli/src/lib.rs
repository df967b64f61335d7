use tracing_subscriber::EnvFilter;

/// Filter variable read by every binary.
pub const LOG_ENV: &str = "RUNLOG_LOG";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Log to stderr; stdout carries only the printed artifact path.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// clap value parser for the `--git` / `--allow-raw-logs` style flags.
pub fn bool_arg(value: &str) -> Result<bool, String> {
    runlog_capture::parse_bool(value)
        .ok_or_else(|| format!("expected true/false, yes/no, y/n or 1/0, got '{value}'"))
}

/// Print `err` with its context chain and exit 1.
pub fn fail(err: anyhow::Error) -> ! {
    eprintln!("error: {err:#}");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_arg_spellings() {
        assert_eq!(bool_arg("yes"), Ok(true));
        assert_eq!(bool_arg("0"), Ok(false));
        assert!(bool_arg("sometimes").unwrap_err().contains("sometimes"));
    }
}
