use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use deferlog::config::Config;
use deferlog::logging::{self, LogPipeline};
use deferlog::{Error, RemoteError};

/// Exercise the two-phase logging pipeline
#[derive(Debug, Parser)]
#[command(name = "deferlog", version, about)]
struct Cli {
    /// Log full details of escaping errors
    #[arg(long)]
    debug: bool,

    /// Only show warnings and errors on the console
    #[arg(short, long)]
    quiet: bool,

    /// Show more output on the console (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Directory for the log file and its backups
    #[arg(long, value_name = "DIR", env = "DEFERLOG_LOGS_DIR")]
    logs_dir: Option<PathBuf>,

    /// Number of rotated log files to keep
    #[arg(long, value_name = "N")]
    max_log_backups: Option<usize>,

    /// Configuration file (default: ~/.deferlog/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fail on purpose to see how the error is reported
    #[arg(long, value_enum)]
    simulate: Option<Failure>,

    /// Seconds to wait before finishing (press Ctrl-C to interrupt)
    #[arg(long, default_value_t = 0)]
    wait: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Failure {
    User,
    Remote,
    Internal,
    Panic,
}

impl Cli {
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        config.debug |= self.debug;
        config.quiet |= self.quiet;
        config.verbose_count = config.verbose_count.saturating_add(i32::from(self.verbose));
        if let Some(dir) = &self.logs_dir {
            config.logs_dir = dir.clone();
        }
        if let Some(backups) = self.max_log_backups {
            config.max_log_backups = backups;
        }
        Ok(config)
    }
}

async fn run(pipeline: &LogPipeline) -> Result<()> {
    tracing::debug!("deferlog version {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Arguments: {:?}", std::env::args().skip(1).collect::<Vec<_>>());

    let cli = Cli::parse();
    let config = cli.resolve_config().context("Failed to load configuration")?;
    tracing::debug!("Resolved configuration: {:?}", config);

    pipeline.finalize(&config)?;

    if cli.wait > 0 {
        tracing::info!("Waiting {} seconds", cli.wait);
        tokio::time::sleep(Duration::from_secs(cli.wait)).await;
    }

    match cli.simulate {
        None => {
            tracing::info!("Done");
            Ok(())
        }
        Some(Failure::User) => Err(Error::User("The requested name is not valid".into()).into()),
        Some(Failure::Remote) => {
            Err(RemoteError::with_code("malformed", "The request message was malformed").into())
        }
        Some(Failure::Internal) => {
            let err = io::Error::new(io::ErrorKind::Other, "state file is corrupt");
            Err(anyhow::Error::new(err).context("Failed to read saved state"))
        }
        Some(Failure::Panic) => panic!("simulated panic"),
    }
}

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().collect();

    // Everything from here on is captured, even before arguments are parsed
    let pipeline = match logging::bootstrap(&argv) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("deferlog: failed to set up logging: {}", e);
            std::process::exit(1);
        }
    };

    let result = tokio::select! {
        result = run(&pipeline) => result,
        _ = tokio::signal::ctrl_c() => Err(Error::Interrupted.into()),
    };

    match result {
        Ok(()) => pipeline.shutdown(),
        Err(err) => pipeline
            .except_hook()
            .report(&err, &mut io::stderr())
            .exit(&pipeline),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_config_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "verbose_count = 1\nmax_log_backups = 7\n").unwrap();
        let logs_dir = temp_dir.path().join("logs");

        let cli = Cli::parse_from([
            OsStr::new("deferlog"),
            OsStr::new("-vv"),
            OsStr::new("--config"),
            config_path.as_os_str(),
            OsStr::new("--logs-dir"),
            logs_dir.as_os_str(),
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.verbose_count, 3);
        assert_eq!(config.max_log_backups, 7);
        assert_eq!(config.logs_dir, logs_dir);
    }

    #[test]
    fn test_resolve_config_verbose_count_saturates() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, format!("verbose_count = {}\n", i32::MAX)).unwrap();

        let cli = Cli::parse_from([
            OsStr::new("deferlog"),
            OsStr::new("-vvv"),
            OsStr::new("--config"),
            config_path.as_os_str(),
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.verbose_count, i32::MAX);
        assert_eq!(config.console_level(), 20 - i32::MAX);
    }
}
