//! Configuration management for deferlog
//!
//! Only the fields the logging pipeline consumes live here. Values come from
//! `~/.deferlog/config.toml` (optional) and are overridden by command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::logging::{LogLevel, DEFAULT_MAX_BACKUPS};

/// Default number of `-v` flags
pub const DEFAULT_VERBOSE_COUNT: i32 = 0;

/// Console level before any `-v` is applied
pub const DEFAULT_CONSOLE_LEVEL: i32 = LogLevel::Info.value();

/// Console level used with `--quiet`
pub const QUIET_LOGGING_LEVEL: i32 = LogLevel::Warn.value();

/// Fixed basename of the permanent log file
pub const LOG_FILE_NAME: &str = "deferlog.log";

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Path exists but is not a directory
    NotADirectory,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::NotADirectory => "path exists and is not a directory",
            DiskErrorKind::Other => "unexpected I/O error",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        ErrorKind::AlreadyExists => DiskErrorKind::NotADirectory,

        // Check raw OS error for the cases without a stable ErrorKind
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC (28), EDQUOT (122 on Linux, 69 on macOS)
                    if os_error == libc::ENOSPC || os_error == libc::EDQUOT {
                        return DiskErrorKind::DiskFull;
                    }
                    if os_error == libc::EACCES {
                        return DiskErrorKind::PermissionDenied;
                    }
                    if os_error == libc::ENOTDIR || os_error == libc::EEXIST {
                        return DiskErrorKind::NotADirectory;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Message for a failure to use the logs directory, pointing at `--logs-dir`
pub fn logs_dir_error_message(e: &std::io::Error, path: &std::path::Path) -> String {
    let kind = categorize_io_error(e);
    let detail = match kind {
        DiskErrorKind::Other => e.to_string(),
        _ => format!("{} ({})", kind.user_message(), e),
    };
    format!(
        "The following error was encountered while opening the log file {}:\n{}\n\
         Either run with sufficient privileges, or set --logs-dir to a writeable directory.",
        path.display(),
        detail
    )
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log full details of escaping errors at error level
    #[serde(default)]
    pub debug: bool,

    /// Only show warnings and errors on the console
    #[serde(default)]
    pub quiet: bool,

    /// Number of `-v` flags; each one lowers the console level by 10
    #[serde(default = "default_verbose_count")]
    pub verbose_count: i32,

    /// Directory holding the permanent log file and its backups
    #[serde(default = "logs_dir")]
    pub logs_dir: PathBuf,

    /// Number of rotated backups to keep (0 disables rotation)
    #[serde(default = "default_max_log_backups")]
    pub max_log_backups: usize,

    /// Rotate the log file once it would exceed this many bytes (0 disables size rotation)
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,
}

fn default_verbose_count() -> i32 {
    DEFAULT_VERBOSE_COUNT
}

fn default_max_log_backups() -> usize {
    DEFAULT_MAX_BACKUPS
}

fn default_max_log_bytes() -> u64 {
    1 << 20 // 1 MiB
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            quiet: false,
            verbose_count: default_verbose_count(),
            logs_dir: logs_dir(),
            max_log_backups: default_max_log_backups(),
            max_log_bytes: default_max_log_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from the default file, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, or return defaults if it does not exist
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Console level derived from `quiet` and `verbose_count`
    pub fn console_level(&self) -> i32 {
        if self.quiet {
            QUIET_LOGGING_LEVEL
        } else {
            DEFAULT_CONSOLE_LEVEL.saturating_sub(self.verbose_count.saturating_mul(10))
        }
    }
}

/// Get the base configuration directory (~/.deferlog)
/// Falls back to ./.deferlog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| PathBuf::from(".deferlog"))
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".deferlog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the default logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}
