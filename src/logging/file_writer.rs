//! Permanent log file with size-based rotation
//!
//! Every program run starts a fresh file: an existing log is rolled over to `.1`
//! when the handler is created. While running, the file is rolled again whenever the
//! next record would push it past `max_bytes`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::{logs_dir_error_message, Config};
use crate::error::{Error, Result};

use super::handler::Handler;
use super::record::{LogRecord, RecordFormat};
use super::retention::{cleanup_old_logs, rotate_backups};

/// Log file handler that rotates by size and keeps a bounded number of backups
pub struct RotatingFileHandler {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    max_backups: usize,
    format: RecordFormat,
}

impl RotatingFileHandler {
    /// Open `path`, rolling over any file left by a previous run
    ///
    /// `max_bytes == 0` disables size rotation. With `max_backups == 0` there is
    /// nothing to roll over to, so an existing file is truncated instead.
    pub fn open(
        path: impl Into<PathBuf>,
        max_bytes: u64,
        max_backups: usize,
        format: RecordFormat,
    ) -> io::Result<Self> {
        let path = path.into();

        if path.is_file() && max_backups > 0 {
            rotate_backups(&path, max_backups)?;
        }
        let file = Self::create(&path)?;

        Ok(Self {
            path,
            file,
            size: 0,
            max_bytes,
            max_backups,
            format,
        })
    }

    fn create(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
    }

    /// Path of the active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn should_roll_over(&self, incoming: u64) -> bool {
        self.max_bytes > 0
            && self.max_backups > 0
            && self.size > 0
            && self.size + incoming >= self.max_bytes
    }

    fn roll_over(&mut self) -> io::Result<()> {
        self.file.flush()?;
        rotate_backups(&self.path, self.max_backups)?;
        self.file = Self::create(&self.path)?;
        self.size = 0;
        Ok(())
    }

    /// Append already-rendered log lines (the content of an earlier log file)
    pub fn append_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.file.write_all(bytes)?;
        self.file.flush()?;
        self.size += bytes.len() as u64;
        Ok(())
    }
}

impl Handler for RotatingFileHandler {
    fn emit(&mut self, record: &LogRecord) -> io::Result<()> {
        let mut line = self.format.render(record);
        line.push('\n');

        if self.should_roll_over(line.len() as u64) {
            self.roll_over()?;
        }

        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.size += line.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Create the permanent log file handler inside `config.logs_dir`
///
/// Any failure to use the directory becomes `Error::Config` pointing at `--logs-dir`.
pub fn setup_log_file_handler(
    config: &Config,
    log_file: &str,
    format: RecordFormat,
) -> Result<(RotatingFileHandler, PathBuf)> {
    let log_path = config.logs_dir.join(log_file);

    let open = || -> io::Result<RotatingFileHandler> {
        fs::create_dir_all(&config.logs_dir)?;
        let handler = RotatingFileHandler::open(
            &log_path,
            config.max_log_bytes,
            config.max_log_backups,
            format,
        )?;
        cleanup_old_logs(&log_path, config.max_log_backups)?;
        Ok(handler)
    };

    let handler = open().map_err(|e| Error::Config(logs_dir_error_message(&e, &log_path)))?;
    Ok((handler, log_path))
}
