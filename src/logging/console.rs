//! Console output for log records
//!
//! Only the message text is printed. On an interactive terminal, records at or above
//! `red_level` are wrapped in red.

use std::io::{self, Write};

use colored::Colorize;

use super::handler::Handler;
use super::record::{LogLevel, LogRecord};

/// Threshold that lets every record through
pub const SHOW_EVERYTHING: i32 = i32::MIN;

/// Console handler with a mutable severity threshold and optional coloring
pub struct ColoredConsoleWriter<W> {
    stream: W,
    colored: bool,
    level: i32,
    red_level: LogLevel,
}

impl<W: Write + Send> ColoredConsoleWriter<W> {
    /// Create a writer; `colored` says whether `stream` is an interactive terminal
    ///
    /// `colored` crate detection looks at stdout, so a terminal `stream` forces coloring on.
    pub fn new(stream: W, colored: bool) -> Self {
        if colored {
            ::colored::control::set_override(true);
        }
        Self {
            stream,
            colored,
            level: SHOW_EVERYTHING,
            red_level: LogLevel::Warn,
        }
    }

    /// Current threshold; records with a lower numeric level are not written
    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    pub fn red_level(&self) -> LogLevel {
        self.red_level
    }

    pub fn set_red_level(&mut self, level: LogLevel) {
        self.red_level = level;
    }

    /// Whether a record at `level` passes the threshold
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.value() >= self.level
    }

    fn format(&self, record: &LogRecord) -> String {
        if self.colored && record.level >= self.red_level {
            record.message.red().to_string()
        } else {
            record.message.clone()
        }
    }
}

impl<W: Write + Send> Handler for ColoredConsoleWriter<W> {
    fn emit(&mut self, record: &LogRecord) -> io::Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        let line = self.format(record);
        writeln!(self.stream, "{}", line)?;
        self.stream.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
