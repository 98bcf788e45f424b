//! Log records and severities

use chrono::{DateTime, Utc};

/// Event field that keeps a record out of the console (`tracing::error!(log_only = true, ...)`)
pub const LOG_ONLY_FIELD: &str = "log_only";

/// Ordered log severity
///
/// Each level has a numeric value; thresholds are compared against it so that
/// verbosity arithmetic (`base - 10 * verbose_count`) can go below the lowest level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// Numeric value used for threshold comparisons
    pub const fn value(self) -> i32 {
        match self {
            LogLevel::Trace => 5,
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warn => 30,
            LogLevel::Error => 40,
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// A single log record
///
/// Built once by the pipeline layer and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Timestamp when the record was created
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Target/module that produced the record
    pub target: String,
    /// Message text
    pub message: String,
    /// Source location as `file:line`, when known
    pub location: Option<String>,
    /// Only the log files receive this record
    pub log_only: bool,
}

impl LogRecord {
    /// Create a new record stamped with the current time
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            target: target.into(),
            message: message.into(),
            location: None,
            log_only: false,
        }
    }

    /// Attach a source location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Keep the record off the console
    pub fn with_log_only(mut self, log_only: bool) -> Self {
        self.log_only = log_only;
        self
    }
}

/// How a handler renders a record into a line (without the line terminator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    /// Just the message text
    Plain,
    /// `YYYY-MM-DD HH:MM:SS,mmm:LEVEL:target:message`, timestamp in UTC
    #[default]
    Detailed,
}

impl RecordFormat {
    /// Render a record
    pub fn render(&self, record: &LogRecord) -> String {
        match self {
            RecordFormat::Plain => record.message.clone(),
            RecordFormat::Detailed => format!(
                "{}:{}:{}:{}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level.as_str(),
                record.target,
                record.message
            ),
        }
    }
}
