//! Logging system for deferlog
//!
//! Early output is buffered in memory in front of a private temporary file until the
//! program's configuration is known, then handed off to a rotating log file and a
//! console stream filtered by verbosity.

mod console;
mod file_writer;
pub(crate) mod handler;
mod layer;
mod pipeline;
mod record;
mod relay;
mod retention;

pub use console::{ColoredConsoleWriter, SHOW_EVERYTHING};
pub use file_writer::{setup_log_file_handler, RotatingFileHandler};
pub use handler::{Handler, StreamHandler};
pub use layer::PipelineLayer;
pub use pipeline::{bootstrap, bootstrap_with, LogPipeline, DEBUG_FLAG, TEMP_FILE_PREFIX};
pub use record::{LogLevel, LogRecord, RecordFormat, LOG_ONLY_FIELD};
pub use relay::{BufferingRelay, DEFAULT_CAPACITY, DEFAULT_FLUSH_LEVEL};
pub use retention::{backup_path, cleanup_old_logs, rotate_backups, DEFAULT_MAX_BACKUPS};
