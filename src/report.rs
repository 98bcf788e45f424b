//! Handling of errors that escape the program
//!
//! The driver hands any error that reaches the top of `main` to [`ExceptHook::report`].
//! The hook decides what goes to the log and what the user sees, and returns a
//! [`Terminate`] that the driver acts on. The console gets one message plus one
//! line pointing at the logs. The hook's own records are `log_only`, so error
//! details and backtraces only ever go to the log files.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{strip_remote_prefix, Error, RemoteError};
use crate::logging::LogPipeline;

/// Exit code for every abnormal termination
pub const EXIT_FAILURE: i32 = 1;

/// Console message when the user interrupts the program
pub const USER_REQUEST_MESSAGE: &str = "Exiting due to user request.";

/// Header printed before unexpected (non user-facing) errors
pub const UNEXPECTED_ERROR_HEADER: &str = "An unexpected error occurred:";

/// What kind of failure reached the top level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// The user pressed Ctrl-C
    Interrupt,
    /// An expected, user-facing error; carries the message to show
    User(String),
    /// An error reported by the remote peer; carries the detail without the code prefix
    Remote(String),
    /// Anything else; carries the message chain (no backtrace)
    Internal(String),
}

/// Sort an error into one of the classes the hook knows how to report
pub fn classify(err: &anyhow::Error) -> ErrorClass {
    match err.downcast_ref::<Error>() {
        Some(Error::Interrupted) => ErrorClass::Interrupt,
        Some(Error::User(_)) | Some(Error::Config(_)) => ErrorClass::User(format!("{:#}", err)),
        Some(Error::Remote(remote)) => ErrorClass::Remote(remote_detail(remote)),
        _ => match err.downcast_ref::<RemoteError>() {
            Some(remote) => ErrorClass::Remote(remote_detail(remote)),
            None => ErrorClass::Internal(format!("{:#}", err)),
        },
    }
}

fn remote_detail(remote: &RemoteError) -> String {
    strip_remote_prefix(&remote.to_string()).to_string()
}

/// Request to end the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminate {
    pub code: i32,
    /// Final line for stderr
    pub message: String,
}

impl Terminate {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Print the message, flush the logs and exit
    pub fn exit(self, pipeline: &LogPipeline) -> ! {
        eprintln!("{}", self.message);
        pipeline.shutdown();
        std::process::exit(self.code)
    }
}

/// Termination pointing the user at the logs
///
/// A file path names the single log file; a directory means several log files may exist.
pub fn exit_with_log_path(log_path: &Path) -> Terminate {
    let message = if log_path.is_file() {
        format!("Please see the logfile {} for more details.", log_path.display())
    } else {
        format!(
            "Please see the logfiles in {} for more details.",
            log_path.display()
        )
    };
    Terminate::new(EXIT_FAILURE, message)
}

/// The uncaught-error hook, bound to the current log location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptHook {
    /// Log full details of every error at error level
    pub debug: bool,
    /// Log file (before configuration) or logs directory (after)
    pub log_path: PathBuf,
}

impl ExceptHook {
    pub fn new(debug: bool, log_path: PathBuf) -> Self {
        Self { debug, log_path }
    }

    /// Log `err`, print the user-facing summary to `console` and decide how to exit
    pub fn report(&self, err: &anyhow::Error, console: &mut dyn Write) -> Terminate {
        let class = classify(err);

        if class == ErrorClass::Interrupt {
            tracing::error!(log_only = true, "Exiting abnormally:\n{:?}", err);
            return Terminate::new(EXIT_FAILURE, USER_REQUEST_MESSAGE);
        }

        if self.debug {
            tracing::error!(log_only = true, "Exiting abnormally:\n{:?}", err);
        }

        let written = match &class {
            ErrorClass::User(message) => {
                if !self.debug {
                    tracing::debug!(log_only = true, "Exiting abnormally: {}", message);
                }
                writeln!(console, "{}", message)
            }
            ErrorClass::Remote(detail) => {
                if !self.debug {
                    tracing::debug!(log_only = true, "Exiting abnormally: {}", err);
                }
                writeln!(console, "{}\n{}", UNEXPECTED_ERROR_HEADER, detail)
            }
            ErrorClass::Internal(message) => {
                if !self.debug {
                    tracing::debug!(log_only = true, "Exiting abnormally:\n{:?}", err);
                }
                writeln!(console, "{}\n{}", UNEXPECTED_ERROR_HEADER, message)
            }
            ErrorClass::Interrupt => Ok(()),
        };
        // Console write failures are ignored
        let _ = written.and_then(|_| console.flush());

        exit_with_log_path(&self.log_path)
    }

    /// Report a panic the same way as an internal error
    pub fn report_panic(
        &self,
        payload: &str,
        location: Option<&str>,
        console: &mut dyn Write,
    ) -> Terminate {
        let err = match location {
            Some(location) => anyhow::anyhow!("panicked at {}: {}", location, payload),
            None => anyhow::anyhow!("panicked: {}", payload),
        };
        self.report(&err, console)
    }
}

/// Route panics through the pipeline's current except hook, then exit
pub fn install_panic_hook(pipeline: LogPipeline) {
    std::panic::set_hook(Box::new(move |info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));

        pipeline
            .except_hook()
            .report_panic(&payload, location.as_deref(), &mut io::stderr())
            .exit(&pipeline);
    }));
}
