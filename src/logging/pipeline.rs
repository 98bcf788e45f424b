//! Two-phase logging pipeline
//!
//! `bootstrap` runs before the program knows its configuration: every record is kept
//! in a `BufferingRelay` in front of a private temporary file, and the console shows
//! everything. `finalize` runs once configuration is known: buffered and already
//! spilled records move into the permanent rotating log file, the temporary file is
//! deleted, and the console threshold is set from `quiet` / `verbose_count`.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempfile::TempPath;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LOG_FILE_NAME};
use crate::error::{Error, Result};
use crate::report::{install_panic_hook, ExceptHook};
use crate::util::secure_temp_file;

use super::console::{ColoredConsoleWriter, SHOW_EVERYTHING};
use super::file_writer::setup_log_file_handler;
use super::handler::{Handler, StreamHandler};
use super::layer::PipelineLayer;
use super::record::{LogRecord, RecordFormat};
use super::relay::BufferingRelay;

/// Prefix of the temporary log file name
pub const TEMP_FILE_PREFIX: &str = "deferlog-";

/// Command-line token that turns on debug mode before arguments are parsed
pub const DEBUG_FLAG: &str = "--debug";

/// Console sink type used by the pipeline
pub type ConsoleWriter = ColoredConsoleWriter<Box<dyn Write + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Bootstrapped,
    Finalized,
    ShutDown,
}

struct PipelineState {
    phase: Phase,
    /// Present between bootstrap and finalize
    relay: Option<BufferingRelay>,
    /// Present after finalize
    file: Option<Box<dyn Handler>>,
    console: ConsoleWriter,
    temp: Option<TempPath>,
    hook: ExceptHook,
}

/// Shared handle to the process's logging pipeline
///
/// Cloning is cheap; all clones drive the same handlers.
#[derive(Clone)]
pub struct LogPipeline {
    inner: Arc<Mutex<PipelineState>>,
}

/// Phase one, without touching process-wide state
///
/// Creates the owner-only temporary file, the relay in front of it and the console
/// writer over `console`. `colored` says whether `console` is an interactive terminal.
/// The except hook is bound to the temporary file and to whether `argv` contains
/// `--debug`.
pub fn bootstrap_with(
    argv: &[String],
    console: Box<dyn Write + Send>,
    colored: bool,
) -> Result<LogPipeline> {
    let (temp_file, temp_path) = secure_temp_file(TEMP_FILE_PREFIX)?.into_parts();
    let temp_handler = StreamHandler::new(temp_file, RecordFormat::Detailed);
    let relay = BufferingRelay::new(Box::new(temp_handler));

    let mut console = ColoredConsoleWriter::new(console, colored);
    console.set_level(SHOW_EVERYTHING);

    let debug = argv.iter().any(|arg| arg == DEBUG_FLAG);
    let hook = ExceptHook::new(debug, temp_path.to_path_buf());

    Ok(LogPipeline {
        inner: Arc::new(Mutex::new(PipelineState {
            phase: Phase::Bootstrapped,
            relay: Some(relay),
            file: None,
            console,
            temp: Some(temp_path),
            hook,
        })),
    })
}

/// Phase one for the real process
///
/// Same as [`bootstrap_with`] over stderr, then installs the pipeline as the global
/// tracing subscriber, installs the panic hook and registers the shutdown action.
pub fn bootstrap(argv: &[String]) -> Result<LogPipeline> {
    let stderr = io::stderr();
    let colored = stderr.is_terminal();
    let pipeline = bootstrap_with(argv, Box::new(stderr), colored)?;
    pipeline.install()?;
    Ok(pipeline)
}

impl LogPipeline {
    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A subscriber that routes every tracing event into this pipeline
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry().with(PipelineLayer::new(self.clone()))
    }

    /// Make this pipeline process-wide: global subscriber, panic hook, exit flush
    ///
    /// The shutdown action is registered first; if that fails nothing global is touched.
    pub fn install(&self) -> Result<()> {
        register_shutdown(self)?;
        self.subscriber()
            .try_init()
            .map_err(|_| Error::Lifecycle("a global tracing subscriber is already installed"))?;
        install_panic_hook(self.clone());
        Ok(())
    }

    /// Deliver one record to the attached handlers
    ///
    /// Write failures are reported on stderr; they never reach the caller.
    /// Records marked `log_only` skip the console.
    pub fn dispatch(&self, record: LogRecord) {
        let mut guard = self.lock();
        let state = &mut *guard;

        if !record.log_only {
            if let Err(e) = state.console.emit(&record) {
                eprintln!("deferlog: failed to write log record to the console: {}", e);
            }
        }

        let result = match (&state.relay, &mut state.file) {
            (Some(relay), _) => relay.handle(record),
            (None, Some(file)) => file.emit(&record),
            (None, None) => Ok(()),
        };
        if let Err(e) = result {
            eprintln!("deferlog: failed to write log record: {}", e);
        }
    }

    /// Phase two: commit logging to `<logs_dir>/deferlog.log`
    ///
    /// Returns the path of the permanent log file. Fails with `Error::Config` if the
    /// logs directory is unusable, in which case the pipeline stays in phase one and
    /// finalize can be retried. A temporary file that has disappeared counts as empty.
    pub fn finalize(&self, config: &Config) -> Result<PathBuf> {
        let level = config.console_level();

        let log_path = {
            let mut guard = self.lock();
            let state = &mut *guard;
            match state.phase {
                Phase::Bootstrapped => {}
                Phase::Finalized => return Err(Error::Lifecycle("logging was already finalized")),
                Phase::ShutDown => return Err(Error::Lifecycle("logging was already shut down")),
            }
            if state.relay.is_none() {
                return Err(Error::Lifecycle("buffering relay is missing"));
            }

            // Records the relay already spilled into the temporary file come first
            let spilled = match state.temp.as_ref() {
                Some(temp) => read_spilled(temp)?,
                None => Vec::new(),
            };

            let (mut file_handler, log_path) =
                setup_log_file_handler(config, LOG_FILE_NAME, RecordFormat::Detailed)?;
            file_handler.append_raw(&spilled)?;

            let Some(relay) = state.relay.take() else {
                return Err(Error::Lifecycle("buffering relay is missing"));
            };
            if let Err(e) = relay.set_target(Box::new(file_handler)) {
                state.relay = Some(relay);
                return Err(e.into());
            }

            // From here on the handoff is committed; later failures are only reported
            let (mut file, leftover) = relay.into_parts();
            for record in &leftover {
                if let Err(e) = file.emit(record) {
                    eprintln!("deferlog: failed to write log record: {}", e);
                }
            }
            state.file = Some(file);

            if let Some(temp) = state.temp.take() {
                report_temp_error(temp.close(), "remove");
            }

            state.console.set_level(level);
            state.hook = ExceptHook::new(config.debug, config.logs_dir.clone());
            state.phase = Phase::Finalized;
            log_path
        };

        tracing::debug!("Root logging level set at {}", level);
        tracing::info!("Saving debug log to {}", log_path.display());

        Ok(log_path)
    }

    /// Flush everything; runs its body only once
    ///
    /// Before finalize, buffered records go to the temporary file, which is kept if it
    /// holds anything (the except hook points the user at it) and deleted otherwise.
    /// Failures are reported on stderr.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if state.phase == Phase::ShutDown {
            return;
        }
        state.phase = Phase::ShutDown;

        if let Some(relay) = state.relay.take() {
            if let Err(e) = relay.into_target().and_then(|mut target| target.flush()) {
                eprintln!("deferlog: failed to flush buffered log records: {}", e);
            }
        }
        if let Some(file) = state.file.as_mut() {
            if let Err(e) = file.flush() {
                eprintln!("deferlog: failed to flush the log file: {}", e);
            }
        }
        if let Err(e) = state.console.flush() {
            eprintln!("deferlog: failed to flush the console: {}", e);
        }

        if let Some(temp) = state.temp.take() {
            let written = fs::metadata(&temp).map(|m| m.len() > 0).unwrap_or(false);
            if written {
                report_temp_error(temp.keep().map(|_| ()).map_err(|e| e.error), "keep");
            } else {
                report_temp_error(temp.close(), "remove");
            }
        }
    }

    /// The except hook bound to the current log location
    pub fn except_hook(&self) -> ExceptHook {
        self.lock().hook.clone()
    }

    /// Path of the temporary log file, until finalize removes it
    pub fn temp_path(&self) -> Option<PathBuf> {
        self.lock().temp.as_ref().map(|t| t.to_path_buf())
    }

    /// Whether records still go through the buffering relay
    pub fn is_buffering(&self) -> bool {
        self.lock().relay.is_some()
    }

    /// Current console threshold
    pub fn console_level(&self) -> i32 {
        self.lock().console.level()
    }
}

/// Content of the temporary file; a file that is already gone holds nothing
fn read_spilled(temp: &TempPath) -> io::Result<Vec<u8>> {
    match fs::read(temp) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn report_temp_error(result: io::Result<()>, action: &str) {
    match result {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            eprintln!("deferlog: failed to {} the temporary log file: {}", action, e);
        }
        _ => {}
    }
}

#[cfg(unix)]
static SHUTDOWN_PIPELINE: std::sync::OnceLock<LogPipeline> = std::sync::OnceLock::new();

#[cfg(unix)]
extern "C" fn run_shutdown() {
    if let Some(pipeline) = SHUTDOWN_PIPELINE.get() {
        pipeline.shutdown();
    }
}

/// Run `shutdown` when the process exits, whether `main` returns or `exit` is called
#[cfg(unix)]
fn register_shutdown(pipeline: &LogPipeline) -> Result<()> {
    if SHUTDOWN_PIPELINE.set(pipeline.clone()).is_err() {
        return Err(Error::Lifecycle("a shutdown action is already registered"));
    }
    // SAFETY: run_shutdown is a plain extern "C" function without arguments
    if unsafe { libc::atexit(run_shutdown) } != 0 {
        return Err(Error::Lifecycle("could not register the shutdown action"));
    }
    Ok(())
}

// Without atexit the driver's explicit shutdown calls are the only exit flush
#[cfg(not(unix))]
fn register_shutdown(_pipeline: &LogPipeline) -> Result<()> {
    Ok(())
}
