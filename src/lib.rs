//! deferlog - two-phase logging for command-line programs
//!
//! Output produced before the configuration is parsed is buffered, then handed off to
//! a rotating log file once the logs directory and verbosity are known. The except
//! hook decides what an escaping error looks like on the console and in the log.

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod util;

pub use error::{Error, RemoteError, Result};
