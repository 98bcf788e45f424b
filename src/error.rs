//! Error types for deferlog
//!
//! The variants double as the error taxonomy used by the except hook: user-facing
//! errors, errors reported by a remote protocol peer, interrupts and everything else.

use std::io;

use thiserror::Error;

/// Prefix carried by machine-readable error codes from the remote peer
pub const REMOTE_ERROR_PREFIX: &str = "urn:ietf:params:acme:error:";

/// Result alias for fallible deferlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the logging pipeline and recognized by the except hook
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is unusable (for example the logs directory)
    #[error("{0}")]
    Config(String),

    /// An expected failure that should be reported tersely to the user
    #[error("{0}")]
    User(String),

    /// A failure reported by a remote peer, carrying an error code
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The user interrupted the program (Ctrl-C)
    #[error("interrupted")]
    Interrupted,

    /// The pipeline was driven out of order (finalize twice, after shutdown, ...)
    #[error("logging pipeline misuse: {0}")]
    Lifecycle(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Error document returned by a remote peer
///
/// Displays as `<prefix><code> :: <detail>`; the prefix and code are meant for
/// machines, only the detail is shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{prefix}{code} :: {detail}", prefix = REMOTE_ERROR_PREFIX)]
pub struct RemoteError {
    /// Error code without the prefix (e.g. "malformed")
    pub code: String,
    /// Human-readable detail
    pub detail: String,
}

impl RemoteError {
    pub fn with_code(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }
}

/// Strip the machine-readable `<prefix><code> :: ` part of a remote error string
///
/// Strings without the marker are returned unchanged.
pub fn strip_remote_prefix(text: &str) -> &str {
    match text.split_once(":: ") {
        Some((head, rest)) if head.trim_start().starts_with(REMOTE_ERROR_PREFIX) => rest,
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display_has_prefix() {
        let err = RemoteError::with_code("malformed", "bad nonce");
        assert_eq!(
            err.to_string(),
            "urn:ietf:params:acme:error:malformed :: bad nonce"
        );
    }

    #[test]
    fn test_strip_remote_prefix() {
        let err = RemoteError::with_code("rateLimited", "too many certificates");
        assert_eq!(strip_remote_prefix(&err.to_string()), "too many certificates");
    }

    #[test]
    fn test_strip_remote_prefix_leaves_other_text() {
        assert_eq!(strip_remote_prefix("plain :: text"), "plain :: text");
        assert_eq!(strip_remote_prefix("no marker"), "no marker");
    }

    #[test]
    fn test_remote_converts_into_error() {
        let err: Error = RemoteError::with_code("unauthorized", "denied").into();
        assert!(matches!(err, Error::Remote(_)));
        assert!(err.to_string().contains("denied"));
    }
}
