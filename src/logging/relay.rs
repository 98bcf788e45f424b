//! In-memory relay that holds records until its downstream target should see them
//!
//! Records are buffered until a flush. High-severity records and a full buffer
//! trigger a flush on their own. The target can be swapped once the program knows
//! where its logs really belong; whatever is still buffered then goes to the new target.

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::handler::Handler;
use super::record::{LogLevel, LogRecord};

/// Default number of records held before a flush is forced
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default level at which a record flushes the buffer immediately
pub const DEFAULT_FLUSH_LEVEL: LogLevel = LogLevel::Error;

struct RelayState {
    buffer: VecDeque<LogRecord>,
    target: Box<dyn Handler>,
}

impl RelayState {
    /// Forward buffered records in order, dropping each only after the target took it
    fn drain(&mut self) -> io::Result<()> {
        while let Some(record) = self.buffer.front() {
            self.target.emit(record)?;
            self.buffer.pop_front();
        }
        self.target.flush()
    }
}

/// Thread-safe buffering relay
pub struct BufferingRelay {
    state: Mutex<RelayState>,
    capacity: usize,
    flush_level: LogLevel,
}

impl BufferingRelay {
    /// Create a relay with the default capacity and flush level
    pub fn new(target: Box<dyn Handler>) -> Self {
        Self::with_limits(target, DEFAULT_CAPACITY, DEFAULT_FLUSH_LEVEL)
    }

    /// Create a relay that flushes once `capacity` records are held or a record at
    /// `flush_level` or above arrives
    pub fn with_limits(target: Box<dyn Handler>, capacity: usize, flush_level: LogLevel) -> Self {
        Self {
            state: Mutex::new(RelayState {
                buffer: VecDeque::new(),
                target,
            }),
            capacity: capacity.max(1),
            flush_level,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        // A panic while holding the lock never leaves the buffer half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffer a record, flushing if it is severe enough or the buffer is full
    pub fn handle(&self, record: LogRecord) -> io::Result<()> {
        let mut state = self.lock();
        let should_flush = record.level >= self.flush_level;
        state.buffer.push_back(record);

        if should_flush || state.buffer.len() >= self.capacity {
            state.drain()?;
        }
        Ok(())
    }

    /// Forward every buffered record to the target
    ///
    /// On error the undelivered records stay buffered for the next flush.
    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.lock();
        if state.buffer.is_empty() {
            return Ok(());
        }
        state.drain()
    }

    /// Replace the target, returning the previous one
    ///
    /// The old target's own output is flushed before the swap; records still in the
    /// buffer are then delivered to the new target.
    pub fn set_target(&self, target: Box<dyn Handler>) -> io::Result<Box<dyn Handler>> {
        let mut state = self.lock();
        state.target.flush()?;
        let old = std::mem::replace(&mut state.target, target);
        if !state.buffer.is_empty() {
            state.drain()?;
        }
        Ok(old)
    }

    /// Number of records waiting for a flush
    pub fn pending(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Give up the target and whatever is still buffered, without any I/O
    pub fn into_parts(self) -> (Box<dyn Handler>, Vec<LogRecord>) {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        (state.target, state.buffer.into())
    }

    /// Flush and give up the target
    pub fn into_target(self) -> io::Result<Box<dyn Handler>> {
        let mut state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        state.drain()?;
        Ok(state.target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::logging::handler::testing::{CaptureHandler, SharedBuf};
    use crate::logging::handler::StreamHandler;
    use crate::logging::record::RecordFormat;

    fn debug(msg: &str) -> LogRecord {
        LogRecord::new(LogLevel::Debug, "test", msg)
    }

    #[test]
    fn test_flush() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(target.clone()));

        relay.handle(debug("hi there")).unwrap();
        assert!(target.messages().is_empty());

        relay.flush().unwrap();
        assert_eq!(target.messages(), vec!["hi there"]);
        assert_eq!(relay.pending(), 0);
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(target.clone()));

        relay.flush().unwrap();
        assert!(target.messages().is_empty());
    }

    #[test]
    fn test_not_flushed_below_threshold() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(target.clone()));

        relay
            .handle(LogRecord::new(LogLevel::Warn, "test", "warning"))
            .unwrap();
        assert!(target.messages().is_empty());
        assert_eq!(relay.pending(), 1);
    }

    #[test]
    fn test_auto_flush_on_error() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(target.clone()));

        relay.handle(debug("one")).unwrap();
        relay.handle(debug("two")).unwrap();
        relay
            .handle(LogRecord::new(LogLevel::Error, "test", "boom"))
            .unwrap();

        assert_eq!(target.messages(), vec!["one", "two", "boom"]);
        assert_eq!(relay.pending(), 0);
    }

    #[test]
    fn test_capacity_forces_flush() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::with_limits(Box::new(target.clone()), 3, LogLevel::Error);

        relay.handle(debug("a")).unwrap();
        relay.handle(debug("b")).unwrap();
        assert!(target.messages().is_empty());

        relay.handle(debug("c")).unwrap();
        assert_eq!(target.messages(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_target_reset() {
        let old_stream = SharedBuf::default();
        let relay = BufferingRelay::new(Box::new(StreamHandler::new(
            old_stream.clone(),
            RecordFormat::Plain,
        )));
        relay.handle(debug("hi there")).unwrap();

        let new_stream = SharedBuf::default();
        relay
            .set_target(Box::new(StreamHandler::new(
                new_stream.clone(),
                RecordFormat::Plain,
            )))
            .unwrap();
        relay.flush().unwrap();

        assert_eq!(old_stream.contents(), "");
        assert_eq!(new_stream.contents(), "hi there\n");
    }

    #[test]
    fn test_retarget_keeps_order_without_duplicates() {
        let old = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(old.clone()));

        let expected: Vec<String> = (0..50).map(|i| format!("record {}", i)).collect();
        for msg in &expected {
            relay.handle(debug(msg)).unwrap();
        }

        let new = CaptureHandler::default();
        relay.set_target(Box::new(new.clone())).unwrap();
        relay.flush().unwrap();
        relay.flush().unwrap();

        assert!(old.messages().is_empty());
        assert_eq!(new.messages(), expected);
    }

    #[test]
    fn test_records_after_retarget_go_to_new_target() {
        let old = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(old.clone()));
        relay
            .handle(LogRecord::new(LogLevel::Error, "test", "early"))
            .unwrap();

        let new = CaptureHandler::default();
        relay.set_target(Box::new(new.clone())).unwrap();
        relay
            .handle(LogRecord::new(LogLevel::Error, "test", "late"))
            .unwrap();

        assert_eq!(old.messages(), vec!["early"]);
        assert_eq!(new.messages(), vec!["late"]);
    }

    #[test]
    fn test_failed_flush_keeps_records() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(target.clone()));
        relay.handle(debug("kept 1")).unwrap();
        relay.handle(debug("kept 2")).unwrap();

        target.set_failing(true);
        assert!(relay.flush().is_err());
        assert_eq!(relay.pending(), 2);

        target.set_failing(false);
        relay.flush().unwrap();
        assert_eq!(target.messages(), vec!["kept 1", "kept 2"]);
        assert_eq!(relay.pending(), 0);
    }

    #[test]
    fn test_into_target_flushes() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(target.clone()));
        relay.handle(debug("last words")).unwrap();

        let _target = relay.into_target().unwrap();
        assert_eq!(target.messages(), vec!["last words"]);
    }

    #[test]
    fn test_into_parts_returns_unflushed_records() {
        let target = CaptureHandler::default();
        let relay = BufferingRelay::new(Box::new(target.clone()));
        relay.handle(debug("left over")).unwrap();

        let (_target, leftover) = relay.into_parts();
        assert!(target.messages().is_empty());
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].message, "left over");
    }

    #[test]
    fn test_concurrent_handle_loses_nothing() {
        let target = CaptureHandler::default();
        let relay = Arc::new(BufferingRelay::with_limits(
            Box::new(target.clone()),
            7,
            LogLevel::Error,
        ));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let relay = Arc::clone(&relay);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        relay.handle(debug(&format!("{}-{}", t, i))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        relay.flush().unwrap();

        let mut messages = target.messages();
        assert_eq!(messages.len(), 100);
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), 100);
    }
}
