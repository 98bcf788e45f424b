//! Record sinks
//!
//! A `Handler` receives fully built records. The relay, the console writer and the
//! log files all implement it, which lets the relay swap its downstream target freely.

use std::io::{self, Write};

use super::record::{LogRecord, RecordFormat};

/// A destination for log records
pub trait Handler: Send {
    /// Deliver one record
    fn emit(&mut self, record: &LogRecord) -> io::Result<()>;

    /// Push any buffered output down to the underlying writer
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn emit(&mut self, record: &LogRecord) -> io::Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Writes one rendered line per record to any `Write`
///
/// Each line is written and flushed immediately, so the underlying file always holds
/// every delivered record.
pub struct StreamHandler<W> {
    writer: W,
    format: RecordFormat,
}

impl<W: Write + Send> StreamHandler<W> {
    pub fn new(writer: W, format: RecordFormat) -> Self {
        Self { writer, format }
    }
}

impl<W: Write + Send> Handler for StreamHandler<W> {
    fn emit(&mut self, record: &LogRecord) -> io::Result<()> {
        let mut line = self.format.render(record);
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
