//! Tracing layer that feeds events into the log pipeline

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::pipeline::LogPipeline;
use super::record::{LogLevel, LogRecord, LOG_ONLY_FIELD};

/// A tracing Layer that turns every event into a `LogRecord` for the pipeline
///
/// No filtering happens here: the pipeline must see every level so nothing is lost
/// before the console threshold is known.
#[derive(Clone)]
pub struct PipelineLayer {
    pipeline: LogPipeline,
}

impl PipelineLayer {
    pub fn new(pipeline: LogPipeline) -> Self {
        Self { pipeline }
    }
}

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let log_only = visitor.log_only;
        let mut record = LogRecord::new(
            LogLevel::from(*metadata.level()),
            metadata.target(),
            visitor.finish(),
        )
        .with_log_only(log_only);
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            record = record.with_location(format!("{}:{}", file, line));
        }

        self.pipeline.dispatch(record);
    }
}

/// Collects the `message` field; other fields are appended as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    extra: String,
    log_only: bool,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.extra.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.extra.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.extra)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == LOG_ONLY_FIELD {
            self.log_only = value;
        } else {
            let _ = write!(self.extra, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.extra, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.extra, " {}={}", field.name(), value);
        }
    }
}
