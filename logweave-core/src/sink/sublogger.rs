use std::sync::Arc;

use super::{Sink, SinkRouter};
use crate::error::SinkError;
use crate::event::LogEvent;
use crate::pipeline::Pipeline;

/// Feeds a copy of each event through a nested pipeline with its own
/// enrichers, filters, minimum level and sinks.
///
/// Changes the nested pipeline makes to the event are not visible to the
/// parent's other sinks.
pub struct SubLoggerSink {
    pipeline: Arc<Pipeline>,
}

impl SubLoggerSink {
    pub fn new(pipeline: impl Into<Arc<Pipeline>>) -> Self {
        Self {
            pipeline: pipeline.into(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl Sink for SubLoggerSink {
    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        self.pipeline.process(event.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.pipeline.flush();
        Ok(())
    }

    fn name(&self) -> &str {
        "Logger"
    }

    fn inner(&self) -> Option<&SinkRouter> {
        Some(self.pipeline.sinks())
    }
}
