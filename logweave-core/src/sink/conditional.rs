use super::{Sink, SinkRouter};
use crate::enrich::EventPredicate;
use crate::error::SinkError;
use crate::event::LogEvent;

/// Forwards to the wrapped sinks only when the predicate holds.
pub struct ConditionalSink {
    predicate: EventPredicate,
    inner: SinkRouter,
}

impl ConditionalSink {
    pub fn new(predicate: EventPredicate, inner: SinkRouter) -> Self {
        Self { predicate, inner }
    }
}

impl Sink for ConditionalSink {
    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        if (self.predicate)(event) {
            self.inner.dispatch(event);
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush();
        Ok(())
    }

    fn name(&self) -> &str {
        "Conditional"
    }

    fn inner(&self) -> Option<&SinkRouter> {
        Some(&self.inner)
    }
}
