use std::sync::{Arc, Mutex, MutexGuard};

use super::Sink;
use crate::error::SinkError;
use crate::event::LogEvent;

/// Collects events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().clone()
    }

    /// Rendered messages, in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(LogEvent::render_message).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Sink for MemorySink {
    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        self.lock().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "Memory"
    }
}
