//! Sinks and the router that dispatches events to them.
//!
//! # Isolation
//! ```text
//! dispatch(event)
//!   for each routed sink:
//!     gate.allows(level)?  ── no ──→ skip
//!     catch_unwind(sink.emit(event))
//!       Ok(())        → done
//!       Err(e) / panic → failures += 1, tracing::warn!, continue
//! ```
//! Nothing a sink does can reach the log call site.

#[cfg(feature = "async-sink")]
mod async_sink;
mod conditional;
mod console;
#[cfg(feature = "file")]
mod file;
mod memory;
mod sublogger;

#[cfg(feature = "async-sink")]
pub use async_sink::{AsyncSink, DEFAULT_BUFFER_SIZE};
pub use conditional::ConditionalSink;
pub use console::ConsoleSink;
#[cfg(feature = "file")]
pub use file::FileSink;
pub use memory::MemorySink;
pub use sublogger::SubLoggerSink;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::SinkError;
use crate::event::LogEvent;
use crate::level::LevelGate;

pub trait Sink: Send + Sync {
    fn emit(&self, event: &LogEvent) -> Result<(), SinkError>;

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        "sink"
    }

    /// Router of wrapped sinks, for wrappers and sub-loggers.
    fn inner(&self) -> Option<&SinkRouter> {
        None
    }
}

struct RoutedSink {
    sink: Arc<dyn Sink>,
    gate: LevelGate,
    failures: AtomicU64,
}

/// Ordered set of sinks, each behind its own level gate.
#[derive(Default)]
pub struct SinkRouter {
    sinks: Vec<RoutedSink>,
}

impl SinkRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Arc<dyn Sink>, gate: LevelGate) {
        self.sinks.push(RoutedSink {
            sink,
            gate,
            failures: AtomicU64::new(0),
        });
    }

    pub fn with(mut self, sink: Arc<dyn Sink>, gate: LevelGate) -> Self {
        self.add(sink, gate);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn dispatch(&self, event: &LogEvent) {
        for routed in &self.sinks {
            if !routed.gate.allows(event.level()) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| routed.sink.emit(event)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(_) => "sink panicked".to_string(),
            };
            let failures = routed.failures.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(sink = routed.sink.name(), failures, error = %error, "sink emit failed");
        }
    }

    /// Flush every sink; failures are reported, not returned.
    pub fn flush(&self) {
        for routed in &self.sinks {
            match catch_unwind(AssertUnwindSafe(|| routed.sink.flush())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(sink = routed.sink.name(), error = %e, "sink flush failed"),
                Err(_) => warn!(sink = routed.sink.name(), "sink panicked during flush"),
            }
        }
    }

    /// Failure count per sink, in routing order. Sinks behind a wrapper
    /// follow it, named by path (`Logger/Console`).
    pub fn failures(&self) -> Vec<(String, u64)> {
        let mut out = Vec::new();
        self.collect_failures("", &mut out);
        out
    }

    fn collect_failures(&self, prefix: &str, out: &mut Vec<(String, u64)>) {
        for routed in &self.sinks {
            let name = format!("{}{}", prefix, routed.sink.name());
            out.push((name.clone(), routed.failures.load(Ordering::Relaxed)));
            if let Some(inner) = routed.sink.inner() {
                inner.collect_failures(&format!("{}/", name), out);
            }
        }
    }

    /// Failures across this router and every nested one.
    pub fn total_failures(&self) -> u64 {
        self.failures().iter().map(|(_, count)| count).sum()
    }
}

impl std::fmt::Debug for SinkRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sinks.iter().map(|r| (r.sink.name(), &r.gate)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{Level, LevelSwitch};

    struct Failing;
    impl Sink for Failing {
        fn emit(&self, _: &LogEvent) -> Result<(), SinkError> {
            Err(SinkError::Format("always fails".into()))
        }
        fn name(&self) -> &str {
            "Failing"
        }
    }

    struct Panicking;
    impl Sink for Panicking {
        fn emit(&self, _: &LogEvent) -> Result<(), SinkError> {
            panic!("sink failure")
        }
    }

    fn event(level: Level) -> LogEvent {
        LogEvent::from_template(level, "x", vec![])
    }

    #[test]
    fn test_failing_sinks_do_not_affect_others() {
        let memory = MemorySink::new();
        let router = SinkRouter::new()
            .with(Arc::new(Failing), LevelGate::default())
            .with(Arc::new(Panicking), LevelGate::default())
            .with(Arc::new(memory.clone()), LevelGate::default());

        router.dispatch(&event(Level::Information));
        router.dispatch(&event(Level::Information));

        assert_eq!(memory.len(), 2);
        assert_eq!(router.total_failures(), 4);
        assert_eq!(router.failures()[0], ("Failing".to_string(), 2));
    }

    #[test]
    fn test_static_gate() {
        for (gate, delivered) in [
            (Level::Verbose, true),
            (Level::Information, true),
            (Level::Warning, true),
            (Level::Error, false),
            (Level::Fatal, false),
        ] {
            let memory = MemorySink::new();
            let router = SinkRouter::new().with(Arc::new(memory.clone()), gate.into());
            router.dispatch(&event(Level::Warning));
            assert_eq!(memory.len() == 1, delivered, "gate {:?}", gate);
        }
    }

    #[test]
    fn test_switch_gate_read_at_dispatch() {
        let switch = LevelSwitch::new(Level::Error);
        let memory = MemorySink::new();
        let router = SinkRouter::new().with(Arc::new(memory.clone()), switch.clone().into());

        router.dispatch(&event(Level::Debug));
        assert_eq!(memory.len(), 0);

        switch.set_minimum_level(Level::Verbose);
        router.dispatch(&event(Level::Debug));
        assert_eq!(memory.len(), 1);
    }
}
