//! Enrichment: ordered steps that add or overwrite event properties.
//!
//! Steps run in registration order and every step overwrites, so for the
//! same property name the last step wins.

mod ambient;
mod context;

pub use ambient::{
    current_thread_id, machine_name, MachineNameEnricher, ThreadIdEnricher, ThreadNameEnricher,
    MACHINE_NAME_PROPERTY, THREAD_ID_PROPERTY, THREAD_NAME_PROPERTY,
};
pub use context::{LogContext, LogContextGuard};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::event::LogEvent;
use crate::level::{Level, LevelGate};
use crate::value::Value;

pub trait Enricher: Send + Sync {
    fn enrich(&self, event: &mut LogEvent);
}

impl<F> Enricher for F
where
    F: Fn(&mut LogEvent) + Send + Sync,
{
    fn enrich(&self, event: &mut LogEvent) {
        self(event)
    }
}

/// Run `enrichers` in order. A panicking enricher is skipped and reported.
pub fn apply(event: &mut LogEvent, enrichers: &[Arc<dyn Enricher>]) {
    for (index, enricher) in enrichers.iter().enumerate() {
        if catch_unwind(AssertUnwindSafe(|| enricher.enrich(event))).is_err() {
            tracing::warn!(enricher = index, "enricher panicked; skipped");
        }
    }
}

/// Adds one fixed property (`WithProperty`, top-level `Properties`).
#[derive(Debug, Clone)]
pub struct PropertyEnricher {
    name: String,
    value: Value,
}

impl PropertyEnricher {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Enricher for PropertyEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        event.add_or_update_property(self.name.clone(), self.value.clone());
    }
}

/// Copies the current thread's [`LogContext`] onto the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogContextEnricher;

impl Enricher for LogContextEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        LogContext::for_each(|name, value| event.add_or_update_property(name, value.clone()));
    }
}

/// Runs the inner enrichers only for events at or above a level.
pub struct LevelRestrictedEnricher {
    gate: LevelGate,
    inner: Vec<Arc<dyn Enricher>>,
}

impl LevelRestrictedEnricher {
    pub fn new(gate: impl Into<LevelGate>, inner: Vec<Arc<dyn Enricher>>) -> Self {
        Self {
            gate: gate.into(),
            inner,
        }
    }

    pub fn minimum_level(&self) -> Level {
        self.gate.minimum_level()
    }
}

impl Enricher for LevelRestrictedEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        if self.gate.allows(event.level()) {
            apply(event, &self.inner);
        }
    }
}

pub type EventPredicate = Arc<dyn Fn(&LogEvent) -> bool + Send + Sync>;

/// Runs the inner enrichers only when the predicate holds.
///
/// The predicate is evaluated once, before any mutation.
pub struct ConditionalEnricher {
    predicate: EventPredicate,
    inner: Vec<Arc<dyn Enricher>>,
}

impl ConditionalEnricher {
    pub fn new(predicate: EventPredicate, inner: Vec<Arc<dyn Enricher>>) -> Self {
        Self { predicate, inner }
    }
}

impl Enricher for ConditionalEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        if (self.predicate)(event) {
            apply(event, &self.inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(level: Level) -> LogEvent {
        LogEvent::from_template(level, "x", vec![])
    }

    fn set_x(v: i32) -> Arc<dyn Enricher> {
        Arc::new(PropertyEnricher::new("X", v))
    }

    #[test]
    fn test_last_enricher_wins() {
        let mut e = event(Level::Information);
        apply(&mut e, &[set_x(1), set_x(2)]);
        assert_eq!(e.property("X"), Some(&Value::from(2)));

        let mut e = event(Level::Information);
        apply(&mut e, &[set_x(2), set_x(1)]);
        assert_eq!(e.property("X"), Some(&Value::from(1)));
    }

    #[test]
    fn test_panicking_enricher_is_skipped() {
        let boom: Arc<dyn Enricher> = Arc::new(|_: &mut LogEvent| panic!("enricher failure"));
        let mut e = event(Level::Information);
        apply(&mut e, &[boom, set_x(5)]);
        assert_eq!(e.property("X"), Some(&Value::from(5)));
    }

    #[test]
    fn test_level_restricted() {
        let at_warning = LevelRestrictedEnricher::new(Level::Warning, vec![set_x(1)]);
        let mut low = event(Level::Information);
        at_warning.enrich(&mut low);
        assert!(low.property("X").is_none());

        let mut high = event(Level::Error);
        at_warning.enrich(&mut high);
        assert!(high.property("X").is_some());
    }

    #[test]
    fn test_conditional_skips_entirely_on_false() {
        let only_errors: EventPredicate = Arc::new(|e: &LogEvent| e.level() >= Level::Error);
        let when = ConditionalEnricher::new(only_errors, vec![set_x(1), set_x(2)]);

        let mut e = event(Level::Debug);
        when.enrich(&mut e);
        assert!(e.properties().is_empty());

        let mut e = event(Level::Fatal);
        when.enrich(&mut e);
        assert_eq!(e.property("X"), Some(&Value::from(2)));
    }

    #[test]
    fn test_log_context_enricher_innermost_wins() {
        let _a = LogContext::push_property("Scope", "outer");
        let _b = LogContext::push_property("Scope", "inner");
        let mut e = event(Level::Information);
        LogContextEnricher.enrich(&mut e);
        assert_eq!(e.property("Scope").and_then(|v| v.as_str()), Some("inner"));
    }
}
