//! The event pipeline.
//!
//! # Data Flow
//! ```text
//! LogEvent
//!   → level gate (minimum level, or the longest matching source override)
//!   → enrichers (registration order, last writer wins)
//!   → filters (AND, short-circuit; raw values)
//!   → bind template arguments (destructured with caps)
//!   → cap every other property (enriched, ambient, per-logger)
//!   → SinkRouter (per-sink gate, isolated emit)
//! ```

use std::sync::Arc;

use tracing::warn;

use crate::capture::Destructurer;
use crate::enrich::{self, Enricher};
use crate::event::LogEvent;
use crate::filter::{self, Filter};
use crate::level::{Level, LevelGate};
use crate::sink::SinkRouter;
use crate::template::TemplateCache;

/// Property set by [`Logger::for_context`](crate::Logger::for_context).
pub const SOURCE_CONTEXT_PROPERTY: &str = "SourceContext";

/// Minimum level for events whose source context starts with `prefix`.
#[derive(Debug, Clone)]
pub struct LevelOverride {
    pub prefix: String,
    pub gate: LevelGate,
}

impl LevelOverride {
    /// `Microsoft` matches `Microsoft` and `Microsoft.Hosting`, not `MicrosoftX`.
    pub fn matches(&self, source: &str) -> bool {
        source == self.prefix
            || (source.starts_with(&self.prefix)
                && source[self.prefix.len()..].starts_with('.'))
    }
}

pub struct Pipeline {
    pub(crate) minimum: LevelGate,
    /// Longest prefix first.
    pub(crate) overrides: Vec<LevelOverride>,
    pub(crate) enrichers: Vec<Arc<dyn Enricher>>,
    pub(crate) filters: Vec<Arc<dyn Filter>>,
    pub(crate) destructurer: Destructurer,
    pub(crate) sinks: SinkRouter,
    pub(crate) templates: TemplateCache,
}

impl Pipeline {
    pub(crate) fn new(
        minimum: LevelGate,
        mut overrides: Vec<LevelOverride>,
        enrichers: Vec<Arc<dyn Enricher>>,
        filters: Vec<Arc<dyn Filter>>,
        destructurer: Destructurer,
        sinks: SinkRouter,
    ) -> Self {
        overrides.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self {
            minimum,
            overrides,
            enrichers,
            filters,
            destructurer,
            sinks,
            templates: TemplateCache::new(),
        }
    }

    /// The gate in effect for a source context.
    pub fn gate_for(&self, source_context: Option<&str>) -> &LevelGate {
        source_context
            .and_then(|source| self.overrides.iter().find(|o| o.matches(source)))
            .map(|o| &o.gate)
            .unwrap_or(&self.minimum)
    }

    pub fn is_enabled(&self, level: Level, source_context: Option<&str>) -> bool {
        self.gate_for(source_context).allows(level)
    }

    pub fn destructurer(&self) -> &Destructurer {
        &self.destructurer
    }

    pub fn sinks(&self) -> &SinkRouter {
        &self.sinks
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    /// Run an event through every stage, starting with the level gate.
    pub fn process(&self, event: LogEvent) {
        let source = event
            .property(SOURCE_CONTEXT_PROPERTY)
            .and_then(|v| v.as_str());
        if !self.is_enabled(event.level(), source) {
            return;
        }
        self.process_admitted(event);
    }

    /// Run an event that already passed the level gate.
    pub(crate) fn process_admitted(&self, mut event: LogEvent) {
        enrich::apply(&mut event, &self.enrichers);

        if !filter::allow(&event, &self.filters) {
            return;
        }

        let surplus = event.bind_arguments(&self.destructurer);
        if surplus > 0 {
            warn!(
                template = event.template().text(),
                surplus, "more arguments than template holes; extras ignored"
            );
        }
        self.apply_limits(&mut event);

        self.sinks.dispatch(&event);
    }

    /// Enriched values never went through the destructurer; cap them here.
    /// `SourceContext` is left whole since overrides match on it.
    fn apply_limits(&self, event: &mut LogEvent) {
        let limits = self.destructurer.limits();
        event.properties_mut().map_values(|name, value| {
            if name == SOURCE_CONTEXT_PROPERTY {
                value
            } else {
                limits.clamp(value)
            }
        });
    }

    pub fn flush(&self) {
        self.sinks.flush();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("minimum", &self.minimum)
            .field("overrides", &self.overrides)
            .field("enrichers", &self.enrichers.len())
            .field("filters", &self.filters.len())
            .field("destructurer", &self.destructurer)
            .field("sinks", &self.sinks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn over(prefix: &str, level: Level) -> LevelOverride {
        LevelOverride {
            prefix: prefix.into(),
            gate: level.into(),
        }
    }

    #[test]
    fn test_override_prefix_on_dot_boundaries() {
        let o = over("Microsoft", Level::Warning);
        assert!(o.matches("Microsoft"));
        assert!(o.matches("Microsoft.Hosting.Lifetime"));
        assert!(!o.matches("MicrosoftX"));
        assert!(!o.matches("Micro"));
    }

    #[test]
    fn test_longest_override_wins() {
        let pipeline = Pipeline::new(
            Level::Information.into(),
            vec![
                over("MyApp", Level::Error),
                over("MyApp.Something.Tricky", Level::Verbose),
            ],
            Vec::new(),
            Vec::new(),
            Destructurer::default(),
            SinkRouter::new(),
        );
        assert_eq!(pipeline.gate_for(Some("MyApp.Other")).minimum_level(), Level::Error);
        assert_eq!(
            pipeline.gate_for(Some("MyApp.Something.Tricky.Deep")).minimum_level(),
            Level::Verbose
        );
        assert_eq!(pipeline.gate_for(Some("Elsewhere")).minimum_level(), Level::Information);
        assert_eq!(pipeline.gate_for(None).minimum_level(), Level::Information);
    }
}
