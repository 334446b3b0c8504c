//! Builder pattern API for logweave pipelines.
//!
//! Provides a fluent interface for assembling a logger in code:
//!
//! ```rust,ignore
//! use logweave_core::prelude::*;
//!
//! let switch = LevelSwitch::new(Level::Verbose);
//! let logger = LoggerConfiguration::new()
//!     .minimum_level_controlled_by(switch.clone())
//!     .override_level("Microsoft", Level::Warning)
//!     .enrich_with_property("Application", "Serilog Example")
//!     .enrich(ThreadIdEnricher)
//!     .max_depth(3)
//!     .write_to(ConsoleSink::stdout(Arc::new(OutputTemplate::default())))
//!     .create_logger();
//!
//! logger.information("Hello, {name}!", args!["World"]);
//! ```

use std::sync::Arc;

use crate::capture::{Destructurer, DestructuringLimits, DestructuringPolicy};
use crate::enrich::{Enricher, PropertyEnricher};
use crate::filter::{Filter, FilterSwitch};
use crate::level::{Level, LevelGate, LevelSwitch};
use crate::logger::{Logger, Switches};
use crate::pipeline::{LevelOverride, Pipeline};
use crate::sink::{Sink, SinkRouter};
use crate::value::Value;

/// Builder for configuring a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let memory = MemorySink::new();
/// let logger = LoggerConfiguration::new()
///     .minimum_level(Level::Debug)
///     .write_to(memory.clone())
///     .create_logger();
/// ```
#[derive(Clone)]
pub struct LoggerConfiguration {
    /// Pipeline-wide minimum level
    minimum: LevelGate,

    /// Per-source-context minimum levels
    overrides: Vec<LevelOverride>,

    /// Enrichers, in registration order
    enrichers: Vec<Arc<dyn Enricher>>,

    /// Filters, in registration order
    filters: Vec<Arc<dyn Filter>>,

    /// Destructuring caps
    limits: DestructuringLimits,

    /// Destructuring policies, in registration order
    policies: Vec<Arc<dyn DestructuringPolicy>>,

    /// Sinks with their level gates
    sinks: Vec<(Arc<dyn Sink>, LevelGate)>,

    /// Named switches exposed through the built logger
    switches: Switches,
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerConfiguration {
    /// Create a builder: minimum level Information, default caps, no sinks.
    pub fn new() -> Self {
        Self {
            minimum: LevelGate::Static(Level::Information),
            overrides: Vec::new(),
            enrichers: Vec::new(),
            filters: Vec::new(),
            limits: DestructuringLimits::default(),
            policies: Vec::new(),
            sinks: Vec::new(),
            switches: Switches::default(),
        }
    }

    /// Set a fixed minimum level.
    pub fn minimum_level(mut self, level: Level) -> Self {
        self.minimum = LevelGate::Static(level);
        self
    }

    /// Let a shared switch decide the minimum level.
    pub fn minimum_level_controlled_by(mut self, switch: LevelSwitch) -> Self {
        self.minimum = LevelGate::Switch(switch);
        self
    }

    /// Override the minimum level for a source-context prefix.
    pub fn override_level(mut self, prefix: impl Into<String>, gate: impl Into<LevelGate>) -> Self {
        self.overrides.push(LevelOverride {
            prefix: prefix.into(),
            gate: gate.into(),
        });
        self
    }

    pub fn enrich(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    pub fn enrich_shared(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    /// Attach a fixed property to every event.
    pub fn enrich_with_property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.enrich(PropertyEnricher::new(name, value))
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn filter_shared(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn destructure_with(mut self, policy: impl DestructuringPolicy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    pub fn destructure_shared(mut self, policy: Arc<dyn DestructuringPolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    /// Maximum nesting depth of destructured values.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.limits.max_depth = depth;
        self
    }

    /// Maximum string length, in characters.
    pub fn max_string_length(mut self, length: usize) -> Self {
        self.limits.max_string_length = Some(length);
        self
    }

    /// Maximum number of sequence/mapping entries.
    pub fn max_collection_count(mut self, count: usize) -> Self {
        self.limits.max_collection_count = Some(count);
        self
    }

    pub fn limits(mut self, limits: DestructuringLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Add a sink that receives every event passing the pipeline.
    pub fn write_to(self, sink: impl Sink + 'static) -> Self {
        self.write_to_restricted(sink, LevelGate::Static(Level::Verbose))
    }

    /// Add a sink with its own level gate.
    pub fn write_to_restricted(mut self, sink: impl Sink + 'static, gate: impl Into<LevelGate>) -> Self {
        self.sinks.push((Arc::new(sink), gate.into()));
        self
    }

    pub fn write_to_shared(mut self, sink: Arc<dyn Sink>, gate: LevelGate) -> Self {
        self.sinks.push((sink, gate));
        self
    }

    /// Register a level switch so it can be looked up on the logger.
    pub fn level_switch(mut self, name: impl Into<String>, switch: LevelSwitch) -> Self {
        self.switches.levels.insert(name.into(), switch);
        self
    }

    /// Register a filter switch so it can be looked up on the logger.
    pub fn filter_switch(mut self, name: impl Into<String>, switch: FilterSwitch) -> Self {
        self.switches.filters.insert(name.into(), switch);
        self
    }

    /// Assemble the pipeline alone, e.g. for a sub-logger sink.
    pub fn build_pipeline(self) -> Pipeline {
        self.into_parts().0
    }

    /// Assemble the pipeline and wrap it in a logger.
    pub fn create_logger(self) -> Logger {
        let (pipeline, switches) = self.into_parts();
        Logger::new(pipeline, switches)
    }

    fn into_parts(self) -> (Pipeline, Switches) {
        let mut router = SinkRouter::new();
        for (sink, gate) in self.sinks {
            router.add(sink, gate);
        }
        let pipeline = Pipeline::new(
            self.minimum,
            self.overrides,
            self.enrichers,
            self.filters,
            Destructurer::new(self.limits, self.policies),
            router,
        );
        (pipeline, self.switches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::sink::MemorySink;

    #[test]
    fn test_builder_defaults_to_information() {
        let memory = MemorySink::new();
        let logger = LoggerConfiguration::new().write_to(memory.clone()).create_logger();
        logger.debug("hidden", args![]);
        logger.information("shown", args![]);
        assert_eq!(memory.messages(), vec!["shown"]);
    }

    #[test]
    fn test_switch_registered_by_name() {
        let switch = LevelSwitch::new(Level::Warning);
        let logger = LoggerConfiguration::new()
            .minimum_level_controlled_by(switch.clone())
            .level_switch("$controlSwitch", switch.clone())
            .create_logger();
        assert!(logger.level_switch("$controlSwitch").unwrap().same_switch(&switch));
        assert!(logger.level_switch("$other").is_none());
    }

    #[test]
    fn test_restricted_sink_gate() {
        let all = MemorySink::new();
        let errors = MemorySink::new();
        let logger = LoggerConfiguration::new()
            .minimum_level(Level::Verbose)
            .write_to(all.clone())
            .write_to_restricted(errors.clone(), Level::Error)
            .create_logger();
        logger.warning("w", args![]);
        logger.error("e", args![]);
        assert_eq!(all.len(), 2);
        assert_eq!(errors.messages(), vec!["e"]);
    }
}
