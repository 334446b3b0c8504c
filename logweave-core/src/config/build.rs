//! Turning a [`LoggerConfig`] into a pipeline.
//!
//! # Order
//! ```text
//! LevelSwitches / FilterSwitches   declared first, visible to nested loggers
//! MinimumLevel                     static, ControlledBy, Override
//! Properties                       enrichers, ahead of Enrich
//! Enrich → Destructure → Filter → WriteTo (+ WriteTo:<Label>)
//! ```

use std::cell::RefCell;
use std::sync::Arc;

use tracing::debug;

use super::registry::{DestructureStep, Registry};
use super::schema::{json_to_value, ComponentConfig, LoggerConfig, MinimumLevelConfig};
use crate::builder::LoggerConfiguration;
use crate::enrich::Enricher;
use crate::error::{LogweaveError, LogweaveResult};
use crate::filter::{Filter, FilterSwitch};
use crate::level::{Level, LevelGate, LevelSwitch};
use crate::logger::{find_switch, Logger, Switches};
use crate::pipeline::Pipeline;
use crate::sink::{Sink, SinkRouter};

/// State shared by every factory while one configuration is built.
pub struct BuildContext<'r> {
    registry: &'r Registry,
    switches: RefCell<Switches>,
}

impl<'r> BuildContext<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            switches: RefCell::new(Switches::default()),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn level_switch(&self, name: &str) -> LogweaveResult<LevelSwitch> {
        find_switch(&self.switches.borrow().levels, name)
            .cloned()
            .ok_or_else(|| LogweaveError::UnknownSwitch(name.to_string()))
    }

    pub fn filter_switch(&self, name: &str) -> LogweaveResult<FilterSwitch> {
        find_switch(&self.switches.borrow().filters, name)
            .cloned()
            .ok_or_else(|| LogweaveError::UnknownSwitch(name.to_string()))
    }

    /// A level name, or the name of a declared level switch.
    pub fn gate(&self, text: &str) -> LogweaveResult<LevelGate> {
        if let Ok(switch) = self.level_switch(text) {
            return Ok(switch.into());
        }
        if text.starts_with('$') {
            return Err(LogweaveError::UnknownSwitch(text.to_string()));
        }
        Ok(text.parse::<Level>()?.into())
    }

    /// Switch names are global across nested loggers; redeclaring one fails.
    fn declare_switches(&self, config: &LoggerConfig) -> LogweaveResult<()> {
        let mut switches = self.switches.borrow_mut();
        for (name, initial) in &config.level_switches {
            if find_switch(&switches.levels, name).is_some() {
                return Err(LogweaveError::DuplicateSwitch(name.clone()));
            }
            let level: Level = initial.parse()?;
            debug!(switch = %name, %level, "declared level switch");
            switches.levels.insert(name.clone(), LevelSwitch::new(level));
        }
        for (name, expression) in &config.filter_switches {
            if find_switch(&switches.filters, name).is_some() {
                return Err(LogweaveError::DuplicateSwitch(name.clone()));
            }
            let switch = FilterSwitch::new(expression)?;
            debug!(switch = %name, expression = %expression, "declared filter switch");
            switches.filters.insert(name.clone(), switch);
        }
        Ok(())
    }

    /// Apply one document to a fresh builder.
    pub fn configure(&self, config: &LoggerConfig) -> LogweaveResult<LoggerConfiguration> {
        self.declare_switches(config)?;
        let mut builder = LoggerConfiguration::new();

        match &config.minimum_level {
            None => {}
            Some(MinimumLevelConfig::Level(text)) => {
                builder = match self.gate(text)? {
                    LevelGate::Static(level) => builder.minimum_level(level),
                    LevelGate::Switch(switch) => builder.minimum_level_controlled_by(switch),
                };
            }
            Some(MinimumLevelConfig::Detailed {
                default,
                controlled_by,
                overrides,
            }) => {
                if let Some(level) = default {
                    builder = builder.minimum_level(level.parse()?);
                }
                // ControlledBy takes precedence over Default.
                if let Some(name) = controlled_by {
                    builder = builder.minimum_level_controlled_by(self.level_switch(name)?);
                }
                for (prefix, level) in overrides {
                    builder = builder.override_level(prefix.as_str(), self.gate(level)?);
                }
            }
        }

        for (name, value) in &config.properties {
            builder = builder.enrich_with_property(name.as_str(), json_to_value(value));
        }
        for enricher in self.build_enrichers(&config.enrich)? {
            builder = builder.enrich_shared(enricher);
        }

        for component in &config.destructure {
            let factory = self.registry.destructure(component.name())?;
            builder = match factory(component.args(), self)? {
                DestructureStep::Policy(policy) => builder.destructure_shared(policy),
                DestructureStep::MaxDepth(depth) => builder.max_depth(depth),
                DestructureStep::MaxStringLength(length) => builder.max_string_length(length),
                DestructureStep::MaxCollectionCount(count) => builder.max_collection_count(count),
            };
        }

        for filter in self.build_filters(&config.filter)? {
            builder = builder.filter_shared(filter);
        }

        for component in config.sinks()? {
            let (sink, gate) = self.build_sink(&component)?;
            builder = builder.write_to_shared(sink, gate);
        }

        Ok(builder)
    }

    pub fn build_pipeline(&self, config: &LoggerConfig) -> LogweaveResult<Pipeline> {
        Ok(self.configure(config)?.build_pipeline())
    }

    pub fn build_enrichers(&self, components: &[ComponentConfig]) -> LogweaveResult<Vec<Arc<dyn Enricher>>> {
        components
            .iter()
            .map(|c| self.registry.enricher(c.name()).and_then(|f| f(c.args(), self)))
            .collect()
    }

    pub fn build_filters(&self, components: &[ComponentConfig]) -> LogweaveResult<Vec<Arc<dyn Filter>>> {
        components
            .iter()
            .map(|c| self.registry.filter(c.name()).and_then(|f| f(c.args(), self)))
            .collect()
    }

    /// One sink with its gate. `levelSwitch` wins over `restrictedToMinimumLevel`.
    pub fn build_sink(&self, component: &ComponentConfig) -> LogweaveResult<(Arc<dyn Sink>, LevelGate)> {
        let args = component.args();
        let gate = match args.str("levelSwitch")? {
            Some(name) => self.level_switch(name)?.into(),
            None => args
                .level("restrictedToMinimumLevel")?
                .map(LevelGate::Static)
                .unwrap_or_default(),
        };
        let factory = self.registry.sink(component.name())?;
        let sink = factory(args, self)?;
        debug!(sink = sink.name(), minimum = %gate.minimum_level(), "configured sink");
        Ok((sink, gate))
    }

    pub fn build_sinks(&self, components: &[ComponentConfig]) -> LogweaveResult<SinkRouter> {
        let mut router = SinkRouter::new();
        for component in components {
            let (sink, gate) = self.build_sink(component)?;
            router.add(sink, gate);
        }
        Ok(router)
    }

    /// Every switch declared so far, including those of nested loggers.
    pub fn into_switches(self) -> Switches {
        self.switches.into_inner()
    }
}

impl LoggerConfig {
    /// A builder pre-populated from this document, for further code configuration.
    pub fn configuration(&self, registry: &Registry) -> LogweaveResult<LoggerConfiguration> {
        let ctx = BuildContext::new(registry);
        let mut builder = ctx.configure(self)?;
        let switches = ctx.into_switches();
        for (name, switch) in switches.levels {
            builder = builder.level_switch(name, switch);
        }
        for (name, switch) in switches.filters {
            builder = builder.filter_switch(name, switch);
        }
        Ok(builder)
    }

    /// Build a logger. Fails on the first configuration fault.
    pub fn build(&self, registry: &Registry) -> LogweaveResult<Logger> {
        Ok(self.configuration(registry)?.create_logger())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::error::ComponentKind;
    use crate::sink::MemorySink;
    use serde_json::json;

    fn registry_with_memory(memory: &MemorySink) -> Registry {
        let mut registry = Registry::with_defaults();
        registry.add_sink("Memory", Arc::new(memory.clone()));
        registry
    }

    fn config(value: serde_json::Value) -> LoggerConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_switch_controls_minimum_level() {
        let memory = MemorySink::new();
        let logger = config(json!({
            "LevelSwitches": { "$controlSwitch": "Error" },
            "MinimumLevel": { "Default": "Information", "ControlledBy": "$controlSwitch" },
            "WriteTo": ["Memory"]
        }))
        .build(&registry_with_memory(&memory))
        .unwrap();

        logger.debug("hidden", args![]);
        logger
            .level_switch("$controlSwitch")
            .unwrap()
            .set_minimum_level(Level::Verbose);
        logger.debug("shown", args![]);
        assert_eq!(memory.messages(), vec!["shown"]);
    }

    #[test]
    fn test_overrides_and_properties() {
        let memory = MemorySink::new();
        let logger = config(json!({
            "MinimumLevel": { "Default": "Debug", "Override": { "Microsoft": "Warning" } },
            "Properties": { "Application": "Demo" },
            "WriteTo": ["Memory"]
        }))
        .build(&registry_with_memory(&memory))
        .unwrap();

        logger.for_context("Microsoft.Hosting").information("dropped", args![]);
        logger.for_context("MyApp").debug("kept", args![]);
        let events = memory.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].property("Application").unwrap().as_str(), Some("Demo"));
    }

    #[test]
    fn test_sink_level_switch_wins_over_restriction() {
        let memory = MemorySink::new();
        let logger = config(json!({
            "MinimumLevel": "Verbose",
            "LevelSwitches": { "$sinkSwitch": "Debug" },
            "WriteTo": [{ "Name": "Memory", "Args": { "restrictedToMinimumLevel": "Fatal", "levelSwitch": "$sinkSwitch" } }]
        }))
        .build(&registry_with_memory(&memory))
        .unwrap();
        logger.debug("d", args![]);
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_destructure_limits_applied() {
        let memory = MemorySink::new();
        let logger = config(json!({
            "Destructure": [
                { "Name": "ToMaximumStringLength", "Args": { "maximumStringLength": 4 } },
                { "Name": "ToMaximumDepth", "Args": { "maximumDestructuringDepth": 2 } }
            ],
            "WriteTo": ["Memory"]
        }))
        .build(&registry_with_memory(&memory))
        .unwrap();
        let limits = logger.pipeline().destructurer().limits();
        assert_eq!(limits.max_string_length, Some(4));
        assert_eq!(limits.max_depth, 2);
    }

    #[test]
    fn test_fail_fast_errors() {
        let registry = Registry::with_defaults();
        let cases = vec![
            (json!({ "WriteTo": ["Seq"] }), "Unknown sink 'Seq'"),
            (json!({ "Enrich": ["WithColour"] }), "Unknown enricher 'WithColour'"),
            (json!({ "MinimumLevel": "Loud" }), "Invalid level 'Loud'"),
            (json!({ "MinimumLevel": "$missing" }), "Unknown switch '$missing'"),
            (
                json!({ "Filter": [{ "Name": "ControlledBy", "Args": { "switch": "$nope" } }] }),
                "Unknown switch '$nope'",
            ),
        ];
        for (doc, expected) in cases {
            let err = config(doc.clone()).build(&registry).err().unwrap();
            assert_eq!(err.to_string(), expected, "for {}", doc);
            assert!(err.is_configuration_fault());
        }

        let err = config(json!({
            "Filter": [{ "Name": "ByExcluding", "Args": { "expression": "A = " } }]
        }))
        .build(&registry)
        .err()
        .unwrap();
        assert!(matches!(err, LogweaveError::Expression { .. }));

        let err = config(json!({ "Destructure": [{ "Name": "With", "Args": { "policy": "Missing" } }] }))
            .build(&registry)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LogweaveError::UnknownComponent {
                kind: ComponentKind::Policy,
                ..
            }
        ));
    }

    #[test]
    fn test_nested_logger_sees_parent_switches() {
        let memory = MemorySink::new();
        let logger = config(json!({
            "MinimumLevel": "Verbose",
            "LevelSwitches": { "$inner": "Warning" },
            "WriteTo": [{
                "Name": "Logger",
                "Args": { "configureLogger": {
                    "MinimumLevel": { "ControlledBy": "$inner" },
                    "WriteTo": ["Memory"]
                } }
            }]
        }))
        .build(&registry_with_memory(&memory))
        .unwrap();

        logger.information("filtered by inner", args![]);
        logger.warning("passes", args![]);
        assert_eq!(memory.messages(), vec!["passes"]);
    }

    #[test]
    fn test_switch_names_with_or_without_dollar() {
        let registry = Registry::with_defaults();
        let ctx = BuildContext::new(&registry);
        ctx.declare_switches(&config(json!({ "LevelSwitches": { "$a": "Debug" } })))
            .unwrap();
        assert!(ctx.level_switch("a").is_ok());
        assert!(ctx.level_switch("$a").is_ok());
        assert!(matches!(ctx.gate("Warning").unwrap(), LevelGate::Static(Level::Warning)));
    }

    #[test]
    fn test_logger_switch_lookup_ignores_dollar() {
        let logger = config(json!({
            "LevelSwitches": { "$control": "Debug", "bare": "Error" },
            "FilterSwitches": { "$only": "A = 1" }
        }))
        .build(&Registry::with_defaults())
        .unwrap();

        let prefixed = logger.level_switch("$control").unwrap();
        let plain = logger.level_switch("control").unwrap();
        assert!(prefixed.same_switch(plain));
        plain.set_minimum_level(Level::Fatal);
        assert_eq!(prefixed.minimum_level(), Level::Fatal);

        assert!(logger.level_switch("$bare").is_some());
        assert!(logger.level_switch("bare").is_some());
        assert!(logger.filter_switch("only").is_some());
        assert!(logger.filter_switch("$only").is_some());
        assert!(logger.level_switch("$missing").is_none());
    }

    #[test]
    fn test_nested_logger_cannot_redeclare_switch() {
        let memory = MemorySink::new();
        let err = config(json!({
            "LevelSwitches": { "$control": "Verbose" },
            "MinimumLevel": { "ControlledBy": "$control" },
            "WriteTo": [{
                "Name": "Logger",
                "Args": { "configureLogger": {
                    "LevelSwitches": { "control": "Error" },
                    "WriteTo": ["Memory"]
                } }
            }]
        }))
        .build(&registry_with_memory(&memory))
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "Switch 'control' is already declared");
        assert!(err.is_configuration_fault());

        let err = config(json!({
            "FilterSwitches": { "$f": "A = 1", "f": "A = 2" }
        }))
        .build(&Registry::with_defaults())
        .err()
        .unwrap();
        assert!(matches!(err, LogweaveError::DuplicateSwitch(_)));
    }
}
