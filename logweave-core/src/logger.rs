//! The application-facing logger.
//!
//! A [`Logger`] is a cheap handle: cloning it, or deriving a child with
//! [`Logger::for_context`], shares the same pipeline and switches.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::capture::Arg;
use crate::event::LogEvent;
use crate::filter::FilterSwitch;
use crate::level::{Level, LevelSwitch};
use crate::pipeline::{Pipeline, SOURCE_CONTEXT_PROPERTY};
use crate::value::Value;

/// Named switches declared while building, reachable at runtime.
#[derive(Debug, Clone, Default)]
pub struct Switches {
    pub levels: BTreeMap<String, LevelSwitch>,
    pub filters: BTreeMap<String, FilterSwitch>,
}

/// `$name` and `name` refer to the same declared switch.
pub(crate) fn find_switch<'a, V>(map: &'a BTreeMap<String, V>, name: &str) -> Option<&'a V> {
    map.get(name)
        .or_else(|| map.get(&format!("${}", name)))
        .or_else(|| name.strip_prefix('$').and_then(|bare| map.get(bare)))
}

impl Switches {
    pub fn level(&self, name: &str) -> Option<&LevelSwitch> {
        find_switch(&self.levels, name)
    }

    pub fn filter(&self, name: &str) -> Option<&FilterSwitch> {
        find_switch(&self.filters, name)
    }
}

#[derive(Clone)]
pub struct Logger {
    pipeline: Arc<Pipeline>,
    switches: Arc<Switches>,
    source_context: Option<Arc<str>>,
    properties: Arc<[(String, Value)]>,
}

impl Logger {
    pub(crate) fn new(pipeline: Pipeline, switches: Switches) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            switches: Arc::new(switches),
            source_context: None,
            properties: Arc::from(Vec::new()),
        }
    }

    /// Child logger tagged with `SourceContext = source`.
    ///
    /// Minimum-level overrides are matched against this name.
    pub fn for_context(&self, source: &str) -> Self {
        Self {
            source_context: Some(Arc::from(source)),
            ..self.clone()
        }
    }

    /// Child logger that attaches an extra property to every event.
    pub fn with_property(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut properties: Vec<(String, Value)> = self.properties.to_vec();
        let name = name.into();
        properties.retain(|(n, _)| *n != name);
        properties.push((name, value.into()));
        Self {
            properties: properties.into(),
            ..self.clone()
        }
    }

    pub fn source_context(&self) -> Option<&str> {
        self.source_context.as_deref()
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.pipeline.is_enabled(level, self.source_context())
    }

    /// Emit an event. Never fails and never panics because of a sink.
    pub fn write(&self, level: Level, template: &str, args: Vec<Arg>) {
        self.emit(level, None, template, args);
    }

    pub fn write_error<E>(&self, level: Level, error: E, template: &str, args: Vec<Arg>)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.emit(level, Some(Arc::new(error)), template, args);
    }

    fn emit(
        &self,
        level: Level,
        error: Option<Arc<dyn StdError + Send + Sync>>,
        template: &str,
        args: Vec<Arg>,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let parsed = self.pipeline.templates().get_or_parse(template);
        let mut event = LogEvent::new(level, parsed, args);
        if let Some(error) = error {
            event = event.with_error(error);
        }
        if let Some(source) = &self.source_context {
            event.add_or_update_property(SOURCE_CONTEXT_PROPERTY, source.as_ref());
        }
        for (name, value) in self.properties.iter() {
            event.add_or_update_property(name.clone(), value.clone());
        }
        self.pipeline.process_admitted(event);
    }

    pub fn verbose(&self, template: &str, args: Vec<Arg>) {
        self.write(Level::Verbose, template, args);
    }

    pub fn debug(&self, template: &str, args: Vec<Arg>) {
        self.write(Level::Debug, template, args);
    }

    pub fn information(&self, template: &str, args: Vec<Arg>) {
        self.write(Level::Information, template, args);
    }

    pub fn warning(&self, template: &str, args: Vec<Arg>) {
        self.write(Level::Warning, template, args);
    }

    pub fn error(&self, template: &str, args: Vec<Arg>) {
        self.write(Level::Error, template, args);
    }

    pub fn fatal(&self, template: &str, args: Vec<Arg>) {
        self.write(Level::Fatal, template, args);
    }

    /// A level switch declared under `name`; the leading `$` is optional.
    pub fn level_switch(&self, name: &str) -> Option<&LevelSwitch> {
        self.switches.level(name)
    }

    pub fn filter_switch(&self, name: &str) -> Option<&FilterSwitch> {
        self.switches.filter(name)
    }

    pub fn switches(&self) -> &Switches {
        &self.switches
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Flush every sink, including nested and buffered ones.
    pub fn flush(&self) {
        self.pipeline.flush();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("source_context", &self.source_context)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
