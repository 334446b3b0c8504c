//! The log event and its property set.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};

use crate::capture::{Arg, Destructurer};
use crate::level::Level;
use crate::template::{MessageStyle, MessageTemplate};
use crate::value::Value;

/// Error attached to an event.
pub type EventError = Arc<dyn StdError + Send + Sync>;

/// Insertion-ordered property map.
///
/// Lookups are linear; events carry a handful of properties and order
/// matters for rendering `{Properties}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, Value)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add or overwrite; an overwritten property keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Add only if no property of that name exists. Returns whether it was added.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Replace every value with `f(name, value)`, keeping order.
    pub fn map_values(&mut self, mut f: impl FnMut(&str, Value) -> Value) {
        for (name, value) in &mut self.entries {
            let taken = std::mem::replace(value, Value::null());
            *value = f(name, taken);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

/// One emission: created at the call site, discarded once every sink has
/// seen it.
#[derive(Clone)]
pub struct LogEvent {
    timestamp: DateTime<FixedOffset>,
    level: Level,
    template: Arc<MessageTemplate>,
    args: Arc<[Arg]>,
    properties: Properties,
    error: Option<EventError>,
    /// Set once arguments are captured; nested pipelines keep the parent's values.
    bound: bool,
}

impl LogEvent {
    pub fn new(level: Level, template: Arc<MessageTemplate>, args: Vec<Arg>) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            level,
            template,
            args: args.into(),
            properties: Properties::new(),
            error: None,
            bound: false,
        }
    }

    /// Convenience for tests and ad-hoc events: parses `template` directly.
    pub fn from_template(level: Level, template: &str, args: Vec<Arg>) -> Self {
        Self::new(level, Arc::new(MessageTemplate::parse(template)), args)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_error(mut self, error: EventError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn template(&self) -> &MessageTemplate {
        &self.template
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn error(&self) -> Option<&EventError> {
        self.error.as_ref()
    }

    pub fn add_or_update_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name, value);
    }

    pub fn add_property_if_absent(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert_if_absent(name, value);
    }

    /// Look a name up the way filters see it: properties first, then the
    /// raw argument bound to a template hole of that name, uncapped.
    pub fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        if let Some(v) = self.properties.get(name) {
            return Some(Cow::Borrowed(v));
        }
        let (bindings, _) = self.template.bind(&self.args);
        bindings
            .into_iter()
            .find(|b| b.name == name)
            .map(|b| Cow::Owned(Destructurer::default().capture(b.arg, b.hint)))
    }

    /// Capture every bound argument into a property, overwriting.
    /// Only the first call has any effect.
    ///
    /// Returns the number of arguments with no hole to bind to.
    pub fn bind_arguments(&mut self, destructurer: &Destructurer) -> usize {
        if self.bound {
            return 0;
        }
        self.bound = true;
        let template = Arc::clone(&self.template);
        let args = Arc::clone(&self.args);
        let (bindings, surplus) = template.bind(&args);
        for binding in bindings {
            let value = destructurer.capture(binding.arg, binding.hint);
            self.properties.insert(binding.name, value);
        }
        surplus
    }

    /// The message with string values unquoted.
    pub fn render_message(&self) -> String {
        self.template.render(
            &self.properties,
            MessageStyle {
                literal: true,
                json: false,
            },
        )
    }

    pub fn render_message_with(&self, style: MessageStyle) -> String {
        self.template.render(&self.properties, style)
    }
}

impl fmt::Debug for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEvent")
            .field("timestamp", &self.timestamp)
            .field("level", &self.level)
            .field("template", &self.template.text())
            .field("args", &self.args)
            .field("properties", &self.properties)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}
