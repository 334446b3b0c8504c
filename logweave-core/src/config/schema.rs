//! Serde schema for logger configuration documents.
//!
//! Keys follow the host-configuration convention (PascalCase sections,
//! camelCase component arguments). Argument names are matched
//! case-insensitively.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{LogweaveError, LogweaveResult};
use crate::level::Level;
use crate::value::{Property, Value};

/// Root of a configuration document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggerConfig {
    /// `"Debug"` or `{ Default, ControlledBy, Override }`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_level: Option<MinimumLevelConfig>,

    /// Declared level switches: name → initial level
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub level_switches: BTreeMap<String, String>,

    /// Declared filter switches: name → expression
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filter_switches: BTreeMap<String, String>,

    /// Fixed properties, applied before `Enrich`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enrich: Vec<ComponentConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destructure: Vec<ComponentConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<ComponentConfig>,

    #[serde(default)]
    pub write_to: ComponentList,

    /// Anything else. `WriteTo:<Label>` keys are treated as extra sinks;
    /// other keys (`Using`, ...) are ignored.
    #[serde(flatten, skip_serializing)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl LoggerConfig {
    pub fn from_toml_str(text: &str) -> LogweaveResult<Self> {
        toml::from_str(text).map_err(|e| LogweaveError::config("<toml>", e.to_string()))
    }

    /// Accepts either the bare document or one wrapped in a `Serilog` section.
    pub fn from_json_str(text: &str) -> LogweaveResult<Self> {
        let mut doc: JsonValue =
            serde_json::from_str(text).map_err(|e| LogweaveError::config("<json>", e.to_string()))?;
        if let Some(section) = doc.get_mut("Serilog") {
            doc = section.take();
        }
        serde_json::from_value(doc).map_err(|e| LogweaveError::config("<json>", e.to_string()))
    }

    /// Sink entries: `WriteTo` first, then `WriteTo:<Label>` sections.
    pub fn sinks(&self) -> LogweaveResult<Vec<ComponentConfig>> {
        let mut sinks: Vec<ComponentConfig> = self.write_to.entries().into_iter().cloned().collect();
        for (key, value) in &self.extra {
            if key.starts_with("WriteTo:") {
                let component: ComponentConfig = serde_json::from_value(value.clone())
                    .map_err(|e| LogweaveError::invalid_argument(key.as_str(), e.to_string()))?;
                sinks.push(component);
            }
        }
        Ok(sinks)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MinimumLevelConfig {
    Level(String),
    Detailed {
        #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        /// Name of a declared level switch
        #[serde(rename = "ControlledBy", default, skip_serializing_if = "Option::is_none")]
        controlled_by: Option<String>,
        /// Source prefix → level or switch name
        #[serde(rename = "Override", default, skip_serializing_if = "BTreeMap::is_empty")]
        overrides: BTreeMap<String, String>,
    },
}

/// `WriteTo` as a list, or as a map of labelled entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ComponentList {
    List(Vec<ComponentConfig>),
    Labelled(BTreeMap<String, ComponentConfig>),
}

impl Default for ComponentList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ComponentList {
    pub fn entries(&self) -> Vec<&ComponentConfig> {
        match self {
            Self::List(list) => list.iter().collect(),
            Self::Labelled(map) => map.values().collect(),
        }
    }
}

/// One component: `"WithThreadId"` or `{ Name = "Console", Args = { ... } }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ComponentConfig {
    Name(String),
    Detailed {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Args", default)]
        args: Map<String, JsonValue>,
    },
}

impl ComponentConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn with_args(name: impl Into<String>, args: JsonValue) -> Self {
        let args = match args {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        Self::Detailed {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed { name, .. } => name,
        }
    }

    pub fn args(&self) -> ComponentArgs<'_> {
        static EMPTY: std::sync::OnceLock<Map<String, JsonValue>> = std::sync::OnceLock::new();
        match self {
            Self::Name(name) => ComponentArgs {
                component: name,
                map: EMPTY.get_or_init(Map::new),
            },
            Self::Detailed { name, args } => ComponentArgs {
                component: name,
                map: args,
            },
        }
    }
}

/// Typed, case-insensitive access to a component's arguments.
#[derive(Debug, Clone, Copy)]
pub struct ComponentArgs<'a> {
    component: &'a str,
    map: &'a Map<String, JsonValue>,
}

impl<'a> ComponentArgs<'a> {
    pub fn component(&self) -> &'a str {
        self.component
    }

    pub fn get(&self, key: &str) -> Option<&'a JsonValue> {
        self.map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    fn invalid(&self, message: String) -> LogweaveError {
        LogweaveError::invalid_argument(self.component, message)
    }

    pub fn str(&self, key: &str) -> LogweaveResult<Option<&'a str>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(format!("'{}' must be a string, got {}", key, other))),
        }
    }

    pub fn required_str(&self, key: &str) -> LogweaveResult<&'a str> {
        self.str(key)?
            .ok_or_else(|| self.invalid(format!("missing required argument '{}'", key)))
    }

    pub fn usize(&self, key: &str) -> LogweaveResult<Option<usize>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(format!("'{}' must be a non-negative integer", key))),
            Some(JsonValue::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(format!("'{}' must be a non-negative integer", key))),
            Some(other) => Err(self.invalid(format!("'{}' must be an integer, got {}", key, other))),
        }
    }

    pub fn required_usize(&self, key: &str) -> LogweaveResult<usize> {
        self.usize(key)?
            .ok_or_else(|| self.invalid(format!("missing required argument '{}'", key)))
    }

    pub fn bool(&self, key: &str) -> LogweaveResult<Option<bool>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Bool(b)) => Ok(Some(*b)),
            Some(JsonValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(self.invalid(format!("'{}' must be a boolean", key))),
            },
            Some(other) => Err(self.invalid(format!("'{}' must be a boolean, got {}", key, other))),
        }
    }

    pub fn level(&self, key: &str) -> LogweaveResult<Option<Level>> {
        self.str(key)?.map(str::parse).transpose()
    }

    /// String or list of strings.
    pub fn strings(&self, key: &str) -> LogweaveResult<Vec<String>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::String(s)) => Ok(vec![s.clone()]),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| match item {
                    JsonValue::String(s) => Ok(s.clone()),
                    other => Err(self.invalid(format!("'{}' entries must be strings, got {}", key, other))),
                })
                .collect(),
            Some(other) => Err(self.invalid(format!("'{}' must be a list of strings, got {}", key, other))),
        }
    }

    /// Nested component list (`configureEnricher`, `configureSink`, ...).
    pub fn components(&self, key: &str) -> LogweaveResult<Vec<ComponentConfig>> {
        let Some(raw) = self.get(key) else {
            return Ok(Vec::new());
        };
        let list = match raw {
            JsonValue::Array(_) => raw.clone(),
            single => JsonValue::Array(vec![single.clone()]),
        };
        serde_json::from_value(list).map_err(|e| self.invalid(format!("'{}': {}", key, e)))
    }

    /// Nested logger document (`configureLogger`).
    pub fn logger_config(&self, key: &str) -> LogweaveResult<LoggerConfig> {
        let raw = self
            .get(key)
            .ok_or_else(|| self.invalid(format!("missing required argument '{}'", key)))?;
        serde_json::from_value(raw.clone()).map_err(|e| self.invalid(format!("'{}': {}", key, e)))
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.get(key).map(json_to_value)
    }
}

/// Convert a configuration value into a property value.
pub fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::null(),
        JsonValue::Bool(b) => Value::from(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::from(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::string(s.as_str()),
        JsonValue::Array(items) => Value::sequence(items.iter().map(json_to_value).collect()),
        JsonValue::Object(map) => Value::structure(
            None,
            map.iter()
                .map(|(k, v)| Property::new(k.as_str(), json_to_value(v)))
                .collect(),
        ),
    }
}
