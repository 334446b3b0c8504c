//! The loggable value model.
//!
//! Every property attached to a [`LogEvent`](crate::LogEvent) is a [`Value`]:
//! a scalar, a sequence, a mapping or a type-tagged structure. Values are
//! produced by the [`Destructurer`](crate::capture::Destructurer), which
//! enforces depth, string-length and collection-count caps, so a `Value`
//! handed to a sink is always bounded.
//!
//! Rendering follows the conventions the output templates expect:
//!
//! ```text
//! "text"                       string scalar (unquoted with the `l` format)
//! [1, 2, … 3 more]             sequence with an omitted-count marker
//! {["a"]=1, ["b"]=2}           mapping
//! Person { Name: "Bill" }      structure with a type tag
//! ```

use std::fmt::{self, Write as _};

use chrono::{DateTime, FixedOffset};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Marker appended to truncated strings and collections.
pub const TRUNCATION_MARKER: &str = "…";

/// A primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Char(char),
    Str(String),
    Timestamp(DateTime<FixedOffset>),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used for comparisons; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::I64(n) => Some(*n as f64),
            Self::U64(n) => Some(*n as f64),
            Self::F64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn render(&self, out: &mut String, literal: bool) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(b) => {
                let _ = write!(out, "{}", b);
            }
            Self::I64(n) => {
                let _ = write!(out, "{}", n);
            }
            Self::U64(n) => {
                let _ = write!(out, "{}", n);
            }
            Self::F64(n) => {
                let _ = write!(out, "{}", n);
            }
            Self::Char(c) if literal => out.push(*c),
            Self::Char(c) => {
                out.push('\'');
                out.push(*c);
                out.push('\'');
            }
            Self::Str(s) if literal => out.push_str(s),
            Self::Str(s) => {
                out.push('"');
                for ch in s.chars() {
                    if ch == '"' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('"');
            }
            Self::Timestamp(ts) => {
                let _ = write!(out, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f%:z"));
            }
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::I64(n) => serializer.serialize_i64(*n),
            Self::U64(n) => serializer.serialize_u64(*n),
            Self::F64(n) => serializer.serialize_f64(*n),
            Self::Char(c) => serializer.serialize_char(*c),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Timestamp(ts) => serializer.serialize_str(&ts.to_rfc3339()),
        }
    }
}

/// A named member of a [`Value::Structure`].
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A structured, bounded log property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    /// Ordered elements; `omitted` counts elements dropped by the count cap.
    Sequence { items: Vec<Value>, omitted: usize },
    /// Ordered key/value pairs; `omitted` counts entries dropped by the count cap.
    Mapping {
        entries: Vec<(Value, Value)>,
        omitted: usize,
    },
    /// Named properties with an optional type tag.
    Structure {
        type_tag: Option<String>,
        properties: Vec<Property>,
    },
}

impl Value {
    pub fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Str(s.into()))
    }

    pub fn sequence(items: Vec<Value>) -> Self {
        Self::Sequence { items, omitted: 0 }
    }

    pub fn mapping(entries: Vec<(Value, Value)>) -> Self {
        Self::Mapping {
            entries,
            omitted: 0,
        }
    }

    pub fn structure(type_tag: Option<&str>, properties: Vec<Property>) -> Self {
        Self::Structure {
            type_tag: type_tag.map(str::to_string),
            properties,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Container nesting depth: scalars are 0, each enclosing container adds 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Scalar(_) => 0,
            Self::Sequence { items, .. } => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Self::Mapping { entries, .. } => {
                1 + entries
                    .iter()
                    .map(|(k, v)| k.depth().max(v.depth()))
                    .max()
                    .unwrap_or(0)
            }
            Self::Structure { properties, .. } => {
                1 + properties
                    .iter()
                    .map(|p| p.value.depth())
                    .max()
                    .unwrap_or(0)
            }
        }
    }

    /// Look up a member by name: structure property or string-keyed mapping entry.
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Structure { properties, .. } => properties
                .iter()
                .find(|p| p.name == name)
                .map(|p| &p.value),
            Self::Mapping { entries, .. } => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(name))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Render into `out`. `literal` drops quotes from a top-level string.
    pub fn render(&self, out: &mut String, literal: bool) {
        match self {
            Self::Scalar(s) => s.render(out, literal),
            Self::Sequence { items, omitted } => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(out, false);
                }
                write_omitted(out, *omitted, !items.is_empty());
                out.push(']');
            }
            Self::Mapping { entries, omitted } => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('[');
                    key.render(out, false);
                    out.push_str("]=");
                    value.render(out, false);
                }
                write_omitted(out, *omitted, !entries.is_empty());
                out.push('}');
            }
            Self::Structure {
                type_tag,
                properties,
            } => {
                if let Some(tag) = type_tag {
                    out.push_str(tag);
                    out.push(' ');
                }
                out.push_str("{ ");
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&prop.name);
                    out.push_str(": ");
                    prop.value.render(out, false);
                }
                if !properties.is_empty() {
                    out.push(' ');
                }
                out.push('}');
            }
        }
    }

    /// Render as a string; see [`Value::render`].
    pub fn to_rendered(&self, literal: bool) -> String {
        let mut out = String::new();
        self.render(&mut out, literal);
        out
    }

    /// Render as JSON. Falls back to the plain rendering if serialization fails.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_rendered(false))
    }
}

fn write_omitted(out: &mut String, omitted: usize, has_items: bool) {
    if omitted == 0 {
        return;
    }
    if has_items {
        out.push_str(", ");
    }
    let _ = write!(out, "{} {} more", TRUNCATION_MARKER, omitted);
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rendered(false))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(s) => s.serialize(serializer),
            Self::Sequence { items, .. } => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping { entries, .. } => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    match key {
                        Value::Scalar(Scalar::Str(s)) => map.serialize_entry(s, value)?,
                        other => map.serialize_entry(&other.to_rendered(true), value)?,
                    }
                }
                map.end()
            }
            Self::Structure {
                type_tag,
                properties,
            } => {
                let len = properties.len() + usize::from(type_tag.is_some());
                let mut map = serializer.serialize_map(Some(len))?;
                if let Some(tag) = type_tag {
                    map.serialize_entry("$type", tag)?;
                }
                for prop in properties {
                    map.serialize_entry(&prop.name, &prop.value)?;
                }
                map.end()
            }
        }
    }
}

macro_rules! scalar_from {
    ($($t:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant(<$conv>::from(v))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool as bool,
    i8 => I64 as i64,
    i16 => I64 as i64,
    i32 => I64 as i64,
    i64 => I64 as i64,
    u8 => U64 as u64,
    u16 => U64 as u64,
    u32 => U64 as u64,
    u64 => U64 as u64,
    f32 => F64 as f64,
    f64 => F64 as f64,
    char => Char as char,
    String => Str as String,
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<usize> for Scalar {
    fn from(v: usize) -> Self {
        Scalar::U64(v as u64)
    }
}

impl From<isize> for Scalar {
    fn from(v: isize) -> Self {
        Scalar::I64(v as i64)
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Scalar {
    fn from(v: DateTime<Tz>) -> Self {
        Scalar::Timestamp(v.fixed_offset())
    }
}

macro_rules! value_from_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

value_from_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, char, String, &str, usize, isize);

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Value::Scalar(v)
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::Scalar(Scalar::from(v))
    }
}
