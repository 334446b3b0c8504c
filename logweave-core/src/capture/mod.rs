//! Destructuring: turning call-site arguments into bounded [`Value`]s.
//!
//! # Data Flow
//! ```text
//! Arg::Scalar ──────────────────────────────→ Scalar (string cap applied)
//! Arg::Object ─→ policies (registration order, first match wins)
//!                  └─ no match ─→ structural capture via `Serialize`
//!                                   (depth / string / count caps)
//! ```
//!
//! Capture never fails. A `Serialize` impl that errors or panics yields a
//! string placeholder instead, so logging can never take the caller down.

mod policy;
mod serializer;

pub use policy::{DestructuringPolicy, MaskPropertiesPolicy, TypedPolicy};
pub use serializer::{CaptureError, ValueSerializer};

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use crate::value::{Property, Scalar, Value, TRUNCATION_MARKER};

/// Default maximum container depth.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// How a template hole asks for its argument to be captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureHint {
    /// `{name}`: scalars as-is, objects destructured.
    #[default]
    Default,
    /// `{@name}`: destructure.
    Destructure,
    /// `{$name}`: render to a string scalar.
    Stringify,
}

/// A type that can be captured as structured data.
///
/// Implemented for every `Serialize + Send + Sync + 'static` type; the
/// `as_any` hook lets [`TypedPolicy`] recognize concrete types.
pub trait Capture: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Short type name (no module path, no generics).
    fn type_name(&self) -> &'static str;

    /// Structural capture through [`ValueSerializer`].
    fn capture_with(&self, serializer: ValueSerializer<'_>) -> Result<Value, CaptureError>;
}

impl<T: Serialize + Send + Sync + 'static> Capture for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<T>())
    }

    fn capture_with(&self, serializer: ValueSerializer<'_>) -> Result<Value, CaptureError> {
        self.serialize(serializer)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A raw argument supplied at the log call site.
#[derive(Clone)]
pub enum Arg {
    Scalar(Scalar),
    Object(Arc<dyn Capture>),
}

impl Arg {
    /// Wrap a structured value for capture.
    pub fn capture<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    /// Pre-render a value with its `Display` impl.
    pub fn display(value: impl fmt::Display) -> Self {
        Self::Scalar(Scalar::Str(value.to_string()))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Object(_) => None,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            Self::Object(o) => f.debug_tuple("Object").field(&o.type_name()).finish(),
        }
    }
}

macro_rules! arg_from_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Arg::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

arg_from_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, char, String, &str, usize, isize);

impl From<Scalar> for Arg {
    fn from(v: Scalar) -> Self {
        Arg::Scalar(v)
    }
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for Arg {
    fn from(v: chrono::DateTime<Tz>) -> Self {
        Arg::Scalar(Scalar::from(v))
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Arg::Scalar(Scalar::Null))
    }
}

/// Caps applied while destructuring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestructuringLimits {
    /// Maximum container nesting; deeper containers become placeholders.
    pub max_depth: usize,
    /// Maximum string length in characters; `None` is unbounded.
    pub max_string_length: Option<usize>,
    /// Maximum sequence/mapping entries; `None` is unbounded.
    pub max_collection_count: Option<usize>,
}

impl Default for DestructuringLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_string_length: None,
            max_collection_count: None,
        }
    }
}

impl DestructuringLimits {
    /// Truncate to the string cap, appending [`TRUNCATION_MARKER`].
    pub fn truncate(&self, s: &str) -> String {
        match self.max_string_length {
            Some(max) if s.chars().count() > max => {
                let mut out: String = s.chars().take(max).collect();
                out.push_str(TRUNCATION_MARKER);
                out
            }
            _ => s.to_string(),
        }
    }

    pub(crate) fn collection_full(&self, len: usize) -> bool {
        self.max_collection_count.is_some_and(|max| len >= max)
    }

    /// Re-apply every cap to an already-built value.
    ///
    /// Used on policy output, which is built outside the serializer.
    pub fn clamp(&self, value: Value) -> Value {
        self.clamp_at(value, 0)
    }

    fn clamp_at(&self, value: Value, depth: usize) -> Value {
        match value {
            Value::Scalar(Scalar::Str(s)) => Value::Scalar(Scalar::Str(self.truncate(&s))),
            Value::Scalar(s) => Value::Scalar(s),
            Value::Structure { type_tag, .. } if depth >= self.max_depth => match type_tag {
                Some(tag) => Value::string(tag),
                None => Value::null(),
            },
            Value::Sequence { .. } | Value::Mapping { .. } if depth >= self.max_depth => {
                Value::null()
            }
            Value::Sequence { items, omitted } => {
                let keep = self.max_collection_count.unwrap_or(usize::MAX);
                let dropped = items.len().saturating_sub(keep);
                Value::Sequence {
                    items: items
                        .into_iter()
                        .take(keep)
                        .map(|v| self.clamp_at(v, depth + 1))
                        .collect(),
                    omitted: omitted + dropped,
                }
            }
            Value::Mapping { entries, omitted } => {
                let keep = self.max_collection_count.unwrap_or(usize::MAX);
                let dropped = entries.len().saturating_sub(keep);
                Value::Mapping {
                    entries: entries
                        .into_iter()
                        .take(keep)
                        .map(|(k, v)| (self.clamp_at(k, depth + 1), self.clamp_at(v, depth + 1)))
                        .collect(),
                    omitted: omitted + dropped,
                }
            }
            Value::Structure {
                type_tag,
                properties,
            } => Value::Structure {
                type_tag,
                properties: properties
                    .into_iter()
                    .map(|p| Property {
                        name: p.name,
                        value: self.clamp_at(p.value, depth + 1),
                    })
                    .collect(),
            },
        }
    }
}

/// The destructuring engine: limits plus the ordered policy list.
#[derive(Clone, Default)]
pub struct Destructurer {
    limits: DestructuringLimits,
    policies: Vec<Arc<dyn DestructuringPolicy>>,
}

impl fmt::Debug for Destructurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destructurer")
            .field("limits", &self.limits)
            .field("policies", &self.policies.len())
            .finish()
    }
}

impl Destructurer {
    pub fn new(limits: DestructuringLimits, policies: Vec<Arc<dyn DestructuringPolicy>>) -> Self {
        Self { limits, policies }
    }

    pub fn limits(&self) -> &DestructuringLimits {
        &self.limits
    }

    /// Capture a call-site argument according to its template hint.
    pub fn capture(&self, arg: &Arg, hint: CaptureHint) -> Value {
        match (arg, hint) {
            (Arg::Scalar(s), CaptureHint::Stringify) => {
                Value::string(self.limits.truncate(&Value::Scalar(s.clone()).to_rendered(true)))
            }
            (Arg::Scalar(s), _) => self.scalar(s.clone()),
            (Arg::Object(obj), CaptureHint::Stringify) => {
                let rendered = self.destructure(obj.as_ref()).to_rendered(true);
                Value::string(self.limits.truncate(&rendered))
            }
            (Arg::Object(obj), _) => self.destructure(obj.as_ref()),
        }
    }

    /// Scalar with the string cap applied. Policies are never consulted.
    pub fn scalar(&self, s: Scalar) -> Value {
        match s {
            Scalar::Str(text) => Value::Scalar(Scalar::Str(self.limits.truncate(&text))),
            other => Value::Scalar(other),
        }
    }

    /// Policies first, then structural capture.
    pub fn destructure(&self, value: &dyn Capture) -> Value {
        for policy in &self.policies {
            let attempt = catch_unwind(AssertUnwindSafe(|| policy.try_destructure(value, self)));
            match attempt {
                Ok(Some(result)) => return self.limits.clamp(result),
                Ok(None) => continue,
                Err(_) => {
                    tracing::warn!(type_name = value.type_name(), "destructuring policy panicked");
                    return serializer::unreadable(value.type_name(), &"policy panicked");
                }
            }
        }
        self.structural(value)
    }

    /// Default structural capture, bypassing policies.
    pub fn structural(&self, value: &dyn Capture) -> Value {
        let serializer = ValueSerializer::new(&self.limits, 0);
        match catch_unwind(AssertUnwindSafe(|| value.capture_with(serializer))) {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => serializer::unreadable(value.type_name(), &e),
            Err(_) => serializer::unreadable(value.type_name(), &"serializer panicked"),
        }
    }

    /// Capture a member one level below the top, for policies assembling
    /// their own structures.
    pub fn nested<T: Serialize + ?Sized>(&self, value: &T) -> Value {
        value
            .serialize(ValueSerializer::new(&self.limits, 1))
            .unwrap_or_else(|e| serializer::unreadable("member", &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Level5 {
        five: &'static str,
    }
    #[derive(Serialize)]
    struct Level4 {
        four: Level5,
    }
    #[derive(Serialize)]
    struct Level3 {
        three: Level4,
    }
    #[derive(Serialize)]
    struct Level2 {
        two: Level3,
    }
    #[derive(Serialize)]
    struct FiveDeep {
        five_deep: Level2,
    }

    fn five_deep() -> FiveDeep {
        FiveDeep {
            five_deep: Level2 {
                two: Level3 {
                    three: Level4 {
                        four: Level5 { five: "the end" },
                    },
                },
            },
        }
    }

    fn with_limits(limits: DestructuringLimits) -> Destructurer {
        Destructurer::new(limits, Vec::new())
    }

    #[test]
    fn test_depth_cap_never_exceeded() {
        for max_depth in 0..7 {
            let d = with_limits(DestructuringLimits {
                max_depth,
                ..DestructuringLimits::default()
            });
            let v = d.capture(&Arg::capture(five_deep()), CaptureHint::Destructure);
            assert!(
                v.depth() <= max_depth,
                "depth {} exceeds cap {} in {}",
                v.depth(),
                max_depth,
                v
            );
        }
    }

    #[test]
    fn test_depth_cap_placeholder_is_type_name() {
        let d = with_limits(DestructuringLimits {
            max_depth: 3,
            ..DestructuringLimits::default()
        });
        let v = d.capture(&Arg::capture(five_deep()), CaptureHint::Destructure);
        assert_eq!(
            v.to_string(),
            "FiveDeep { five_deep: Level2 { two: Level3 { three: \"Level4\" } } }"
        );
    }

    #[test]
    fn test_string_cap_adds_marker() {
        let d = with_limits(DestructuringLimits {
            max_string_length: Some(10),
            ..DestructuringLimits::default()
        });
        for len in [11usize, 20, 100] {
            let s: String = "x".repeat(len);
            let v = d.capture(&Arg::from(s), CaptureHint::Default);
            let out = v.as_str().unwrap();
            assert_eq!(
                out.chars().count(),
                10 + TRUNCATION_MARKER.chars().count()
            );
            assert!(out.ends_with(TRUNCATION_MARKER));
        }
        let short = d.capture(&Arg::from("short"), CaptureHint::Default);
        assert_eq!(short, Value::string("short"));
    }

    #[test]
    fn test_collection_cap_keeps_exact_count() {
        let d = with_limits(DestructuringLimits {
            max_collection_count: Some(5),
            ..DestructuringLimits::default()
        });
        let items: Vec<&'static str> = vec![
            "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        ];
        match d.capture(&Arg::capture(items), CaptureHint::Destructure) {
            Value::Sequence { items, omitted } => {
                assert_eq!(items.len(), 5);
                assert_eq!(omitted, 5);
                assert_eq!(items[4], Value::string("five"));
            }
            other => panic!("Expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_stringify_hint() {
        let d = Destructurer::default();
        let v = d.capture(&Arg::capture(vec![1, 2]), CaptureHint::Stringify);
        assert_eq!(v, Value::string("[1, 2]"));
        let n = d.capture(&Arg::from(42), CaptureHint::Stringify);
        assert_eq!(n, Value::string("42"));
    }

    #[test]
    fn test_panicking_serialize_degrades() {
        struct Explodes;
        impl Serialize for Explodes {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                panic!("boom")
            }
        }
        let d = Destructurer::default();
        let v = d.capture(&Arg::capture(Explodes), CaptureHint::Destructure);
        assert_eq!(v, Value::string("<unreadable Explodes: serializer panicked>"));
    }

    #[test]
    fn test_clamp_policy_output() {
        let limits = DestructuringLimits {
            max_depth: 1,
            max_string_length: Some(3),
            max_collection_count: Some(1),
        };
        let built = Value::structure(
            Some("Built"),
            vec![
                Property::new("name", "abcdef"),
                Property::new("list", Value::sequence(vec![Value::from(1)])),
            ],
        );
        let clamped = limits.clamp(built);
        assert_eq!(clamped.to_string(), "Built { name: \"abc…\", list: null }");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("alloc::vec::Vec<u8>"), "Vec");
        assert_eq!(short_type_name("my_app::LoginData"), "LoginData");
        assert_eq!(short_type_name("u32"), "u32");
    }
}
