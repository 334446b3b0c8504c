//! Destructuring policies.
//!
//! A policy gets the first look at every captured object. Returning `Some`
//! short-circuits the remaining policies and the structural default; its
//! output is still clamped to the configured limits.

use std::marker::PhantomData;

use super::{Capture, Destructurer};
use crate::value::{Property, Scalar, Value};

/// Custom conversion of a captured object into a [`Value`].
pub trait DestructuringPolicy: Send + Sync {
    fn try_destructure(&self, value: &dyn Capture, destructurer: &Destructurer) -> Option<Value>;
}

/// Policy for one concrete type, built from a closure.
///
/// ```rust,ignore
/// let policy = TypedPolicy::new(|login: &LoginData, _| {
///     Value::structure(None, vec![Property::new("Username", login.username.as_str())])
/// });
/// ```
pub struct TypedPolicy<T, F> {
    convert: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> TypedPolicy<T, F>
where
    T: 'static,
    F: Fn(&T, &Destructurer) -> Value + Send + Sync,
{
    pub fn new(convert: F) -> Self {
        Self {
            convert,
            _marker: PhantomData,
        }
    }
}

impl<T, F> DestructuringPolicy for TypedPolicy<T, F>
where
    T: 'static,
    F: Fn(&T, &Destructurer) -> Value + Send + Sync,
{
    fn try_destructure(&self, value: &dyn Capture, destructurer: &Destructurer) -> Option<Value> {
        value
            .as_any()
            .downcast_ref::<T>()
            .map(|typed| (self.convert)(typed, destructurer))
    }
}

/// Replaces the values of sensitive members, at any nesting level.
///
/// Matches only objects whose structural capture actually contains one of
/// the names, so unrelated types fall through to later policies.
#[derive(Debug, Clone)]
pub struct MaskPropertiesPolicy {
    names: Vec<String>,
    mask: String,
}

impl MaskPropertiesPolicy {
    pub const DEFAULT_MASK: &'static str = "***";

    /// Member names are compared case-insensitively.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>, mask: impl Into<String>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            mask: mask.into(),
        }
    }

    fn is_sensitive(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    fn mask_value(&self, value: Value, masked: &mut bool) -> Value {
        match value {
            Value::Structure {
                type_tag,
                properties,
            } => Value::Structure {
                type_tag,
                properties: properties
                    .into_iter()
                    .map(|p| {
                        if self.is_sensitive(&p.name) {
                            *masked = true;
                            Property::new(p.name, Scalar::Str(self.mask.clone()))
                        } else {
                            Property {
                                value: self.mask_value(p.value, masked),
                                name: p.name,
                            }
                        }
                    })
                    .collect(),
            },
            Value::Sequence { items, omitted } => Value::Sequence {
                items: items
                    .into_iter()
                    .map(|v| self.mask_value(v, masked))
                    .collect(),
                omitted,
            },
            Value::Mapping { entries, omitted } => Value::Mapping {
                entries: entries
                    .into_iter()
                    .map(|(k, v)| {
                        if k.as_str().is_some_and(|key| self.is_sensitive(key)) {
                            *masked = true;
                            (k, Value::string(self.mask.clone()))
                        } else {
                            let v = self.mask_value(v, masked);
                            (k, v)
                        }
                    })
                    .collect(),
                omitted,
            },
            scalar => scalar,
        }
    }
}

impl DestructuringPolicy for MaskPropertiesPolicy {
    fn try_destructure(&self, value: &dyn Capture, destructurer: &Destructurer) -> Option<Value> {
        let captured = destructurer.structural(value);
        let mut masked = false;
        let result = self.mask_value(captured, &mut masked);
        masked.then_some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Arg, CaptureHint, DestructuringLimits};
    use serde::Serialize;
    use std::sync::Arc;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct LoginData {
        username: String,
        password: String,
    }

    #[derive(Serialize)]
    struct Session {
        login: LoginData,
        id: u32,
    }

    fn login() -> LoginData {
        LoginData {
            username: "BGates".into(),
            password: "isityearoflinuxyet".into(),
        }
    }

    fn username_only() -> Arc<dyn DestructuringPolicy> {
        Arc::new(TypedPolicy::new(|l: &LoginData, _: &Destructurer| {
            Value::structure(None, vec![Property::new("Username", l.username.as_str())])
        }))
    }

    #[test]
    fn test_typed_policy_matches_only_its_type() {
        let d = Destructurer::new(DestructuringLimits::default(), vec![username_only()]);
        let v = d.capture(&Arg::capture(login()), CaptureHint::Destructure);
        assert_eq!(v.to_string(), "{ Username: \"BGates\" }");

        let other = d.capture(&Arg::capture(vec![1u8]), CaptureHint::Destructure);
        assert_eq!(other.to_string(), "[1]");
    }

    #[test]
    fn test_first_matching_policy_wins() {
        let second: Arc<dyn DestructuringPolicy> =
            Arc::new(TypedPolicy::new(|_: &LoginData, _: &Destructurer| Value::string("second")));
        let d = Destructurer::new(DestructuringLimits::default(), vec![username_only(), second]);
        let v = d.capture(&Arg::capture(login()), CaptureHint::Destructure);
        assert_eq!(v.to_string(), "{ Username: \"BGates\" }");

        let second_first: Arc<dyn DestructuringPolicy> =
            Arc::new(TypedPolicy::new(|_: &LoginData, _: &Destructurer| Value::string("second")));
        let d = Destructurer::new(
            DestructuringLimits::default(),
            vec![second_first, username_only()],
        );
        let v = d.capture(&Arg::capture(login()), CaptureHint::Destructure);
        assert_eq!(v, Value::string("second"));
    }

    #[test]
    fn test_mask_policy_nested() {
        let policy: Arc<dyn DestructuringPolicy> =
            Arc::new(MaskPropertiesPolicy::new(["password"], "***"));
        let d = Destructurer::new(DestructuringLimits::default(), vec![policy]);
        let v = d.capture(
            &Arg::capture(Session { login: login(), id: 7 }),
            CaptureHint::Destructure,
        );
        assert_eq!(
            v.to_string(),
            "Session { login: LoginData { Username: \"BGates\", Password: \"***\" }, id: 7 }"
        );
    }

    #[test]
    fn test_mask_policy_falls_through_when_nothing_masked() {
        let mask = MaskPropertiesPolicy::new(["secret"], "***");
        let d = Destructurer::default();
        assert!(mask
            .try_destructure(&Session { login: login(), id: 1 }, &d)
            .is_none());
    }
}
