//! Compact JSON: one object per event, reserved keys prefixed with `@`.
//!
//! `@t` timestamp, `@mt` message template, `@l` level (omitted for
//! Information), `@x` error chain. Property names that start with `@` are
//! escaped by doubling the `@`.

use serde_json::{Map, Value as JsonValue};

use super::timestamp::{format_timestamp, ROUND_TRIP_PATTERN};
use super::{render_error_chain, Formatter};
use crate::event::LogEvent;
use crate::level::Level;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompactJsonFormatter;

impl CompactJsonFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn to_json(&self, event: &LogEvent) -> JsonValue {
        let mut map = Map::new();
        map.insert(
            "@t".into(),
            JsonValue::String(format_timestamp(&event.timestamp(), ROUND_TRIP_PATTERN)),
        );
        map.insert("@mt".into(), JsonValue::String(event.template().text().into()));
        if event.level() != Level::Information {
            map.insert("@l".into(), JsonValue::String(event.level().name().into()));
        }
        if let Some(error) = event.error() {
            let mut text = String::new();
            render_error_chain(error.as_ref(), &mut text);
            map.insert("@x".into(), JsonValue::String(text));
        }
        for (name, value) in event.properties().iter() {
            let key = if name.starts_with('@') {
                format!("@{}", name)
            } else {
                name.to_string()
            };
            map.insert(key, serde_json::to_value(value).unwrap_or(JsonValue::Null));
        }
        JsonValue::Object(map)
    }
}

impl Formatter for CompactJsonFormatter {
    fn format(&self, event: &LogEvent, out: &mut String) {
        out.push_str(&self.to_json(event).to_string());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Arg, Destructurer};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Person {
        #[serde(rename = "Name")]
        name: String,
    }

    #[test]
    fn test_compact_json_fields() {
        let mut event = LogEvent::from_template(
            Level::Warning,
            "Hi {@p}",
            vec![Arg::capture(Person { name: "Bill".into() })],
        );
        event.bind_arguments(&Destructurer::default());
        event.add_or_update_property("@odd", true);

        let json = CompactJsonFormatter::new().to_json(&event);
        assert_eq!(json["@mt"], "Hi {@p}");
        assert_eq!(json["@l"], "Warning");
        assert_eq!(json["p"]["Name"], "Bill");
        assert_eq!(json["p"]["$type"], "Person");
        assert_eq!(json["@@odd"], true);
        assert!(json["@t"].as_str().is_some());
    }

    #[test]
    fn test_information_level_omitted() {
        let event = LogEvent::from_template(Level::Information, "plain", vec![]);
        let line = CompactJsonFormatter::new().format_to_string(&event);
        assert!(line.ends_with('\n'));
        assert!(!line.contains("\"@l\""));
    }
}
