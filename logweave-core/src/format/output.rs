//! Human-readable output templates.
//!
//! An output template uses the same syntax as a message template. The
//! built-in names `Timestamp`, `Level`, `Message`, `NewLine`, `Exception`
//! and `Properties` are rendered from the event itself; any other name is
//! looked up in the event's properties, and renders empty when absent.

use std::collections::HashSet;

use super::timestamp::format_timestamp;
use super::{render_error_chain, Formatter};
use crate::event::LogEvent;
use crate::template::{render_value, MessageStyle, MessageTemplate, Token};
use crate::value::{Property, Value};

pub const DEFAULT_OUTPUT_TEMPLATE: &str =
    "[{Timestamp:HH:mm:ss} {Level:u3}] {Message:lj}{NewLine}{Exception}";

const DEFAULT_TIMESTAMP_PATTERN: &str = "yyyy-MM-dd HH:mm:ss.fff zzz";

const BUILT_INS: [&str; 6] = [
    "Timestamp",
    "Level",
    "Message",
    "NewLine",
    "Exception",
    "Properties",
];

#[derive(Debug, Clone)]
pub struct OutputTemplate {
    template: MessageTemplate,
}

impl OutputTemplate {
    pub fn parse(text: &str) -> Self {
        Self {
            template: MessageTemplate::parse(text),
        }
    }

    pub fn text(&self) -> &str {
        self.template.text()
    }

    /// Properties mentioned by name in this template or the event's message.
    fn used_names<'a>(&'a self, event: &'a LogEvent) -> HashSet<&'a str> {
        self.template
            .property_tokens()
            .chain(event.template().property_tokens())
            .map(|t| t.name.as_str())
            .collect()
    }

    fn render_properties(&self, event: &LogEvent, format: Option<&str>) -> String {
        let used = self.used_names(event);
        let remaining: Vec<Property> = event
            .properties()
            .iter()
            .filter(|(name, _)| !used.contains(name))
            .map(|(name, value)| Property::new(name, value.clone()))
            .collect();
        let structure = Value::structure(None, remaining);
        if MessageStyle::from_format(format).json {
            structure.to_json()
        } else {
            structure.to_rendered(false)
        }
    }
}

impl Default for OutputTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_OUTPUT_TEMPLATE)
    }
}

impl Formatter for OutputTemplate {
    fn format(&self, event: &LogEvent, out: &mut String) {
        for token in self.template.tokens() {
            let hole = match token {
                Token::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Token::Property(hole) => hole,
            };
            let format = hole.format.as_deref();

            let rendered = match hole.name.as_str() {
                "Timestamp" => {
                    format_timestamp(&event.timestamp(), format.unwrap_or(DEFAULT_TIMESTAMP_PATTERN))
                }
                "Level" => match format {
                    Some(spec) => event.level().format(spec),
                    None => event.level().name().to_string(),
                },
                "Message" => event.render_message_with(MessageStyle::from_format(format)),
                "NewLine" => "\n".to_string(),
                "Exception" => match event.error() {
                    Some(error) => {
                        let mut text = String::new();
                        render_error_chain(error.as_ref(), &mut text);
                        text.push('\n');
                        text
                    }
                    None => String::new(),
                },
                "Properties" => self.render_properties(event, format),
                name => match event.property(name) {
                    Some(value) => render_value(
                        value,
                        format,
                        MessageStyle {
                            literal: true,
                            json: false,
                        },
                    ),
                    None => String::new(),
                },
            };

            match hole.alignment {
                Some(alignment) if !BUILT_INS[3..5].contains(&hole.name.as_str()) => {
                    out.push_str(&alignment.apply(&rendered))
                }
                _ => out.push_str(&rendered),
            }
        }
    }
}
