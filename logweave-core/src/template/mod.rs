//! Message templates: parsing, argument binding and rendering.
//!
//! A template such as `"Hello, {name}!"` is parsed once into tokens (and
//! cached, see [`TemplateCache`]). Binding pairs each distinct hole with a
//! call-site argument; rendering substitutes the captured property values.

mod cache;
mod parser;

pub use cache::TemplateCache;

use std::fmt::Write as _;

use crate::capture::{Arg, CaptureHint};
use crate::event::Properties;
use crate::format::timestamp::format_timestamp;
use crate::value::{Scalar, Value};

/// Widest alignment a hole may request; wider ones leave the hole as text.
pub const MAX_ALIGNMENT: usize = 1024;

/// Padding applied to a rendered hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left(usize),
    Right(usize),
}

impl Alignment {
    pub fn apply(self, text: &str) -> String {
        let len = text.chars().count();
        match self {
            Self::Left(w) if w.min(MAX_ALIGNMENT) > len => {
                format!("{}{}", text, " ".repeat(w.min(MAX_ALIGNMENT) - len))
            }
            Self::Right(w) if w.min(MAX_ALIGNMENT) > len => {
                format!("{}{}", " ".repeat(w.min(MAX_ALIGNMENT) - len), text)
            }
            _ => text.to_string(),
        }
    }
}

/// A hole in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyToken {
    pub name: String,
    pub hint: CaptureHint,
    pub alignment: Option<Alignment>,
    pub format: Option<String>,
    /// Index for positional holes like `{0}`.
    pub position: Option<usize>,
    /// Original text, used when the hole cannot be filled.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Property(PropertyToken),
}

/// How string and complex values are rendered into a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageStyle {
    /// Top-level strings without quotes (`l`).
    pub literal: bool,
    /// Complex values as JSON (`j`).
    pub json: bool,
}

impl MessageStyle {
    /// Parse an output-template format such as `lj`.
    pub fn from_format(format: Option<&str>) -> Self {
        let f = format.unwrap_or("");
        Self {
            literal: f.contains('l'),
            json: f.contains('j'),
        }
    }
}

/// One argument bound to a named hole.
#[derive(Debug)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub hint: CaptureHint,
    pub arg: &'a Arg,
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTemplate {
    text: String,
    tokens: Vec<Token>,
}

impl MessageTemplate {
    pub fn parse(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tokens: parser::parse(text),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn property_tokens(&self) -> impl Iterator<Item = &PropertyToken> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Property(p) => Some(p),
            Token::Text(_) => None,
        })
    }

    /// Pair holes with arguments.
    ///
    /// If every hole is positional, arguments bind by index. Otherwise each
    /// distinct name binds, in order of first appearance, to the next
    /// argument. Returns the bindings and the number of unused arguments.
    pub fn bind<'a>(&'a self, args: &'a [Arg]) -> (Vec<Binding<'a>>, usize) {
        let holes: Vec<&PropertyToken> = self.property_tokens().collect();
        let mut bindings: Vec<Binding<'a>> = Vec::new();

        if !holes.is_empty() && holes.iter().all(|h| h.position.is_some()) {
            let mut used = vec![false; args.len()];
            for hole in holes {
                let Some(index) = hole.position else { continue };
                if bindings.iter().any(|b| b.name == hole.name) {
                    continue;
                }
                if let Some(arg) = args.get(index) {
                    used[index] = true;
                    bindings.push(Binding {
                        name: &hole.name,
                        hint: hole.hint,
                        arg,
                    });
                }
            }
            let surplus = used.iter().filter(|u| !**u).count();
            return (bindings, surplus);
        }

        let mut next = args.iter();
        for hole in holes {
            if bindings.iter().any(|b| b.name == hole.name) {
                continue;
            }
            match next.next() {
                Some(arg) => bindings.push(Binding {
                    name: &hole.name,
                    hint: hole.hint,
                    arg,
                }),
                None => break,
            }
        }
        let surplus = next.count();
        (bindings, surplus)
    }

    /// Render with the given properties; unfilled holes keep their raw text.
    pub fn render(&self, properties: &Properties, style: MessageStyle) -> String {
        let mut out = String::with_capacity(self.text.len());
        for token in &self.tokens {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Property(hole) => match properties.get(&hole.name) {
                    Some(value) => {
                        let rendered = render_value(value, hole.format.as_deref(), style);
                        match hole.alignment {
                            Some(a) => out.push_str(&a.apply(&rendered)),
                            None => out.push_str(&rendered),
                        }
                    }
                    None => out.push_str(&hole.raw),
                },
            }
        }
        out
    }
}

/// Render a single value with an optional hole format.
///
/// Timestamps accept date patterns (`yyyy-MM-dd`), numbers accept fixed
/// decimals (`0.00`) and hex (`x`/`X`). A hole format made of `l`/`j`
/// adds to the render style for that hole only. Other formats are ignored.
pub fn render_value(value: &Value, format: Option<&str>, style: MessageStyle) -> String {
    if let Some(flags) = format.filter(|f| f.chars().all(|c| c == 'l' || c == 'j')) {
        let hole = MessageStyle::from_format(Some(flags));
        let style = MessageStyle {
            literal: style.literal || hole.literal,
            json: style.json || hole.json,
        };
        return render_value(value, None, style);
    }
    match (value, format) {
        (Value::Scalar(Scalar::Timestamp(ts)), Some(f)) => format_timestamp(ts, f),
        (Value::Scalar(s), Some(f)) => match format_number(s, f) {
            Some(text) => text,
            None => value.to_rendered(style.literal),
        },
        (Value::Scalar(_), None) => value.to_rendered(style.literal),
        (_, _) if style.json => value.to_json(),
        _ => value.to_rendered(style.literal),
    }
}

fn format_number(scalar: &Scalar, format: &str) -> Option<String> {
    match format {
        "x" | "X" => {
            let n = match scalar {
                Scalar::I64(n) => u64::try_from(*n).ok()?,
                Scalar::U64(n) => *n,
                _ => return None,
            };
            let mut out = String::new();
            if format == "x" {
                let _ = write!(out, "{:x}", n);
            } else {
                let _ = write!(out, "{:X}", n);
            }
            Some(out)
        }
        _ => {
            let decimals = match format.strip_prefix('0') {
                Some("") => 0,
                Some(rest) => {
                    let zeros = rest.strip_prefix('.')?;
                    if zeros.is_empty() || !zeros.chars().all(|c| c == '0') {
                        return None;
                    }
                    zeros.len()
                }
                None => return None,
            };
            let n = scalar.as_f64()?;
            Some(format!("{:.*}", decimals, n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<Arg> {
        values.iter().map(|v| Arg::from(*v)).collect()
    }

    #[test]
    fn test_bind_named_in_order() {
        let t = MessageTemplate::parse("{a} {b} {a}");
        let a = args(&["1", "2"]);
        let (bindings, surplus) = t.bind(&a);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].name, "a");
        assert_eq!(bindings[1].name, "b");
        assert_eq!(surplus, 0);
    }

    #[test]
    fn test_bind_reports_surplus_and_missing() {
        let t = MessageTemplate::parse("{a}");
        let a = args(&["1", "2", "3"]);
        let (bindings, surplus) = t.bind(&a);
        assert_eq!(bindings.len(), 1);
        assert_eq!(surplus, 2);

        let t = MessageTemplate::parse("{a} {b}");
        let a = args(&["1"]);
        let (bindings, surplus) = t.bind(&a);
        assert_eq!(bindings.len(), 1);
        assert_eq!(surplus, 0);
    }

    #[test]
    fn test_bind_positional() {
        let t = MessageTemplate::parse("{1} {0}");
        let a = args(&["zero", "one"]);
        let (bindings, _) = t.bind(&a);
        assert_eq!(bindings[0].name, "1");
        assert_eq!(bindings[0].arg.as_scalar(), Some(&Scalar::Str("one".into())));
    }

    #[test]
    fn test_render_styles() {
        let t = MessageTemplate::parse("Hello, {name}! {missing}");
        let mut props = Properties::default();
        props.insert("name", Value::string("World"));
        assert_eq!(
            t.render(&props, MessageStyle::default()),
            "Hello, \"World\"! {missing}"
        );
        assert_eq!(
            t.render(&props, MessageStyle { literal: true, json: false }),
            "Hello, World! {missing}"
        );
    }

    #[test]
    fn test_render_json_style_for_structures() {
        let t = MessageTemplate::parse("{@p}");
        let mut props = Properties::default();
        props.insert(
            "p",
            Value::structure(Some("P"), vec![crate::value::Property::new("N", 1)]),
        );
        assert_eq!(t.render(&props, MessageStyle::from_format(Some("lj"))), r#"{"$type":"P","N":1}"#);
        assert_eq!(t.render(&props, MessageStyle::default()), "P { N: 1 }");
    }

    #[test]
    fn test_render_alignment_and_number_format() {
        let t = MessageTemplate::parse("[{Amount,8:0.00}] [{Code,-4:X}]");
        let mut props = Properties::default();
        props.insert("Amount", Value::from(3.14159));
        props.insert("Code", Value::from(255u32));
        assert_eq!(t.render(&props, MessageStyle::default()), "[    3.14] [FF  ]");
    }

    #[test]
    fn test_oversized_alignment_is_not_a_hole() {
        let t = MessageTemplate::parse("{name,1000000000000000000} {name,-1000000000000000000}");
        let mut props = Properties::default();
        props.insert("name", Value::string("World"));
        assert_eq!(
            t.render(&props, MessageStyle::default()),
            "{name,1000000000000000000} {name,-1000000000000000000}"
        );

        let padded = Alignment::Right(usize::MAX).apply("x");
        assert_eq!(padded.chars().count(), MAX_ALIGNMENT);
    }

    #[test]
    fn test_literal_format_on_one_hole() {
        let t = MessageTemplate::parse("{a:l} {b} {@c:j}");
        let mut props = Properties::default();
        props.insert("a", Value::string("plain"));
        props.insert("b", Value::string("quoted"));
        props.insert(
            "c",
            Value::structure(Some("P"), vec![crate::value::Property::new("N", 1)]),
        );
        assert_eq!(
            t.render(&props, MessageStyle::default()),
            r#"plain "quoted" {"$type":"P","N":1}"#
        );
    }
}
