//! Filter expressions.
//!
//! A small boolean language over event properties:
//!
//! ```text
//! Application = 'Serilog Example'
//! @Level in ['Error', 'Fatal']
//! RequestPath like '/api/%' and not (StatusCode < 400)
//! Customer.Address.City <> 'Paris'
//! ```
//!
//! Evaluation is three-valued. A missing property is *undefined*; any
//! comparison involving undefined is undefined, `not` keeps it undefined, and
//! the event is only accepted when the whole expression is exactly `true`.

mod lexer;
mod parser;

use std::borrow::Cow;
use std::cmp::Ordering;

use regex::Regex;

use crate::error::LogweaveResult;
use crate::event::LogEvent;
use crate::level::Level;
use crate::template::MessageStyle;
use crate::value::{Scalar, Value};

/// Event data that is not a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltIn {
    Level,
    MessageTemplate,
    Message,
    Exception,
}

impl BuiltIn {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Level" | "l" => Some(Self::Level),
            "MessageTemplate" | "mt" => Some(Self::MessageTemplate),
            "Message" | "m" => Some(Self::Message),
            "Exception" | "x" => Some(Self::Exception),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Scalar),
    /// `Name` or `Name.Member.Member`
    Property(Vec<String>),
    BuiltIn(BuiltIn),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    In {
        value: Box<Expr>,
        list: Vec<Expr>,
    },
    Like {
        value: Box<Expr>,
        pattern: String,
        regex: Regex,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse expression source. Errors carry the byte position.
    pub fn parse(source: &str) -> LogweaveResult<Self> {
        let tokens = lexer::tokenize(source)?;
        parser::Parser::new(source, tokens).parse()
    }

    /// `true` only if the expression evaluates to boolean true.
    pub fn is_match(&self, event: &LogEvent) -> bool {
        matches!(
            self.evaluate(event).as_deref(),
            Some(Value::Scalar(Scalar::Bool(true)))
        )
    }

    /// Evaluate; `None` is undefined.
    pub fn evaluate<'e>(&self, event: &'e LogEvent) -> Option<Cow<'e, Value>> {
        match self {
            Self::Literal(s) => Some(Cow::Owned(Value::Scalar(s.clone()))),
            Self::Property(path) => {
                let (first, rest) = path.split_first()?;
                let mut current = event.lookup(first)?;
                for segment in rest {
                    current = match current {
                        Cow::Borrowed(v) => Cow::Borrowed(v.member(segment)?),
                        Cow::Owned(v) => Cow::Owned(v.member(segment)?.clone()),
                    };
                }
                Some(current)
            }
            Self::BuiltIn(b) => Some(Cow::Owned(match b {
                BuiltIn::Level => Value::string(event.level().name()),
                BuiltIn::MessageTemplate => Value::string(event.template().text()),
                BuiltIn::Message => Value::string(event.render_message_with(MessageStyle {
                    literal: true,
                    json: false,
                })),
                BuiltIn::Exception => match event.error() {
                    Some(e) => Value::string(e.to_string()),
                    None => return None,
                },
            })),
            Self::Compare { op, left, right } => {
                let l = left.evaluate(event)?;
                let r = right.evaluate(event)?;
                let levels = matches!(**left, Self::BuiltIn(BuiltIn::Level))
                    || matches!(**right, Self::BuiltIn(BuiltIn::Level));
                compare(*op, &l, &r, levels).map(bool_value)
            }
            Self::In { value, list } => {
                let v = value.evaluate(event)?;
                let found = list.iter().any(|item| {
                    item.evaluate(event)
                        .is_some_and(|candidate| values_equal(&v, &candidate))
                });
                Some(bool_value(found))
            }
            Self::Like { value, regex, .. } => {
                let v = value.evaluate(event)?;
                let text = match v.as_ref() {
                    Value::Scalar(Scalar::Str(s)) => Cow::Borrowed(s.as_str()),
                    other => Cow::Owned(other.to_rendered(true)),
                };
                Some(bool_value(regex.is_match(&text)))
            }
            Self::Not(inner) => {
                let v = inner.evaluate(event)?;
                Some(bool_value(!truthy(&v)))
            }
            Self::And(l, r) => {
                let result = l.is_match(event) && r.is_match(event);
                Some(bool_value(result))
            }
            Self::Or(l, r) => {
                let result = l.is_match(event) || r.is_match(event);
                Some(bool_value(result))
            }
        }
    }
}

fn bool_value(b: bool) -> Cow<'static, Value> {
    Cow::Owned(Value::Scalar(Scalar::Bool(b)))
}

fn truthy(v: &Value) -> bool {
    matches!(v, Value::Scalar(Scalar::Bool(true)))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(m), Some(n)) => m == n,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn compare(op: CompareOp, l: &Value, r: &Value, as_levels: bool) -> Option<bool> {
    match op {
        CompareOp::Eq => return Some(values_equal(l, r)),
        CompareOp::NotEq => return Some(!values_equal(l, r)),
        _ => {}
    }

    let ordering = ordering(l, r, as_levels)?;
    Some(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
        CompareOp::Eq | CompareOp::NotEq => unreachable!("handled above"),
    })
}

fn ordering(l: &Value, r: &Value, as_levels: bool) -> Option<Ordering> {
    let (Value::Scalar(x), Value::Scalar(y)) = (l, r) else {
        return None;
    };
    if as_levels {
        if let (Some(a), Some(b)) = (x.as_str(), y.as_str()) {
            if let (Ok(a), Ok(b)) = (a.parse::<Level>(), b.parse::<Level>()) {
                return Some(a.cmp(&b));
            }
        }
    }
    match (x, y) {
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
        (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(b)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}
