//! Message template parser.
//!
//! Grammar (informal):
//!
//! ```text
//! template := (text | "{{" | "}}" | hole)*
//! hole     := "{" hint? name ("," "-"? digits)? (":" format)? "}"
//! hint     := "@" | "$"
//! name     := [A-Za-z0-9_]+
//! ```
//!
//! Parsing never fails: anything that does not form a valid hole is kept as
//! literal text, so a malformed template still renders something sensible.

use super::{Alignment, PropertyToken, Token, MAX_ALIGNMENT};
use crate::capture::CaptureHint;

pub(super) fn parse(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("{{") {
            literal.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix("}}") {
            literal.push('}');
            rest = after;
            continue;
        }
        if rest.starts_with('{') {
            match rest.find('}') {
                Some(close) => {
                    let raw = &rest[..=close];
                    match parse_hole(raw) {
                        Some(token) => {
                            if !literal.is_empty() {
                                tokens.push(Token::Text(std::mem::take(&mut literal)));
                            }
                            tokens.push(Token::Property(token));
                        }
                        None => literal.push_str(raw),
                    }
                    rest = &rest[close + 1..];
                }
                None => {
                    literal.push_str(rest);
                    rest = "";
                }
            }
            continue;
        }

        let ch = rest.chars().next().unwrap_or_default();
        literal.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if !literal.is_empty() {
        tokens.push(Token::Text(literal));
    }
    tokens
}

/// Parse `{...}` including braces; `None` if it is not a valid hole.
fn parse_hole(raw: &str) -> Option<PropertyToken> {
    let inner = &raw[1..raw.len() - 1];

    let (hint, body) = match inner.chars().next()? {
        '@' => (CaptureHint::Destructure, &inner[1..]),
        '$' => (CaptureHint::Stringify, &inner[1..]),
        _ => (CaptureHint::Default, inner),
    };

    let (head, format) = match body.split_once(':') {
        Some((head, format)) => (head, Some(format.to_string())),
        None => (body, None),
    };

    let (name, alignment) = match head.split_once(',') {
        Some((name, align)) => (name, Some(parse_alignment(align)?)),
        None => (head, None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    if format.as_deref().is_some_and(str::is_empty) {
        return None;
    }

    let position = if name.chars().all(|c| c.is_ascii_digit()) {
        name.parse().ok()
    } else {
        None
    };

    Some(PropertyToken {
        name: name.to_string(),
        hint,
        alignment,
        format,
        position,
        raw: raw.to_string(),
    })
}

fn parse_alignment(raw: &str) -> Option<Alignment> {
    let (left, digits) = match raw.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, raw),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let width: usize = digits.parse().ok()?;
    if width > MAX_ALIGNMENT {
        return None;
    }
    Some(if left {
        Alignment::Left(width)
    } else {
        Alignment::Right(width)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(tokens: &[Token]) -> Vec<&PropertyToken> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Property(p) => Some(p),
                Token::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_simple_named_hole() {
        let tokens = parse("Hello, {name}!");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::Text("Hello, ".into()));
        assert_eq!(tokens[2], Token::Text("!".into()));
        let p = props(&tokens);
        assert_eq!(p[0].name, "name");
        assert_eq!(p[0].hint, CaptureHint::Default);
    }

    #[test]
    fn test_hints_format_and_alignment() {
        let tokens = parse("{@obj} {$s} {Amount,-8:0.00} {When:yyyy-MM-dd}");
        let p = props(&tokens);
        assert_eq!(p[0].hint, CaptureHint::Destructure);
        assert_eq!(p[1].hint, CaptureHint::Stringify);
        assert_eq!(p[2].alignment, Some(Alignment::Left(8)));
        assert_eq!(p[2].format.as_deref(), Some("0.00"));
        assert_eq!(p[3].format.as_deref(), Some("yyyy-MM-dd"));
    }

    #[test]
    fn test_escaped_braces() {
        let tokens = parse("{{literal}} {x}");
        assert_eq!(tokens[0], Token::Text("{literal} ".into()));
        assert_eq!(props(&tokens)[0].name, "x");
    }

    #[test]
    fn test_positional_holes() {
        let tokens = parse("{1} then {0}");
        let p = props(&tokens);
        assert_eq!(p[0].position, Some(1));
        assert_eq!(p[1].position, Some(0));
    }

    #[test]
    fn test_malformed_holes_stay_text() {
        assert_eq!(parse("{not valid}"), vec![Token::Text("{not valid}".into())]);
        assert_eq!(parse("open {brace"), vec![Token::Text("open {brace".into())]);
        assert_eq!(parse("{x,abc}"), vec![Token::Text("{x,abc}".into())]);
        assert_eq!(parse("{}"), vec![Token::Text("{}".into())]);
        assert_eq!(
            parse("{x,99999999999999999999999}"),
            vec![Token::Text("{x,99999999999999999999999}".into())]
        );
    }

    #[test]
    fn test_alignment_width_limit() {
        let at_limit = format!("{{x,{}}}", MAX_ALIGNMENT);
        assert_eq!(props(&parse(&at_limit))[0].alignment, Some(Alignment::Right(MAX_ALIGNMENT)));

        let over = format!("{{x,-{}}}", MAX_ALIGNMENT + 1);
        assert_eq!(parse(&over), vec![Token::Text(over.clone())]);
    }

    #[test]
    fn test_unicode_text_preserved() {
        let tokens = parse("naïve → {v}");
        assert_eq!(tokens[0], Token::Text("naïve → ".into()));
    }
}
