use crate::error::{LogweaveError, LogweaveResult};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Ident(String),
    BuiltIn(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    In,
    Like,
    True,
    False,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token start.
    pub position: usize,
}

pub(super) fn tokenize(source: &str) -> LogweaveResult<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    let err = |position: usize, message: &str| LogweaveError::expression(source, message, position);

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let kind = match c {
            b'(' => {
                i += 1;
                TokenKind::LParen
            }
            b')' => {
                i += 1;
                TokenKind::RParen
            }
            b'[' => {
                i += 1;
                TokenKind::LBracket
            }
            b']' => {
                i += 1;
                TokenKind::RBracket
            }
            b',' => {
                i += 1;
                TokenKind::Comma
            }
            b'.' if !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                i += 1;
                TokenKind::Dot
            }
            b'=' => {
                i += 1;
                TokenKind::Eq
            }
            b'<' => match bytes.get(i + 1) {
                Some(b'>') => {
                    i += 2;
                    TokenKind::NotEq
                }
                Some(b'=') => {
                    i += 2;
                    TokenKind::LtEq
                }
                _ => {
                    i += 1;
                    TokenKind::Lt
                }
            },
            b'>' => match bytes.get(i + 1) {
                Some(b'=') => {
                    i += 2;
                    TokenKind::GtEq
                }
                _ => {
                    i += 1;
                    TokenKind::Gt
                }
            },
            b'\'' => {
                i += 1;
                let mut text = String::new();
                loop {
                    match source[i..].find('\'') {
                        None => return Err(err(start, "unterminated string literal")),
                        Some(offset) => {
                            text.push_str(&source[i..i + offset]);
                            i += offset + 1;
                            // `''` inside a literal is an escaped quote.
                            if bytes.get(i) == Some(&b'\'') {
                                text.push('\'');
                                i += 1;
                            } else {
                                break;
                            }
                        }
                    }
                }
                TokenKind::Str(text)
            }
            b'@' => {
                i += 1;
                let end = ident_end(bytes, i);
                if end == i {
                    return Err(err(start, "expected a name after '@'"));
                }
                let name = source[i..end].to_string();
                i = end;
                TokenKind::BuiltIn(name)
            }
            b'-' | b'0'..=b'9' | b'.' => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let text = &source[start..i];
                if let Ok(n) = text.parse::<i64>() {
                    TokenKind::Int(n)
                } else if let Ok(n) = text.parse::<f64>() {
                    TokenKind::Float(n)
                } else {
                    return Err(err(start, "invalid number"));
                }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let end = ident_end(bytes, i);
                let word = &source[i..end];
                i = end;
                match word.to_ascii_lowercase().as_str() {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    "in" => TokenKind::In,
                    "like" => TokenKind::Like,
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    _ => TokenKind::Ident(word.to_string()),
                }
            }
            _ => return Err(err(start, "unexpected character")),
        };

        tokens.push(Token {
            kind,
            position: start,
        });
    }

    Ok(tokens)
}

fn ident_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds("Application = 'Serilog Example'"),
            vec![
                TokenKind::Ident("Application".into()),
                TokenKind::Eq,
                TokenKind::Str("Serilog Example".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_membership() {
        assert_eq!(
            kinds("@Level in ['Error','Fatal']"),
            vec![
                TokenKind::BuiltIn("Level".into()),
                TokenKind::In,
                TokenKind::LBracket,
                TokenKind::Str("Error".into()),
                TokenKind::Comma,
                TokenKind::Str("Fatal".into()),
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn test_escaped_quote_and_numbers() {
        assert_eq!(
            kinds("'it''s' 42 -1.5 <> <="),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Int(42),
                TokenKind::Float(-1.5),
                TokenKind::NotEq,
                TokenKind::LtEq,
            ]
        );
    }

    #[test]
    fn test_errors_carry_position() {
        match tokenize("A = 'open") {
            Err(LogweaveError::Expression { position, .. }) => assert_eq!(position, 4),
            other => panic!("Expected expression error, got {:?}", other),
        }
        assert!(tokenize("A # 1").is_err());
    }
}
