//! Recursive-descent parser.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons
//! (`= <> < <= > >= in like`), primaries.

use regex::{Regex, RegexBuilder};

use super::lexer::{Token, TokenKind};
use super::{BuiltIn, CompareOp, Expr};
use crate::error::{LogweaveError, LogweaveResult};
use crate::value::Scalar;

pub(super) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    pub(super) fn parse(mut self) -> LogweaveResult<Expr> {
        if self.tokens.is_empty() {
            return Err(self.error_at(0, "empty expression"));
        }
        let expr = self.parse_or()?;
        if let Some(extra) = self.tokens.get(self.pos) {
            return Err(self.error_at(extra.position, "unexpected trailing input"));
        }
        Ok(expr)
    }

    fn error_at(&self, position: usize, message: &str) -> LogweaveError {
        LogweaveError::expression(self.source, message, position)
    }

    fn error_here(&self, message: &str) -> LogweaveError {
        let position = self
            .tokens
            .get(self.pos)
            .map(|t| t.position)
            .unwrap_or(self.source.len());
        self.error_at(position, message)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> LogweaveResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {}", what)))
        }
    }

    fn parse_or(&mut self) -> LogweaveResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> LogweaveResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> LogweaveResult<Expr> {
        if self.eat(&TokenKind::Not) {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> LogweaveResult<Expr> {
        let left = self.parse_primary()?;

        // `x not in [...]` / `x not like '...'`
        let negated = matches!(
            (self.peek(), self.tokens.get(self.pos + 1).map(|t| &t.kind)),
            (Some(TokenKind::Not), Some(TokenKind::In | TokenKind::Like))
        );
        if negated {
            self.pos += 1;
        }

        let op = match self.peek() {
            Some(TokenKind::Eq) => CompareOp::Eq,
            Some(TokenKind::NotEq) => CompareOp::NotEq,
            Some(TokenKind::Lt) => CompareOp::Lt,
            Some(TokenKind::LtEq) => CompareOp::LtEq,
            Some(TokenKind::Gt) => CompareOp::Gt,
            Some(TokenKind::GtEq) => CompareOp::GtEq,
            Some(TokenKind::In) => {
                self.pos += 1;
                let list = self.parse_list()?;
                let expr = Expr::In {
                    value: Box::new(left),
                    list,
                };
                return Ok(wrap_not(expr, negated));
            }
            Some(TokenKind::Like) => {
                self.pos += 1;
                let expr = self.parse_like(left)?;
                return Ok(wrap_not(expr, negated));
            }
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_primary()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_list(&mut self) -> LogweaveResult<Vec<Expr>> {
        self.expect(&TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_primary()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RBracket, "',' or ']'")?;
            return Ok(items);
        }
    }

    fn parse_like(&mut self, value: Expr) -> LogweaveResult<Expr> {
        let pattern = match self.peek() {
            Some(TokenKind::Str(p)) => p.clone(),
            _ => return Err(self.error_here("'like' expects a string pattern")),
        };
        self.pos += 1;
        let regex = like_to_regex(&pattern).map_err(|e| self.error_here(&e.to_string()))?;
        Ok(Expr::Like {
            value: Box::new(value),
            pattern,
            regex,
        })
    }

    fn parse_primary(&mut self) -> LogweaveResult<Expr> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error_here("unexpected end of expression"));
        };
        self.pos += 1;

        match token.kind {
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Str(s) => Ok(Expr::Literal(Scalar::Str(s))),
            TokenKind::Int(n) => Ok(Expr::Literal(Scalar::I64(n))),
            TokenKind::Float(n) => Ok(Expr::Literal(Scalar::F64(n))),
            TokenKind::True => Ok(Expr::Literal(Scalar::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Scalar::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Scalar::Null)),
            TokenKind::BuiltIn(name) => match BuiltIn::from_name(&name) {
                Some(b) => Ok(Expr::BuiltIn(b)),
                None => Err(self.error_at(token.position, &format!("unknown built-in '@{}'", name))),
            },
            TokenKind::Ident(first) => {
                let mut path = vec![first];
                while self.eat(&TokenKind::Dot) {
                    match self.peek().cloned() {
                        Some(TokenKind::Ident(segment)) => {
                            self.pos += 1;
                            path.push(segment);
                        }
                        _ => return Err(self.error_here("expected a member name after '.'")),
                    }
                }
                Ok(Expr::Property(path))
            }
            _ => Err(self.error_at(token.position, "expected a value")),
        }
    }
}

fn wrap_not(expr: Expr, negated: bool) -> Expr {
    if negated {
        Expr::Not(Box::new(expr))
    } else {
        expr
    }
}

/// `%` matches any run, `_` any single character; case-insensitive.
fn like_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    RegexBuilder::new(&re)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}
