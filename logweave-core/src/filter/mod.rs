//! Filtering: a conjunctive chain of predicates over events.
//!
//! Filters run after enrichment and before arguments are captured, so they
//! see raw, uncapped values.

pub mod expr;
mod switch;

pub use expr::Expr;
pub use switch::FilterSwitch;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::LogweaveResult;
use crate::event::LogEvent;
use crate::level::LevelGate;

pub trait Filter: Send + Sync {
    /// `true` keeps the event.
    fn is_enabled(&self, event: &LogEvent) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&LogEvent) -> bool + Send + Sync,
{
    fn is_enabled(&self, event: &LogEvent) -> bool {
        self(event)
    }
}

/// Logical AND over `filters`, stopping at the first rejection.
///
/// A panicking filter rejects the event.
pub fn allow(event: &LogEvent, filters: &[Arc<dyn Filter>]) -> bool {
    filters.iter().enumerate().all(|(index, filter)| {
        match catch_unwind(AssertUnwindSafe(|| filter.is_enabled(event))) {
            Ok(keep) => keep,
            Err(_) => {
                tracing::warn!(filter = index, "filter panicked; event rejected");
                false
            }
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionMode {
    /// Keep matching events (`ByIncludingOnly`).
    Include,
    /// Drop matching events (`ByExcluding`).
    Exclude,
}

#[derive(Debug, Clone)]
pub struct ExpressionFilter {
    expr: Expr,
    mode: ExpressionMode,
}

impl ExpressionFilter {
    pub fn including_only(source: &str) -> LogweaveResult<Self> {
        Ok(Self {
            expr: Expr::parse(source)?,
            mode: ExpressionMode::Include,
        })
    }

    pub fn excluding(source: &str) -> LogweaveResult<Self> {
        Ok(Self {
            expr: Expr::parse(source)?,
            mode: ExpressionMode::Exclude,
        })
    }
}

impl Filter for ExpressionFilter {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        let matched = self.expr.is_match(event);
        match self.mode {
            ExpressionMode::Include => matched,
            ExpressionMode::Exclude => !matched,
        }
    }
}

/// Keeps events matching a [`FilterSwitch`] (`ControlledBy`).
#[derive(Debug, Clone)]
pub struct SwitchFilter(pub FilterSwitch);

impl Filter for SwitchFilter {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        self.0.is_match(event)
    }
}

/// Keeps events at or above a level (`ByMinimumLevel`).
#[derive(Debug, Clone)]
pub struct LevelFilter(pub LevelGate);

impl Filter for LevelFilter {
    fn is_enabled(&self, event: &LogEvent) -> bool {
        self.0.allows(event.level())
    }
}
