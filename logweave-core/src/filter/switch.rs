use std::fmt;
use std::sync::{Arc, RwLock};

use super::expr::Expr;
use crate::error::LogweaveResult;
use crate::event::LogEvent;

struct Current {
    source: String,
    expr: Arc<Expr>,
}

/// A filter expression that can be replaced while the pipeline runs.
///
/// Clones share the same expression. An invalid replacement is rejected and
/// the previous expression stays in effect.
#[derive(Clone)]
pub struct FilterSwitch {
    current: Arc<RwLock<Current>>,
}

impl FilterSwitch {
    pub fn new(source: &str) -> LogweaveResult<Self> {
        let expr = Expr::parse(source)?;
        Ok(Self {
            current: Arc::new(RwLock::new(Current {
                source: source.to_string(),
                expr: Arc::new(expr),
            })),
        })
    }

    /// Current expression source.
    pub fn expression(&self) -> String {
        match self.current.read() {
            Ok(current) => current.source.clone(),
            Err(poisoned) => poisoned.into_inner().source.clone(),
        }
    }

    pub fn set_expression(&self, source: &str) -> LogweaveResult<()> {
        let expr = Arc::new(Expr::parse(source)?);
        let mut current = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        current.source = source.to_string();
        current.expr = expr;
        tracing::debug!(expression = source, "filter switch updated");
        Ok(())
    }

    pub fn is_match(&self, event: &LogEvent) -> bool {
        let expr = match self.current.read() {
            Ok(current) => Arc::clone(&current.expr),
            Err(poisoned) => Arc::clone(&poisoned.into_inner().expr),
        };
        expr.is_match(event)
    }

    pub fn same_switch(&self, other: &FilterSwitch) -> bool {
        Arc::ptr_eq(&self.current, &other.current)
    }
}

impl fmt::Debug for FilterSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilterSwitch").field(&self.expression()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn event(app: &str) -> LogEvent {
        let mut e = LogEvent::from_template(Level::Information, "x", vec![]);
        e.add_or_update_property("Application", app);
        e
    }

    #[test]
    fn test_replacement_visible_to_clones() {
        let switch = FilterSwitch::new("Application = 'Serilog Example'").unwrap();
        let shared = switch.clone();
        assert!(shared.is_match(&event("Serilog Example")));

        switch.set_expression("Application = 'Other'").unwrap();
        assert!(!shared.is_match(&event("Serilog Example")));
        assert!(shared.is_match(&event("Other")));
        assert!(switch.same_switch(&shared));
    }

    #[test]
    fn test_invalid_replacement_keeps_old_expression() {
        let switch = FilterSwitch::new("Application = 'A'").unwrap();
        assert!(switch.set_expression("Application = ").is_err());
        assert_eq!(switch.expression(), "Application = 'A'");
        assert!(switch.is_match(&event("A")));
    }
}
