//! Turning events into text.
//!
//! Two formatters ship with the crate: [`OutputTemplate`] for human-readable
//! lines and [`CompactJsonFormatter`] for one JSON object per line.

mod json;
mod output;
pub mod timestamp;

pub use json::CompactJsonFormatter;
pub use output::{OutputTemplate, DEFAULT_OUTPUT_TEMPLATE};

use crate::event::LogEvent;

/// Renders an event into `out`. Formatting never fails; values that cannot
/// be rendered were already degraded during capture.
pub trait Formatter: Send + Sync {
    fn format(&self, event: &LogEvent, out: &mut String);

    fn format_to_string(&self, event: &LogEvent) -> String {
        let mut out = String::new();
        self.format(event, &mut out);
        out
    }
}

/// Render an error and its `source()` chain on one line each.
pub fn render_error_chain(error: &(dyn std::error::Error + 'static), out: &mut String) {
    out.push_str(&error.to_string());
    let mut source = error.source();
    while let Some(inner) = source {
        out.push_str("\n ---> ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
}
