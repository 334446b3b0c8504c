//! logweave-core: a structured log event pipeline
//!
//! Application code emits events as a level, a message template and
//! arguments. Each event flows through a fixed pipeline:
//!
//! ```text
//! level gate → enrichers → filters → destructuring → sink router
//! ```
//!
//! # Features
//!
//! - **Message templates**: `"Hello, {name}!"` with named/positional holes,
//!   capture hints (`{@obj}`, `{$obj}`), alignment and format specifiers
//! - **Structured capture**: any `serde::Serialize` type becomes a property
//!   value, bounded by depth, string length and collection count caps
//! - **Destructuring policies**: first matching policy wins (typed
//!   conversions, property masking)
//! - **Enrichment**: fixed properties, thread and machine identity, ambient
//!   log context, level-restricted and conditional enrichers
//! - **Filtering**: closures, a small expression language, filter switches
//! - **Level switches**: shared minimum levels changeable at runtime
//! - **Sink routing**: per-sink gates and fault isolation; console, file,
//!   async, conditional and sub-logger sinks
//! - **Configuration**: TOML/JSON documents resolved through a registry
//!
//! # Quick Start
//!
//! Use the [`prelude`] module for convenient imports:
//!
//! ```rust,ignore
//! use logweave_core::prelude::*;
//!
//! let logger = LoggerConfiguration::new()
//!     .minimum_level(Level::Debug)
//!     .enrich(ThreadIdEnricher)
//!     .write_to(ConsoleSink::stdout(Arc::new(OutputTemplate::default())))
//!     .create_logger();
//!
//! logger.information("Hello, {name}!", args!["World"]);
//! ```
//!
//! # Module Organization
//!
//! - [`level`]: Severity levels, level switches and gates
//! - [`value`]: Captured property values
//! - [`capture`]: Destructuring of call-site arguments
//! - [`template`]: Message template parsing, binding and rendering
//! - [`event`]: The log event and its property bag
//! - [`enrich`]: Enrichers and the ambient log context
//! - [`filter`]: Filters and the expression language
//! - [`format`]: Output templates and compact JSON
//! - [`sink`]: Sinks and the sink router
//! - [`pipeline`]: The processing pipeline
//! - [`logger`]: The application-facing logger
//! - [`builder`]: Fluent builder API for configuration in code
//! - [`config`]: Configuration documents and the component registry
//! - [`logging`]: Self-diagnostics via tracing
//! - [`error`]: Typed error handling
//!
//! # Cargo Features
//!
//! - `file` (default): Enable the file sink
//! - `async-sink` (default): Enable the background-thread wrapper sink
//! - `full`: Enable all optional features

pub mod builder;
pub mod capture;
pub mod config;
pub mod enrich;
pub mod error;
pub mod event;
pub mod filter;
pub mod format;
pub mod level;
pub mod logger;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod sink;
pub mod template;
pub mod value;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{ComponentKind, IoResultExt, LogweaveError, LogweaveResult, SinkError};

// Levels
pub use level::{Level, LevelGate, LevelSwitch};

// Values and capture
pub use capture::{
    Arg, Capture, CaptureHint, Destructurer, DestructuringLimits, DestructuringPolicy,
    MaskPropertiesPolicy, TypedPolicy, DEFAULT_MAX_DEPTH,
};
pub use value::{Property, Scalar, Value, TRUNCATION_MARKER};

// Templates and events
pub use event::{EventError, LogEvent, Properties};
pub use template::{MessageStyle, MessageTemplate, TemplateCache};

// Enrichment
pub use enrich::{
    ConditionalEnricher, Enricher, EventPredicate, LevelRestrictedEnricher, LogContext,
    LogContextEnricher, LogContextGuard, MachineNameEnricher, PropertyEnricher, ThreadIdEnricher,
    ThreadNameEnricher,
};

// Filtering
pub use filter::{Expr, ExpressionFilter, Filter, FilterSwitch, LevelFilter, SwitchFilter};

// Formatting
pub use format::{CompactJsonFormatter, Formatter, OutputTemplate, DEFAULT_OUTPUT_TEMPLATE};

// Sinks
pub use sink::{ConditionalSink, ConsoleSink, MemorySink, Sink, SinkRouter, SubLoggerSink};

// Pipeline and logger
pub use builder::LoggerConfiguration;
pub use logger::{Logger, Switches};
pub use pipeline::{LevelOverride, Pipeline, SOURCE_CONTEXT_PROPERTY};

// Configuration
pub use config::{find_config, load_config, ComponentConfig, LoggerConfig, Registry};

// Logging
pub use logging::init_self_diagnostics;

// Feature-gated re-exports
#[cfg(feature = "file")]
pub use sink::FileSink;

#[cfg(feature = "async-sink")]
pub use sink::{AsyncSink, DEFAULT_BUFFER_SIZE};

/// Build the argument list for a log call.
///
/// Scalars and strings convert directly; wrap structured values with
/// [`Arg::capture`].
///
/// ```rust,ignore
/// logger.information("{user} bought {@item}", args!["bill", Arg::capture(item)]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}
