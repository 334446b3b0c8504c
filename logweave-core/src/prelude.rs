//! Prelude module for convenient imports.
//!
//! Import commonly used types with a single line:
//!
//! ```rust,ignore
//! use logweave_core::prelude::*;
//! ```
//!
//! This covers building a logger, emitting events and writing custom
//! components, without the lower-level formatting and template items.

pub use std::sync::Arc;

pub use crate::args;

// Events and values
pub use crate::capture::{Arg, Destructurer, DestructuringPolicy, MaskPropertiesPolicy, TypedPolicy};
pub use crate::event::LogEvent;
pub use crate::level::{Level, LevelSwitch};
pub use crate::value::{Property, Scalar, Value};

// Pipeline components
pub use crate::enrich::{
    Enricher, LogContext, MachineNameEnricher, ThreadIdEnricher, ThreadNameEnricher,
};
pub use crate::filter::{ExpressionFilter, Filter, FilterSwitch};
pub use crate::format::{CompactJsonFormatter, OutputTemplate};
pub use crate::sink::{ConsoleSink, MemorySink, Sink, SubLoggerSink};

// Building
pub use crate::builder::LoggerConfiguration;
pub use crate::config::{load_config, LoggerConfig, Registry};
pub use crate::logger::Logger;

// Errors
pub use crate::error::{LogweaveError, LogweaveResult};
