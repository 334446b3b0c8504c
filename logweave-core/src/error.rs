//! Typed error handling for logweave.
//!
//! Errors only surface while a pipeline is being *built* (configuration
//! faults) or from the few fallible helpers around it (config loading, file
//! sink creation). Once a [`Logger`](crate::Logger) exists, emitting an event
//! never returns an error: sink faults are isolated by the router and reported
//! on the self-diagnostic channel instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for logweave operations.
#[derive(Error, Debug)]
pub enum LogweaveError {
    /// I/O error when reading configuration or opening a sink target
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Malformed configuration document
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// A configuration entry names a component that is not registered
    #[error("Unknown {kind} '{name}'")]
    UnknownComponent { kind: ComponentKind, name: String },

    /// A component's arguments could not be interpreted
    #[error("Invalid arguments for '{component}': {message}")]
    InvalidArgument { component: String, message: String },

    /// A level string that does not name a severity
    #[error("Invalid level '{0}'")]
    InvalidLevel(String),

    /// Reference to a level or filter switch that was never declared
    #[error("Unknown switch '{0}'")]
    UnknownSwitch(String),

    /// A switch name declared twice, possibly in a nested logger
    #[error("Switch '{0}' is already declared")]
    DuplicateSwitch(String),

    /// Filter expression syntax error
    #[error("Invalid expression '{source_text}' at {position}: {message}")]
    Expression {
        source_text: String,
        message: String,
        /// Byte offset into `source_text`
        position: usize,
    },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// The registry namespace a component name is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Enricher,
    Filter,
    Policy,
    Destructure,
    Sink,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enricher => write!(f, "enricher"),
            Self::Filter => write!(f, "filter"),
            Self::Policy => write!(f, "destructuring policy"),
            Self::Destructure => write!(f, "destructure directive"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

impl LogweaveError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-component error.
    pub fn unknown(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self::UnknownComponent {
            kind,
            name: name.into(),
        }
    }

    /// Create an invalid-argument error for a named component.
    pub fn invalid_argument(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an expression syntax error.
    pub fn expression(
        source_text: impl Into<String>,
        message: impl Into<String>,
        position: usize,
    ) -> Self {
        Self::Expression {
            source_text: source_text.into(),
            message: message.into(),
            position,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a programmer error in the pipeline configuration.
    ///
    /// These are raised at build time and are expected to abort startup.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::UnknownComponent { .. }
                | Self::InvalidArgument { .. }
                | Self::InvalidLevel(_)
                | Self::UnknownSwitch(_)
                | Self::DuplicateSwitch(_)
                | Self::Expression { .. }
        )
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for logweave results.
pub type LogweaveResult<T> = Result<T, LogweaveError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> LogweaveResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> LogweaveResult<T> {
        self.map_err(|e| LogweaveError::io(path, e))
    }
}

/// Failure raised by a sink while writing or flushing.
///
/// Never crosses the router boundary; see [`SinkRouter`](crate::sink::SinkRouter).
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("formatting failed: {0}")]
    Format(String),

    #[error("sink closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error() {
        let err = LogweaveError::io(
            PathBuf::from("/var/log/app.log"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, LogweaveError::Io { .. }));
        assert_eq!(err.path(), Some(&PathBuf::from("/var/log/app.log")));
        assert!(err.to_string().contains("/var/log/app.log"));
    }

    #[test]
    fn test_unknown_component_message() {
        let err = LogweaveError::unknown(ComponentKind::Sink, "Seq");
        assert_eq!(err.to_string(), "Unknown sink 'Seq'");
    }

    #[test]
    fn test_expression_error_position() {
        let err = LogweaveError::expression("A = ", "expected a value", 4);
        if let LogweaveError::Expression { position, .. } = &err {
            assert_eq!(*position, 4);
        } else {
            panic!("Expected Expression error");
        }
    }

    #[test]
    fn test_is_configuration_fault() {
        assert!(LogweaveError::InvalidLevel("Loud".into()).is_configuration_fault());
        assert!(LogweaveError::UnknownSwitch("$x".into()).is_configuration_fault());
        assert!(!LogweaveError::internal("boom").is_configuration_fault());
    }

    #[test]
    fn test_io_result_ext() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let mapped = result.with_path("/missing/logweave.toml");
        assert!(mapped.is_err());
    }
}
