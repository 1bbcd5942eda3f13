// src/error.rs
//! Unified error handling for calo-core
//!
//! Every fallible operation in the crate returns [`CaloResult`]. Each variant
//! carries an [`ErrorContext`] naming the component and operation that failed,
//! so an error surfacing from a study case still points at the solve or the
//! file that produced it.
//!
//! An infeasible filter solution is *not* an error: it is reported through
//! [`crate::processing::filters::SolutionStatus`] alongside the weights.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for amplitude reconstruction
#[derive(Debug, Error)]
pub enum CaloError {
    /// A coefficient vector disagrees with the declared filter width
    #[error("[DIMENSION] '{vector}' has length {actual}, expected {expected} ({context})")]
    DimensionMismatch {
        /// Name of the offending vector
        vector: &'static str,
        /// Declared length
        expected: usize,
        /// Length received
        actual: usize,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// A linear solve hit a non-invertible matrix
    #[error("[SOLVE] {system} is singular: {reason} ({context})")]
    SingularSystem {
        /// System being solved
        system: &'static str,
        /// What went wrong
        reason: String,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Array shapes disagree between estimated and reference sequences
    #[error("[SHAPE] {what}: expected {expected}, got {actual} ({context})")]
    ShapeMismatch {
        /// Sequence being checked
        what: &'static str,
        /// Required shape or length
        expected: String,
        /// Shape or length received
        actual: String,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Invalid configuration or estimator inputs
    #[error("[CONFIG] {reason} ({context})")]
    Configuration {
        /// What went wrong
        reason: String,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Requested file or directory does not exist
    #[error("[IO] {} does not exist ({context})", path.display())]
    NotFound {
        /// File or directory involved
        path: PathBuf,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Target directory is not writable
    #[error("[IO] no write permission in {} ({context})", path.display())]
    PermissionDenied {
        /// File or directory involved
        path: PathBuf,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Underlying filesystem failure
    #[error("[IO] error accessing {}: {source} ({context})", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Malformed numeric or configuration text
    #[error("[PARSE] {}:{line}: {reason} ({context})", path.display())]
    Parse {
        /// File or directory involved
        path: PathBuf,
        /// 1-based line, 0 when unknown
        line: usize,
        /// What went wrong
        reason: String,
        /// Where the error was raised
        context: ErrorContext,
    },
}

/// Where an error was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Module that raised the error
    pub component: String,
    /// Operation within the module
    pub operation: String,
    /// Source file, when recorded by `error_context!`
    pub file: Option<&'static str>,
    /// Source line, when recorded by `error_context!`
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}::{} at {}:{}", self.component, self.operation, file, line)
            }
            _ => write!(f, "{}::{}", self.component, self.operation),
        }
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

/// Result type alias for calo-core operations
pub type CaloResult<T> = Result<T, CaloError>;

impl CaloError {
    /// Classify an I/O failure on `path`
    pub fn from_io(source: std::io::Error, path: impl Into<PathBuf>, component: &str, operation: &str) -> Self {
        let path = path.into();
        let context = ErrorContext::new(component, operation);
        match source.kind() {
            std::io::ErrorKind::NotFound => CaloError::NotFound { path, context },
            std::io::ErrorKind::PermissionDenied => CaloError::PermissionDenied { path, context },
            _ => CaloError::Io { path, source, context },
        }
    }

    /// Short, stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CaloError::DimensionMismatch { .. } => "DimensionMismatch",
            CaloError::SingularSystem { .. } => "SingularSystem",
            CaloError::ShapeMismatch { .. } => "ShapeMismatch",
            CaloError::Configuration { .. } => "Configuration",
            CaloError::NotFound { .. } => "NotFound",
            CaloError::PermissionDenied { .. } => "PermissionDenied",
            CaloError::Io { .. } => "Io",
            CaloError::Parse { .. } => "Parse",
        }
    }

    /// Context of the failing operation
    pub fn context(&self) -> &ErrorContext {
        match self {
            CaloError::DimensionMismatch { context, .. }
            | CaloError::SingularSystem { context, .. }
            | CaloError::ShapeMismatch { context, .. }
            | CaloError::Configuration { context, .. }
            | CaloError::NotFound { context, .. }
            | CaloError::PermissionDenied { context, .. }
            | CaloError::Io { context, .. }
            | CaloError::Parse { context, .. } => context,
        }
    }
}

/// Error builder for convenient error construction
pub struct CaloErrorBuilder {
    component: String,
    operation: String,
}

impl CaloErrorBuilder {
    /// Builder for errors raised by `component::operation`
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
        }
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::new(&self.component, &self.operation)
    }

    /// [`CaloError::DimensionMismatch`]
    pub fn dimension_mismatch(self, vector: &'static str, expected: usize, actual: usize) -> CaloError {
        CaloError::DimensionMismatch {
            vector,
            expected,
            actual,
            context: self.context(),
        }
    }

    /// [`CaloError::SingularSystem`]
    pub fn singular(self, system: &'static str, reason: &str) -> CaloError {
        CaloError::SingularSystem {
            system,
            reason: reason.to_string(),
            context: self.context(),
        }
    }

    /// [`CaloError::ShapeMismatch`]
    pub fn shape_mismatch<E: ToString, A: ToString>(
        self,
        what: &'static str,
        expected: E,
        actual: A,
    ) -> CaloError {
        CaloError::ShapeMismatch {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
            context: self.context(),
        }
    }

    /// [`CaloError::Configuration`]
    pub fn configuration(self, reason: &str) -> CaloError {
        CaloError::Configuration {
            reason: reason.to_string(),
            context: self.context(),
        }
    }
}

/// Convenience trait for attaching a path to I/O failures
pub trait IntoCaloError<T> {
    /// Map an I/O error on `path` to the matching [`CaloError`] variant
    fn calo_err(self, path: impl Into<PathBuf>, component: &str, operation: &str) -> CaloResult<T>;
}

impl<T> IntoCaloError<T> for Result<T, std::io::Error> {
    fn calo_err(self, path: impl Into<PathBuf>, component: &str, operation: &str) -> CaloResult<T> {
        self.map_err(|source| CaloError::from_io(source, path, component, operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("filters", "go_filtering");
        assert_eq!(context.component, "filters");
        assert_eq!(context.operation, "go_filtering");
        assert!(context.file.is_none());
    }

    #[test]
    fn test_error_context_macro_records_location() {
        let context = error_context!("of2", "solve");
        assert_eq!(context.file, Some(file!()));
        assert!(context.line.is_some());
        assert!(context.to_string().starts_with("of2::solve at"));
    }

    #[test]
    fn test_error_builder() {
        let err = CaloErrorBuilder::new("filter_spec", "new").dimension_mismatch("t_filter", 7, 5);

        match &err {
            CaloError::DimensionMismatch { vector, expected, actual, context } => {
                assert_eq!(*vector, "t_filter");
                assert_eq!(*expected, 7);
                assert_eq!(*actual, 5);
                assert_eq!(context.component, "filter_spec");
            }
            _ => panic!("Expected dimension mismatch"),
        }
        assert_eq!(err.kind(), "DimensionMismatch");
    }

    #[test]
    fn test_error_display() {
        let err = CaloErrorBuilder::new("statistics", "compare_amplitudes")
            .shape_mismatch("estimated amplitudes", 13, 12);

        let display = format!("{}", err);
        assert!(display.contains("SHAPE"));
        assert!(display.contains("estimated amplitudes"));
        assert!(display.contains("13"));
        assert!(display.contains("12"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CaloError>();
    }

    #[test]
    fn test_io_error_conversion() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));

        let err = result.calo_err("data/missing.csv", "io", "read").unwrap_err();
        match err {
            CaloError::NotFound { path, .. } => assert_eq!(path, PathBuf::from("data/missing.csv")),
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk on fire",
        ));
        let err = result.calo_err("out.csv", "io", "write").unwrap_err();
        assert_eq!(err.kind(), "Io");
        assert!(std::error::Error::source(&err).is_some());
    }
}
