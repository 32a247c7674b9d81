//! Error types for the attest test execution engine.
//!
//! This module provides the error handling strategy for the engine using
//! `thiserror`. All errors are represented by the [`EngineError`] enum, which
//! distinguishes *specification defects* (expected business outcomes such as
//! a malformed rowcount result) from *infrastructure faults* (backend
//! unreachable, storage failure). Test cases use this split to decide whether
//! a failing execution ends up `Aborted` or `Error`.

use thiserror::Error;

/// The main error type for the attest engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A defect in the test's declarative inputs, e.g. a rowcount query that
    /// does not yield exactly one `expected` and one `actual` row. Surfaced
    /// as an aborted test case, never retried.
    #[error("Specification defect: {0}")]
    SpecificationDefect(String),

    /// A precondition check name that is not registered with the checker.
    #[error("Unknown precondition check: '{0}'")]
    UnknownCheck(String),

    /// A test type with no registered test logic factory.
    #[error("Unknown test type: '{0}'")]
    UnknownTestType(String),

    /// Error raised by a data-platform backend.
    #[error("Backend error: {message}")]
    Backend {
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from the test run storage port.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error when an operation is not supported by the engine or a backend.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, EngineError>`.
///
/// This is the standard `Result` type used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Creates a specification defect error.
    pub fn specification_defect(message: impl Into<String>) -> Self {
        Self::SpecificationDefect(message.into())
    }

    /// Creates a backend error without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a backend error wrapping an underlying source error.
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error is a defect in the declarative test inputs
    /// rather than an infrastructure fault.
    ///
    /// Test cases map specification defects to the `Aborted` status and
    /// everything else to `Error`.
    pub fn is_specification_defect(&self) -> bool {
        matches!(self, Self::SpecificationDefect(_))
    }
}
