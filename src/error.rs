//! Error types for the Halberd library.
//!
//! Two classes of failure exist in the compiler. Structural absence (an unbound
//! fragment, a dangling reference, a composite without children) is never an
//! error: the affected subtree is pruned. Contract violations (a serializer
//! invoked on the wrong variant, an accessor a bucket cannot answer) are always
//! reported through [`HalberdError`].
//!
//! # Examples
//!
//! ```
//! use halberd::error::{HalberdError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(HalberdError::config("span size must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::aggregation::BucketType;
use crate::query::QueryType;

/// The main error type for Halberd operations.
#[derive(Error, Debug)]
pub enum HalberdError {
    /// I/O errors (reading fragment or mapping files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A serializer was invoked on a node of another variant.
    #[error("Type mismatch: expected {expected} query, got {actual}")]
    TypeMismatch {
        expected: QueryType,
        actual: QueryType,
    },

    /// A bucket serializer was invoked on a bucket of another variant.
    #[error("Type mismatch: expected {expected} bucket, got {actual}")]
    BucketTypeMismatch {
        expected: BucketType,
        actual: BucketType,
    },

    /// A bucket was asked for something its variant cannot provide.
    #[error("Bucket type {bucket} does not support {accessor}")]
    UnsupportedAccessor {
        bucket: BucketType,
        accessor: &'static str,
    },

    /// Recursive assembly went deeper than allowed.
    #[error("Recursion limit of {0} exceeded")]
    RecursionLimit(usize),

    /// A query could not be built from the given input.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with HalberdError.
pub type Result<T> = std::result::Result<T, HalberdError>;

impl HalberdError {
    /// Create a new type mismatch error.
    pub fn type_mismatch(expected: QueryType, actual: QueryType) -> Self {
        HalberdError::TypeMismatch { expected, actual }
    }

    /// Create a new bucket type mismatch error.
    pub fn bucket_type_mismatch(expected: BucketType, actual: BucketType) -> Self {
        HalberdError::BucketTypeMismatch { expected, actual }
    }

    /// Create a new invalid query error.
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        HalberdError::InvalidQuery(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HalberdError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HalberdError::Other(msg.into())
    }

    /// Whether this error signals a programming or configuration bug rather than bad input.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            HalberdError::TypeMismatch { .. }
                | HalberdError::BucketTypeMismatch { .. }
                | HalberdError::UnsupportedAccessor { .. }
                | HalberdError::RecursionLimit(_)
        )
    }
}
