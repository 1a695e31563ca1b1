//! Error types for the Calluna library.
//!
//! All errors are represented by the [`CallunaError`] enum, which provides
//! detailed information about what went wrong.
//!
//! # Examples
//!
//! ```
//! use calluna::error::{CallunaError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     // Return an error
//!     Err(CallunaError::construction("conjunction requires at least one cursor"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use anyhow;
use thiserror::Error;

/// The main error type for Calluna operations.
///
/// This enum represents all possible errors that can occur in the Calluna
/// library. It uses the `thiserror` crate for automatic `Error` trait
/// implementation and provides convenient constructor methods for creating
/// specific error types.
#[derive(Error, Debug)]
pub enum CallunaError {
    /// Invalid cursor or filter composition detected at construction time
    #[error("Construction error: {0}")]
    Construction(String),

    /// Operation attempted on a facet view that has already been closed
    #[error("Use after close: {0}")]
    Closed(String),

    /// A caller broke an ordering or binding contract
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Facet counting or extraction errors
    #[error("Facet error: {0}")]
    Facet(String),

    /// Browse request execution errors
    #[error("Browse error: {0}")]
    Browse(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with CallunaError.
pub type Result<T> = std::result::Result<T, CallunaError>;

impl CallunaError {
    /// Create a new construction error.
    pub fn construction<S: Into<String>>(msg: S) -> Self {
        CallunaError::Construction(msg.into())
    }

    /// Create a new use-after-close error.
    pub fn closed<S: Into<String>>(msg: S) -> Self {
        CallunaError::Closed(msg.into())
    }

    /// Create a new invariant violation error.
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        CallunaError::InvariantViolation(msg.into())
    }

    /// Create a new facet error.
    pub fn facet<S: Into<String>>(msg: S) -> Self {
        CallunaError::Facet(msg.into())
    }

    /// Create a new browse error.
    pub fn browse<S: Into<String>>(msg: S) -> Self {
        CallunaError::Browse(msg.into())
    }
}
