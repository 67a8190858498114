//! Unified error types for the grid workspace
//!
//! [`GridError`] is the common error returned at API boundaries. Crates with
//! their own domain errors (for example the circuit compiler) convert into it
//! so callers can use a single `?` chain.
//!
//! # Example
//!
//! ```ignore
//! use grid_core::{GridError, GridResult};
//!
//! fn compile_and_check(network: &Network) -> GridResult<()> {
//!     let circuit = compile_numerical_circuit_at(network, None)?;
//!     check_islands(&circuit)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for device graph and compilation operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A device references something that does not exist in the graph
    #[error("Reference error: {0}")]
    Reference(String),

    /// Compilation of the numerical model failed
    #[error("Compile error: {0}")]
    Compile(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors
    #[error("Network error: {0}")]
    Network(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(err.to_string())
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}
