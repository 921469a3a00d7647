//! Error types for the geofactor library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.

use crate::{factors::FactorError, manifold::ManifoldError};
use thiserror::Error;

/// Main result type used throughout the geofactor library
pub type GeofactorResult<T> = Result<T, GeofactorError>;

/// Main error type for the geofactor library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofactorError {
    /// Manifold operations errors (retract, local coordinates, construction)
    #[error("Manifold error: {0}")]
    Manifold(String),

    /// Factor evaluation errors
    #[error("Factor error: {0}")]
    Factor(String),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A variable referenced by a factor is missing from the value store
    #[error("Missing variable: {0}")]
    MissingVariable(String),
}

// Convert module-specific errors to GeofactorError

impl From<ManifoldError> for GeofactorError {
    fn from(err: ManifoldError) -> Self {
        GeofactorError::Manifold(err.to_string())
    }
}

impl From<FactorError> for GeofactorError {
    fn from(err: FactorError) -> Self {
        GeofactorError::Factor(err.to_string())
    }
}
