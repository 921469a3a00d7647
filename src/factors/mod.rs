//! Residual factors connecting manifold-valued variables.
//!
//! A factor reads a fixed, ordered list of variables from a [`Values`](crate::core::variable::Values)
//! store, produces a raw residual and, on request, one Jacobian block per variable. Weighting is
//! delegated to the factor's [`NoiseModel`].
//!
//! # Module Structure
//!
//! - `linearization`: [`JacobianRequest`] mask and [`Linearization`] result
//! - `velocity_constraint`: constant-velocity constraint `x1 + v·dt − x2 = 0`

use crate::core::{noise_model::NoiseModel, variable::Value};
use std::fmt;
use thiserror::Error;

pub mod linearization;
pub mod velocity_constraint;

pub use linearization::{JacobianRequest, Linearization};
pub use velocity_constraint::VelocityConstraint;

/// Factor evaluation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FactorError {
    #[error("factor expects {expected} variables, got {actual}")]
    VariableCount { expected: usize, actual: usize },

    #[error("variable {index} must be a {expected}, got {actual}")]
    VariableType {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid factor parameter: {0}")]
    InvalidParameter(String),

    #[error("residual has {actual} rows but the noise model expects {expected}")]
    ResidualDimension { expected: usize, actual: usize },
}

pub type FactorResult<T> = Result<T, FactorError>;

/// Common interface for residual factors.
///
/// Factors are immutable once built and may be evaluated concurrently; `linearize` never
/// mutates the factor or the variables it reads.
pub trait Factor: fmt::Debug + Send + Sync + FactorClone {
    /// Keys of the connected variables, in residual/Jacobian order.
    fn keys(&self) -> &[String];

    /// Residual dimension.
    fn residual_dim(&self) -> usize;

    /// Evaluate the raw residual and the requested Jacobian blocks.
    ///
    /// `values` holds the variables named by [`Factor::keys`], in the same order.
    fn linearize(&self, values: &[&Value], request: JacobianRequest)
    -> FactorResult<Linearization>;

    /// Weighting applied to the residual.
    fn noise_model(&self) -> &dyn NoiseModel;

    /// Number of connected variables.
    fn arity(&self) -> usize {
        self.keys().len()
    }
}

/// Owned copy of a boxed factor.
///
/// Implemented for every `Factor + Clone`, so `Box<dyn Factor>` is `Clone` while concrete
/// factors stay plain values.
pub trait FactorClone {
    fn clone_box(&self) -> Box<dyn Factor>;
}

impl<T> FactorClone for T
where
    T: Factor + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn Factor> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Factor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Check the number of variables handed to a factor.
pub fn check_variable_count(values: &[&Value], expected: usize) -> FactorResult<()> {
    if values.len() != expected {
        return Err(FactorError::VariableCount {
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}
