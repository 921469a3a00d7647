//! Residual and per-variable Jacobian blocks produced by a factor evaluation.

use nalgebra::{DMatrix, DVector};

/// Selects which per-variable Jacobians a factor evaluation should fill in.
///
/// Bit `i` requests the Jacobian with respect to the factor's `i`-th variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JacobianRequest(u64);

impl JacobianRequest {
    /// Request no Jacobians, residual only.
    pub const fn none() -> Self {
        JacobianRequest(0)
    }

    /// Request every Jacobian of an `arity`-variable factor.
    pub fn all(arity: usize) -> Self {
        if arity >= 64 {
            JacobianRequest(u64::MAX)
        } else {
            JacobianRequest((1u64 << arity) - 1)
        }
    }

    /// Request only the Jacobian of variable `index`.
    pub fn only(index: usize) -> Self {
        JacobianRequest::none().with(index)
    }

    /// Add variable `index` to the request.
    pub fn with(self, index: usize) -> Self {
        if index >= 64 {
            return self;
        }
        JacobianRequest(self.0 | (1u64 << index))
    }

    /// Whether the Jacobian for variable `index` is requested.
    pub fn contains(&self, index: usize) -> bool {
        index < 64 && self.0 & (1u64 << index) != 0
    }

    /// Whether any Jacobian is requested.
    pub fn any(&self) -> bool {
        self.0 != 0
    }
}

/// Residual plus optional Jacobian blocks, one slot per factor variable.
///
/// `jacobians[i]` has `residual.len()` rows and as many columns as variable `i` has
/// tangent dimensions. Unrequested slots are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Linearization {
    pub residual: DVector<f64>,
    pub jacobians: Vec<Option<DMatrix<f64>>>,
}

impl Linearization {
    pub fn new(residual: DVector<f64>, jacobians: Vec<Option<DMatrix<f64>>>) -> Self {
        Linearization {
            residual,
            jacobians,
        }
    }

    /// Jacobian with respect to variable `index`, if it was computed.
    pub fn jacobian(&self, index: usize) -> Option<&DMatrix<f64>> {
        self.jacobians.get(index).and_then(Option::as_ref)
    }

    /// Concatenate the computed blocks horizontally, in variable order.
    ///
    /// Returns `None` unless every block is present.
    pub fn stacked_jacobian(&self) -> Option<DMatrix<f64>> {
        let blocks: Option<Vec<&DMatrix<f64>>> =
            self.jacobians.iter().map(Option::as_ref).collect();
        let blocks = blocks?;
        let rows = self.residual.len();
        let cols = blocks.iter().map(|b| b.ncols()).sum();
        let mut stacked = DMatrix::zeros(rows, cols);
        let mut col = 0;
        for block in blocks {
            stacked.columns_mut(col, block.ncols()).copy_from(block);
            col += block.ncols();
        }
        Some(stacked)
    }
}
