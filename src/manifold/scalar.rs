//! Scalars as a one-dimensional Euclidean manifold.
//!
//! Positions and velocities in dynamics constraints are plain `f64` variables; giving them
//! the [`Manifold`] interface lets the optimizer treat them like any other parameter.

use super::{Manifold, ManifoldResult, check_tangent_dimension};
use nalgebra::DVector;

impl Manifold for f64 {
    const DIM: usize = 1;

    fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Self> {
        check_tangent_dimension(delta, Self::DIM)?;
        Ok(self + delta[0])
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        DVector::from_element(1, other - self)
    }

    fn equals(&self, other: &Self, tolerance: f64) -> bool {
        (self - other).abs() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::ManifoldError;

    #[test]
    fn test_scalar_retract_is_addition() -> Result<(), ManifoldError> {
        let x = 2.0_f64;
        let y = x.retract(&DVector::from_element(1, 0.25))?;
        assert_eq!(y, 2.25);
        assert_eq!(x.local_coordinates(&y)[0], 0.25);
        Ok(())
    }

    #[test]
    fn test_scalar_rejects_wrong_dimension() {
        let result = 1.0_f64.retract(&DVector::zeros(2));
        assert!(matches!(
            result,
            Err(ManifoldError::InvalidTangentDimension {
                expected: 1,
                actual: 2
            })
        ));
    }
}
