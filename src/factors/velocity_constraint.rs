//! Constant-velocity consistency constraint between two scalar positions.
//!
//! Connects two positions `x1`, `x2` and a velocity `v` through a fixed time step:
//!
//! ```text
//! r = x1 + v · dt − x2
//! ```
//!
//! The residual is linear in all three variables, so the Jacobians are constants:
//!
//! ```text
//! ∂r/∂x1 = [1],   ∂r/∂x2 = [−1],   ∂r/∂v = [dt]
//! ```
//!
//! The constraint is enforced through a [`ConstrainedNoise`] with penalty weight `mu`.
//!
//! # Example
//!
//! ```
//! use geofactor::factors::{JacobianRequest, VelocityConstraint};
//!
//! let factor = VelocityConstraint::new("x1", "x2", "v", 0.1, 1000.0).unwrap();
//! let linearization = factor.evaluate_error(2.0, 2.2, 2.0, JacobianRequest::all(3));
//! assert!(linearization.residual[0].abs() < 1e-12);
//! ```

use super::{
    Factor, FactorError, FactorResult, JacobianRequest, Linearization, check_variable_count,
};
use crate::core::noise_model::{ConstrainedNoise, DEFAULT_CONSTRAINT_MU, NoiseModel};
use crate::core::variable::Value;
use crate::error::{GeofactorError, GeofactorResult};
use nalgebra::{DMatrix, DVector};
use tracing::warn;

/// Hard constraint `x1 + v·dt = x2` over three scalar variables.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityConstraint {
    keys: [String; 3],
    dt: f64,
    noise: ConstrainedNoise,
}

impl VelocityConstraint {
    /// Create a constraint between positions `key1`, `key2` and velocity `vel_key`.
    ///
    /// # Arguments
    ///
    /// * `dt` - Time step between the two positions, fixed for the life of the factor
    /// * `mu` - Penalty weight of the hard constraint
    ///
    /// # Errors
    ///
    /// [`GeofactorError::InvalidInput`] if `mu` is not positive or `dt`/`mu` are not finite.
    pub fn new(
        key1: impl Into<String>,
        key2: impl Into<String>,
        vel_key: impl Into<String>,
        dt: f64,
        mu: f64,
    ) -> GeofactorResult<Self> {
        if !dt.is_finite() {
            warn!("rejecting velocity constraint with dt = {dt}");
            return Err(GeofactorError::InvalidInput(format!(
                "time step must be finite, got {dt}"
            )));
        }
        let noise = ConstrainedNoise::all(1, mu)?;
        Ok(VelocityConstraint {
            keys: [key1.into(), key2.into(), vel_key.into()],
            dt,
            noise,
        })
    }

    /// Create a constraint with the default penalty weight.
    pub fn with_default_mu(
        key1: impl Into<String>,
        key2: impl Into<String>,
        vel_key: impl Into<String>,
        dt: f64,
    ) -> GeofactorResult<Self> {
        Self::new(key1, key2, vel_key, dt, DEFAULT_CONSTRAINT_MU)
    }

    /// Time step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Penalty weight.
    pub fn mu(&self) -> f64 {
        self.noise.mu()[0]
    }

    /// Residual and requested Jacobians at `(x1, x2, v)`.
    pub fn evaluate_error(
        &self,
        x1: f64,
        x2: f64,
        v: f64,
        request: JacobianRequest,
    ) -> Linearization {
        let residual = DVector::from_element(1, x1 + v * self.dt - x2);
        let jacobians = [1.0, -1.0, self.dt]
            .iter()
            .enumerate()
            .map(|(i, &d)| request.contains(i).then(|| DMatrix::from_element(1, 1, d)))
            .collect();
        Linearization::new(residual, jacobians)
    }
}

fn scalar_at(values: &[&Value], index: usize) -> FactorResult<f64> {
    values[index]
        .as_scalar()
        .ok_or_else(|| FactorError::VariableType {
            index,
            expected: "scalar",
            actual: values[index].type_name(),
        })
}

impl Factor for VelocityConstraint {
    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn residual_dim(&self) -> usize {
        1
    }

    fn linearize(
        &self,
        values: &[&Value],
        request: JacobianRequest,
    ) -> FactorResult<Linearization> {
        check_variable_count(values, 3)?;
        let x1 = scalar_at(values, 0)?;
        let x2 = scalar_at(values, 1)?;
        let v = scalar_at(values, 2)?;
        Ok(self.evaluate_error(x1, x2, v, request))
    }

    fn noise_model(&self) -> &dyn NoiseModel {
        &self.noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::so3::SO3;
    use nalgebra::dmatrix;

    const TOLERANCE: f64 = 1e-12;

    fn factor() -> VelocityConstraint {
        VelocityConstraint::new("x1", "x2", "v", 0.1, 1000.0).unwrap()
    }

    #[test]
    fn test_velocity_residual_and_jacobians() {
        let linearization = factor().evaluate_error(2.0, 2.2, 2.0, JacobianRequest::all(3));
        assert_eq!(linearization.residual.len(), 1);
        assert!(linearization.residual[0].abs() < TOLERANCE);
        assert_eq!(linearization.jacobian(0), Some(&dmatrix![1.0]));
        assert_eq!(linearization.jacobian(1), Some(&dmatrix![-1.0]));
        assert_eq!(linearization.jacobian(2), Some(&dmatrix![0.1]));
    }

    #[test]
    fn test_velocity_jacobians_independent_of_operating_point() {
        let f = factor();
        let first = f.evaluate_error(2.0, 2.2, 2.0, JacobianRequest::all(3));
        let second = f.evaluate_error(-7.5, 3.0, 42.0, JacobianRequest::all(3));
        assert!((second.residual[0] - (-7.5 + 4.2 - 3.0)).abs() < TOLERANCE);
        assert_eq!(first.jacobians, second.jacobians);
    }

    #[test]
    fn test_velocity_partial_request() {
        let f = factor();
        let full = f.evaluate_error(1.0, 1.5, 3.0, JacobianRequest::all(3));
        let partial = f.evaluate_error(1.0, 1.5, 3.0, JacobianRequest::only(2));
        let none = f.evaluate_error(1.0, 1.5, 3.0, JacobianRequest::none());

        assert_eq!(partial.residual, full.residual);
        assert_eq!(none.residual, full.residual);
        assert!(partial.jacobian(0).is_none());
        assert!(partial.jacobian(1).is_none());
        assert_eq!(partial.jacobian(2), Some(&dmatrix![0.1]));
        assert!(none.jacobians.iter().all(Option::is_none));
    }

    #[test]
    fn test_velocity_linearize_reads_values() {
        let (x1, x2, v) = (Value::Scalar(2.0), Value::Scalar(2.2), Value::Scalar(2.0));
        let linearization = factor()
            .linearize(&[&x1, &x2, &v], JacobianRequest::all(3))
            .unwrap();
        assert!(linearization.residual[0].abs() < TOLERANCE);
        assert_eq!(linearization.stacked_jacobian(), Some(dmatrix![1.0, -1.0, 0.1]));
    }

    #[test]
    fn test_velocity_linearize_rejects_bad_variables() {
        let f = factor();
        let x = Value::Scalar(1.0);
        assert_eq!(
            f.linearize(&[&x, &x], JacobianRequest::none()),
            Err(FactorError::VariableCount {
                expected: 3,
                actual: 2
            })
        );

        let rotation = Value::Rotation(SO3::identity());
        assert_eq!(
            f.linearize(&[&x, &x, &rotation], JacobianRequest::none()),
            Err(FactorError::VariableType {
                index: 2,
                expected: "scalar",
                actual: "rotation"
            })
        );
    }

    #[test]
    fn test_velocity_clone_independence() {
        let original: Box<dyn Factor> = Box::new(factor());
        let copy = original.clone();
        drop(original);

        assert_eq!(copy.keys(), ["x1", "x2", "v"]);
        let (x1, x2, v) = (Value::Scalar(2.0), Value::Scalar(2.2), Value::Scalar(2.0));
        let linearization = copy
            .linearize(&[&x1, &x2, &v], JacobianRequest::all(3))
            .unwrap();
        assert!(linearization.residual[0].abs() < TOLERANCE);
        assert_eq!(linearization.jacobian(2), Some(&dmatrix![0.1]));
    }

    #[test]
    fn test_velocity_rejects_non_positive_mu() {
        for mu in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                VelocityConstraint::new("a", "b", "v", 0.1, mu),
                Err(GeofactorError::InvalidInput(_))
            ));
        }
        assert!(VelocityConstraint::new("a", "b", "v", f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_velocity_default_mu() {
        let f = VelocityConstraint::with_default_mu("a", "b", "v", 0.5).unwrap();
        assert_eq!(f.mu(), 1000.0);
        assert_eq!(f.dt(), 0.5);
        assert!(f.noise_model().is_constrained());
        assert_eq!(f.residual_dim(), 1);
        assert_eq!(f.arity(), 3);
    }

    #[test]
    fn test_velocity_weighted_error() {
        let f = factor();
        let linearization = f.evaluate_error(0.0, 0.1, 0.0, JacobianRequest::none());
        let error = f.noise_model().error(&linearization.residual);
        assert!((error - 0.5 * 1000.0 * 0.01).abs() < 1e-9);
    }
}
