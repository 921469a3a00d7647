//! Unit3 - directions on the 2-sphere S².
//!
//! A direction has two degrees of freedom. Its tangent plane at `p` is spanned by a
//! point-dependent orthonormal basis `B(p) = [b₁ b₂]` (both columns orthogonal to `p`), and
//! the chart uses the sphere exponential map:
//!
//! ```text
//! retract(p, v)          = cos(‖ξ‖) · p + sin(‖ξ‖) · ξ / ‖ξ‖,   ξ = B(p) · v
//! local_coordinates(p,q) = B(p)ᵀ · θ · (q - ⟨p,q⟩ p) / ‖q - ⟨p,q⟩ p‖,   θ = ∠(p, q)
//! ```

use super::{Manifold, ManifoldError, ManifoldResult, check_tangent_dimension};
use nalgebra::{DVector, Matrix3, Matrix3x2, Unit, Vector2, Vector3};
use std::f64::consts::PI;
use std::fmt;

/// Norm below which a vector cannot be normalized into a direction.
const MIN_DIRECTION_NORM: f64 = 1e-12;

/// Point on the unit sphere S².
#[derive(Debug, Clone, PartialEq)]
pub struct Unit3 {
    direction: Unit<Vector3<f64>>,
}

impl Default for Unit3 {
    /// The x-axis direction `(1, 0, 0)`.
    fn default() -> Self {
        Unit3 {
            direction: Vector3::x_axis(),
        }
    }
}

impl fmt::Display for Unit3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unit3([{:.4}, {:.4}, {:.4}])",
            self.direction.x, self.direction.y, self.direction.z
        )
    }
}

impl Unit3 {
    /// Create a direction by normalizing `vector`.
    ///
    /// # Errors
    /// [`ManifoldError::InvalidElement`] for zero or non-finite vectors.
    pub fn new(vector: Vector3<f64>) -> ManifoldResult<Self> {
        let norm = vector.norm();
        if !norm.is_finite() || norm < MIN_DIRECTION_NORM {
            return Err(ManifoldError::InvalidElement(format!(
                "cannot build a direction from vector with norm {norm}"
            )));
        }
        Ok(Unit3 {
            direction: Unit::new_unchecked(vector / norm),
        })
    }

    /// Generate a random direction, uniformly distributed on the sphere.
    pub fn random() -> Self {
        loop {
            let candidate = Vector3::new(
                rand::random::<f64>() * 2.0 - 1.0,
                rand::random::<f64>() * 2.0 - 1.0,
                rand::random::<f64>() * 2.0 - 1.0,
            );
            let norm = candidate.norm();
            if norm > 0.1 && norm <= 1.0 {
                return Unit3 {
                    direction: Unit::new_unchecked(candidate / norm),
                };
            }
        }
    }

    /// Unit vector of this direction.
    pub fn unit_vector(&self) -> Vector3<f64> {
        self.direction.into_inner()
    }

    /// Orthonormal basis of the tangent plane at this point.
    ///
    /// b₁ is built from the coordinate axis least aligned with `p`, so the basis is
    /// well-conditioned everywhere on the sphere.
    pub fn basis(&self) -> Matrix3x2<f64> {
        let p = self.direction.as_ref();
        let (ax, ay, az) = (p.x.abs(), p.y.abs(), p.z.abs());
        let axis = if ax <= ay && ax <= az {
            Vector3::x()
        } else if ay <= ax && ay <= az {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let b1 = p.cross(&axis).normalize();
        let b2 = p.cross(&b1);
        Matrix3x2::from_columns(&[b1, b2])
    }

    /// Cross-product matrix [p]ₓ.
    pub fn skew(&self) -> Matrix3<f64> {
        let p = self.direction.as_ref();
        Matrix3::new(0.0, -p.z, p.y, p.z, 0.0, -p.x, -p.y, p.x, 0.0)
    }

    /// Angle between two directions.
    pub fn distance(&self, other: &Self) -> f64 {
        let dot = self.direction.dot(&other.direction).clamp(-1.0, 1.0);
        let cross = self.direction.cross(&other.direction).norm();
        cross.atan2(dot)
    }
}

impl Manifold for Unit3 {
    const DIM: usize = 2;

    fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Self> {
        check_tangent_dimension(delta, Self::DIM)?;
        let p = self.unit_vector();
        let xi = self.basis() * Vector2::new(delta[0], delta[1]);
        let theta = xi.norm();
        if theta < f64::EPSILON {
            return Unit3::new(p + xi);
        }
        Unit3::new(theta.cos() * p + xi * (theta.sin() / theta))
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        let p = self.unit_vector();
        let q = other.unit_vector();
        let dot = p.dot(&q).clamp(-1.0, 1.0);
        let perpendicular = q - dot * p;
        let perpendicular_norm = perpendicular.norm();

        if perpendicular_norm < MIN_DIRECTION_NORM {
            // identical or antipodal points
            return if dot > 0.0 {
                DVector::zeros(2)
            } else {
                DVector::from_vec(vec![PI, 0.0])
            };
        }

        let theta = perpendicular_norm.atan2(dot);
        let v = self.basis().transpose() * perpendicular * (theta / perpendicular_norm);
        DVector::from_vec(vec![v.x, v.y])
    }

    fn equals(&self, other: &Self, tolerance: f64) -> bool {
        (self.unit_vector() - other.unit_vector()).norm() < tolerance
    }
}
