//! Manifold-valued parameters for optimization on non-Euclidean spaces.
//!
//! Every parameter type exposes the same local-chart interface so that a generic
//! optimizer can update it with an unconstrained increment vector:
//!
//! Manifold              | dim | X ∈ M                  | retract(δ)                       | tangent order
//! --------------------- | --- | ---------------------- | -------------------------------- | --------------------
//! Scalar `f64`          | 1   | x ∈ R                  | x + δ                            | [δx]
//! Rotation SO(3)        | 3   | R, RᵀR = I             | R · Exp(δ)                       | [θx, θy, θz]
//! Direction S²          | 2   | p ∈ R³, ‖p‖ = 1        | exp_p(B(p) · δ)                  | [a, b]
//! Essential matrix      | 5   | (R, t̂)                 | (R ⊞ δ₀..₃, t̂ ⊞ δ₃..₅)           | [rotation, direction]
//! Fundamental matrix    | 7   | (U, s, V)              | (U ⊞ δ₀..₃, s + δ₃, V ⊞ δ₄..₇)   | [U, s, V]
//! Simple fundamental    | 7   | (E, fa, fb; ca, cb)    | (E ⊞ δ₀..₅, fa + δ₅, fb + δ₆)    | [E, fa, fb]
//!
//! `retract` and `local_coordinates` of a composite manifold slice the tangent vector in the
//! same order; `p.local_coordinates(&p.retract(δ)?) ≈ δ` for small δ.
//!
//! # Example
//!
//! ```
//! use geofactor::manifold::{Manifold, fundamental::FundamentalMatrix, so3::SO3};
//! use nalgebra::DVector;
//!
//! let f = FundamentalMatrix::new(SO3::identity(), 0.5, SO3::identity());
//! let delta = DVector::from_vec(vec![0.01, 0.0, 0.0, 0.1, 0.0, 0.02, 0.0]);
//! let g = f.retract(&delta).unwrap();
//! assert!((f.local_coordinates(&g) - delta).norm() < 1e-9);
//! ```

use nalgebra::{DVector, Matrix3, Point2, Vector3};
use std::fmt::Debug;
use thiserror::Error;

pub mod essential;
pub mod fundamental;
pub mod scalar;
pub mod simple_fundamental;
pub mod so3;
pub mod unit3;

/// Squared-angle threshold below which first-order expansions replace closed forms.
pub const SMALL_ANGLE_THRESHOLD: f64 = 1e-10;

/// Default tolerance used by `equals` comparisons throughout the crate.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Errors that can occur during manifold operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifoldError {
    /// Tangent vector length does not match the manifold dimension
    #[error("Invalid tangent dimension: expected {expected}, got {actual}")]
    InvalidTangentDimension { expected: usize, actual: usize },

    /// Value violates the manifold constraints (e.g. non-orthonormal rotation)
    #[error("Invalid manifold element: {0}")]
    InvalidElement(String),

    /// Operation combined values living on different manifolds
    #[error("Manifold type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Result type for manifold operations.
pub type ManifoldResult<T> = Result<T, ManifoldError>;

/// Local-chart interface shared by every manifold-valued parameter.
///
/// Implementations are immutable values: `retract` produces a new instance and never
/// mutates `self`. All operations are pure, so values can be read from many threads at once.
pub trait Manifold: Clone + Debug + Send + Sync {
    /// Intrinsic degrees of freedom (tangent space dimension).
    const DIM: usize;

    /// Intrinsic degrees of freedom of this value, always `Self::DIM`.
    fn dimension(&self) -> usize {
        Self::DIM
    }

    /// Apply a tangent-space increment and return the resulting point.
    ///
    /// # Errors
    /// [`ManifoldError::InvalidTangentDimension`] if `delta.len() != Self::DIM`.
    fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Self>;

    /// Tangent vector `v` such that `self.retract(v)` reproduces `other`.
    fn local_coordinates(&self, other: &Self) -> DVector<f64>;

    /// Componentwise approximate equality.
    fn equals(&self, other: &Self, tolerance: f64) -> bool;
}

/// Manifold parameters that have a dense 3×3 epipolar matrix view.
pub trait EpipolarGeometry: Manifold {
    /// Dense matrix recomputed from the current state.
    fn matrix(&self) -> Matrix3<f64>;

    /// Algebraic epipolar error `[pa; 1]ᵀ · F · [pb; 1]` for a correspondence.
    fn epipolar_error(&self, pa: &Point2<f64>, pb: &Point2<f64>) -> f64 {
        let ha = Vector3::new(pa.x, pa.y, 1.0);
        let hb = Vector3::new(pb.x, pb.y, 1.0);
        ha.dot(&(self.matrix() * hb))
    }
}

/// Fail with [`ManifoldError::InvalidTangentDimension`] unless `delta` has `expected` entries.
pub fn check_tangent_dimension(delta: &DVector<f64>, expected: usize) -> ManifoldResult<()> {
    if delta.len() != expected {
        return Err(ManifoldError::InvalidTangentDimension {
            expected,
            actual: delta.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tangent_dimension() {
        let delta = DVector::<f64>::zeros(6);
        assert!(check_tangent_dimension(&delta, 6).is_ok());
        assert_eq!(
            check_tangent_dimension(&delta, 7),
            Err(ManifoldError::InvalidTangentDimension {
                expected: 7,
                actual: 6
            })
        );
    }

    #[test]
    fn test_manifold_error_display() {
        let error = ManifoldError::TypeMismatch {
            expected: "SO3",
            actual: "Scalar",
        };
        assert_eq!(
            error.to_string(),
            "Manifold type mismatch: expected SO3, got Scalar"
        );
    }
}
