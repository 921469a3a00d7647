//! Essential matrix manifold: calibrated two-view relative pose up to scale.
//!
//! An essential matrix is parameterized by a rotation `R ∈ SO(3)` and a translation
//! direction `t̂ ∈ S²`, giving 5 degrees of freedom. The dense view is `E = [t̂]ₓ · R`.
//! Tangent vectors are ordered `[rotation (3), direction (2)]`.

use super::{Manifold, ManifoldResult, check_tangent_dimension, so3::SO3, unit3::Unit3};
use nalgebra::{DVector, Matrix3, Vector3};
use std::fmt;

/// Essential matrix as a (rotation, direction) pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EssentialMatrix {
    rotation: SO3,
    direction: Unit3,
}

impl fmt::Display for EssentialMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EssentialMatrix(rotation: {}, direction: {})",
            self.rotation, self.direction
        )
    }
}

impl EssentialMatrix {
    /// Create from a rotation and a translation direction.
    pub fn new(rotation: SO3, direction: Unit3) -> Self {
        EssentialMatrix {
            rotation,
            direction,
        }
    }

    /// Create from a rotation and a (non-zero) translation vector; the scale is dropped.
    ///
    /// # Errors
    /// [`ManifoldError::InvalidElement`](super::ManifoldError::InvalidElement) for a zero
    /// translation.
    pub fn from_rotation_translation(
        rotation: SO3,
        translation: Vector3<f64>,
    ) -> ManifoldResult<Self> {
        Ok(EssentialMatrix::new(rotation, Unit3::new(translation)?))
    }

    /// Generate a random essential matrix.
    pub fn random() -> Self {
        EssentialMatrix::new(SO3::random(), Unit3::random())
    }

    /// Relative rotation.
    pub fn rotation(&self) -> &SO3 {
        &self.rotation
    }

    /// Translation direction.
    pub fn direction(&self) -> &Unit3 {
        &self.direction
    }

    /// Dense essential matrix `[t̂]ₓ · R`.
    pub fn matrix(&self) -> Matrix3<f64> {
        self.direction.skew() * self.rotation.rotation_matrix()
    }
}

impl Manifold for EssentialMatrix {
    const DIM: usize = 5;

    fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Self> {
        check_tangent_dimension(delta, Self::DIM)?;
        let rotation = self.rotation.retract(&delta.rows(0, 3).into_owned())?;
        let direction = self.direction.retract(&delta.rows(3, 2).into_owned())?;
        Ok(EssentialMatrix::new(rotation, direction))
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        let mut result = DVector::zeros(Self::DIM);
        result
            .rows_mut(0, 3)
            .copy_from(&self.rotation.local_coordinates(&other.rotation));
        result
            .rows_mut(3, 2)
            .copy_from(&self.direction.local_coordinates(&other.direction));
        result
    }

    fn equals(&self, other: &Self, tolerance: f64) -> bool {
        self.rotation.equals(&other.rotation, tolerance)
            && self.direction.equals(&other.direction, tolerance)
    }
}
