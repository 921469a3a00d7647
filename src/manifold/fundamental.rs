//! General fundamental matrix manifold.
//!
//! A fundamental matrix is parameterized as `F = U · diag(1, s, 1) · Vᵀ` with
//! `U, V ∈ SO(3)` and an unconstrained scalar `s`, for 7 degrees of freedom.
//!
//! Tangent vectors are ordered `[U (3), s (1), V (3)]`; `retract` and `local_coordinates`
//! slice them identically.

use super::{EpipolarGeometry, Manifold, ManifoldResult, check_tangent_dimension, so3::SO3};
use nalgebra::{DVector, Matrix3, Vector3};
use std::fmt;

/// Fundamental matrix as (left rotation, scalar, right rotation).
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalMatrix {
    u: SO3,
    s: f64,
    v: SO3,
}

impl Default for FundamentalMatrix {
    /// Identity rotations and `s = 1`.
    fn default() -> Self {
        FundamentalMatrix {
            u: SO3::identity(),
            s: 1.0,
            v: SO3::identity(),
        }
    }
}

impl fmt::Display for FundamentalMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FundamentalMatrix(U: {}, s: {:.6}, V: {})",
            self.u, self.s, self.v
        )
    }
}

impl FundamentalMatrix {
    /// Create from left rotation `u`, scalar `s` and right rotation `v`.
    pub fn new(u: SO3, s: f64, v: SO3) -> Self {
        FundamentalMatrix { u, s, v }
    }

    /// Create from dense left/right rotation matrices.
    ///
    /// # Errors
    /// [`ManifoldError::InvalidElement`](super::ManifoldError::InvalidElement) if either
    /// matrix is not a proper rotation.
    pub fn from_rotation_matrices(
        u: &Matrix3<f64>,
        s: f64,
        v: &Matrix3<f64>,
    ) -> ManifoldResult<Self> {
        Ok(FundamentalMatrix::new(
            SO3::from_rotation_matrix(u)?,
            s,
            SO3::from_rotation_matrix(v)?,
        ))
    }

    /// Left rotation U.
    pub fn u(&self) -> &SO3 {
        &self.u
    }

    /// Scalar shape parameter s.
    pub fn s(&self) -> f64 {
        self.s
    }

    /// Right rotation V.
    pub fn v(&self) -> &SO3 {
        &self.v
    }
}

impl Manifold for FundamentalMatrix {
    const DIM: usize = 7;

    fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Self> {
        check_tangent_dimension(delta, Self::DIM)?;
        let u = self.u.retract(&delta.rows(0, 3).into_owned())?;
        let s = self.s + delta[3];
        let v = self.v.retract(&delta.rows(4, 3).into_owned())?;
        Ok(FundamentalMatrix::new(u, s, v))
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        let mut result = DVector::zeros(Self::DIM);
        result
            .rows_mut(0, 3)
            .copy_from(&self.u.local_coordinates(&other.u));
        result[3] = other.s - self.s;
        result
            .rows_mut(4, 3)
            .copy_from(&self.v.local_coordinates(&other.v));
        result
    }

    fn equals(&self, other: &Self, tolerance: f64) -> bool {
        self.u.equals(&other.u, tolerance)
            && (self.s - other.s).abs() < tolerance
            && self.v.equals(&other.v, tolerance)
    }
}

impl EpipolarGeometry for FundamentalMatrix {
    /// `U · diag(1, s, 1) · Vᵀ`
    fn matrix(&self) -> Matrix3<f64> {
        self.u.rotation_matrix()
            * Matrix3::from_diagonal(&Vector3::new(1.0, self.s, 1.0))
            * self.v.rotation_matrix().transpose()
    }
}
